//! Usage-time aggregation.
//!
//! Reconstructs per-course session durations from the ordered activity log
//! in a single forward scan. The input must be sorted by (account,
//! timestamp); session boundaries are inferred from logout events, course
//! changes and user changes.

use std::collections::BTreeMap;

use aula_core::{CourseId, Turn};
use aula_lms::{EventAction, UsageEvent};

/// Sessions longer than this are considered a forgotten browser tab.
const MAX_SESSION_SECS: i64 = 3600;

/// Duration substituted for over-long sessions (a third of the cap).
const CAPPED_SESSION_SECS: i64 = 1200;

/// Accumulated minutes per (course, turn).
#[derive(Debug, Default)]
pub struct UsageTotals {
    totals: BTreeMap<(i64, Turn), f64>,
}

/// One reportable usage row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRow {
    /// Course the time was spent on.
    pub course_id: i64,

    /// Day-part bucket.
    pub turn: Turn,

    /// Total minutes, rounded up.
    pub minutes: i64,
}

impl UsageTotals {
    /// An empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one closed session to the running totals.
    ///
    /// A session with no recorded end contributes zero (not the elapsed
    /// time); a session longer than [`MAX_SESSION_SECS`] contributes the
    /// fixed [`CAPPED_SESSION_SECS`] instead of its true duration.
    pub fn accumulate(&mut self, course_id: CourseId, start: i64, end: i64, turn: Turn) {
        if start <= 0 {
            return;
        }

        let mut spent = if end > 0 { end - start } else { 0 };
        if spent > MAX_SESSION_SECS {
            spent = CAPPED_SESSION_SECS;
        }

        *self.totals.entry((course_id.get(), turn)).or_insert(0.0) += spent as f64 / 60.0;
    }

    /// Total minutes accumulated for one (course, turn) key.
    #[must_use]
    pub fn minutes(&self, course_id: CourseId, turn: Turn) -> f64 {
        self.totals
            .get(&(course_id.get(), turn))
            .copied()
            .unwrap_or(0.0)
    }

    /// Reportable rows: every key with nonzero time, minutes rounded up,
    /// in (course, turn) order.
    #[must_use]
    pub fn rows(&self) -> Vec<UsageRow> {
        self.totals
            .iter()
            .filter(|(_, &minutes)| minutes > 0.0)
            .map(|(&(course_id, turn), &minutes)| UsageRow {
                course_id,
                turn,
                minutes: minutes.ceil() as i64,
            })
            .collect()
    }
}

/// Replays the ordered event log and returns the accumulated totals.
///
/// The scan keeps one open session at a time: it opens when an event lands
/// on a real course, and closes on the first of — a logout recorded since,
/// a different course event (closed at that event's own time), a user
/// change, or the end of the input. Only sessions with a recorded end
/// contribute time.
#[must_use]
pub fn aggregate(events: &[UsageEvent]) -> UsageTotals {
    let mut totals = UsageTotals::new();

    let mut current_user: i64 = 0;
    let mut current_course = CourseId::SITE;
    let mut current_turn = Turn::Night;
    let mut start_time: i64 = 0;
    let mut end_time: i64 = 0;

    for event in events {
        if event.account_id != current_user {
            if current_course.is_course() && current_user != 0 {
                totals.accumulate(current_course, start_time, end_time, current_turn);
            }
            current_course = CourseId::SITE;
            current_turn = Turn::Night;
            start_time = 0;
            end_time = 0;
            current_user = event.account_id;
        }

        if end_time > 0 && current_course.is_course() {
            totals.accumulate(current_course, start_time, end_time, current_turn);
            current_course = CourseId::SITE;
        }

        if event.action == EventAction::LoggedOut && current_course.is_course() {
            end_time = event.timestamp;
        } else {
            end_time = 0;
        }

        if event.course_id.is_course() {
            if current_course.is_course() {
                // A course change without a logout ends the previous
                // session at the new event's time.
                totals.accumulate(current_course, start_time, event.timestamp, current_turn);
                end_time = 0;
            }
            start_time = event.timestamp;
            current_course = event.course_id;
            current_turn = event.turn;
        }
    }

    if current_course.is_course() {
        totals.accumulate(current_course, start_time, end_time, current_turn);
    }

    totals
}
