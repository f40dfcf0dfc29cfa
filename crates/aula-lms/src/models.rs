//! LMS-side request and row types.

use aula_core::{CourseId, Turn};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Request to create a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    /// Full display name.
    pub full_name: String,

    /// Short name; must be unique across the LMS.
    pub short_name: String,

    /// Owning category.
    pub category_id: i64,

    /// External reference (unique when present).
    pub reference: Option<String>,

    /// Course summary.
    pub summary: String,
}

/// Request to create a course category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    /// Display name.
    pub name: String,

    /// Parent category.
    pub parent_id: i64,

    /// Depth below the root (parent depth + 1).
    pub depth: i32,
}

/// Request to create a user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    /// Login name.
    pub username: String,

    /// Password hash, stored verbatim.
    pub password_hash: String,

    /// First name.
    pub first_name: String,

    /// Last name (both surnames joined).
    pub last_name: String,

    /// Contact email.
    pub email: String,

    /// Interface language code.
    pub language: String,
}

/// Resolved enrolment context for one course.
///
/// Computed once per distinct course while reconciling; carries everything
/// an enrolment needs besides the account and role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseContext {
    /// The course.
    pub course_id: CourseId,

    /// The course's LMS context.
    pub context_id: i64,

    /// The course's manual enrolment channel.
    pub channel_id: i64,
}

/// One aggregated statistics row (access or participation).
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StatRow {
    /// Course the activity happened on.
    pub course_id: i64,

    /// Day-part bucket (0 morning, 1 afternoon, 2 night).
    pub turn: i64,

    /// Aggregated value (participant or access count).
    pub value: i64,
}

/// Action kinds in the activity log relevant to usage tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// A page/course view.
    Viewed,
    /// The user logged out of the platform.
    LoggedOut,
    /// Anything else in the log.
    Other,
}

impl EventAction {
    /// Maps the log's action column onto the closed set.
    #[must_use]
    pub fn parse(action: &str) -> Self {
        match action {
            "viewed" => EventAction::Viewed,
            "loggedout" => EventAction::LoggedOut,
            _ => EventAction::Other,
        }
    }
}

/// One activity-log record, ordered by (user, timestamp) when fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent {
    /// Acting LMS account.
    pub account_id: i64,

    /// Course the event was logged against; the site course marks
    /// site-level activity.
    pub course_id: CourseId,

    /// What happened.
    pub action: EventAction,

    /// Event time as epoch seconds.
    pub timestamp: i64,

    /// Day-part bucket of the event time.
    pub turn: Turn,
}

impl UsageEvent {
    /// Builds an event, deriving the turn from the timestamp's hour of day.
    #[must_use]
    pub fn new(account_id: i64, course_id: CourseId, action: EventAction, timestamp: i64) -> Self {
        let turn = match Utc.timestamp_opt(timestamp, 0).single() {
            Some(at) => {
                use chrono::Timelike;
                Turn::from_hour(at.hour())
            }
            None => Turn::Night,
        };

        Self {
            account_id,
            course_id,
            action,
            timestamp,
            turn,
        }
    }
}
