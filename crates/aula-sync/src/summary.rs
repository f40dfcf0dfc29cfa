//! Per-phase progress counters.

use serde::{Deserialize, Serialize};

/// Summary of one row-oriented sync phase (containers, people).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseSummary {
    /// Rows examined.
    pub processed: usize,

    /// Rows fully synced (created/linked as needed).
    pub succeeded: usize,

    /// Failure events counted against the run.
    pub errors: u64,
}

impl PhaseSummary {
    /// A fresh summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one successful row.
    pub fn success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    /// Records one failed row.
    pub fn failure(&mut self) {
        self.processed += 1;
        self.errors += 1;
    }

    /// Records a failure event that is not itself a row (for example a
    /// link write that failed after the row's object was created).
    pub fn extra_error(&mut self) {
        self.errors += 1;
    }

    /// Rows that did not complete.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.processed - self.succeeded
    }
}

/// Summary of the enrolment reconciliation phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrolmentSummary {
    /// Pending requests still expected to complete. Requests whose course
    /// disappeared are removed from this count rather than failed.
    pub pending: usize,

    /// Requests enrolled and linked.
    pub linked: usize,

    /// Failure events counted against the run.
    pub errors: u64,
}

impl EnrolmentSummary {
    /// Requests that should have completed but did not.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.saturating_sub(self.linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_summary_counts() {
        let mut summary = PhaseSummary::new();
        summary.success();
        summary.success();
        summary.failure();
        summary.extra_error();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.remaining(), 1);
    }

    #[test]
    fn test_enrolment_summary_remaining() {
        let summary = EnrolmentSummary {
            pending: 5,
            linked: 3,
            errors: 1,
        };
        assert_eq!(summary.remaining(), 2);
    }
}
