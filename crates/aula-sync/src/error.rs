//! Engine error type.

use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the synchronization engine.
///
/// These never escape a phase: each phase catches, logs and counts them,
/// and the run carries on with the next row or step.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source-platform failure.
    #[error(transparent)]
    Store(#[from] aula_db::StoreError),

    /// LMS failure.
    #[error(transparent)]
    Lms(#[from] aula_lms::LmsError),

    /// Report upload failure.
    #[error("Report upload failed: {0}")]
    Report(String),
}

impl SyncError {
    /// Builds a report-transport error.
    pub fn report(message: impl Into<String>) -> Self {
        SyncError::Report(message.into())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Report(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let err = SyncError::report("connection refused");
        assert_eq!(err.to_string(), "Report upload failed: connection refused");
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err = SyncError::from(aula_db::StoreError::Configuration("bad".to_string()));
        assert_eq!(err.to_string(), "Invalid source configuration: bad");
    }
}
