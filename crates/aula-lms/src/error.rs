//! Error types for LMS access.

use thiserror::Error;

/// Result type for LMS operations.
pub type LmsResult<T> = Result<T, LmsError>;

/// Errors raised by the LMS collaborators.
#[derive(Debug, Error)]
pub enum LmsError {
    /// A query against the LMS database failed.
    #[error("LMS query failed: {0}")]
    Database(#[from] sqlx::Error),

    /// The LMS returned data the sync cannot work with.
    #[error("Unexpected LMS data: {0}")]
    Data(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_display() {
        let err = LmsError::Data("section position went backwards".to_string());
        assert_eq!(
            err.to_string(),
            "Unexpected LMS data: section position went backwards"
        );
    }
}
