//! Error types for source-platform access.

use thiserror::Error;

/// Result type for source-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the source-platform store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid or incomplete connection configuration.
    #[error("Invalid source configuration: {0}")]
    Configuration(String),

    /// Could not establish the source connection.
    #[error("Failed to connect to source platform: {0}")]
    Connection(#[source] sqlx::Error),

    /// A query against the source platform failed.
    #[error("Source query failed: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_display() {
        let err = StoreError::Configuration("host is required".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid source configuration: host is required"
        );
    }

    #[test]
    fn test_database_wraps_sqlx() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(err.to_string().starts_with("Source query failed"));
    }
}
