//! Job configuration loaded from environment variables.
//!
//! Fail-fast: required variables must be present and valid or the job exits
//! with a clear message before touching either platform.

use std::env;

use aula_db::SourceConfig;

use crate::error::{SyncError, SyncResult};

/// Ordinary (non-certificate) courses land under this category by default.
const DEFAULT_ORDINARY_ROOT: i64 = 1;

/// Full configuration for one synchronization run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Source-platform connection settings.
    pub source: SourceConfig,

    /// LMS database connection URL.
    pub lms_database_url: String,

    /// Report-importer base URL; reporting is skipped when unset.
    /// Always carries a trailing slash.
    pub report_base_url: Option<String>,

    /// Category receiving ordinary group courses.
    pub ordinary_root_category: i64,

    /// Parent category for certificate-group categories.
    pub certificate_root_category: i64,

    /// Log filter directive.
    pub log_filter: String,
}

impl SyncConfig {
    /// Loads the configuration from the environment.
    pub fn from_env() -> SyncResult<Self> {
        let source = SourceConfig {
            host: require("SOURCE_DB_HOST")?,
            port: optional("SOURCE_DB_PORT")
                .map(|p| parse_number(&p, "SOURCE_DB_PORT"))
                .transpose()?
                .unwrap_or(0) as u16,
            database: require("SOURCE_DB_NAME")?,
            username: require("SOURCE_DB_USER")?,
            password: optional("SOURCE_DB_PASSWORD").unwrap_or_default(),
            ..SourceConfig::default()
        };

        let config = Self {
            source,
            lms_database_url: require("LMS_DATABASE_URL")?,
            report_base_url: optional("REPORT_BASE_URL").map(|url| normalize_base_url(&url)),
            ordinary_root_category: optional("ORDINARY_ROOT_CATEGORY")
                .map(|v| parse_number(&v, "ORDINARY_ROOT_CATEGORY"))
                .transpose()?
                .unwrap_or(DEFAULT_ORDINARY_ROOT),
            certificate_root_category: parse_number(
                &require("CERTIFICATE_ROOT_CATEGORY")?,
                "CERTIFICATE_ROOT_CATEGORY",
            )?,
            log_filter: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };

        config.validate()?;

        Ok(config)
    }

    /// Cross-field validation.
    pub fn validate(&self) -> SyncResult<()> {
        self.source
            .validate()
            .map_err(|e| SyncError::Configuration(e.to_string()))?;

        if self.lms_database_url.is_empty() {
            return Err(SyncError::Configuration(
                "LMS_DATABASE_URL must not be empty".to_string(),
            ));
        }

        if let Some(url) = &self.report_base_url {
            if !url.ends_with('/') {
                return Err(SyncError::Configuration(
                    "report base URL must end with a slash".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Appends the trailing slash the report importer expects, when missing.
#[must_use]
pub fn normalize_base_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

fn require(name: &str) -> SyncResult<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(SyncError::Configuration(format!(
            "missing required environment variable {name}"
        ))),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_number(value: &str, name: &str) -> SyncResult<i64> {
    value
        .parse()
        .map_err(|_| SyncError::Configuration(format!("{name} must be a number, got '{value}'")))
}
