//! Source-platform global settings.

use sqlx::FromRow;

/// A code/value row from the platform-wide settings table.
#[derive(Debug, Clone, FromRow)]
pub struct PlatformSetting {
    /// Setting code.
    pub code: String,

    /// Setting value.
    pub value: String,
}

/// Setting code holding the platform access mode. Values `A` and `S`
/// activate auxiliary (proxy) enrolments.
pub const ACCESS_MODE: &str = "ACCESS_MODE";

impl PlatformSetting {
    /// Looks up a setting value by code.
    pub async fn get(pool: &sqlx::PgPool, code: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<Self> = sqlx::query_as(
            r"
            SELECT code, value FROM platform_settings WHERE code = $1
            ",
        )
        .bind(code)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|setting| setting.value))
    }
}
