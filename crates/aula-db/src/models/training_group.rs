//! Training group model.
//!
//! A training group is the top-level teaching unit on the source platform.
//! Groups belonging to a professional-certificate action become LMS course
//! categories; ordinary groups become standalone courses.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A training group joined with its owning training action.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TrainingGroup {
    /// Source-platform key.
    pub id: i64,

    /// Display name.
    pub name: String,

    /// Whether the owning action is a professional certificate.
    pub is_certificate: bool,

    /// General description of the owning action.
    pub description: Option<String>,

    /// Linked LMS container (course or category), NULL until synced.
    pub lms_id: Option<i64>,
}

impl TrainingGroup {
    /// Groups that have not been materialized on the LMS yet.
    pub async fn list_unlinked(pool: &sqlx::PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT tg.id, tg.name, ta.is_certificate, ta.description, tg.lms_id
            FROM training_groups tg
            INNER JOIN training_actions ta ON ta.id = tg.action_id
            WHERE tg.lms_id IS NULL
            ORDER BY tg.id
            ",
        )
        .fetch_all(pool)
        .await
    }

    /// Persists the LMS container link for a group.
    ///
    /// Best effort: returns whether a row was updated. The link is set once
    /// and never overwritten by the sync.
    pub async fn set_lms_link(
        pool: &sqlx::PgPool,
        id: i64,
        lms_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            UPDATE training_groups
            SET lms_id = $2
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(lms_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_serialization() {
        let group = TrainingGroup {
            id: 12,
            name: "Welding fundamentals".to_string(),
            is_certificate: false,
            description: Some("Intro course".to_string()),
            lms_id: None,
        };

        let json = serde_json::to_string(&group).unwrap();
        assert!(json.contains("Welding fundamentals"));
        assert!(json.contains("\"lms_id\":null"));
    }
}
