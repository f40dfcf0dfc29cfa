//! Course module (group specialty) model.
//!
//! Within a certificate group, each specialty is taught as its own LMS
//! course under the group's category, with one section per sub-specialty.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A group specialty pending materialization as an LMS course.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CourseModule {
    /// Source-platform key (the group-specialty row).
    pub id: i64,

    /// Module code, used as the course short name.
    pub code: String,

    /// Module description.
    pub description: String,

    /// Code of the certificate the module belongs to.
    pub certificate_code: String,

    /// Specialty key used to look up the module's sub-specialties.
    pub specialty_id: i64,

    /// The owning group's LMS category.
    pub group_lms_id: i64,

    /// General description of the owning action, used as the course summary.
    pub summary: Option<String>,
}

/// A sub-specialty of a module; becomes one course section.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubSpecialty {
    /// Source-platform key.
    pub id: i64,

    /// Sub-specialty code.
    pub code: String,

    /// Sub-specialty description.
    pub description: String,
}

impl CourseModule {
    /// Modules whose group is linked but which have no LMS course yet,
    /// ordered so modules of the same category are created together.
    pub async fn list_unlinked(pool: &sqlx::PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT gs.id, gs.code, gs.description, gs.certificate_code,
                   gs.specialty_id, tg.lms_id AS group_lms_id, ta.description AS summary
            FROM group_specialties gs
            INNER JOIN training_groups tg ON tg.id = gs.group_id
            INNER JOIN training_actions ta ON ta.id = tg.action_id
            WHERE gs.lms_id IS NULL AND tg.lms_id IS NOT NULL
            ORDER BY tg.lms_id, gs.id
            ",
        )
        .fetch_all(pool)
        .await
    }

    /// Persists the LMS course link for a module.
    pub async fn set_lms_link(
        pool: &sqlx::PgPool,
        id: i64,
        lms_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            UPDATE group_specialties
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

impl SubSpecialty {
    /// Sub-specialties of a module, in source order.
    pub async fn list_for_module(
        pool: &sqlx::PgPool,
        specialty_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT id, code, description
            FROM specialties
            WHERE module_id = $1
            ORDER BY id
            ",
        )
        .bind(specialty_id)
        .fetch_all(pool)
        .await
    }
}
