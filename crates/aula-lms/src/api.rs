//! Collaborator traits for the target LMS.
//!
//! The engine depends on these traits only; the Postgres implementations
//! live in [`crate::pg`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use aula_core::{AccountId, CategoryId, CourseId, EnrolmentId, Role};

use crate::error::LmsResult;
use crate::models::{CourseContext, NewAccount, NewCategory, NewCourse, StatRow, UsageEvent};

/// Course, category, section, account and enrolment operations.
#[async_trait]
pub trait LmsApi: Send + Sync {
    /// Whether a course with this short name already exists.
    async fn course_shortname_exists(&self, short_name: &str) -> LmsResult<bool>;

    /// Whether a course with this external reference already exists.
    async fn course_ref_exists(&self, reference: &str) -> LmsResult<bool>;

    /// Creates a course. The caller checks uniqueness first.
    async fn create_course(&self, course: &NewCourse) -> LmsResult<CourseId>;

    /// Creates a course category.
    async fn create_category(&self, category: &NewCategory) -> LmsResult<CategoryId>;

    /// Forces the course's default section count.
    async fn set_section_count(&self, course_id: CourseId, count: i64) -> LmsResult<()>;

    /// Writes one course section. Position 0 updates the pre-existing
    /// default section in place; higher positions insert a new section and
    /// advance the course's section count.
    async fn upsert_section(
        &self,
        course_id: CourseId,
        position: i64,
        name: &str,
        summary: &str,
    ) -> LmsResult<()>;

    /// Looks up an account by username.
    async fn find_account_by_username(&self, username: &str) -> LmsResult<Option<AccountId>>;

    /// Creates an account.
    async fn create_account(&self, account: &NewAccount) -> LmsResult<AccountId>;

    /// Resolves a course's enrolment context and manual channel.
    ///
    /// Returns `None` when the course no longer exists (or has no usable
    /// manual channel); this is an expected absence, not an error.
    async fn resolve_course_context(&self, course_id: CourseId)
        -> LmsResult<Option<CourseContext>>;

    /// Enrols an account into a resolved course context with a role.
    async fn enrol(
        &self,
        context: &CourseContext,
        account_id: AccountId,
        role: Role,
    ) -> LmsResult<EnrolmentId>;
}

/// Read access to the LMS activity log for statistics.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Per-(course, turn) access counts: distinct viewing students summed
    /// per day, bounded below by `since` when present.
    async fn access_stats(&self, since: Option<DateTime<Utc>>) -> LmsResult<Vec<StatRow>>;

    /// Per-(course, turn) distinct participant counts, bounded below by
    /// `since` when present.
    async fn participation_stats(&self, since: Option<DateTime<Utc>>) -> LmsResult<Vec<StatRow>>;

    /// Raw student activity events ordered by (account, timestamp), bounded
    /// below by `since` when present. The ordering is load-bearing: the
    /// usage aggregator reconstructs sessions from it.
    async fn usage_events(&self, since: Option<DateTime<Utc>>) -> LmsResult<Vec<UsageEvent>>;
}

/// Persistent key/value settings owned by the sync job.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Reads a timestamp setting.
    async fn last_sent(&self, key: &str) -> LmsResult<Option<DateTime<Utc>>>;

    /// Writes a timestamp setting.
    async fn mark_sent(&self, key: &str, at: DateTime<Utc>) -> LmsResult<()>;
}
