//! Postgres implementation of the LMS collaborators.
//!
//! Thin persistence plumbing: every method is a handful of parameterized
//! queries against the LMS schema. No sync policy lives here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, warn};

use aula_core::{AccountId, CategoryId, CourseId, EnrolmentId, Role};

use crate::api::{ActivityLog, LmsApi, SettingsStore};
use crate::error::{LmsError, LmsResult};
use crate::models::{
    CourseContext, EventAction, NewAccount, NewCategory, NewCourse, StatRow, UsageEvent,
};

/// The enrolment method used for all sync-driven enrolments.
const MANUAL_METHOD: &str = "manual";

/// Postgres-backed LMS client.
#[derive(Debug, Clone)]
pub struct PgLms {
    pool: PgPool,
}

impl PgLms {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LmsApi for PgLms {
    async fn course_shortname_exists(&self, short_name: &str) -> LmsResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE short_name = $1")
                .bind(short_name)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    async fn course_ref_exists(&self, reference: &str) -> LmsResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE reference = $1")
            .bind(reference)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn create_course(&self, course: &NewCourse) -> LmsResult<CourseId> {
        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO courses (full_name, short_name, category_id, reference, summary)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(&course.full_name)
        .bind(&course.short_name)
        .bind(course.category_id)
        .bind(&course.reference)
        .bind(&course.summary)
        .fetch_one(&self.pool)
        .await?;

        // The LMS seeds every course with a default section 0, a section
        // count option, an enrolment context and a manual channel.
        sqlx::query(
            r"
            INSERT INTO course_sections (course_id, position, name, summary, summary_format)
            VALUES ($1, 0, '', '', 1)
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            INSERT INTO course_options (course_id, name, value)
            VALUES ($1, 'numsections', '1')
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        sqlx::query("INSERT INTO course_contexts (course_id) VALUES ($1)")
            .bind(id)
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r"
            INSERT INTO enrol_channels (course_id, method, role_id)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(id)
        .bind(MANUAL_METHOD)
        .bind(Role::Student.id())
        .execute(&self.pool)
        .await?;

        debug!(course_id = id, short_name = %course.short_name, "Course created");

        Ok(CourseId::new(id))
    }

    async fn create_category(&self, category: &NewCategory) -> LmsResult<CategoryId> {
        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO categories (name, parent_id, depth)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(&category.name)
        .bind(category.parent_id)
        .bind(category.depth)
        .fetch_one(&self.pool)
        .await?;

        debug!(category_id = id, name = %category.name, "Category created");

        Ok(CategoryId::new(id))
    }

    async fn set_section_count(&self, course_id: CourseId, count: i64) -> LmsResult<()> {
        sqlx::query(
            r"
            UPDATE course_options
            SET value = $2
            WHERE course_id = $1 AND name = 'numsections'
            ",
        )
        .bind(course_id.get())
        .bind(count.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_section(
        &self,
        course_id: CourseId,
        position: i64,
        name: &str,
        summary: &str,
    ) -> LmsResult<()> {
        if position == 0 {
            sqlx::query(
                r"
                UPDATE course_sections
                SET name = $2, summary = $3
                WHERE course_id = $1 AND position = 0
                ",
            )
            .bind(course_id.get())
            .bind(name)
            .bind(summary)
            .execute(&self.pool)
            .await?;
            return Ok(());
        }

        sqlx::query(
            r"
            INSERT INTO course_sections (course_id, position, name, summary, summary_format)
            VALUES ($1, $2, $3, $4, 1)
            ",
        )
        .bind(course_id.get())
        .bind(position)
        .bind(name)
        .bind(summary)
        .execute(&self.pool)
        .await?;

        // Inserting section N makes it the last visible one.
        self.set_section_count(course_id, position).await
    }

    async fn find_account_by_username(&self, username: &str) -> LmsResult<Option<AccountId>> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM accounts WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id.map(AccountId::new))
    }

    async fn create_account(&self, account: &NewAccount) -> LmsResult<AccountId> {
        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO accounts
                (username, password_hash, first_name, last_name, email, confirmed, language)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6)
            RETURNING id
            ",
        )
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.email)
        .bind(&account.language)
        .fetch_one(&self.pool)
        .await?;

        debug!(account_id = id, username = %account.username, "Account created");

        Ok(AccountId::new(id))
    }

    async fn resolve_course_context(
        &self,
        course_id: CourseId,
    ) -> LmsResult<Option<CourseContext>> {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE id = $1")
            .bind(course_id.get())
            .fetch_one(&self.pool)
            .await?;
        if exists == 0 {
            return Ok(None);
        }

        let context_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM course_contexts WHERE course_id = $1")
                .bind(course_id.get())
                .fetch_optional(&self.pool)
                .await?;

        let channel_id: Option<i64> = sqlx::query_scalar(
            r"
            SELECT id FROM enrol_channels
            WHERE course_id = $1 AND method = $2
            LIMIT 1
            ",
        )
        .bind(course_id.get())
        .bind(MANUAL_METHOD)
        .fetch_optional(&self.pool)
        .await?;

        match (context_id, channel_id) {
            (Some(context_id), Some(channel_id)) => Ok(Some(CourseContext {
                course_id,
                context_id,
                channel_id,
            })),
            _ => {
                warn!(%course_id, "Course exists but has no usable manual enrolment channel");
                Ok(None)
            }
        }
    }

    async fn enrol(
        &self,
        context: &CourseContext,
        account_id: AccountId,
        role: Role,
    ) -> LmsResult<EnrolmentId> {
        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO user_enrolments (account_id, channel_id, created_at)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(account_id.get())
        .bind(context.channel_id)
        .bind(Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await?;

        sqlx::query(
            r"
            INSERT INTO role_assignments (role_id, context_id, account_id)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(role.id())
        .bind(context.context_id)
        .bind(account_id.get())
        .execute(&self.pool)
        .await?;

        Ok(EnrolmentId::new(id))
    }
}

#[async_trait]
impl ActivityLog for PgLms {
    async fn access_stats(&self, since: Option<DateTime<Utc>>) -> LmsResult<Vec<StatRow>> {
        let rows = sqlx::query_as(
            r"
            SELECT course_id, turn, SUM(participants)::bigint AS value
            FROM (
                SELECT l.course_id,
                       CASE WHEN EXTRACT(HOUR FROM to_timestamp(l.created_at)) BETWEEN 7 AND 14 THEN 0::bigint
                            WHEN EXTRACT(HOUR FROM to_timestamp(l.created_at)) BETWEEN 15 AND 22 THEN 1::bigint
                            ELSE 2::bigint END AS turn,
                       to_char(to_timestamp(l.created_at), 'YYYYMMDD') AS day,
                       COUNT(DISTINCT l.account_id) AS participants
                FROM activity_log l
                WHERE l.action = 'viewed'
                      AND l.course_id <> 1
                      AND ($1::timestamptz IS NULL OR to_timestamp(l.created_at) > $1)
                      AND l.account_id IN (
                          SELECT ue.account_id
                          FROM user_enrolments ue
                          INNER JOIN enrol_channels ec ON ue.channel_id = ec.id
                          WHERE ec.role_id = 5 AND ec.course_id = l.course_id)
                GROUP BY l.course_id, turn, day
            ) daily
            GROUP BY course_id, turn
            ORDER BY course_id, turn
            ",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn participation_stats(&self, since: Option<DateTime<Utc>>) -> LmsResult<Vec<StatRow>> {
        let rows = sqlx::query_as(
            r"
            SELECT l.course_id,
                   CASE WHEN EXTRACT(HOUR FROM to_timestamp(l.created_at)) BETWEEN 7 AND 14 THEN 0::bigint
                        WHEN EXTRACT(HOUR FROM to_timestamp(l.created_at)) BETWEEN 15 AND 22 THEN 1::bigint
                        ELSE 2::bigint END AS turn,
                   COUNT(DISTINCT l.account_id)::bigint AS value
            FROM activity_log l
            WHERE l.action = 'viewed'
                  AND l.course_id <> 1
                  AND ($1::timestamptz IS NULL OR to_timestamp(l.created_at) > $1)
                  AND l.account_id IN (
                      SELECT ue.account_id
                      FROM user_enrolments ue
                      INNER JOIN enrol_channels ec ON ue.channel_id = ec.id
                      WHERE ec.role_id = 5 AND ec.course_id = l.course_id)
            GROUP BY l.course_id, turn
            ORDER BY l.course_id, turn
            ",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn usage_events(&self, since: Option<DateTime<Utc>>) -> LmsResult<Vec<UsageEvent>> {
        let rows = sqlx::query(
            r"
            SELECT l.account_id, l.course_id, l.action, l.created_at
            FROM activity_log l
            WHERE ($1::timestamptz IS NULL OR to_timestamp(l.created_at) > $1)
                  AND l.account_id IN (
                      SELECT ue.account_id
                      FROM user_enrolments ue
                      INNER JOIN enrol_channels ec ON ue.channel_id = ec.id
                      WHERE ec.role_id = 5 AND ec.course_id = l.course_id)
            ORDER BY l.account_id, l.created_at
            ",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let account_id: i64 = row.try_get("account_id")?;
                let course_id: i64 = row.try_get("course_id")?;
                let action: String = row.try_get("action")?;
                let created_at: i64 = row.try_get("created_at")?;
                Ok(UsageEvent::new(
                    account_id,
                    CourseId::new(course_id),
                    EventAction::parse(&action),
                    created_at,
                ))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(LmsError::from)
    }
}

#[async_trait]
impl SettingsStore for PgLms {
    async fn last_sent(&self, key: &str) -> LmsResult<Option<DateTime<Utc>>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM sync_settings WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        match value {
            None => Ok(None),
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map(|at| Some(at.with_timezone(&Utc)))
                .map_err(|e| LmsError::Data(format!("bad timestamp in setting {key}: {e}"))),
        }
    }

    async fn mark_sent(&self, key: &str, at: DateTime<Utc>) -> LmsResult<()> {
        sqlx::query(
            r"
            INSERT INTO sync_settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            ",
        )
        .bind(key)
        .bind(at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
