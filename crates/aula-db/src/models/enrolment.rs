//! Pending enrolment queries and link writes.
//!
//! Each enrolment category has its own pending query, filtered by that
//! category's own NULL link column, and its own write-back route. The
//! queries are issued independently and merged by the store; they are never
//! combined into a single SQL UNION.

use aula_core::{AccountId, CourseId, EnrolmentId, EnrolmentKind, Role};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One pending (person, course, role) triple, computed per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolmentRequest {
    /// LMS account to enrol.
    pub account_id: AccountId,

    /// LMS course to enrol into.
    pub course_id: CourseId,

    /// Role granted by the enrolment.
    pub role: Role,

    /// Category, which determines the link write-back route.
    pub kind: EnrolmentKind,

    /// Source-platform key of the row carrying the link column. Zero for
    /// auxiliary enrolments, which have no source row.
    pub source_id: i64,
}

/// Raw shape shared by all pending-category queries.
#[derive(Debug, FromRow)]
struct PendingRow {
    account_id: i64,
    course_id: i64,
    source_id: i64,
}

impl PendingRow {
    fn into_request(self, kind: EnrolmentKind, role: Role) -> EnrolmentRequest {
        EnrolmentRequest {
            account_id: AccountId::new(self.account_id),
            course_id: CourseId::new(self.course_id),
            role,
            kind,
            source_id: self.source_id,
        }
    }
}

impl EnrolmentRequest {
    /// Students on certificate specialties whose enrolment is not linked.
    pub async fn pending_certificate_students(
        pool: &sqlx::PgPool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let rows: Vec<PendingRow> = sqlx::query_as(
            r"
            SELECT p.lms_id AS account_id, gs.lms_id AS course_id, sse.id AS source_id
            FROM student_specialty_enrolments sse
            INNER JOIN students s ON s.id = sse.student_id
            INNER JOIN persons p ON p.id = s.person_id
            INNER JOIN group_specialties gs
                ON gs.group_id = sse.group_id AND gs.specialty_id = sse.specialty_id
            WHERE p.lms_id IS NOT NULL AND gs.lms_id IS NOT NULL AND sse.lms_id IS NULL
            ",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_request(EnrolmentKind::CertificateStudent, Role::Student))
            .collect())
    }

    /// Students on ordinary (non-certificate) group courses.
    pub async fn pending_ordinary_students(pool: &sqlx::PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let rows: Vec<PendingRow> = sqlx::query_as(
            r"
            SELECT p.lms_id AS account_id, tg.lms_id AS course_id, sge.id AS source_id
            FROM student_group_enrolments sge
            INNER JOIN students s ON s.id = sge.student_id
            INNER JOIN persons p ON p.id = s.person_id
            INNER JOIN training_groups tg ON tg.id = sge.group_id
            INNER JOIN training_actions ta ON ta.id = tg.action_id
            WHERE p.lms_id IS NOT NULL AND tg.lms_id IS NOT NULL
                  AND NOT ta.is_certificate AND sge.lms_id IS NULL
            ",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_request(EnrolmentKind::OrdinaryStudent, Role::Student))
            .collect())
    }

    /// Teachers assigned to certificate specialties.
    pub async fn pending_certificate_teachers(
        pool: &sqlx::PgPool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let rows: Vec<PendingRow> = sqlx::query_as(
            r"
            SELECT p.lms_id AS account_id, gs.lms_id AS course_id, tsa.id AS source_id
            FROM teacher_specialty_assignments tsa
            INNER JOIN teachers t ON t.id = tsa.teacher_id
            INNER JOIN persons p ON p.id = t.person_id
            INNER JOIN group_specialties gs ON gs.id = tsa.group_specialty_id
            WHERE p.lms_id IS NOT NULL AND gs.lms_id IS NOT NULL AND tsa.lms_id IS NULL
            ",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_request(EnrolmentKind::CertificateTeacher, Role::Teacher))
            .collect())
    }

    /// Tutors of training groups.
    pub async fn pending_group_tutors(pool: &sqlx::PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let rows: Vec<PendingRow> = sqlx::query_as(
            r"
            SELECT p.lms_id AS account_id, tg.lms_id AS course_id, gt.id AS source_id
            FROM group_tutors gt
            INNER JOIN teachers t ON t.id = gt.teacher_id
            INNER JOIN persons p ON p.id = t.person_id
            INNER JOIN training_groups tg ON tg.id = gt.group_id
            WHERE p.lms_id IS NOT NULL AND tg.lms_id IS NOT NULL AND gt.lms_id IS NULL
            ",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_request(EnrolmentKind::GroupTutor, Role::Teacher))
            .collect())
    }

    /// Group trainers teaching each certificate specialty of their group.
    ///
    /// The link column lives on the specialty row itself, so the source id
    /// is the group-specialty key.
    pub async fn pending_specialty_trainers(
        pool: &sqlx::PgPool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let rows: Vec<PendingRow> = sqlx::query_as(
            r"
            SELECT p.lms_id AS account_id, gs.lms_id AS course_id, gs.id AS source_id
            FROM group_specialties gs
            INNER JOIN training_groups tg ON tg.id = gs.group_id
            INNER JOIN training_actions ta ON ta.id = tg.action_id
            INNER JOIN teachers t ON t.id = tg.trainer_id
            INNER JOIN persons p ON p.id = t.person_id
            WHERE ta.is_certificate AND p.lms_id IS NOT NULL
                  AND gs.lms_id IS NOT NULL AND gs.trainer_lms_id IS NULL
            ",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_request(EnrolmentKind::SpecialtyTrainer, Role::Teacher))
            .collect())
    }

    /// Trainers of ordinary groups, enrolled onto the group course.
    pub async fn pending_group_trainers(pool: &sqlx::PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let rows: Vec<PendingRow> = sqlx::query_as(
            r"
            SELECT p.lms_id AS account_id, tg.lms_id AS course_id, tg.id AS source_id
            FROM training_groups tg
            INNER JOIN training_actions ta ON ta.id = tg.action_id
            INNER JOIN teachers t ON t.id = tg.trainer_id
            INNER JOIN persons p ON p.id = t.person_id
            WHERE NOT ta.is_certificate AND p.lms_id IS NOT NULL
                  AND tg.lms_id IS NOT NULL AND tg.trainer_lms_id IS NULL
            ",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_request(EnrolmentKind::GroupTrainer, Role::Teacher))
            .collect())
    }

    /// Specialty courses where an auxiliary account is not enrolled yet.
    ///
    /// Auxiliary enrolments are tracked by (account, course, role) rows in
    /// `proxy_enrolments` rather than a link column.
    pub async fn pending_auxiliary(
        pool: &sqlx::PgPool,
        account_id: AccountId,
        role: Role,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r"
            SELECT gs.lms_id
            FROM group_specialties gs
            LEFT JOIN proxy_enrolments pe
                ON pe.account_lms_id = $1 AND pe.course_lms_id = gs.lms_id AND pe.role_id = $2
            WHERE gs.lms_id IS NOT NULL AND pe.id IS NULL
            ",
        )
        .bind(account_id.get())
        .bind(role.id())
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(course_id,)| EnrolmentRequest {
                account_id,
                course_id: CourseId::new(course_id),
                role,
                kind: EnrolmentKind::Auxiliary,
                source_id: 0,
            })
            .collect())
    }

    /// Writes the LMS enrolment id back through the category's link column.
    ///
    /// Rows without a source link (auxiliary, or a zero source id) succeed
    /// trivially; those are recorded through `insert_proxy` instead.
    pub async fn write_link(
        pool: &sqlx::PgPool,
        kind: EnrolmentKind,
        source_id: i64,
        lms_id: EnrolmentId,
    ) -> Result<bool, sqlx::Error> {
        if source_id <= 0 {
            return Ok(true);
        }

        let sql = match kind {
            EnrolmentKind::CertificateStudent => {
                "UPDATE student_specialty_enrolments SET lms_id = $2 WHERE id = $1"
            }
            EnrolmentKind::OrdinaryStudent => {
                "UPDATE student_group_enrolments SET lms_id = $2 WHERE id = $1"
            }
            EnrolmentKind::CertificateTeacher => {
                "UPDATE teacher_specialty_assignments SET lms_id = $2 WHERE id = $1"
            }
            EnrolmentKind::GroupTutor => "UPDATE group_tutors SET lms_id = $2 WHERE id = $1",
            EnrolmentKind::SpecialtyTrainer => {
                "UPDATE group_specialties SET trainer_lms_id = $2 WHERE id = $1"
            }
            EnrolmentKind::GroupTrainer => {
                "UPDATE training_groups SET trainer_lms_id = $2 WHERE id = $1"
            }
            EnrolmentKind::Auxiliary => return Ok(true),
        };

        let result = sqlx::query(sql)
            .bind(source_id)
            .bind(lms_id.get())
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records an auxiliary enrolment as a (account, course, role) row.
    pub async fn insert_proxy(
        pool: &sqlx::PgPool,
        account_id: AccountId,
        course_id: CourseId,
        role: Role,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            INSERT INTO proxy_enrolments (account_lms_id, course_lms_id, role_id)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(account_id.get())
        .bind(course_id.get())
        .bind(role.id())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_row_mapping() {
        let row = PendingRow {
            account_id: 10,
            course_id: 20,
            source_id: 30,
        };
        let request = row.into_request(EnrolmentKind::GroupTutor, Role::Teacher);
        assert_eq!(request.account_id, AccountId::new(10));
        assert_eq!(request.course_id, CourseId::new(20));
        assert_eq!(request.role, Role::Teacher);
        assert_eq!(request.kind, EnrolmentKind::GroupTutor);
        assert_eq!(request.source_id, 30);
    }
}
