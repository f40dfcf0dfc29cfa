//! The source-platform store seam.
//!
//! [`SourceStore`] is the single boundary between the sync engine and the
//! source database; [`PgSourceStore`] is the Postgres implementation. Tests
//! drive the engine through in-memory implementations of this trait.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use aula_core::{AccountId, CourseId, EnrolmentId, EnrolmentKind, Role};

use crate::config::SourceConfig;
use crate::error::StoreResult;
use crate::models::{
    CourseModule, EnrolmentRequest, Person, PlatformSetting, SubSpecialty, TrainingGroup,
};

/// Orders pending enrolments by (course, account).
///
/// The reconciler resolves course context once per distinct course value it
/// encounters; this ordering is what makes that amortization correct.
pub fn order_for_batching(requests: &mut [EnrolmentRequest]) {
    requests.sort_by_key(|r| (r.course_id, r.account_id));
}

/// Read and write access to the source platform.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Training groups with no LMS container link.
    async fn unlinked_groups(&self) -> StoreResult<Vec<TrainingGroup>>;

    /// Modules of linked groups that have no LMS course link, ordered by
    /// (group container, module id).
    async fn unlinked_modules(&self) -> StoreResult<Vec<CourseModule>>;

    /// Sub-specialties of a module, in source order.
    async fn module_sub_specialties(&self, specialty_id: i64) -> StoreResult<Vec<SubSpecialty>>;

    /// People with no LMS account link.
    async fn unlinked_persons(&self) -> StoreResult<Vec<Person>>;

    /// Links a group to its LMS container. Set once, best effort.
    async fn set_group_link(&self, id: i64, lms_id: i64) -> StoreResult<bool>;

    /// Links a module to its LMS course. Set once, best effort.
    async fn set_module_link(&self, id: i64, lms_id: i64) -> StoreResult<bool>;

    /// Links a person to their LMS account. Set once, best effort.
    async fn set_person_link(&self, id: i64, account_id: AccountId) -> StoreResult<bool>;

    /// All pending enrolments across every category, ordered by
    /// (course, account) as required by [`order_for_batching`].
    ///
    /// `proxies` carries the auxiliary accounts (with their roles) to
    /// compute the auxiliary categories for; it is empty outside proxy mode.
    async fn pending_enrolments(
        &self,
        proxies: &[(AccountId, Role)],
    ) -> StoreResult<Vec<EnrolmentRequest>>;

    /// Writes an enrolment link through the category's own column.
    async fn write_enrolment_link(
        &self,
        kind: EnrolmentKind,
        source_id: i64,
        lms_id: EnrolmentId,
    ) -> StoreResult<bool>;

    /// Records an auxiliary enrolment row.
    async fn insert_proxy_enrolment(
        &self,
        account_id: AccountId,
        course_id: CourseId,
        role: Role,
    ) -> StoreResult<bool>;

    /// Reads a platform-wide setting value.
    async fn global_setting(&self, code: &str) -> StoreResult<Option<String>>;
}

/// Postgres-backed source store.
#[derive(Debug, Clone)]
pub struct PgSourceStore {
    pool: PgPool,
}

impl PgSourceStore {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the given configuration.
    pub async fn connect(config: &SourceConfig) -> StoreResult<Self> {
        Ok(Self {
            pool: config.connect().await?,
        })
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SourceStore for PgSourceStore {
    async fn unlinked_groups(&self) -> StoreResult<Vec<TrainingGroup>> {
        Ok(TrainingGroup::list_unlinked(&self.pool).await?)
    }

    async fn unlinked_modules(&self) -> StoreResult<Vec<CourseModule>> {
        Ok(CourseModule::list_unlinked(&self.pool).await?)
    }

    async fn module_sub_specialties(&self, specialty_id: i64) -> StoreResult<Vec<SubSpecialty>> {
        Ok(SubSpecialty::list_for_module(&self.pool, specialty_id).await?)
    }

    async fn unlinked_persons(&self) -> StoreResult<Vec<Person>> {
        Ok(Person::list_unlinked(&self.pool).await?)
    }

    async fn set_group_link(&self, id: i64, lms_id: i64) -> StoreResult<bool> {
        Ok(TrainingGroup::set_lms_link(&self.pool, id, lms_id).await?)
    }

    async fn set_module_link(&self, id: i64, lms_id: i64) -> StoreResult<bool> {
        Ok(CourseModule::set_lms_link(&self.pool, id, lms_id).await?)
    }

    async fn set_person_link(&self, id: i64, account_id: AccountId) -> StoreResult<bool> {
        Ok(Person::set_lms_link(&self.pool, id, account_id.get()).await?)
    }

    async fn pending_enrolments(
        &self,
        proxies: &[(AccountId, Role)],
    ) -> StoreResult<Vec<EnrolmentRequest>> {
        let mut requests = EnrolmentRequest::pending_certificate_students(&self.pool).await?;
        requests.extend(EnrolmentRequest::pending_ordinary_students(&self.pool).await?);
        requests.extend(EnrolmentRequest::pending_certificate_teachers(&self.pool).await?);
        requests.extend(EnrolmentRequest::pending_group_tutors(&self.pool).await?);
        requests.extend(EnrolmentRequest::pending_specialty_trainers(&self.pool).await?);
        requests.extend(EnrolmentRequest::pending_group_trainers(&self.pool).await?);

        for &(account_id, role) in proxies {
            requests
                .extend(EnrolmentRequest::pending_auxiliary(&self.pool, account_id, role).await?);
        }

        order_for_batching(&mut requests);

        debug!(pending = requests.len(), "Collected pending enrolments");

        Ok(requests)
    }

    async fn write_enrolment_link(
        &self,
        kind: EnrolmentKind,
        source_id: i64,
        lms_id: EnrolmentId,
    ) -> StoreResult<bool> {
        Ok(EnrolmentRequest::write_link(&self.pool, kind, source_id, lms_id).await?)
    }

    async fn insert_proxy_enrolment(
        &self,
        account_id: AccountId,
        course_id: CourseId,
        role: Role,
    ) -> StoreResult<bool> {
        Ok(EnrolmentRequest::insert_proxy(&self.pool, account_id, course_id, role).await?)
    }

    async fn global_setting(&self, code: &str) -> StoreResult<Option<String>> {
        Ok(PlatformSetting::get(&self.pool, code).await?)
    }
}
