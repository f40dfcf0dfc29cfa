//! In-memory collaborators for engine tests.
//!
//! `MockSource` and `MockLms` implement the platform seams with plain
//! collections so the phases can be exercised without a database.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use aula_core::{AccountId, CategoryId, CourseId, EnrolmentId, EnrolmentKind, Role};
use aula_db::models::{CourseModule, EnrolmentRequest, Person, SubSpecialty, TrainingGroup};
use aula_db::store::order_for_batching;
use aula_db::{SourceStore, StoreResult};
use aula_lms::{
    CourseContext, LmsApi, LmsError, LmsResult, NewAccount, NewCategory, NewCourse,
};

/// In-memory source platform.
#[derive(Default)]
pub struct MockSource {
    groups: Mutex<Vec<TrainingGroup>>,
    modules: Mutex<Vec<CourseModule>>,
    sub_specialties: Mutex<HashMap<i64, Vec<SubSpecialty>>>,
    persons: Mutex<Vec<Person>>,
    pending: Mutex<Vec<EnrolmentRequest>>,
    settings: Mutex<HashMap<String, String>>,

    group_links: Mutex<Vec<(i64, i64)>>,
    module_links: Mutex<Vec<(i64, i64)>>,
    person_links: Mutex<Vec<(i64, i64)>>,
    enrolment_links: Mutex<Vec<(EnrolmentKind, i64, i64)>>,
    proxy_rows: Mutex<Vec<(AccountId, CourseId, i64)>>,

    fail_group_links: AtomicBool,
    fail_enrolment_links: AtomicBool,
}

impl MockSource {
    pub fn add_group(&self, group: TrainingGroup) {
        self.groups.lock().unwrap().push(group);
    }

    pub fn add_module(&self, module: CourseModule) {
        self.modules.lock().unwrap().push(module);
    }

    pub fn add_sub_specialties(&self, specialty_id: i64, subs: Vec<SubSpecialty>) {
        self.sub_specialties
            .lock()
            .unwrap()
            .insert(specialty_id, subs);
    }

    pub fn add_person(&self, person: Person) {
        self.persons.lock().unwrap().push(person);
    }

    pub fn add_pending(&self, request: EnrolmentRequest) {
        self.pending.lock().unwrap().push(request);
    }

    pub fn fail_group_links(&self) {
        self.fail_group_links.store(true, Ordering::SeqCst);
    }

    pub fn fail_enrolment_links(&self) {
        self.fail_enrolment_links.store(true, Ordering::SeqCst);
    }

    pub fn group_links(&self) -> Vec<(i64, i64)> {
        self.group_links.lock().unwrap().clone()
    }

    pub fn module_links(&self) -> Vec<(i64, i64)> {
        self.module_links.lock().unwrap().clone()
    }

    pub fn person_links(&self) -> Vec<(i64, i64)> {
        self.person_links.lock().unwrap().clone()
    }

    pub fn enrolment_links(&self) -> Vec<(EnrolmentKind, i64, i64)> {
        self.enrolment_links.lock().unwrap().clone()
    }

    pub fn proxy_rows(&self) -> Vec<(AccountId, CourseId, i64)> {
        self.proxy_rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceStore for MockSource {
    async fn unlinked_groups(&self) -> StoreResult<Vec<TrainingGroup>> {
        let linked: HashSet<i64> = self.group_links().iter().map(|&(id, _)| id).collect();
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .filter(|g| !linked.contains(&g.id))
            .cloned()
            .collect())
    }

    async fn unlinked_modules(&self) -> StoreResult<Vec<CourseModule>> {
        let linked: HashSet<i64> = self.module_links().iter().map(|&(id, _)| id).collect();
        Ok(self
            .modules
            .lock()
            .unwrap()
            .iter()
            .filter(|m| !linked.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn module_sub_specialties(&self, specialty_id: i64) -> StoreResult<Vec<SubSpecialty>> {
        Ok(self
            .sub_specialties
            .lock()
            .unwrap()
            .get(&specialty_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn unlinked_persons(&self) -> StoreResult<Vec<Person>> {
        let linked: HashSet<i64> = self.person_links().iter().map(|&(id, _)| id).collect();
        Ok(self
            .persons
            .lock()
            .unwrap()
            .iter()
            .filter(|p| !linked.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn set_group_link(&self, id: i64, lms_id: i64) -> StoreResult<bool> {
        if self.fail_group_links.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.group_links.lock().unwrap().push((id, lms_id));
        Ok(true)
    }

    async fn set_module_link(&self, id: i64, lms_id: i64) -> StoreResult<bool> {
        self.module_links.lock().unwrap().push((id, lms_id));
        Ok(true)
    }

    async fn set_person_link(&self, id: i64, account_id: AccountId) -> StoreResult<bool> {
        self.person_links
            .lock()
            .unwrap()
            .push((id, account_id.get()));
        Ok(true)
    }

    async fn pending_enrolments(
        &self,
        _proxies: &[(AccountId, Role)],
    ) -> StoreResult<Vec<EnrolmentRequest>> {
        let links = self.enrolment_links();
        let proxy_rows = self.proxy_rows();

        let mut requests: Vec<EnrolmentRequest> = self
            .pending
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                if r.kind.uses_proxy_table() {
                    !proxy_rows
                        .iter()
                        .any(|&(a, c, role_id)| {
                            a == r.account_id && c == r.course_id && role_id == r.role.id()
                        })
                } else {
                    !links
                        .iter()
                        .any(|&(kind, source_id, _)| kind == r.kind && source_id == r.source_id)
                }
            })
            .cloned()
            .collect();

        order_for_batching(&mut requests);
        Ok(requests)
    }

    async fn write_enrolment_link(
        &self,
        kind: EnrolmentKind,
        source_id: i64,
        lms_id: EnrolmentId,
    ) -> StoreResult<bool> {
        if self.fail_enrolment_links.load(Ordering::SeqCst) {
            return Ok(false);
        }
        if source_id <= 0 {
            return Ok(true);
        }
        self.enrolment_links
            .lock()
            .unwrap()
            .push((kind, source_id, lms_id.get()));
        Ok(true)
    }

    async fn insert_proxy_enrolment(
        &self,
        account_id: AccountId,
        course_id: CourseId,
        role: Role,
    ) -> StoreResult<bool> {
        self.proxy_rows
            .lock()
            .unwrap()
            .push((account_id, course_id, role.id()));
        Ok(true)
    }

    async fn global_setting(&self, code: &str) -> StoreResult<Option<String>> {
        Ok(self.settings.lock().unwrap().get(code).cloned())
    }
}

/// In-memory LMS.
pub struct MockLms {
    next_id: AtomicI64,
    existing_shortnames: Mutex<HashSet<String>>,
    existing_references: Mutex<HashSet<String>>,
    created_courses: Mutex<Vec<NewCourse>>,
    created_categories: Mutex<Vec<NewCategory>>,
    section_counts: Mutex<Vec<(i64, i64)>>,
    sections: Mutex<Vec<(i64, i64, String, String)>>,
    failing_sections: Mutex<HashSet<String>>,

    accounts: Mutex<HashMap<String, i64>>,
    created_accounts: Mutex<Vec<NewAccount>>,

    courses_present: Mutex<HashSet<i64>>,
    resolve_calls: AtomicUsize,
    failing_resolves: Mutex<HashSet<i64>>,
    enrolments: Mutex<Vec<(i64, i64, Role)>>,
    failing_enrol_accounts: Mutex<HashSet<i64>>,
}

impl Default for MockLms {
    fn default() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            existing_shortnames: Mutex::default(),
            existing_references: Mutex::default(),
            created_courses: Mutex::default(),
            created_categories: Mutex::default(),
            section_counts: Mutex::default(),
            sections: Mutex::default(),
            failing_sections: Mutex::default(),
            accounts: Mutex::default(),
            created_accounts: Mutex::default(),
            courses_present: Mutex::default(),
            resolve_calls: AtomicUsize::new(0),
            failing_resolves: Mutex::default(),
            enrolments: Mutex::default(),
            failing_enrol_accounts: Mutex::default(),
        }
    }
}

impl MockLms {
    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn add_existing_shortname(&self, short_name: &str) {
        self.existing_shortnames
            .lock()
            .unwrap()
            .insert(short_name.to_string());
    }

    pub fn add_existing_reference(&self, reference: &str) {
        self.existing_references
            .lock()
            .unwrap()
            .insert(reference.to_string());
    }

    pub fn fail_section_named(&self, name: &str) {
        self.failing_sections.lock().unwrap().insert(name.to_string());
    }

    pub fn seed_course(&self, course_id: i64) {
        self.courses_present.lock().unwrap().insert(course_id);
    }

    pub fn seed_account(&self, username: &str) -> i64 {
        let id = self.next_id();
        self.accounts.lock().unwrap().insert(username.to_string(), id);
        id
    }

    pub fn fail_resolve_for(&self, course_id: i64) {
        self.failing_resolves.lock().unwrap().insert(course_id);
    }

    pub fn fail_enrol_for_account(&self, account_id: i64) {
        self.failing_enrol_accounts
            .lock()
            .unwrap()
            .insert(account_id);
    }

    pub fn created_courses(&self) -> Vec<String> {
        self.created_courses
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.short_name.clone())
            .collect()
    }

    pub fn created_categories(&self) -> Vec<String> {
        self.created_categories
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn created_accounts(&self) -> Vec<NewAccount> {
        self.created_accounts.lock().unwrap().clone()
    }

    pub fn section_counts(&self) -> Vec<(i64, i64)> {
        self.section_counts.lock().unwrap().clone()
    }

    pub fn sections(&self) -> Vec<(i64, i64, String, String)> {
        self.sections.lock().unwrap().clone()
    }

    pub fn enrolments(&self) -> Vec<(i64, i64, Role)> {
        self.enrolments.lock().unwrap().clone()
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LmsApi for MockLms {
    async fn course_shortname_exists(&self, short_name: &str) -> LmsResult<bool> {
        Ok(self
            .existing_shortnames
            .lock()
            .unwrap()
            .contains(short_name))
    }

    async fn course_ref_exists(&self, reference: &str) -> LmsResult<bool> {
        Ok(self
            .existing_references
            .lock()
            .unwrap()
            .contains(reference))
    }

    async fn create_course(&self, course: &NewCourse) -> LmsResult<CourseId> {
        let id = self.next_id();
        self.existing_shortnames
            .lock()
            .unwrap()
            .insert(course.short_name.clone());
        if let Some(reference) = &course.reference {
            self.existing_references
                .lock()
                .unwrap()
                .insert(reference.clone());
        }
        self.courses_present.lock().unwrap().insert(id);
        self.created_courses.lock().unwrap().push(course.clone());
        Ok(CourseId::new(id))
    }

    async fn create_category(&self, category: &NewCategory) -> LmsResult<CategoryId> {
        let id = self.next_id();
        self.created_categories
            .lock()
            .unwrap()
            .push(category.clone());
        Ok(CategoryId::new(id))
    }

    async fn set_section_count(&self, course_id: CourseId, count: i64) -> LmsResult<()> {
        self.section_counts
            .lock()
            .unwrap()
            .push((course_id.get(), count));
        Ok(())
    }

    async fn upsert_section(
        &self,
        course_id: CourseId,
        position: i64,
        name: &str,
        summary: &str,
    ) -> LmsResult<()> {
        if self.failing_sections.lock().unwrap().contains(name) {
            return Err(LmsError::Data(format!("section '{name}' refused")));
        }
        self.sections.lock().unwrap().push((
            course_id.get(),
            position,
            name.to_string(),
            summary.to_string(),
        ));
        Ok(())
    }

    async fn find_account_by_username(&self, username: &str) -> LmsResult<Option<AccountId>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .get(username)
            .copied()
            .map(AccountId::new))
    }

    async fn create_account(&self, account: &NewAccount) -> LmsResult<AccountId> {
        let id = self.next_id();
        self.accounts
            .lock()
            .unwrap()
            .insert(account.username.clone(), id);
        self.created_accounts.lock().unwrap().push(account.clone());
        Ok(AccountId::new(id))
    }

    async fn resolve_course_context(
        &self,
        course_id: CourseId,
    ) -> LmsResult<Option<CourseContext>> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_resolves.lock().unwrap().contains(&course_id.get()) {
            return Err(LmsError::Data("context resolution refused".to_string()));
        }
        if !self.courses_present.lock().unwrap().contains(&course_id.get()) {
            return Ok(None);
        }

        Ok(Some(CourseContext {
            course_id,
            context_id: course_id.get() * 10,
            channel_id: course_id.get() * 100,
        }))
    }

    async fn enrol(
        &self,
        context: &CourseContext,
        account_id: AccountId,
        role: Role,
    ) -> LmsResult<EnrolmentId> {
        if self
            .failing_enrol_accounts
            .lock()
            .unwrap()
            .contains(&account_id.get())
        {
            return Err(LmsError::Data("enrolment refused".to_string()));
        }

        let id = self.next_id();
        self.enrolments.lock().unwrap().push((
            account_id.get(),
            context.course_id.get(),
            role,
        ));
        Ok(EnrolmentId::new(id))
    }
}
