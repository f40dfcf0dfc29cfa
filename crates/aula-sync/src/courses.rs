//! Container materialization.
//!
//! Walks unlinked training groups and modules, creates the matching LMS
//! object — a course for ordinary groups, a category for certificate
//! groups, a course-with-sections for each module — and writes the LMS id
//! back onto the source row. Rows that are already linked never reach this
//! phase: the pending queries filter on the NULL link field.

use std::sync::Arc;
use tracing::{info, warn};

use aula_core::CourseId;
use aula_db::models::{CourseModule, TrainingGroup};
use aula_db::SourceStore;
use aula_lms::{LmsApi, NewCategory, NewCourse};

use crate::summary::PhaseSummary;

/// Certificate categories sit directly below the configured root.
const CATEGORY_DEPTH: i32 = 2;

/// Course and category synchronization.
pub struct CourseSync {
    store: Arc<dyn SourceStore>,
    lms: Arc<dyn LmsApi>,
    ordinary_root_category: i64,
    certificate_root_category: i64,
}

impl CourseSync {
    /// Creates the phase over the two platforms.
    pub fn new(
        store: Arc<dyn SourceStore>,
        lms: Arc<dyn LmsApi>,
        ordinary_root_category: i64,
        certificate_root_category: i64,
    ) -> Self {
        Self {
            store,
            lms,
            ordinary_root_category,
            certificate_root_category,
        }
    }

    /// Synchronizes groups, then the modules of linked groups.
    pub async fn sync(&self) -> PhaseSummary {
        let mut summary = PhaseSummary::new();
        info!("Synchronizing courses...");

        match self.store.unlinked_groups().await {
            Ok(groups) => {
                for group in groups {
                    self.sync_group(&group, &mut summary).await;
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not list unlinked training groups");
                summary.extra_error();
            }
        }

        match self.store.unlinked_modules().await {
            Ok(modules) => {
                for module in modules {
                    self.sync_module(&module, &mut summary).await;
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not list unlinked modules");
                summary.extra_error();
            }
        }

        info!(
            processed = summary.processed,
            errors = summary.errors,
            "Course synchronization finished"
        );

        summary
    }

    /// Certificate groups become categories, ordinary groups become courses.
    async fn sync_group(&self, group: &TrainingGroup, summary: &mut PhaseSummary) {
        if group.is_certificate {
            self.create_group_category(group, summary).await;
        } else {
            self.create_group_course(group, summary).await;
        }
    }

    async fn create_group_course(&self, group: &TrainingGroup, summary: &mut PhaseSummary) {
        let name = format!("{} ({})", group.name, group.id);

        match self.lms.course_shortname_exists(&name).await {
            Ok(true) => {
                warn!(short_name = %name, "Cannot create course: short name already exists");
                summary.failure();
                return;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(short_name = %name, error = %e, "Short name check failed");
                summary.failure();
                return;
            }
        }

        let course = NewCourse {
            full_name: name.clone(),
            short_name: name.clone(),
            category_id: self.ordinary_root_category,
            reference: None,
            summary: group.description.clone().unwrap_or_default(),
        };

        let course_id = match self.lms.create_course(&course).await {
            Ok(id) => id,
            Err(e) => {
                warn!(short_name = %name, error = %e, "Course creation failed");
                summary.failure();
                return;
            }
        };

        info!(%course_id, name = %course.full_name, "Created course");

        if let Err(e) = self.lms.set_section_count(course_id, 0).await {
            warn!(%course_id, error = %e, "Could not reset default section count");
            summary.extra_error();
        }
        if let Err(e) = self
            .lms
            .upsert_section(course_id, 0, &group.name, "")
            .await
        {
            warn!(%course_id, error = %e, "Could not rename default section");
            summary.extra_error();
        }

        self.write_group_link(group, course_id.get(), summary).await;
        summary.success();
    }

    async fn create_group_category(&self, group: &TrainingGroup, summary: &mut PhaseSummary) {
        let category = NewCategory {
            name: group.name.clone(),
            parent_id: self.certificate_root_category,
            depth: CATEGORY_DEPTH,
        };

        let category_id = match self.lms.create_category(&category).await {
            Ok(id) => id,
            Err(e) => {
                warn!(name = %group.name, error = %e, "Category creation failed");
                summary.failure();
                return;
            }
        };

        info!(%category_id, name = %group.name, "Created category");

        // A failed link leaves the category in place; the next run will try
        // the group again and the orphan is cleaned up by hand.
        self.write_group_link(group, category_id.get(), summary)
            .await;
        summary.success();
    }

    async fn write_group_link(
        &self,
        group: &TrainingGroup,
        lms_id: i64,
        summary: &mut PhaseSummary,
    ) {
        match self.store.set_group_link(group.id, lms_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(group_id = group.id, lms_id, "Group link update matched no row");
                summary.extra_error();
            }
            Err(e) => {
                warn!(group_id = group.id, lms_id, error = %e, "Group link update failed");
                summary.extra_error();
            }
        }
    }

    /// Creates a module course under its group's category, then seeds its
    /// sections.
    async fn sync_module(&self, module: &CourseModule, summary: &mut PhaseSummary) {
        let reference = format!("MOD-{}", module.id);

        let shortname_taken = match self.lms.course_shortname_exists(&module.code).await {
            Ok(taken) => taken,
            Err(e) => {
                warn!(code = %module.code, error = %e, "Short name check failed");
                summary.failure();
                return;
            }
        };
        let reference_taken = match self.lms.course_ref_exists(&reference).await {
            Ok(taken) => taken,
            Err(e) => {
                warn!(code = %module.code, error = %e, "Reference check failed");
                summary.failure();
                return;
            }
        };
        if shortname_taken || reference_taken {
            warn!(code = %module.code, "Cannot create module course: already exists");
            summary.failure();
            return;
        }

        let course = NewCourse {
            full_name: format!("{} {}", module.certificate_code, module.description),
            short_name: module.code.clone(),
            category_id: module.group_lms_id,
            reference: Some(reference),
            summary: module.summary.clone().unwrap_or_default(),
        };

        let course_id = match self.lms.create_course(&course).await {
            Ok(id) => id,
            Err(e) => {
                warn!(code = %module.code, error = %e, "Module course creation failed");
                summary.failure();
                return;
            }
        };

        info!(%course_id, code = %module.code, "Created module course");

        if let Err(e) = self.lms.set_section_count(course_id, 0).await {
            warn!(%course_id, error = %e, "Could not reset default section count");
            summary.extra_error();
        }

        match self.store.set_module_link(module.id, course_id.get()).await {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                warn!(module_id = module.id, %course_id, "Module link update failed");
                summary.extra_error();
            }
        }

        let sections = self.create_sections(module, course_id, summary).await;
        info!(%course_id, sections, "Seeded module sections");

        summary.success();
    }

    /// Inserts one section per sub-specialty plus the final-test section.
    ///
    /// A failed section is logged, counted and skipped; the position counter
    /// only advances on success, so the surviving sections stay contiguous
    /// in their original order. Returns the number of sections written.
    async fn create_sections(
        &self,
        module: &CourseModule,
        course_id: CourseId,
        summary: &mut PhaseSummary,
    ) -> i64 {
        let sub_specialties = match self.store.module_sub_specialties(module.specialty_id).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(module_id = module.id, error = %e, "Could not list sub-specialties");
                summary.extra_error();
                Vec::new()
            }
        };

        let mut position: i64 = 0;
        for sub in &sub_specialties {
            let name = format!("{} ({})", sub.description, sub.code);
            let section_summary = format!("{}-{}", sub.code, module.id);
            match self
                .lms
                .upsert_section(course_id, position, &name, &section_summary)
                .await
            {
                Ok(()) => position += 1,
                Err(e) => {
                    warn!(%course_id, position, error = %e, "Section not synchronized");
                    summary.extra_error();
                }
            }
        }

        let final_name = format!("FINAL TEST {}", module.code);
        let final_summary = module.code.replace("MF", "TF");
        match self
            .lms
            .upsert_section(course_id, position, &final_name, &final_summary)
            .await
        {
            Ok(()) => position += 1,
            Err(e) => {
                warn!(%course_id, position, error = %e, "Final test section not inserted");
                summary.extra_error();
            }
        }

        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockLms, MockSource};
    use aula_db::models::SubSpecialty;

    fn group(id: i64, certificate: bool, name: &str) -> TrainingGroup {
        TrainingGroup {
            id,
            name: name.to_string(),
            is_certificate: certificate,
            description: Some("General information".to_string()),
            lms_id: None,
        }
    }

    fn module(id: i64, code: &str, group_lms_id: i64, specialty_id: i64) -> CourseModule {
        CourseModule {
            id,
            code: code.to_string(),
            description: "Office applications".to_string(),
            certificate_code: "ADGG0558".to_string(),
            specialty_id,
            group_lms_id,
            summary: Some("Certificate info".to_string()),
        }
    }

    fn sub(id: i64, code: &str, description: &str) -> SubSpecialty {
        SubSpecialty {
            id,
            code: code.to_string(),
            description: description.to_string(),
        }
    }

    fn phase(store: &Arc<MockSource>, lms: &Arc<MockLms>) -> CourseSync {
        CourseSync::new(store.clone(), lms.clone(), 1, 4)
    }

    #[tokio::test]
    async fn test_decision_rule_course_vs_category() {
        let store = Arc::new(MockSource::default());
        let lms = Arc::new(MockLms::default());
        store.add_group(group(1, false, "A"));
        store.add_group(group(2, true, "B"));

        let summary = phase(&store, &lms).sync().await;

        assert_eq!(summary.errors, 0);
        assert_eq!(lms.created_courses(), vec!["A (1)".to_string()]);
        assert_eq!(lms.created_categories(), vec!["B".to_string()]);

        // Both groups received a non-null link.
        let links = store.group_links();
        assert_eq!(links.len(), 2);
        assert!(links.iter().any(|&(id, lms_id)| id == 1 && lms_id > 0));
        assert!(links.iter().any(|&(id, lms_id)| id == 2 && lms_id > 0));
    }

    #[tokio::test]
    async fn test_duplicate_shortname_is_counted_and_skipped() {
        let store = Arc::new(MockSource::default());
        let lms = Arc::new(MockLms::default());
        lms.add_existing_shortname("A (1)");
        store.add_group(group(1, false, "A"));

        let summary = phase(&store, &lms).sync().await;

        assert_eq!(summary.errors, 1);
        assert!(lms.created_courses().is_empty());
        assert!(store.group_links().is_empty());
    }

    #[tokio::test]
    async fn test_group_course_resets_and_renames_default_section() {
        let store = Arc::new(MockSource::default());
        let lms = Arc::new(MockLms::default());
        store.add_group(group(7, false, "Welding"));

        phase(&store, &lms).sync().await;

        let course_id = store.group_links()[0].1;
        assert_eq!(lms.section_counts(), vec![(course_id, 0)]);
        assert_eq!(
            lms.sections(),
            vec![(course_id, 0, "Welding".to_string(), String::new())]
        );
    }

    #[tokio::test]
    async fn test_module_sections_positions_and_final_test() {
        let store = Arc::new(MockSource::default());
        let lms = Arc::new(MockLms::default());
        store.add_module(module(9, "MF0233", 4, 70));
        store.add_sub_specialties(
            70,
            vec![sub(1, "UF01", "Spreadsheets"), sub(2, "UF02", "Databases")],
        );

        let summary = phase(&store, &lms).sync().await;
        assert_eq!(summary.errors, 0);

        let course_id = store.module_links()[0].1;
        let sections = lms.sections();
        assert_eq!(sections.len(), 3);
        assert_eq!(
            sections[0],
            (course_id, 0, "Spreadsheets (UF01)".to_string(), "UF01-9".to_string())
        );
        assert_eq!(
            sections[1],
            (course_id, 1, "Databases (UF02)".to_string(), "UF02-9".to_string())
        );
        assert_eq!(
            sections[2],
            (course_id, 2, "FINAL TEST MF0233".to_string(), "TF0233".to_string())
        );
    }

    #[tokio::test]
    async fn test_failed_section_is_skipped_and_numbering_continues() {
        let store = Arc::new(MockSource::default());
        let lms = Arc::new(MockLms::default());
        store.add_module(module(9, "MF0233", 4, 70));
        store.add_sub_specialties(
            70,
            vec![
                sub(1, "UF01", "Spreadsheets"),
                sub(2, "UF02", "Databases"),
                sub(3, "UF03", "Presentations"),
            ],
        );
        lms.fail_section_named("Databases (UF02)");

        let summary = phase(&store, &lms).sync().await;

        // One counted error, and the survivors stay contiguous.
        assert_eq!(summary.errors, 1);
        let positions: Vec<(i64, String)> = lms
            .sections()
            .into_iter()
            .map(|(_, pos, name, _)| (pos, name))
            .collect();
        assert_eq!(
            positions,
            vec![
                (0, "Spreadsheets (UF01)".to_string()),
                (1, "Presentations (UF03)".to_string()),
                (2, "FINAL TEST MF0233".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_module_reference_is_counted() {
        let store = Arc::new(MockSource::default());
        let lms = Arc::new(MockLms::default());
        store.add_module(module(9, "MF0233", 4, 70));
        lms.add_existing_reference("MOD-9");

        let summary = phase(&store, &lms).sync().await;

        assert_eq!(summary.errors, 1);
        assert!(lms.created_courses().is_empty());
        assert!(store.module_links().is_empty());
    }

    #[tokio::test]
    async fn test_category_link_failure_leaves_category() {
        let store = Arc::new(MockSource::default());
        store.fail_group_links();
        let lms = Arc::new(MockLms::default());
        store.add_group(group(2, true, "B"));

        let summary = phase(&store, &lms).sync().await;

        // The category exists, the link failure is counted, nothing is
        // rolled back.
        assert_eq!(summary.errors, 1);
        assert_eq!(lms.created_categories(), vec!["B".to_string()]);
    }
}
