//! Enrolment reconciliation.
//!
//! Computes the pending (person, course, role) triples across every
//! category, enrols each through the course's manual channel and writes the
//! enrolment id back through the category's own link field. The input is
//! ordered by (course, account) so course existence, context and channel
//! are resolved once per distinct course, not once per row.

use std::sync::Arc;
use tracing::{info, warn};

use aula_core::{AccountId, CourseId, Role};
use aula_db::models::EnrolmentRequest;
use aula_db::SourceStore;
use aula_lms::{CourseContext, LmsApi};

use crate::summary::EnrolmentSummary;

/// Enrolment reconciliation phase.
pub struct EnrolmentSync {
    store: Arc<dyn SourceStore>,
    lms: Arc<dyn LmsApi>,
}

impl EnrolmentSync {
    /// Creates the phase over the two platforms.
    pub fn new(store: Arc<dyn SourceStore>, lms: Arc<dyn LmsApi>) -> Self {
        Self { store, lms }
    }

    /// Reconciles every pending enrolment.
    ///
    /// `proxies` carries the auxiliary accounts to compute auxiliary
    /// categories for; pass an empty slice outside proxy mode.
    pub async fn sync(&self, proxies: &[(AccountId, Role)]) -> EnrolmentSummary {
        let mut summary = EnrolmentSummary::default();

        let requests = match self.store.pending_enrolments(proxies).await {
            Ok(requests) => requests,
            Err(e) => {
                warn!(error = %e, "Could not collect pending enrolments");
                summary.errors += 1;
                return summary;
            }
        };

        summary.pending = requests.len();
        info!(pending = summary.pending, "Synchronizing enrolments...");

        let mut last_course: Option<CourseId> = None;
        let mut context: Option<CourseContext> = None;

        for request in &requests {
            // Course existence, context and channel are resolved once per
            // distinct course value in the ordered input.
            if last_course != Some(request.course_id) {
                last_course = Some(request.course_id);
                context = match self.lms.resolve_course_context(request.course_id).await {
                    Ok(Some(ctx)) => Some(ctx),
                    Ok(None) => {
                        // Expected absence (a course deleted after linking):
                        // every request for this course is skipped, uncounted.
                        info!(course_id = %request.course_id, "Course does not exist");
                        None
                    }
                    Err(e) => {
                        warn!(
                            course_id = %request.course_id,
                            error = %e,
                            "Course context resolution failed"
                        );
                        None
                    }
                };
            }

            let Some(ctx) = context.as_ref() else {
                summary.pending -= 1;
                continue;
            };

            self.reconcile_one(ctx, request, &mut summary).await;
        }

        if summary.remaining() == 0 {
            info!(linked = summary.linked, "Enrolment synchronization done");
        } else {
            info!(remaining = summary.remaining(), "Remaining enrolments");
        }

        summary
    }

    /// Enrols one request and writes its link back.
    async fn reconcile_one(
        &self,
        context: &CourseContext,
        request: &EnrolmentRequest,
        summary: &mut EnrolmentSummary,
    ) {
        let enrolment_id = match self
            .lms
            .enrol(context, request.account_id, request.role)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    account_id = %request.account_id,
                    course_id = %request.course_id,
                    kind = %request.kind,
                    error = %e,
                    "Enrolment failed"
                );
                summary.errors += 1;
                return;
            }
        };

        let written = if request.kind.uses_proxy_table() {
            self.store
                .insert_proxy_enrolment(request.account_id, request.course_id, request.role)
                .await
        } else {
            self.store
                .write_enrolment_link(request.kind, request.source_id, enrolment_id)
                .await
        };

        match written {
            Ok(true) => summary.linked += 1,
            Ok(false) => {
                warn!(
                    account_id = %request.account_id,
                    course_id = %request.course_id,
                    kind = %request.kind,
                    "Cannot link enrolment"
                );
                summary.errors += 1;
            }
            Err(e) => {
                warn!(
                    account_id = %request.account_id,
                    course_id = %request.course_id,
                    kind = %request.kind,
                    error = %e,
                    "Cannot link enrolment"
                );
                summary.errors += 1;
            }
        }
    }
}
