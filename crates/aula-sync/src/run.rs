//! Run orchestration.
//!
//! One pass, fixed order: connect to the source platform, provision
//! auxiliary accounts when proxy mode is on, sync containers, sync people,
//! reconcile enrolments, then push the three statistics reports. Only the
//! initial connections are fatal; everything after is per-row isolated and
//! counted into the run's error tally.

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use aula_core::{AccountId, Role};
use aula_db::models::settings::ACCESS_MODE;
use aula_db::{PgSourceStore, SourceStore};
use aula_lms::{ActivityLog, PgLms, SettingsStore};

use crate::config::SyncConfig;
use crate::courses::CourseSync;
use crate::enrolments::EnrolmentSync;
use crate::error::SyncResult;
use crate::persons::PersonSync;
use crate::report::{HttpReportTransport, ReportGateway, ReportKind};
use crate::usage;

/// Final outcome of one synchronization run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Correlation id for the run's log lines.
    pub run_id: Uuid,

    /// Total failure events counted across all phases.
    pub errors: u64,
}

impl RunSummary {
    /// The run succeeded iff nothing was counted against it.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors == 0
    }
}

/// The batch job.
pub struct SyncJob {
    config: SyncConfig,
}

impl SyncJob {
    /// Creates the job over a validated configuration.
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    /// Executes one full synchronization pass.
    pub async fn execute(&self) -> RunSummary {
        let run_id = Uuid::new_v4();
        let mut errors: u64 = 0;

        info!(%run_id, source = ?self.config.source.redacted(), "Starting synchronization run");

        let store = match PgSourceStore::connect(&self.config.source).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!(error = %e, "Cannot connect to source platform");
                return self.finish(run_id, 1);
            }
        };

        let lms = match self.connect_lms().await {
            Ok(lms) => Arc::new(lms),
            Err(e) => {
                error!(error = %e, "Cannot connect to LMS");
                return self.finish(run_id, errors + 1);
            }
        };

        let proxy_mode = self.proxy_mode(store.as_ref()).await;
        let persons = PersonSync::new(store.clone(), lms.clone());

        let mut proxies: Vec<(AccountId, Role)> = Vec::new();
        if proxy_mode {
            let (accounts, proxy_errors) = persons.ensure_proxy_accounts().await;
            errors += proxy_errors;
            proxies = accounts;
        }

        let course_summary = CourseSync::new(
            store.clone(),
            lms.clone(),
            self.config.ordinary_root_category,
            self.config.certificate_root_category,
        )
        .sync()
        .await;
        errors += course_summary.errors;

        let person_summary = persons.sync().await;
        errors += person_summary.errors;

        let enrolment_summary = EnrolmentSync::new(store.clone(), lms.clone())
            .sync(&proxies)
            .await;
        errors += enrolment_summary.errors;

        if let Some(base_url) = &self.config.report_base_url {
            errors += self.send_reports(base_url, lms.as_ref()).await;
        } else {
            info!("Report endpoint not configured; skipping statistics upload");
        }

        self.finish(run_id, errors)
    }

    /// Proxy mode is a source-side platform setting; a missing or
    /// unreadable value means ordinary mode.
    async fn proxy_mode(&self, store: &dyn SourceStore) -> bool {
        let mode = match store.global_setting(ACCESS_MODE).await {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Could not read platform access mode");
                String::new()
            }
        };
        mode == "A" || mode == "S"
    }

    async fn connect_lms(&self) -> SyncResult<PgLms> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&self.config.lms_database_url)
            .await
            .map_err(aula_lms::LmsError::from)?;

        info!("LMS connection established");

        Ok(PgLms::new(pool))
    }

    /// Pushes access, participation and usage reports, in that order. Each
    /// kind fails independently and counts at most one error.
    async fn send_reports(&self, base_url: &str, lms: &PgLms) -> u64 {
        let transport = match HttpReportTransport::new(base_url.to_string()) {
            Ok(transport) => Arc::new(transport),
            Err(e) => {
                error!(error = %e, "Cannot build report transport");
                return 1;
            }
        };
        let settings: Arc<dyn SettingsStore> = Arc::new(lms.clone());
        let gateway = ReportGateway::new(transport, settings);

        let mut errors: u64 = 0;

        info!("Updating access data...");
        if let Err(e) = self.push_stats(&gateway, lms, ReportKind::Access).await {
            warn!(error = %e, "Access report failed");
            errors += 1;
        }

        info!("Updating participation data...");
        if let Err(e) = self
            .push_stats(&gateway, lms, ReportKind::Participation)
            .await
        {
            warn!(error = %e, "Participation report failed");
            errors += 1;
        }

        info!("Updating usage data...");
        if let Err(e) = self.push_usage(&gateway, lms).await {
            warn!(error = %e, "Usage report failed");
            errors += 1;
        }

        errors
    }

    async fn push_stats(
        &self,
        gateway: &ReportGateway,
        log: &dyn ActivityLog,
        kind: ReportKind,
    ) -> SyncResult<()> {
        let since = gateway.last_sent(kind).await?;
        let rows = match kind {
            ReportKind::Access => log.access_stats(since).await?,
            _ => log.participation_stats(since).await?,
        };
        gateway.send(kind, &rows).await
    }

    async fn push_usage(&self, gateway: &ReportGateway, log: &dyn ActivityLog) -> SyncResult<()> {
        let since = gateway.last_sent(ReportKind::Usage).await?;
        let events = log.usage_events(since).await?;
        let totals = usage::aggregate(&events);
        gateway.send(ReportKind::Usage, &totals.rows()).await
    }

    fn finish(&self, run_id: Uuid, errors: u64) -> RunSummary {
        if errors == 0 {
            info!(%run_id, "Process completed successfully.");
        } else {
            error!(%run_id, errors, "There were {errors} error(s) found.");
        }

        RunSummary { run_id, errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_summary_success() {
        let clean = RunSummary {
            run_id: Uuid::new_v4(),
            errors: 0,
        };
        assert!(clean.is_success());

        let failed = RunSummary {
            run_id: Uuid::new_v4(),
            errors: 3,
        };
        assert!(!failed.is_success());
    }
}
