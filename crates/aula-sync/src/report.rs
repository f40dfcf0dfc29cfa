//! Statistics reporting gateway.
//!
//! Serializes aggregated rows into the report importer's delimited wire
//! format and POSTs them, one request per report kind. Each kind tracks its
//! own high-water-mark timestamp, advanced only after a confirmed send, so
//! a failed upload is retried with the same window on the next run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use aula_lms::{SettingsStore, StatRow};

use crate::error::{SyncError, SyncResult};
use crate::usage::UsageRow;

/// Field delimiter of the wire format. Values must never contain it.
const FIELD_DELIMITER: char = '|';

/// Path of the report importer below the configured base URL.
const IMPORT_PATH: &str = "reports/import";

/// Request timeout for report uploads.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The three report kinds pushed after each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Summed daily access counts per (course, turn).
    Access,
    /// Distinct participant counts per (course, turn).
    Participation,
    /// Reconstructed usage minutes per (course, turn).
    Usage,
}

impl ReportKind {
    /// The importer's action tag for this kind.
    #[must_use]
    pub const fn action(self) -> &'static str {
        match self {
            ReportKind::Access => "access",
            ReportKind::Participation => "participation",
            ReportKind::Usage => "usage",
        }
    }

    /// The settings key holding this kind's high-water-mark.
    #[must_use]
    pub const fn setting_key(self) -> &'static str {
        match self {
            ReportKind::Access => "report.last_sent.access",
            ReportKind::Participation => "report.last_sent.participation",
            ReportKind::Usage => "report.last_sent.usage",
        }
    }
}

/// A row serializable onto the wire.
pub trait WireRecord {
    /// The row's column values, in wire order. Values must not contain the
    /// field delimiter or newlines; producers only emit numbers.
    fn fields(&self) -> Vec<String>;
}

impl WireRecord for StatRow {
    fn fields(&self) -> Vec<String> {
        vec![
            self.course_id.to_string(),
            self.turn.to_string(),
            self.value.to_string(),
        ]
    }
}

impl WireRecord for UsageRow {
    fn fields(&self) -> Vec<String> {
        vec![
            self.course_id.to_string(),
            self.turn.index().to_string(),
            self.minutes.to_string(),
        ]
    }
}

/// Joins rows into the importer's `|`-and-newline wire format.
#[must_use]
pub fn encode<R: WireRecord>(rows: &[R]) -> String {
    rows.iter()
        .map(|row| {
            let fields = row.fields();
            debug_assert!(fields
                .iter()
                .all(|f| !f.contains(FIELD_DELIMITER) && !f.contains('\n')));
            fields.join(&FIELD_DELIMITER.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Transport seam for the report importer endpoint.
#[async_trait]
pub trait ReportTransport: Send + Sync {
    /// Posts one report payload under an action tag.
    async fn post(&self, action: &str, data: &str) -> SyncResult<()>;
}

/// reqwest-based transport.
#[derive(Debug, Clone)]
pub struct HttpReportTransport {
    client: Client,
    base_url: String,
}

impl HttpReportTransport {
    /// Builds the transport for a base URL (trailing slash included).
    pub fn new(base_url: String) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("aula-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl ReportTransport for HttpReportTransport {
    async fn post(&self, action: &str, data: &str) -> SyncResult<()> {
        let url = format!("{}{IMPORT_PATH}", self.base_url);

        debug!(%url, action, bytes = data.len(), "Posting report");

        self.client
            .post(&url)
            .form(&[("action", action), ("data", data)])
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

/// Report gateway: serialization, upload and high-water-mark tracking.
pub struct ReportGateway {
    transport: Arc<dyn ReportTransport>,
    settings: Arc<dyn SettingsStore>,
}

impl ReportGateway {
    /// Creates the gateway over a transport and the settings store.
    pub fn new(transport: Arc<dyn ReportTransport>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// This kind's current lower bound, if any run succeeded before.
    pub async fn last_sent(&self, kind: ReportKind) -> SyncResult<Option<DateTime<Utc>>> {
        Ok(self.settings.last_sent(kind.setting_key()).await?)
    }

    /// Sends one report.
    ///
    /// An empty row set is trivial success: no request is made, but the
    /// high-water-mark still advances. The mark is only written after the
    /// importer confirmed the upload.
    pub async fn send<R: WireRecord>(&self, kind: ReportKind, rows: &[R]) -> SyncResult<()> {
        if rows.is_empty() {
            debug!(kind = kind.action(), "No rows to report");
            self.advance_mark(kind).await;
            return Ok(());
        }

        let data = encode(rows);
        self.transport.post(kind.action(), &data).await?;

        info!(kind = kind.action(), rows = rows.len(), "Report sent");
        self.advance_mark(kind).await;

        Ok(())
    }

    /// Moves the high-water-mark to now. A failed write is logged only:
    /// the worst case is re-sending the same window next run.
    async fn advance_mark(&self, kind: ReportKind) {
        if let Err(e) = self.settings.mark_sent(kind.setting_key(), Utc::now()).await {
            warn!(kind = kind.action(), error = %e, "Could not advance report high-water-mark");
        }
    }
}
