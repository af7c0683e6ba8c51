//! The two jobs the binary runs: ingest (extract, transform, load) and the
//! weekly report.

use crate::load::{LoadError, LoadReport, MusicStore};
use crate::report::{self, MailSettings, ReportError};
use crate::spotify::{ApiError, SpotifyApi};
use crate::transform::{transform, TransformError, TransformSettings};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use lettre::Transport;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Extract failed: {0}")]
    Extract(#[from] ApiError),

    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    #[error("Report failed: {0}")]
    Report(#[from] ReportError),
}

/// Calendar date at `now` in the zone plays are recorded in.
pub fn local_today(timezone: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&timezone).date_naive()
}

pub struct IngestSettings {
    pub limit: u32,
    pub transform: TransformSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub fetched: usize,
    pub load: LoadReport,
}

pub fn run_ingest<A: SpotifyApi>(
    api: &A,
    store_path: &Path,
    settings: &IngestSettings,
) -> Result<IngestSummary, PipelineError> {
    let mut store = MusicStore::open(store_path)?;

    let page = api.recently_played(settings.limit)?;
    info!("Fetched {} play events", page.items.len());

    let batch = transform(&page, api, &settings.transform)?;
    if batch.is_empty() {
        info!("No plays to load");
        return Ok(IngestSummary {
            fetched: 0,
            load: LoadReport::default(),
        });
    }

    let load = store.load(&batch)?;
    for table in &load.tables {
        info!(
            "{}: {} staged, {} inserted, {} refreshed",
            table.table, table.staged, table.inserted, table.refreshed
        );
    }

    Ok(IngestSummary {
        fetched: page.items.len(),
        load,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecapSummary {
    pub subject: String,
    pub recipient: String,
}

/// Collects the recap for the week ending on `today` and mails it. Nothing
/// is sent when any routine fails.
pub fn run_report<T>(
    store_path: &Path,
    mail: &MailSettings,
    transport: &T,
    today: NaiveDate,
) -> Result<RecapSummary, PipelineError>
where
    T: Transport,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    let store = MusicStore::open(store_path)?;
    let recap = report::collect_recap(&store, today)?;
    drop(store);

    let subject = report::subject(&recap);
    info!("Sending \"{}\" to {}", subject, mail.recipient);
    let message = report::build_message(mail, &recap)?;
    report::send_message(transport, &message)?;

    Ok(RecapSummary {
        subject,
        recipient: mail.recipient.clone(),
    })
}
