//! Multi-event batch runner
//!
//! One event per worker, up to `concurrency` workers at a time. Each event
//! goes through header upsert, vote ingestion and recomputation in that
//! order. A failing event is reported and the batch carries on. The payload
//! digest is recorded only once every vote of the event has been stored.

use crate::aggregation::{recompute_totals, Recompute};
use crate::db::{payload_digest, SqliteStore};
use crate::error::IngestError;
use crate::payload::EventHeader;
use crate::pipeline::{ingest_event, IngestSummary};
use futures::stream::{self, StreamExt};
use rollcall_common::config::IngestConfig;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Batch runner settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Events processed at the same time (at least 1)
    pub concurrency: usize,
    /// Skip events whose stored payload digest matches the file
    pub skip_unchanged: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

impl From<&IngestConfig> for BatchOptions {
    fn from(config: &IngestConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            skip_unchanged: config.skip_unchanged,
        }
    }
}

/// What happened to one event
#[derive(Debug, Clone, PartialEq)]
pub enum EventStatus {
    Ingested {
        summary: IngestSummary,
        recompute: Recompute,
    },
    /// Payload identical to the stored one
    Unchanged,
    Failed(String),
}

/// Outcome of one payload file
#[derive(Debug, Clone, PartialEq)]
pub struct EventReport {
    pub path: PathBuf,
    /// `None` when the file failed before its identifier could be read
    pub event_id: Option<String>,
    pub status: EventStatus,
}

impl EventReport {
    pub fn display_string(&self) -> String {
        let name = self
            .event_id
            .clone()
            .unwrap_or_else(|| self.path.display().to_string());

        match &self.status {
            EventStatus::Ingested { summary, recompute } => {
                let totals = match recompute {
                    Recompute::Updated(result) => format!(
                        "{}, outcome {}",
                        result.totals,
                        result.outcome.as_deref().unwrap_or("undetermined")
                    ),
                    Recompute::Skipped => "no individual votes".to_string(),
                };
                format!("{}: {}; {}", name, summary.display_string(), totals)
            }
            EventStatus::Unchanged => format!("{}: unchanged", name),
            EventStatus::Failed(reason) => format!("{}: FAILED ({})", name, reason),
        }
    }
}

/// Per-event reports in input order, plus summed entry counts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub events: Vec<EventReport>,
    pub totals: IngestSummary,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.count(|status| matches!(status, EventStatus::Ingested { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|status| matches!(status, EventStatus::Unchanged))
    }

    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, EventStatus::Failed(_)))
    }

    /// True for a non-empty batch in which no event got through
    pub fn all_failed(&self) -> bool {
        !self.events.is_empty() && self.failed() == self.events.len()
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} events: {} ingested, {} unchanged, {} failed; {}",
            self.events.len(),
            self.succeeded(),
            self.unchanged(),
            self.failed(),
            self.totals.display_string()
        )
    }

    fn count(&self, predicate: impl Fn(&EventStatus) -> bool) -> usize {
        self.events.iter().filter(|report| predicate(&report.status)).count()
    }
}

/// Ingest every payload file in `paths`
pub async fn run_batch(store: &SqliteStore, paths: Vec<PathBuf>, options: &BatchOptions) -> BatchReport {
    let workers = options.concurrency.max(1);
    let skip_unchanged = options.skip_unchanged;

    info!(events = paths.len(), workers, "Starting batch ingestion");

    let mut indexed: Vec<(usize, EventReport)> = stream::iter(paths.into_iter().enumerate())
        .map(|(index, path)| async move { (index, process_file(store, path, skip_unchanged).await) })
        .buffer_unordered(workers)
        .collect()
        .await;

    indexed.sort_by_key(|(index, _)| *index);

    let mut report = BatchReport::default();
    for (_, event) in indexed {
        if let EventStatus::Ingested { summary, .. } = &event.status {
            report.totals.add(summary);
        }
        report.events.push(event);
    }

    info!("Batch complete: {}", report.display_string());
    report
}

/// Ingest one payload document already in memory
///
/// Returns the event identifier and what was done with it.
pub async fn ingest_document(
    store: &SqliteStore,
    raw_payload: &str,
    skip_unchanged: bool,
) -> Result<(String, EventStatus), IngestError> {
    let payload: Value = serde_json::from_str(raw_payload)?;
    let header = EventHeader::from_payload(&payload)?;
    let status = ingest_parsed(store, &header, &payload, raw_payload, skip_unchanged).await?;

    Ok((header.uid, status))
}

async fn process_file(store: &SqliteStore, path: PathBuf, skip_unchanged: bool) -> EventReport {
    debug!(path = %path.display(), "Worker starting event");

    let mut event_id = None;
    let status = match ingest_file(store, &path, skip_unchanged, &mut event_id).await {
        Ok(status) => status,
        Err(e) => {
            error!(path = %path.display(), event_id = ?event_id, "Event failed: {}", e);
            EventStatus::Failed(e.to_string())
        }
    };

    EventReport { path, event_id, status }
}

async fn ingest_file(
    store: &SqliteStore,
    path: &Path,
    skip_unchanged: bool,
    event_id: &mut Option<String>,
) -> Result<EventStatus, IngestError> {
    let raw_payload = tokio::fs::read_to_string(path).await?;
    let payload: Value = serde_json::from_str(&raw_payload)?;
    let header = EventHeader::from_payload(&payload)?;
    *event_id = Some(header.uid.clone());

    ingest_parsed(store, &header, &payload, &raw_payload, skip_unchanged).await
}

async fn ingest_parsed(
    store: &SqliteStore,
    header: &EventHeader,
    payload: &Value,
    raw_payload: &str,
    skip_unchanged: bool,
) -> Result<EventStatus, IngestError> {
    if skip_unchanged {
        let stored = store.stored_digest(&header.uid).await?;
        if stored.as_deref() == Some(payload_digest(raw_payload).as_str()) {
            info!(event_id = %header.uid, "Payload unchanged, skipping");
            return Ok(EventStatus::Unchanged);
        }
    }

    store.upsert_event_header(header, raw_payload).await?;

    let summary = ingest_event(store, &header.uid, payload).await;
    let recompute = recompute_totals(store, store, &header.uid).await?;

    if summary.errors == 0 {
        store.mark_ingested(&header.uid, &payload_digest(raw_payload)).await?;
    } else {
        debug!(event_id = %header.uid, errors = summary.errors, "Payload left unmarked for retry");
    }

    Ok(EventStatus::Ingested { summary, recompute })
}
