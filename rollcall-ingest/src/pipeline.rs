//! Single-event ingestion
//!
//! Walks one payload, builds each entry and upserts it. Bad entries and
//! per-entry storage failures are counted, never fatal.

use crate::builder::VoteRecordBuilder;
use crate::repository::VoteRepository;
use crate::walker::walk;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Per-event ingestion counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Entries written to the vote repository
    pub upserted: usize,
    /// Entries dropped for lack of a voter reference
    pub skipped: usize,
    /// Entries the vote repository rejected
    pub errors: usize,
    /// Branches discarded because of a malformed nesting level
    pub malformed: usize,
}

impl IngestSummary {
    pub fn display_string(&self) -> String {
        format!(
            "{} upserted, {} skipped, {} errors, {} malformed branches",
            self.upserted, self.skipped, self.errors, self.malformed
        )
    }

    /// Accumulate another event's counts
    pub fn add(&mut self, other: &IngestSummary) {
        self.upserted += other.upserted;
        self.skipped += other.skipped;
        self.errors += other.errors;
        self.malformed += other.malformed;
    }
}

/// Flatten `payload` and upsert every individual vote under `event_id`
///
/// Re-ingesting the same payload converges to the same row set. Entries
/// that appear in an older payload but not in this one are not removed.
pub async fn ingest_event<R>(repo: &R, event_id: &str, payload: &Value) -> IngestSummary
where
    R: VoteRepository + ?Sized,
{
    let builder = VoteRecordBuilder::new(event_id);
    let mut summary = IngestSummary::default();

    for item in walk(payload) {
        let entry = match item {
            Ok(entry) => entry,
            Err(malformed) => {
                warn!(event_id = %event_id, level = %malformed.level, found = malformed.found, "Malformed branch treated as empty");
                summary.malformed += 1;
                continue;
            }
        };

        let vote = match builder.build(&entry) {
            Ok(vote) => vote,
            Err(reason) => {
                warn!(event_id = %event_id, bucket = ?entry.bucket, "Skipping voter entry: {}", reason);
                summary.skipped += 1;
                continue;
            }
        };

        match repo.upsert(&vote).await {
            Ok(()) => {
                debug!(event_id = %event_id, voter_id = %vote.voter_id, position = %vote.position, "Vote upserted");
                summary.upserted += 1;
            }
            Err(e) => {
                error!(event_id = %event_id, voter_id = %vote.voter_id, "Failed to store vote: {}", e);
                summary.errors += 1;
            }
        }
    }

    info!(event_id = %event_id, "Ingested: {}", summary.display_string());
    summary
}
