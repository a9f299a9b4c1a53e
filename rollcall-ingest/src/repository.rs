//! Storage contracts consumed by ingestion and aggregation
//!
//! Any store satisfying these contracts can back the engine; the crate ships
//! a SQLite implementation in [`crate::db::SqliteStore`].

use crate::aggregation::EventTotals;
use crate::error::StorageError;
use async_trait::async_trait;
use rollcall_common::db::IndividualVote;
use rollcall_common::Outcome;

/// Individual vote persistence
#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Insert the vote, or overwrite every field of the existing row with the
    /// same `(event_id, voter_id)`
    async fn upsert(&self, vote: &IndividualVote) -> Result<(), StorageError>;

    /// All votes recorded for one event (order is not significant)
    async fn fetch_all(&self, event_id: &str) -> Result<Vec<IndividualVote>, StorageError>;
}

/// Ballot event aggregate persistence
#[async_trait]
pub trait EventTotalsWriter: Send + Sync {
    /// Outcome code currently stored on the event, `None` while undetermined
    async fn current_outcome(&self, event_id: &str) -> Result<Option<String>, StorageError>;

    /// Store the recomputed aggregates
    ///
    /// `outcome` is only applied when the event has no outcome yet; an
    /// existing outcome is never overwritten.
    async fn write_aggregates(
        &self,
        event_id: &str,
        totals: &EventTotals,
        outcome: Option<Outcome>,
    ) -> Result<(), StorageError>;
}
