//! Event aggregates and outcome derivation
//!
//! Totals are a pure function of the individual votes stored for an event,
//! so recomputation can be repeated at will. It should run once the event's
//! ingestion has finished; running it alongside an in-flight ingestion of
//! the same event can under-count.

use crate::error::StorageError;
use crate::repository::{EventTotalsWriter, VoteRepository};
use rollcall_common::db::IndividualVote;
use rollcall_common::{Outcome, Position};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Position counts of one ballot event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventTotals {
    pub for_count: i64,
    pub against_count: i64,
    pub abstain_count: i64,
    pub non_voter_count: i64,
    /// Number of individual votes on record
    pub total_cast: i64,
    /// Expressed votes: for + against
    pub valid_count: i64,
}

impl EventTotals {
    /// Count positions among `votes`
    pub fn tally(votes: &[IndividualVote]) -> Self {
        let mut totals = EventTotals::default();

        for vote in votes {
            if vote.position.is_expressed() {
                totals.valid_count += 1;
            }
            match vote.position {
                Position::For => totals.for_count += 1,
                Position::Against => totals.against_count += 1,
                Position::Abstain => totals.abstain_count += 1,
                Position::NonVoter => totals.non_voter_count += 1,
            }
        }

        totals.total_cast = votes.len() as i64;
        totals
    }
}

impl fmt::Display for EventTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} for, {} against, {} abstain, {} non-voters ({} cast, {} expressed)",
            self.for_count,
            self.against_count,
            self.abstain_count,
            self.non_voter_count,
            self.total_cast,
            self.valid_count
        )
    }
}

/// Outcome implied by the counts
///
/// A tie yields `None`: the correct tie-break depends on vote-type rules
/// that are not modelled here.
pub fn derive_outcome(totals: &EventTotals) -> Option<Outcome> {
    use std::cmp::Ordering;

    match totals.for_count.cmp(&totals.against_count) {
        Ordering::Greater => Some(Outcome::Adopted),
        Ordering::Less => Some(Outcome::Rejected),
        Ordering::Equal => None,
    }
}

/// Aggregates written for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    pub event_id: String,
    pub totals: EventTotals,
    /// Outcome code on the event after recomputation
    pub outcome: Option<String>,
    /// True when `outcome` was derived by this recomputation
    pub outcome_derived: bool,
    /// Votes departing from their group's majority position
    pub dissent_count: usize,
}

/// Result of a recomputation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Recompute {
    Updated(AggregateResult),
    /// The event has no individual votes; its aggregates were left untouched
    Skipped,
}

/// Recompute and store the aggregates of one event
///
/// An event with no individual votes on record is skipped rather than
/// zeroed. The outcome is derived only when the event has none.
pub async fn recompute_totals<R, W>(
    votes: &R,
    events: &W,
    event_id: &str,
) -> Result<Recompute, StorageError>
where
    R: VoteRepository + ?Sized,
    W: EventTotalsWriter + ?Sized,
{
    let rows = votes.fetch_all(event_id).await?;

    if rows.is_empty() {
        info!(event_id = %event_id, "No individual votes on record, aggregates left untouched");
        return Ok(Recompute::Skipped);
    }

    let totals = EventTotals::tally(&rows);
    let dissent_count = rows.iter().filter(|vote| vote.is_dissent()).count();

    let current = events.current_outcome(event_id).await?;
    let derived = match current {
        Some(_) => None,
        None => derive_outcome(&totals),
    };

    events.write_aggregates(event_id, &totals, derived).await?;

    let outcome = current.or_else(|| derived.map(|o| o.to_db_string().to_string()));
    debug!(event_id = %event_id, outcome = ?outcome, derived = derived.is_some(), "Outcome resolved");
    info!(event_id = %event_id, "Aggregates updated: {}", totals);

    Ok(Recompute::Updated(AggregateResult {
        event_id: event_id.to_string(),
        totals,
        outcome,
        outcome_derived: derived.is_some(),
        dissent_count,
    }))
}
