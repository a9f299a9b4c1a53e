//! Raw voter entry → individual vote
//!
//! The voter reference is the only mandatory field. Everything else is
//! coerced leniently: an unparseable optional field becomes `None` rather
//! than dropping the vote.

use crate::error::SkipReason;
use crate::payload::{scalar_bool, scalar_i64, scalar_string};
use crate::walker::{Bucket, RawVoteEntry};
use rollcall_common::db::IndividualVote;
use rollcall_common::Position;
use tracing::debug;

/// Builds individual votes for one ballot event
#[derive(Debug, Clone)]
pub struct VoteRecordBuilder {
    event_id: String,
}

impl VoteRecordBuilder {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Normalize one raw entry
    ///
    /// - position comes from the bucket the voter was listed under
    /// - the group majority label is normalized; unknown or mixed labels
    ///   become `None`
    /// - a missing delegation flag means "not delegated"
    /// - the non-vote reason is kept only for non-voters
    pub fn build(&self, entry: &RawVoteEntry<'_>) -> Result<IndividualVote, SkipReason> {
        let voter_id = scalar_string(entry.voter_ref).ok_or(SkipReason::MissingVoterReference)?;

        let group_position = scalar_string(entry.group_majority)
            .and_then(|label| Position::from_str(&label));

        let seat_number = scalar_i64(entry.seat);
        if seat_number.is_none() && entry.seat.is_some_and(|seat| !seat.is_null()) {
            debug!(
                event_id = %self.event_id,
                voter_id = %voter_id,
                seat = ?entry.seat,
                "Ignoring non-numeric seat number"
            );
        }

        let non_vote_reason = match entry.bucket {
            Bucket::NonVoter => scalar_string(entry.non_vote_reason),
            _ => None,
        };

        Ok(IndividualVote {
            event_id: self.event_id.clone(),
            voter_id,
            mandate_id: scalar_string(entry.mandate_ref),
            group_id: scalar_string(entry.group_ref),
            position: entry.bucket.position(),
            group_position,
            seat_number,
            delegated: scalar_bool(entry.delegation).unwrap_or(false),
            non_vote_reason,
        })
    }
}
