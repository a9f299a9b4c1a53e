//! Database models

use crate::position::Position;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One recorded roll-call vote
///
/// Aggregate counts stay `None` until the event's totals are recomputed from
/// its individual votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallotEvent {
    pub uid: String,
    pub number: Option<i64>,
    pub legislature: Option<String>,
    pub session_ref: Option<String>,
    pub vote_date: Option<NaiveDate>,
    pub title: Option<String>,
    pub vote_type_code: Option<String>,
    pub vote_type_label: Option<String>,
    pub outcome_code: Option<String>,
    pub outcome_label: Option<String>,
    pub ballots_cast: Option<i64>,
    pub ballots_valid: Option<i64>,
    pub votes_for: Option<i64>,
    pub votes_against: Option<i64>,
    pub abstentions: Option<i64>,
    pub non_voters: Option<i64>,
    /// Payload as received (JSON text)
    pub raw_payload: Option<String>,
    /// SHA-256 hex digest of `raw_payload`
    pub payload_sha256: Option<String>,
}

/// One legislator's recorded participation in one ballot event
///
/// Unique per `(event_id, voter_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualVote {
    pub event_id: String,
    pub voter_id: String,
    pub mandate_id: Option<String>,
    /// `None` for unaffiliated legislators
    pub group_id: Option<String>,
    pub position: Position,
    /// Group majority position at the time of the vote; `None` when the
    /// group had no single majority position
    pub group_position: Option<Position>,
    pub seat_number: Option<i64>,
    pub delegated: bool,
    /// Only set when `position` is `NonVoter`
    pub non_vote_reason: Option<String>,
}

impl IndividualVote {
    /// True when the legislator voted, their group had a majority position,
    /// and they did not follow it
    pub fn is_dissent(&self) -> bool {
        match self.group_position {
            Some(majority) => self.position != Position::NonVoter && self.position != majority,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(position: Position, group_position: Option<Position>) -> IndividualVote {
        IndividualVote {
            event_id: "VTANR5L15V1".to_string(),
            voter_id: "PA1".to_string(),
            mandate_id: None,
            group_id: Some("PO1".to_string()),
            position,
            group_position,
            seat_number: None,
            delegated: false,
            non_vote_reason: None,
        }
    }

    #[test]
    fn test_dissent_against_majority() {
        assert!(vote(Position::Against, Some(Position::For)).is_dissent());
        assert!(vote(Position::Abstain, Some(Position::For)).is_dissent());
    }

    #[test]
    fn test_no_dissent_when_following_or_no_majority() {
        assert!(!vote(Position::For, Some(Position::For)).is_dissent());
        assert!(!vote(Position::Against, None).is_dissent());
    }

    #[test]
    fn test_non_voter_is_never_dissent() {
        assert!(!vote(Position::NonVoter, Some(Position::For)).is_dissent());
    }
}
