//! Vote positions and ballot outcomes
//!
//! A legislator's recorded participation in a ballot event is exactly one of
//! four positions. "Abstain" and "non-voter" both mean the legislator did not
//! vote for or against, but they are distinct positions and are stored under
//! distinct labels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Recorded position of one legislator on one ballot event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// Voted for the motion
    For,
    /// Voted against the motion
    Against,
    /// Present and abstained
    Abstain,
    /// Did not take part in the vote (chair, government member, ...)
    NonVoter,
}

impl Position {
    /// Parse a position label
    ///
    /// Accepts the storage labels (`for`, `against`, `abstain`, `non_voter`)
    /// as well as the labels used by the source documents for group majority
    /// positions (`pour`, `contre`, `abstention`, `nonVotant`). Matching is
    /// case-insensitive. Anything else (including "mixed" markers) is `None`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "for" | "pour" => Some(Position::For),
            "against" | "contre" => Some(Position::Against),
            "abstain" | "abstention" => Some(Position::Abstain),
            "non_voter" | "nonvotant" | "non-votant" | "non_votant" => Some(Position::NonVoter),
            _ => None,
        }
    }

    /// Convert to database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Position::For => "for",
            Position::Against => "against",
            Position::Abstain => "abstain",
            Position::NonVoter => "non_voter",
        }
    }

    /// True for the two "expressed" positions (for / against)
    pub fn is_expressed(&self) -> bool {
        matches!(self, Position::For | Position::Against)
    }

    /// Get all positions in canonical order
    pub fn all_variants() -> &'static [Position] {
        &[
            Position::For,
            Position::Against,
            Position::Abstain,
            Position::NonVoter,
        ]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Verdict of a ballot event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Adopted,
    Rejected,
}

impl Outcome {
    /// Parse an outcome code, from storage or from a source document
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "adopted" | "adopté" | "adopte" | "adoptée" | "adoptee" => Some(Outcome::Adopted),
            "rejected" | "rejeté" | "rejete" | "rejetée" | "rejetee" => Some(Outcome::Rejected),
            _ => None,
        }
    }

    /// Convert to database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Outcome::Adopted => "adopted",
            Outcome::Rejected => "rejected",
        }
    }

    /// Get human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Outcome::Adopted => "Adopted",
            Outcome::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_db_string_parses_back() {
        for position in Position::all_variants() {
            assert_eq!(Position::from_str(position.to_db_string()), Some(*position));
        }
    }

    #[test]
    fn test_position_source_labels() {
        assert_eq!(Position::from_str("pour"), Some(Position::For));
        assert_eq!(Position::from_str("Contre"), Some(Position::Against));
        assert_eq!(Position::from_str("abstention"), Some(Position::Abstain));
        assert_eq!(Position::from_str("nonVotant"), Some(Position::NonVoter));
    }

    #[test]
    fn test_abstain_and_non_voter_stay_distinct() {
        assert_ne!(Position::Abstain.to_db_string(), Position::NonVoter.to_db_string());
        assert!(!Position::Abstain.is_expressed());
        assert!(!Position::NonVoter.is_expressed());
    }

    #[test]
    fn test_mixed_majority_is_none() {
        assert_eq!(Position::from_str("mixte"), None);
        assert_eq!(Position::from_str(""), None);
    }

    #[test]
    fn test_outcome_from_source_codes() {
        assert_eq!(Outcome::from_str("adopté"), Some(Outcome::Adopted));
        assert_eq!(Outcome::from_str("rejeté"), Some(Outcome::Rejected));
        assert_eq!(Outcome::from_str("rejected"), Some(Outcome::Rejected));
        assert_eq!(Outcome::from_str("ajourné"), None);
    }
}
