//! Ballot tree walker
//!
//! Flattens the ventilation hierarchy
//!
//! ```text
//! event → organe (body, 1..n) → groupes.groupe (group, 1..n)
//!       → vote.decompteNominatif.{pours|contres|abstentions|nonVotants}
//!       → votant (voter, 1..n)
//! ```
//!
//! into a stream of [`RawVoteEntry`] values. Every collection level goes
//! through [`normalize_to_list`]. A malformed level shows up in the stream as
//! one `Err(MalformedShape)` item in place of that branch; sibling branches
//! are still walked.
//!
//! The walk is lazy, finite and restartable: [`BallotTreeWalker::entries`]
//! may be called any number of times on the same payload. Output order
//! follows the payload but carries no meaning.

use crate::error::{MalformedShape, ShapeLevel};
use crate::payload::{event_root, keys};
use crate::shape::normalize_to_list;
use rollcall_common::Position;
use serde_json::Value;
use std::iter;

/// Result of walking one voter (or one malformed branch)
pub type WalkItem<'a> = Result<RawVoteEntry<'a>, MalformedShape>;

type Items<'a, T> = Box<dyn Iterator<Item = Result<T, MalformedShape>> + Send + 'a>;

/// One of the four fixed position buckets of a group's nominal tally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    For,
    Against,
    Abstain,
    NonVoter,
}

impl Bucket {
    /// Buckets in walk order
    pub const ALL: [Bucket; 4] = [Bucket::For, Bucket::Against, Bucket::Abstain, Bucket::NonVoter];

    /// Field name of the bucket in the source payload
    pub fn source_key(&self) -> &'static str {
        match self {
            Bucket::For => keys::BUCKET_FOR,
            Bucket::Against => keys::BUCKET_AGAINST,
            Bucket::Abstain => keys::BUCKET_ABSTAIN,
            Bucket::NonVoter => keys::BUCKET_NON_VOTER,
        }
    }

    /// Stored position for voters found in this bucket
    pub fn position(&self) -> Position {
        match self {
            Bucket::For => Position::For,
            Bucket::Against => Position::Against,
            Bucket::Abstain => Position::Abstain,
            Bucket::NonVoter => Position::NonVoter,
        }
    }
}

/// One voter as found in the payload, before normalization
///
/// Scalar fields are left as raw JSON values; [`crate::builder`] coerces
/// them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawVoteEntry<'a> {
    pub body_ref: Option<&'a Value>,
    pub group_ref: Option<&'a Value>,
    /// Raw majority label of the enclosing group (may be absent or "mixed")
    pub group_majority: Option<&'a Value>,
    pub bucket: Bucket,
    pub voter_ref: Option<&'a Value>,
    pub mandate_ref: Option<&'a Value>,
    pub seat: Option<&'a Value>,
    pub delegation: Option<&'a Value>,
    /// Only populated for the non-voter bucket
    pub non_vote_reason: Option<&'a Value>,
}

/// Walks the ventilation hierarchy of one ballot-event payload
#[derive(Debug, Clone, Copy)]
pub struct BallotTreeWalker<'a> {
    payload: &'a Value,
}

impl<'a> BallotTreeWalker<'a> {
    /// `payload` is the event object, optionally wrapped in `{"scrutin": ...}`
    pub fn new(payload: &'a Value) -> Self {
        Self { payload }
    }

    /// Flat stream of voter entries
    ///
    /// Empty when the payload has no ventilation root: some events carry no
    /// nominal detail.
    pub fn entries(&self) -> impl Iterator<Item = WalkItem<'a>> + Send + 'a {
        let bodies: Items<'a, &'a Value> = match event_root(self.payload).get(keys::VENTILATION) {
            Some(ventilation) => objects(ventilation.get(keys::BODY), ShapeLevel::Body),
            None => Box::new(iter::empty()),
        };

        descend(bodies, |body| {
            let body_ref = body.get(keys::ORGAN_REF);
            let groups = body.get(keys::GROUPS).and_then(|groups| groups.get(keys::GROUP));
            descend(objects(groups, ShapeLevel::Group), move |group| {
                group_entries(body_ref, group)
            })
        })
    }
}

/// Shorthand for `BallotTreeWalker::new(payload).entries()`
pub fn walk(payload: &Value) -> impl Iterator<Item = WalkItem<'_>> + Send + '_ {
    BallotTreeWalker::new(payload).entries()
}

/// Voter entries of one group, bucket by bucket
///
/// A bucket may itself arrive as a one-element list; it is normalized like
/// every other level.
fn group_entries<'a>(body_ref: Option<&'a Value>, group: &'a Value) -> Items<'a, RawVoteEntry<'a>> {
    let group_ref = group.get(keys::ORGAN_REF);
    let vote = group.get(keys::VOTE);
    let group_majority = vote.and_then(|v| v.get(keys::MAJORITY));
    let tally = vote.and_then(|v| v.get(keys::NOMINAL_TALLY));

    Box::new(Bucket::ALL.into_iter().flat_map(move |bucket| {
        let buckets = objects(tally.and_then(|t| t.get(bucket.source_key())), ShapeLevel::Bucket);
        descend(buckets, move |bucket_value| -> Items<'a, RawVoteEntry<'a>> {
            let voters = objects(bucket_value.get(keys::VOTER), ShapeLevel::Voter);
            Box::new(voters.map(move |voter| {
                voter.map(|voter| RawVoteEntry {
                    body_ref,
                    group_ref,
                    group_majority,
                    bucket,
                    voter_ref: voter.get(keys::VOTER_REF),
                    mandate_ref: voter.get(keys::MANDATE_REF),
                    seat: voter.get(keys::SEAT),
                    delegation: voter.get(keys::DELEGATION),
                    non_vote_reason: match bucket {
                        Bucket::NonVoter => voter.get(keys::NON_VOTE_REASON),
                        _ => None,
                    },
                })
            }))
        })
    }))
}

/// Normalized items of one collection level; non-object items are malformed
fn objects<'a>(value: Option<&'a Value>, level: ShapeLevel) -> Items<'a, &'a Value> {
    match normalize_to_list(value, level) {
        Ok(items) => Box::new(items.into_iter().map(move |item| {
            if item.is_object() {
                Ok(item)
            } else {
                Err(MalformedShape::new(level, item))
            }
        })),
        Err(malformed) => Box::new(iter::once(Err(malformed))),
    }
}

/// Expand each item into its children, passing malformed items through
fn descend<'a, T, U, F>(items: Items<'a, T>, children: F) -> Items<'a, U>
where
    T: 'a + Send,
    U: 'a + Send,
    F: Fn(T) -> Items<'a, U> + Send + 'a,
{
    Box::new(items.flat_map(move |item| -> Items<'a, U> {
        match item {
            Ok(parent) => children(parent),
            Err(malformed) => Box::new(iter::once(Err(malformed))),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn voter(id: &str) -> Value {
        json!({"acteurRef": id, "mandatRef": format!("PM{}", id), "parDelegation": "false"})
    }

    fn ok_entries(payload: &Value) -> Vec<RawVoteEntry<'_>> {
        walk(payload).map(|item| item.unwrap()).collect()
    }

    #[test]
    fn test_missing_ventilation_is_empty() {
        let payload = json!({"uid": "VTANR5L15V1"});
        assert_eq!(walk(&payload).count(), 0);
    }

    #[test]
    fn test_null_buckets_are_skipped() {
        let payload = json!({
            "ventilationVotes": {"organe": {"organeRef": "PO1", "groupes": {"groupe": {
                "organeRef": "PO2",
                "vote": {
                    "positionMajoritaire": "pour",
                    "decompteNominatif": {"pours": {"votant": voter("PA1")}, "contres": null, "abstentions": null, "nonVotants": null}
                }
            }}}}
        });

        let entries = ok_entries(&payload);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].bucket, Bucket::For);
        assert_eq!(entries[0].voter_ref, Some(&json!("PA1")));
        assert_eq!(entries[0].group_ref, Some(&json!("PO2")));
        assert_eq!(entries[0].body_ref, Some(&json!("PO1")));
        assert_eq!(entries[0].group_majority, Some(&json!("pour")));
    }

    #[test]
    fn test_flattens_bodies_groups_buckets_voters() {
        let payload = json!({"scrutin": {"ventilationVotes": {"organe": [
            {"organeRef": "PO1", "groupes": {"groupe": [
                {"organeRef": "PO2", "vote": {"decompteNominatif": {
                    "pours": {"votant": [voter("PA1"), voter("PA2")]},
                    "contres": {"votant": voter("PA3")}
                }}},
                {"organeRef": "PO3", "vote": {"decompteNominatif": {
                    "abstentions": {"votant": voter("PA4")},
                    "nonVotants": {"votant": {"acteurRef": "PA5", "causePositionVote": "PAN"}}
                }}}
            ]}},
            {"organeRef": "PO9", "groupes": {"groupe": {"organeRef": "PO4", "vote": {"decompteNominatif": {
                "pours": {"votant": voter("PA6")}
            }}}}}
        ]}}});

        let entries = ok_entries(&payload);
        let buckets: Vec<Bucket> = entries.iter().map(|e| e.bucket).collect();
        assert_eq!(
            buckets,
            vec![Bucket::For, Bucket::For, Bucket::Against, Bucket::Abstain, Bucket::NonVoter, Bucket::For]
        );
        assert_eq!(entries[4].non_vote_reason, Some(&json!("PAN")));
        assert_eq!(entries[5].body_ref, Some(&json!("PO9")));
    }

    #[test]
    fn test_non_vote_reason_only_for_non_voters() {
        let payload = json!({"ventilationVotes": {"organe": {"groupes": {"groupe": {"vote": {"decompteNominatif": {
            "pours": {"votant": {"acteurRef": "PA1", "causePositionVote": "MG"}}
        }}}}}}});

        let entries = ok_entries(&payload);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].non_vote_reason, None);
    }

    #[test]
    fn test_malformed_group_does_not_hide_siblings() {
        let payload = json!({"ventilationVotes": {"organe": {"groupes": {"groupe": [
            "not-a-group",
            {"organeRef": "PO2", "vote": {"decompteNominatif": {"contres": {"votant": voter("PA1")}}}}
        ]}}}});

        let items: Vec<WalkItem<'_>> = walk(&payload).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap_err().level, ShapeLevel::Group);
        assert_eq!(items[1].as_ref().unwrap().bucket, Bucket::Against);
    }

    #[test]
    fn test_malformed_voter_level_and_bucket() {
        let payload = json!({"ventilationVotes": {"organe": {"groupes": {"groupe": {"vote": {"decompteNominatif": {
            "pours": {"votant": "PA1"},
            "contres": ["unexpected"],
            "abstentions": {"votant": voter("PA2")}
        }}}}}}});

        let items: Vec<WalkItem<'_>> = walk(&payload).collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap_err().level, ShapeLevel::Voter);
        assert_eq!(items[1].as_ref().unwrap_err().level, ShapeLevel::Bucket);
        assert_eq!(items[2].as_ref().unwrap().bucket, Bucket::Abstain);
    }

    #[test]
    fn test_bucket_as_list_matches_bare_bucket() {
        let bare = json!({"ventilationVotes": {"organe": {"groupes": {"groupe": {"vote": {"decompteNominatif": {
            "pours": {"votant": voter("PA1")}
        }}}}}}});
        let listed = json!({"ventilationVotes": {"organe": {"groupes": {"groupe": {"vote": {"decompteNominatif": {
            "pours": [{"votant": voter("PA1")}]
        }}}}}}});

        let bare_entries = ok_entries(&bare);
        let listed_entries = ok_entries(&listed);

        assert_eq!(listed_entries.len(), 1);
        assert_eq!(listed_entries, bare_entries);
        assert_eq!(listed_entries[0].bucket, Bucket::For);
    }

    #[test]
    fn test_walk_is_restartable() {
        let payload = json!({"ventilationVotes": {"organe": {"groupes": {"groupe": {"vote": {"decompteNominatif": {
            "pours": {"votant": [voter("PA1"), voter("PA2")]}
        }}}}}}});

        let walker = BallotTreeWalker::new(&payload);
        assert_eq!(walker.entries().count(), 2);
        assert_eq!(walker.entries().count(), 2);
    }

    #[test]
    fn test_walk_moves_to_another_thread() {
        let payload = json!({"ventilationVotes": {"organe": {"groupes": {"groupe": {"vote": {"decompteNominatif": {
            "pours": [{"votant": [voter("PA1"), voter("PA2")]}],
            "contres": {"votant": voter("PA3")}
        }}}}}}});

        let entries = walk(&payload);
        let count = std::thread::scope(|scope| scope.spawn(move || entries.count()).join().unwrap());

        assert_eq!(count, 3);
    }
}
