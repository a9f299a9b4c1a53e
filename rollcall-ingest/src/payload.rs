//! Source payload field names, scalar coercion and event header extraction
//!
//! Scalars in the source documents are usually strings (`"12"`, `"true"`)
//! but native JSON numbers and booleans are accepted too.

use crate::error::IngestError;
use chrono::NaiveDate;
use rollcall_common::Outcome;
use serde_json::Value;

/// Fixed field names of the roll-call document
pub mod keys {
    /// Optional wrapper around the event object
    pub const DOCUMENT: &str = "scrutin";

    pub const UID: &str = "uid";
    pub const NUMBER: &str = "numero";
    pub const LEGISLATURE: &str = "legislature";
    pub const SESSION_REF: &str = "sessionRef";
    pub const DATE: &str = "dateScrutin";
    pub const TITLE: &str = "titre";
    pub const VOTE_TYPE: &str = "typeVote";
    pub const VOTE_TYPE_CODE: &str = "codeTypeVote";
    pub const VOTE_TYPE_LABEL: &str = "libelleTypeVote";
    pub const OUTCOME: &str = "sort";
    pub const OUTCOME_CODE: &str = "code";
    pub const OUTCOME_LABEL: &str = "libelle";

    /// Ventilation root
    pub const VENTILATION: &str = "ventilationVotes";
    pub const BODY: &str = "organe";
    pub const ORGAN_REF: &str = "organeRef";
    pub const GROUPS: &str = "groupes";
    pub const GROUP: &str = "groupe";
    pub const VOTE: &str = "vote";
    pub const MAJORITY: &str = "positionMajoritaire";
    pub const NOMINAL_TALLY: &str = "decompteNominatif";
    pub const VOTER: &str = "votant";

    pub const BUCKET_FOR: &str = "pours";
    pub const BUCKET_AGAINST: &str = "contres";
    pub const BUCKET_ABSTAIN: &str = "abstentions";
    pub const BUCKET_NON_VOTER: &str = "nonVotants";

    pub const VOTER_REF: &str = "acteurRef";
    pub const MANDATE_REF: &str = "mandatRef";
    pub const SEAT: &str = "numPlace";
    pub const DELEGATION: &str = "parDelegation";
    pub const NON_VOTE_REASON: &str = "causePositionVote";
}

/// The ballot-event object, unwrapping the optional document wrapper
pub fn event_root(payload: &Value) -> &Value {
    match payload.get(keys::DOCUMENT) {
        Some(inner) if inner.is_object() => inner,
        _ => payload,
    }
}

/// Non-empty trimmed text of a string or number scalar
pub fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integer value of a number or numeric string scalar
pub fn scalar_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Boolean value of a boolean, `"true"`/`"false"` or `"1"`/`"0"` scalar
pub fn scalar_bool(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "oui" => Some(true),
            "false" | "0" | "non" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Ballot event header fields carried by the payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventHeader {
    pub uid: String,
    pub number: Option<i64>,
    pub legislature: Option<String>,
    pub session_ref: Option<String>,
    pub vote_date: Option<NaiveDate>,
    pub title: Option<String>,
    pub vote_type_code: Option<String>,
    pub vote_type_label: Option<String>,
    /// Outcome as published by the chamber, in its stored code form when
    /// recognised and verbatim otherwise
    pub outcome_code: Option<String>,
    pub outcome_label: Option<String>,
}

impl EventHeader {
    /// Extract the header; the event identifier is mandatory
    pub fn from_payload(payload: &Value) -> Result<Self, IngestError> {
        let event = event_root(payload);

        let uid = scalar_string(event.get(keys::UID))
            .ok_or_else(|| IngestError::InvalidPayload(format!("missing '{}'", keys::UID)))?;

        let vote_date = scalar_string(event.get(keys::DATE))
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());

        let vote_type = event.get(keys::VOTE_TYPE);
        let outcome = event.get(keys::OUTCOME);

        Ok(Self {
            uid,
            number: scalar_i64(event.get(keys::NUMBER)),
            legislature: scalar_string(event.get(keys::LEGISLATURE)),
            session_ref: scalar_string(event.get(keys::SESSION_REF)),
            vote_date,
            title: scalar_string(event.get(keys::TITLE)),
            vote_type_code: scalar_string(vote_type.and_then(|t| t.get(keys::VOTE_TYPE_CODE))),
            vote_type_label: scalar_string(vote_type.and_then(|t| t.get(keys::VOTE_TYPE_LABEL))),
            outcome_code: scalar_string(outcome.and_then(|o| o.get(keys::OUTCOME_CODE))).map(|code| {
                Outcome::from_str(&code)
                    .map(|o| o.to_db_string().to_string())
                    .unwrap_or(code)
            }),
            outcome_label: scalar_string(outcome.and_then(|o| o.get(keys::OUTCOME_LABEL))),
        })
    }
}
