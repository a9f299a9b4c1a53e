//! Error taxonomy for ballot ingestion
//!
//! None of these abort a batch: malformed shapes and skipped entries are
//! counted per event, storage errors are counted per entry (ingest) or
//! reported per event (header, recompute), and `IngestError` marks a whole
//! event as failed while sibling events carry on.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Nesting level of the ventilation payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeLevel {
    /// Organizing body (`organe`)
    Body,
    /// Political group (`groupe`)
    Group,
    /// Position bucket (`pours`, `contres`, ...)
    Bucket,
    /// Individual voter (`votant`)
    Voter,
}

impl fmt::Display for ShapeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeLevel::Body => "body",
            ShapeLevel::Group => "group",
            ShapeLevel::Bucket => "bucket",
            ShapeLevel::Voter => "voter",
        };
        f.write_str(name)
    }
}

/// A nesting level holding something other than absent / object / list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {level} collection: expected object or array, found {found}")]
pub struct MalformedShape {
    pub level: ShapeLevel,
    pub found: &'static str,
}

impl MalformedShape {
    pub fn new(level: ShapeLevel, value: &Value) -> Self {
        Self {
            level,
            found: json_type_name(value),
        }
    }
}

/// Why a raw voter entry did not become an individual vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("voter entry has no voter reference")]
    MissingVoterReference,
}

/// Storage-layer failure (vote upsert, vote fetch, event write)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unknown ballot event: {0}")]
    UnknownEvent(String),

    #[error("Invalid stored row: {0}")]
    InvalidRow(String),

    #[error("Database locked after {attempts} attempts ({elapsed_ms} ms elapsed, max {max_wait_ms} ms)")]
    LockTimeout {
        attempts: u32,
        elapsed_ms: u128,
        max_wait_ms: u64,
    },
}

/// Failure that prevents a whole ballot event from being processed
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
