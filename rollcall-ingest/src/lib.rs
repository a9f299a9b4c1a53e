//! Roll-call ballot ingestion
//!
//! Turns the nested, shape-ambiguous ventilation payload of a ballot event
//! into one row per legislator, then derives the event's totals and outcome
//! from those rows.
//!
//! Pipeline per event: [`walker`] (using [`shape`]) → [`builder`] →
//! [`repository::VoteRepository`], then [`aggregation::recompute_totals`].
//! [`batch`] drives many events concurrently against [`db::SqliteStore`].

pub mod aggregation;
pub mod batch;
pub mod builder;
pub mod db;
pub mod error;
pub mod payload;
pub mod pipeline;
pub mod repository;
pub mod shape;
pub mod walker;

pub use aggregation::{derive_outcome, recompute_totals, AggregateResult, EventTotals, Recompute};
pub use batch::{ingest_document, run_batch, BatchOptions, BatchReport, EventReport, EventStatus};
pub use builder::VoteRecordBuilder;
pub use db::SqliteStore;
pub use error::{IngestError, MalformedShape, ShapeLevel, SkipReason, StorageError};
pub use payload::EventHeader;
pub use pipeline::{ingest_event, IngestSummary};
pub use repository::{EventTotalsWriter, VoteRepository};
pub use shape::normalize_to_list;
pub use walker::{walk, BallotTreeWalker, Bucket, RawVoteEntry};
