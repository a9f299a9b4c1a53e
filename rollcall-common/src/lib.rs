//! # Rollcall Common Library
//!
//! Shared code for the roll-call ingestion crates:
//! - Database initialization, migrations and row models
//! - Vote position and outcome definitions
//! - Configuration loading and root folder resolution
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod position;

pub use error::{Error, Result};
pub use position::{Outcome, Position};
