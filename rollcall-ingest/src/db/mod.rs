//! SQLite-backed vote and event storage

pub mod events;
pub mod retry;
pub mod votes;

pub use events::payload_digest;
pub use retry::retry_on_lock;

use rollcall_common::config::IngestConfig;
use sqlx::SqlitePool;

/// Default ceiling on lock retries for one write
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Implements [`crate::repository::VoteRepository`] and
/// [`crate::repository::EventTotalsWriter`] over one connection pool
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }

    pub fn with_max_lock_wait_ms(mut self, max_lock_wait_ms: u64) -> Self {
        self.max_lock_wait_ms = max_lock_wait_ms;
        self
    }

    /// Store configured from the `[ingest]` section
    pub fn from_config(pool: SqlitePool, config: &IngestConfig) -> Self {
        Self::new(pool).with_max_lock_wait_ms(config.max_lock_wait_ms)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn max_lock_wait_ms(&self) -> u64 {
        self.max_lock_wait_ms
    }
}
