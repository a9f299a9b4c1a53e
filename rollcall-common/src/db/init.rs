//! Database initialization
//!
//! Creates the database file on first run, sets per-connection pragmas
//! through the connect options, creates tables idempotently and runs
//! pending migrations.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Default busy timeout applied to every database connection
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL allows concurrent readers with one writer
    let options = connection_options(SqliteConnectOptions::new().filename(db_path))
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .create_if_missing(true);

    // One event per worker; leave headroom for the batch runner's workers
    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    apply_schema(&pool).await?;

    Ok(pool)
}

/// Initialize a private in-memory database
///
/// Limited to a single connection: every SQLite connection to `:memory:`
/// opens its own empty database.
pub async fn init_in_memory_database() -> Result<SqlitePool> {
    let options = connection_options(SqliteConnectOptions::from_str("sqlite::memory:")?);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    apply_schema(&pool).await?;

    Ok(pool)
}

/// Pragmas every pooled connection is opened with
fn connection_options(options: SqliteConnectOptions) -> SqliteConnectOptions {
    options
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
}

/// Create tables and run migrations (idempotent)
async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_ballot_events_table(pool).await?;
    create_individual_votes_table(pool).await?;

    crate::db::migrations::run_migrations(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the ballot_events table
///
/// Aggregate columns are NULL until totals are recomputed.
pub async fn create_ballot_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ballot_events (
            uid TEXT PRIMARY KEY,
            number INTEGER,
            legislature TEXT,
            session_ref TEXT,
            vote_date TEXT,
            title TEXT,
            vote_type_code TEXT,
            vote_type_label TEXT,
            outcome_code TEXT,
            outcome_label TEXT,
            ballots_cast INTEGER,
            ballots_valid INTEGER,
            votes_for INTEGER,
            votes_against INTEGER,
            abstentions INTEGER,
            non_voters INTEGER,
            raw_payload TEXT,
            payload_sha256 TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the individual_votes table
///
/// `event_id` references `ballot_events.uid` by value only; votes may be
/// ingested before the event header is stored.
pub async fn create_individual_votes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS individual_votes (
            guid TEXT PRIMARY KEY,
            event_id TEXT NOT NULL,
            voter_id TEXT NOT NULL,
            mandate_id TEXT,
            group_id TEXT,
            position TEXT NOT NULL CHECK (position IN ('for', 'against', 'abstain', 'non_voter')),
            group_position TEXT CHECK (group_position IN ('for', 'against', 'abstain', 'non_voter')),
            seat_number INTEGER,
            delegated INTEGER NOT NULL DEFAULT 0,
            non_vote_reason TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (event_id, voter_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_individual_votes_event ON individual_votes(event_id)")
        .execute(pool)
        .await?;

    Ok(())
}
