//! Database schema migrations
//!
//! Versioned schema migrations tracked in the `schema_version` table. Every
//! migration is idempotent: it checks the current shape of the database
//! before changing anything, so running the full sequence on a fresh
//! database (whose tables were just created with the current schema) is a
//! series of no-ops that only record the version.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field were upgraded by them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Use ALTER TABLE** - prefer it over DROP/CREATE to preserve data

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    if !table_exists(pool, "schema_version").await? {
        return Ok(0);
    }

    let version: Option<i32> = sqlx::query_scalar(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1"
    )
    .fetch_optional(pool)
    .await?;

    Ok(version.unwrap_or(0))
}

/// Set schema version in database
async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: Add payload_sha256 column to ballot_events
///
/// Early databases stored the raw payload without its digest.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: Add payload_sha256 column to ballot_events");

    if !table_exists(pool, "ballot_events").await? {
        info!("  ballot_events table doesn't exist yet - skipping migration");
        return Ok(());
    }

    if column_exists(pool, "ballot_events", "payload_sha256").await? {
        info!("  payload_sha256 column already exists - skipping");
        return Ok(());
    }

    match sqlx::query("ALTER TABLE ballot_events ADD COLUMN payload_sha256 TEXT")
        .execute(pool)
        .await
    {
        Ok(_) => {
            info!("  ✓ Added payload_sha256 column to ballot_events table");
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
            info!("  payload_sha256 column added by concurrent initialization - skipping");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Migration v2: Enforce one vote per legislator per event
///
/// Early databases had no uniqueness on (event_id, voter_id). Duplicates are
/// collapsed to the most recently written row before the unique index is
/// created.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: Unique (event_id, voter_id) on individual_votes");

    if !table_exists(pool, "individual_votes").await? {
        info!("  individual_votes table doesn't exist yet - skipping migration");
        return Ok(());
    }

    let removed = sqlx::query(
        r#"
        DELETE FROM individual_votes
        WHERE rowid NOT IN (
            SELECT MAX(rowid) FROM individual_votes GROUP BY event_id, voter_id
        )
        "#,
    )
    .execute(pool)
    .await?
    .rows_affected();

    if removed > 0 {
        warn!("  Removed {} duplicate individual vote rows", removed);
    }

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_individual_votes_event_voter ON individual_votes(event_id, voter_id)"
    )
    .execute(pool)
    .await?;

    info!("  ✓ Unique index on individual_votes(event_id, voter_id) in place");
    Ok(())
}

async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)"
    )
    .bind(table)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

async fn column_exists(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?"
    )
    .bind(table)
    .bind(column)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}
