//! ballot_events table access
//!
//! Header fields are written at ingestion, aggregate fields only by
//! recomputation. Neither write touches the other's columns.

use super::{retry_on_lock, SqliteStore};
use crate::aggregation::EventTotals;
use crate::error::StorageError;
use crate::payload::EventHeader;
use crate::repository::EventTotalsWriter;
use async_trait::async_trait;
use rollcall_common::db::BallotEvent;
use rollcall_common::Outcome;
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// SHA-256 hex digest of a stored payload
pub fn payload_digest(raw_payload: &str) -> String {
    format!("{:x}", Sha256::digest(raw_payload.as_bytes()))
}

impl SqliteStore {
    /// Insert or refresh the event header and its raw payload
    ///
    /// An outcome carried by the payload replaces the stored one; a payload
    /// without one keeps whatever is stored. Aggregate columns are left
    /// untouched. The payload digest is cleared until [`Self::mark_ingested`]
    /// records a complete ingestion.
    pub async fn upsert_event_header(
        &self,
        header: &EventHeader,
        raw_payload: &str,
    ) -> Result<(), StorageError> {
        let pool = self.pool();

        retry_on_lock("event header upsert", self.max_lock_wait_ms(), || async {
            sqlx::query(
                r#"
                INSERT INTO ballot_events (
                    uid, number, legislature, session_ref, vote_date, title,
                    vote_type_code, vote_type_label, outcome_code, outcome_label,
                    raw_payload, payload_sha256, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
                ON CONFLICT(uid) DO UPDATE SET
                    number = excluded.number,
                    legislature = excluded.legislature,
                    session_ref = excluded.session_ref,
                    vote_date = excluded.vote_date,
                    title = excluded.title,
                    vote_type_code = excluded.vote_type_code,
                    vote_type_label = excluded.vote_type_label,
                    outcome_label = CASE
                        WHEN excluded.outcome_code IS NOT NULL THEN excluded.outcome_label
                        ELSE outcome_label
                    END,
                    outcome_code = COALESCE(excluded.outcome_code, outcome_code),
                    raw_payload = excluded.raw_payload,
                    payload_sha256 = NULL,
                    updated_at = CURRENT_TIMESTAMP
                "#,
            )
            .bind(&header.uid)
            .bind(header.number)
            .bind(&header.legislature)
            .bind(&header.session_ref)
            .bind(header.vote_date)
            .bind(&header.title)
            .bind(&header.vote_type_code)
            .bind(&header.vote_type_label)
            .bind(&header.outcome_code)
            .bind(&header.outcome_label)
            .bind(raw_payload)
            .execute(pool)
            .await?;

            Ok(())
        })
        .await
    }

    /// Record `digest` as the payload whose votes and aggregates are fully
    /// stored
    pub async fn mark_ingested(&self, uid: &str, digest: &str) -> Result<(), StorageError> {
        let pool = self.pool();

        let result = retry_on_lock("ingestion mark", self.max_lock_wait_ms(), || async {
            let result = sqlx::query(
                "UPDATE ballot_events SET payload_sha256 = ?, updated_at = CURRENT_TIMESTAMP WHERE uid = ?",
            )
            .bind(digest)
            .bind(uid)
            .execute(pool)
            .await?;

            Ok(result)
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::UnknownEvent(uid.to_string()));
        }

        Ok(())
    }

    /// Digest of the last fully ingested payload for `uid`, if any
    pub async fn stored_digest(&self, uid: &str) -> Result<Option<String>, StorageError> {
        let digest: Option<Option<String>> =
            sqlx::query_scalar("SELECT payload_sha256 FROM ballot_events WHERE uid = ?")
                .bind(uid)
                .fetch_optional(self.pool())
                .await?;

        Ok(digest.flatten())
    }

    /// Load a ballot event by identifier
    pub async fn load_event(&self, uid: &str) -> Result<Option<BallotEvent>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT uid, number, legislature, session_ref, vote_date, title,
                   vote_type_code, vote_type_label, outcome_code, outcome_label,
                   ballots_cast, ballots_valid, votes_for, votes_against,
                   abstentions, non_voters, raw_payload, payload_sha256
            FROM ballot_events
            WHERE uid = ?
            "#,
        )
        .bind(uid)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(event_from_row).transpose()
    }
}

#[async_trait]
impl EventTotalsWriter for SqliteStore {
    async fn current_outcome(&self, event_id: &str) -> Result<Option<String>, StorageError> {
        let outcome: Option<Option<String>> =
            sqlx::query_scalar("SELECT outcome_code FROM ballot_events WHERE uid = ?")
                .bind(event_id)
                .fetch_optional(self.pool())
                .await?;

        outcome.ok_or_else(|| StorageError::UnknownEvent(event_id.to_string()))
    }

    async fn write_aggregates(
        &self,
        event_id: &str,
        totals: &EventTotals,
        outcome: Option<Outcome>,
    ) -> Result<(), StorageError> {
        let pool = self.pool();
        let outcome_code = outcome.map(|o| o.to_db_string());
        let outcome_label = outcome.map(|o| o.display_name());

        let result = retry_on_lock("aggregate write", self.max_lock_wait_ms(), || async {
            // SET expressions all read the pre-update row
            let result = sqlx::query(
                r#"
                UPDATE ballot_events SET
                    ballots_cast = ?,
                    ballots_valid = ?,
                    votes_for = ?,
                    votes_against = ?,
                    abstentions = ?,
                    non_voters = ?,
                    outcome_label = CASE
                        WHEN outcome_code IS NULL THEN COALESCE(?, outcome_label)
                        ELSE outcome_label
                    END,
                    outcome_code = COALESCE(outcome_code, ?),
                    updated_at = CURRENT_TIMESTAMP
                WHERE uid = ?
                "#,
            )
            .bind(totals.total_cast)
            .bind(totals.valid_count)
            .bind(totals.for_count)
            .bind(totals.against_count)
            .bind(totals.abstain_count)
            .bind(totals.non_voter_count)
            .bind(outcome_label)
            .bind(outcome_code)
            .bind(event_id)
            .execute(pool)
            .await?;

            Ok(result)
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::UnknownEvent(event_id.to_string()));
        }

        Ok(())
    }
}

fn event_from_row(row: &SqliteRow) -> Result<BallotEvent, StorageError> {
    Ok(BallotEvent {
        uid: row.try_get("uid")?,
        number: row.try_get("number")?,
        legislature: row.try_get("legislature")?,
        session_ref: row.try_get("session_ref")?,
        vote_date: row.try_get("vote_date")?,
        title: row.try_get("title")?,
        vote_type_code: row.try_get("vote_type_code")?,
        vote_type_label: row.try_get("vote_type_label")?,
        outcome_code: row.try_get("outcome_code")?,
        outcome_label: row.try_get("outcome_label")?,
        ballots_cast: row.try_get("ballots_cast")?,
        ballots_valid: row.try_get("ballots_valid")?,
        votes_for: row.try_get("votes_for")?,
        votes_against: row.try_get("votes_against")?,
        abstentions: row.try_get("abstentions")?,
        non_voters: row.try_get("non_voters")?,
        raw_payload: row.try_get("raw_payload")?,
        payload_sha256: row.try_get("payload_sha256")?,
    })
}
