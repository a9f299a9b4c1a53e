//! individual_votes table access

use super::{retry_on_lock, SqliteStore};
use crate::error::StorageError;
use crate::repository::VoteRepository;
use async_trait::async_trait;
use rollcall_common::db::IndividualVote;
use rollcall_common::Position;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

const SELECT_VOTES: &str = r#"
    SELECT event_id, voter_id, mandate_id, group_id, position, group_position,
           seat_number, delegated, non_vote_reason
    FROM individual_votes
"#;

#[async_trait]
impl VoteRepository for SqliteStore {
    async fn upsert(&self, vote: &IndividualVote) -> Result<(), StorageError> {
        let pool = self.pool();

        retry_on_lock("vote upsert", self.max_lock_wait_ms(), || async {
            sqlx::query(
                r#"
                INSERT INTO individual_votes (
                    guid, event_id, voter_id, mandate_id, group_id, position,
                    group_position, seat_number, delegated, non_vote_reason,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
                ON CONFLICT(event_id, voter_id) DO UPDATE SET
                    mandate_id = excluded.mandate_id,
                    group_id = excluded.group_id,
                    position = excluded.position,
                    group_position = excluded.group_position,
                    seat_number = excluded.seat_number,
                    delegated = excluded.delegated,
                    non_vote_reason = excluded.non_vote_reason,
                    updated_at = CURRENT_TIMESTAMP
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&vote.event_id)
            .bind(&vote.voter_id)
            .bind(&vote.mandate_id)
            .bind(&vote.group_id)
            .bind(vote.position.to_db_string())
            .bind(vote.group_position.map(|p| p.to_db_string()))
            .bind(vote.seat_number)
            .bind(vote.delegated)
            .bind(&vote.non_vote_reason)
            .execute(pool)
            .await?;

            Ok(())
        })
        .await
    }

    async fn fetch_all(&self, event_id: &str) -> Result<Vec<IndividualVote>, StorageError> {
        let sql = format!("{} WHERE event_id = ? ORDER BY group_id, voter_id", SELECT_VOTES);
        let rows = sqlx::query(&sql)
            .bind(event_id)
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(vote_from_row).collect()
    }
}

impl SqliteStore {
    /// Votes that depart from their group's majority position
    pub async fn dissenting_votes(&self, event_id: &str) -> Result<Vec<IndividualVote>, StorageError> {
        let sql = format!(
            "{} WHERE event_id = ? AND group_position IS NOT NULL \
             AND position != 'non_voter' AND position != group_position \
             ORDER BY group_id, voter_id",
            SELECT_VOTES
        );
        let rows = sqlx::query(&sql)
            .bind(event_id)
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(vote_from_row).collect()
    }

    /// Number of stored votes for one event
    pub async fn count_votes(&self, event_id: &str) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM individual_votes WHERE event_id = ?")
            .bind(event_id)
            .fetch_one(self.pool())
            .await?;

        Ok(count)
    }
}

fn vote_from_row(row: &SqliteRow) -> Result<IndividualVote, StorageError> {
    let position: String = row.try_get("position")?;
    let position = Position::from_str(&position)
        .ok_or_else(|| StorageError::InvalidRow(format!("unknown position '{}'", position)))?;

    let group_position = match row.try_get::<Option<String>, _>("group_position")? {
        Some(label) => Some(
            Position::from_str(&label)
                .ok_or_else(|| StorageError::InvalidRow(format!("unknown group position '{}'", label)))?,
        ),
        None => None,
    };

    Ok(IndividualVote {
        event_id: row.try_get("event_id")?,
        voter_id: row.try_get("voter_id")?,
        mandate_id: row.try_get("mandate_id")?,
        group_id: row.try_get("group_id")?,
        position,
        group_position,
        seat_number: row.try_get("seat_number")?,
        delegated: row.try_get("delegated")?,
        non_vote_reason: row.try_get("non_vote_reason")?,
    })
}
