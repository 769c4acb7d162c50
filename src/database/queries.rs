use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::database::models::Voter;
use crate::error::{LedgerError, Result};

pub struct Queries;

impl Queries {
    pub async fn insert_voter(pool: &SqlitePool, voter: &Voter) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO voters (id, aadhaar_hash, phone_hash, epic_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(voter.id.to_string())
        .bind(&voter.aadhaar_hash)
        .bind(&voter.phone_hash)
        .bind(&voter.epic_id)
        .bind(voter.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Compensating delete for a registration whose ledger append failed.
    pub async fn delete_voter(pool: &SqlitePool, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM voters WHERE id = ?")
            .bind(id.to_string())
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn get_voter_by_epic_id(pool: &SqlitePool, epic_id: &str) -> Result<Option<Voter>> {
        let row = sqlx::query(
            r#"
            SELECT id, aadhaar_hash, phone_hash, epic_id, created_at
            FROM voters
            WHERE epic_id = ?
            "#,
        )
        .bind(epic_id)
        .fetch_optional(pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.try_get("id")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Some(Voter {
            id: Uuid::parse_str(&id)
                .map_err(|e| LedgerError::DatabaseError(format!("Invalid voter id {}: {}", id, e)))?,
            aadhaar_hash: row.try_get("aadhaar_hash")?,
            phone_hash: row.try_get("phone_hash")?,
            epic_id: row.try_get("epic_id")?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| LedgerError::DatabaseError(format!("Invalid created_at: {}", e)))?
                .with_timezone(&Utc),
        }))
    }

    pub async fn count_voters(pool: &SqlitePool) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM voters")
            .fetch_one(pool)
            .await?;
        Ok(count as u64)
    }
}
