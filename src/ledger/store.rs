//! Ledger Store
//!
//! Durable, ordered persistence of blocks. The store owns sequence
//! assignment: `append` only succeeds for the next free slot, so two writers
//! racing for the same slot produce exactly one block and one
//! `WriteConflict`. No update or delete operation is exposed.

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{LedgerError, Result};
use crate::ledger::block::Block;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Number of stored blocks.
    async fn count(&self) -> Result<u64>;

    /// Block with the highest sequence, `None` when empty.
    async fn tail(&self) -> Result<Option<Block>>;

    /// Persist `block` at `block.sequence`, which must be the next free slot.
    ///
    /// Fails with [`LedgerError::WriteConflict`] if the slot is taken (or would leave a gap).
    async fn append(&self, block: &Block) -> Result<()>;

    /// All blocks by ascending sequence, read as one snapshot.
    async fn scan_ordered(&self) -> Result<Vec<Block>>;
}

/// SQLite-backed store. `sequence` is the primary key.
#[derive(Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Decode a row as stored, without judging its contents.
    ///
    /// A negative sequence can only come from tampering. It decodes to
    /// `u64::MAX`, which matches no chain position, so verification reports
    /// the row instead of the scan failing.
    fn decode_row(row: &SqliteRow) -> Result<Block> {
        let sequence: i64 = row.try_get("sequence")?;

        Ok(Block {
            sequence: u64::try_from(sequence).unwrap_or(u64::MAX),
            previous_hash: row.try_get("previous_hash")?,
            data_hash: row.try_get("data_hash")?,
            block_hash: row.try_get("block_hash")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn sql_sequence(sequence: u64) -> Result<i64> {
    i64::try_from(sequence)
        .map_err(|_| LedgerError::ValidationError(format!("sequence {} out of range", sequence)))
}

/// SQLITE_BUSY and SQLITE_BUSY_SNAPSHOT: another writer held the lock past the busy timeout.
fn is_busy(code: Option<&str>) -> bool {
    matches!(code, Some("5") | Some("517"))
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blocks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn tail(&self) -> Result<Option<Block>> {
        let row = sqlx::query(
            r#"
            SELECT sequence,
                   CAST(previous_hash AS TEXT) AS previous_hash,
                   CAST(data_hash AS TEXT) AS data_hash,
                   CAST(block_hash AS TEXT) AS block_hash,
                   CAST(created_at AS TEXT) AS created_at
            FROM blocks
            ORDER BY sequence DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let sequence: i64 = row.try_get("sequence")?;
        if sequence < 0 {
            return Err(LedgerError::CorruptBlock(format!(
                "tail has negative sequence {}",
                sequence
            )));
        }
        Self::decode_row(&row).map(Some)
    }

    async fn append(&self, block: &Block) -> Result<()> {
        let sequence = sql_sequence(block.sequence)?;

        // Insert only into the next free slot; the primary key rejects duplicates.
        let result = sqlx::query(
            r#"
            INSERT INTO blocks (sequence, previous_hash, data_hash, block_hash, created_at)
            SELECT ?1, ?2, ?3, ?4, ?5
            WHERE ?1 = (SELECT COUNT(*) FROM blocks)
            "#,
        )
        .bind(sequence)
        .bind(&block.previous_hash)
        .bind(&block.data_hash)
        .bind(&block.block_hash)
        .bind(&block.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => {
                debug!("Persisted block {}", block.summary());
                Ok(())
            }
            Ok(_) => Err(LedgerError::WriteConflict {
                sequence: block.sequence,
            }),
            Err(sqlx::Error::Database(db_err))
                if db_err.is_unique_violation() || is_busy(db_err.code().as_deref()) =>
            {
                Err(LedgerError::WriteConflict {
                    sequence: block.sequence,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn scan_ordered(&self) -> Result<Vec<Block>> {
        let rows = sqlx::query(
            r#"
            SELECT sequence,
                   CAST(previous_hash AS TEXT) AS previous_hash,
                   CAST(data_hash AS TEXT) AS data_hash,
                   CAST(block_hash AS TEXT) AS block_hash,
                   CAST(created_at AS TEXT) AS created_at
            FROM blocks
            ORDER BY sequence ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::decode_row).collect()
    }
}

/// In-process store with the same slot semantics as [`SqliteLedgerStore`].
#[derive(Default)]
pub struct MemoryLedgerStore {
    blocks: RwLock<Vec<Block>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a stored block in place, bypassing the append-only API.
    /// Exists to simulate tampering in tests.
    #[cfg(test)]
    pub(crate) async fn overwrite(&self, block: Block) {
        let mut blocks = self.blocks.write().await;
        let idx = block.sequence as usize;
        blocks[idx] = block;
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn count(&self) -> Result<u64> {
        Ok(self.blocks.read().await.len() as u64)
    }

    async fn tail(&self) -> Result<Option<Block>> {
        Ok(self.blocks.read().await.last().cloned())
    }

    async fn append(&self, block: &Block) -> Result<()> {
        let mut blocks = self.blocks.write().await;
        if block.sequence != blocks.len() as u64 {
            return Err(LedgerError::WriteConflict {
                sequence: block.sequence,
            });
        }
        blocks.push(block.clone());
        Ok(())
    }

    async fn scan_ordered(&self) -> Result<Vec<Block>> {
        Ok(self.blocks.read().await.clone())
    }
}
