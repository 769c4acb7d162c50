//! Chain Service
//!
//! Sole writer and verifier of the ledger. Every append re-reads the tail
//! from the store and claims the next slot through the store's conditional
//! append; a lost race is retried against the fresh tail, so the chain never
//! forks.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{LedgerError, Result};
use crate::ledger::block::{block_timestamp, Block};
use crate::ledger::hash::{compute_block_hash, GENESIS_PREVIOUS_HASH};
use crate::ledger::store::LedgerStore;

pub const DEFAULT_MAX_APPEND_ATTEMPTS: u32 = 5;

/// Read-only view used by status endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainStatus {
    pub length: u64,
    pub valid: bool,
}

/// Outcome of a full-chain verification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainVerification {
    pub length: u64,
    pub valid: bool,
    /// Sequence of the first block that failed a check.
    pub first_invalid: Option<u64>,
    pub reason: Option<String>,
}

impl ChainVerification {
    fn valid(length: u64) -> Self {
        Self {
            length,
            valid: true,
            first_invalid: None,
            reason: None,
        }
    }

    fn broken(length: u64, sequence: u64, reason: String) -> Self {
        Self {
            length,
            valid: false,
            first_invalid: Some(sequence),
            reason: Some(reason),
        }
    }
}

pub struct ChainService<S: LedgerStore> {
    store: Arc<S>,
    max_append_attempts: u32,
}

impl<S: LedgerStore> Clone for ChainService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            max_append_attempts: self.max_append_attempts,
        }
    }
}

impl<S: LedgerStore> ChainService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_max_attempts(store, DEFAULT_MAX_APPEND_ATTEMPTS)
    }

    /// `max_append_attempts` is clamped to at least one attempt.
    pub fn with_max_attempts(store: Arc<S>, max_append_attempts: u32) -> Self {
        Self {
            store,
            max_append_attempts: max_append_attempts.max(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create the genesis block if the store is empty.
    ///
    /// Returns `true` when this call persisted genesis. Safe to call on every
    /// startup and from concurrent bootstrappers: only one genesis is stored.
    pub async fn ensure_genesis(&self) -> Result<bool> {
        if self.store.count().await? > 0 {
            debug!("Genesis block already present");
            return Ok(false);
        }

        let genesis = Block::genesis(block_timestamp());
        match self.store.append(&genesis).await {
            Ok(()) => {
                info!("Created genesis block {}", genesis.block_hash);
                Ok(true)
            }
            Err(e) if e.is_write_conflict() => {
                debug!("Genesis created concurrently by another caller");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Notarize `payload` as a new block and return its hash as a receipt.
    pub async fn append(&self, payload: &str) -> Result<String> {
        for attempt in 1..=self.max_append_attempts {
            let tail = self
                .store
                .tail()
                .await?
                .ok_or(LedgerError::UninitializedChain)?;

            let block = Block::next(&tail, payload, block_timestamp());
            match self.store.append(&block).await {
                Ok(()) => {
                    debug!("Appended block {}", block.summary());
                    return Ok(block.block_hash);
                }
                Err(LedgerError::WriteConflict { sequence }) => {
                    warn!(
                        "Sequence {} claimed concurrently (attempt {}/{}), retrying",
                        sequence, attempt, self.max_append_attempts
                    );
                    tokio::task::yield_now().await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(LedgerError::AppendConflict {
            attempts: self.max_append_attempts,
        })
    }

    pub async fn verify(&self) -> Result<bool> {
        Ok(self.verify_detailed().await?.valid)
    }

    /// Scan the whole chain and stop at the first broken block.
    pub async fn verify_detailed(&self) -> Result<ChainVerification> {
        let blocks = self.store.scan_ordered().await?;
        let result = verify_blocks(&blocks);
        if let (Some(sequence), Some(reason)) = (result.first_invalid, &result.reason) {
            error!("Chain verification failed at block {}: {}", sequence, reason);
        }
        Ok(result)
    }

    /// Length and validity taken from the same verification snapshot.
    pub async fn status(&self) -> Result<ChainStatus> {
        let verification = self.verify_detailed().await?;
        Ok(ChainStatus {
            length: verification.length,
            valid: verification.valid,
        })
    }
}

/// Check an ordered run of blocks starting at genesis.
///
/// Each block's hash is recomputed against the predecessor's `block_hash`
/// (the zero constant for genesis), and its stored `previous_hash` must
/// match the same value.
pub fn verify_blocks(blocks: &[Block]) -> ChainVerification {
    let length = blocks.len() as u64;
    let mut expected_prev = GENESIS_PREVIOUS_HASH;

    for (position, block) in blocks.iter().enumerate() {
        let position = position as u64;
        if block.sequence != position {
            return ChainVerification::broken(
                length,
                position,
                format!("expected sequence {}, found {}", position, block.sequence),
            );
        }

        if block.previous_hash != expected_prev {
            return ChainVerification::broken(
                length,
                position,
                format!(
                    "previous_hash {} does not match predecessor {}",
                    block.previous_hash, expected_prev
                ),
            );
        }

        if block.timestamp().is_none() {
            return ChainVerification::broken(
                length,
                position,
                format!("created_at {:?} is not an RFC 3339 timestamp", block.created_at),
            );
        }

        let recomputed = compute_block_hash(expected_prev, &block.data_hash, &block.created_at);
        if recomputed != block.block_hash {
            return ChainVerification::broken(
                length,
                position,
                format!(
                    "block_hash {} does not match recomputed {}",
                    block.block_hash, recomputed
                ),
            );
        }

        expected_prev = block.block_hash.as_str();
    }

    ChainVerification::valid(length)
}
