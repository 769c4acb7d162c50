//! Ledger Block
//!
//! Immutable, hash-linked record. A block commits to its predecessor through
//! `previous_hash` and to its own contents through `block_hash`.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::hash::{
    canonical_timestamp, compute_block_hash, digest_str, GENESIS_PAYLOAD, GENESIS_PREVIOUS_HASH,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, 0 for genesis.
    pub sequence: u64,
    pub previous_hash: String,
    /// Digest of the notarized payload; the payload itself is never stored.
    pub data_hash: String,
    pub block_hash: String,
    /// Timestamp text hashed into `block_hash`, stored byte for byte.
    pub created_at: String,
}

impl Block {
    /// Build the genesis block stamped at `created_at`.
    pub fn genesis(created_at: DateTime<Utc>) -> Self {
        Self::assemble(
            0,
            GENESIS_PREVIOUS_HASH.to_string(),
            digest_str(GENESIS_PAYLOAD),
            canonical_timestamp(&created_at),
        )
    }

    /// Build the block that follows `tail`, notarizing `payload`.
    pub fn next(tail: &Block, payload: &str, created_at: DateTime<Utc>) -> Self {
        Self::assemble(
            tail.sequence + 1,
            tail.block_hash.clone(),
            digest_str(payload),
            canonical_timestamp(&created_at),
        )
    }

    fn assemble(
        sequence: u64,
        previous_hash: String,
        data_hash: String,
        created_at: String,
    ) -> Self {
        let block_hash = compute_block_hash(&previous_hash, &data_hash, &created_at);
        Self {
            sequence,
            previous_hash,
            data_hash,
            block_hash,
            created_at,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.sequence == 0
    }

    /// Recompute the hash from this block's own stored fields.
    pub fn recompute_hash(&self) -> String {
        compute_block_hash(&self.previous_hash, &self.data_hash, &self.created_at)
    }

    pub fn verify_hash(&self) -> bool {
        self.block_hash == self.recompute_hash()
    }

    /// Parsed `created_at`, `None` if the stored text is not RFC 3339.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    pub fn summary(&self) -> String {
        format!(
            "#{} {} (prev {})",
            self.sequence,
            short_hash(&self.block_hash),
            short_hash(&self.previous_hash)
        )
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

/// Current instant, truncated to the precision kept by the canonical timestamp.
///
/// The value is taken once per block and reused for hashing and storage.
pub fn block_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
