//! Hash Function Contract
//!
//! SHA-256 digests rendered as lowercase hex, plus the canonical encoding of
//! block timestamps that feeds into every block hash.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

/// Predecessor hash recorded on the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Payload notarized by the genesis block.
pub const GENESIS_PAYLOAD: &str = "GENESIS";

/// Length of a hex-encoded digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// SHA-256 of `input`, lowercase hex.
pub fn digest(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

pub fn digest_str(input: &str) -> String {
    digest(input.as_bytes())
}

/// RFC 3339, UTC, microsecond precision. This exact string is hashed and stored.
pub fn canonical_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `digest(previous_hash ∥ data_hash ∥ created_at)` over the exact stored timestamp text.
pub fn compute_block_hash(previous_hash: &str, data_hash: &str, created_at: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous_hash.as_bytes());
    hasher.update(data_hash.as_bytes());
    hasher.update(created_at.as_bytes());
    hex::encode(hasher.finalize())
}

/// True for a 64-char lowercase hex string.
pub fn is_hex_digest(value: &str) -> bool {
    value.len() == DIGEST_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
