//! Tamper-Evident Ledger
//!
//! Append-only hash chain of event records. Each block commits to its
//! predecessor, so any retroactive edit is detectable by recomputing hashes.

pub mod block;
pub mod chain;
pub mod hash;
pub mod store;

pub use block::Block;
pub use chain::{ChainService, ChainStatus, ChainVerification, DEFAULT_MAX_APPEND_ATTEMPTS};
pub use hash::{digest, digest_str, GENESIS_PREVIOUS_HASH};
pub use store::{LedgerStore, MemoryLedgerStore, SqliteLedgerStore};
