use thiserror::Error;

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::CorruptBlock(format!("JSON serialization error: {}", err))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(format!("Database error: {}", err))
    }
}

impl From<config::ConfigError> for LedgerError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// `append` was called before the genesis block exists.
    #[error("Chain is not initialized: genesis block missing")]
    UninitializedChain,

    /// Another writer already claimed this sequence slot. Retried internally by the chain service.
    #[error("Write conflict at sequence {sequence}")]
    WriteConflict { sequence: u64 },

    /// The retry bound was exhausted under contention; the event was not notarized.
    #[error("Append conflict: gave up after {attempts} attempts")]
    AppendConflict { attempts: u32 },

    /// A stored row could not be decoded into a block.
    #[error("Corrupt block: {0}")]
    CorruptBlock(String),
}

impl LedgerError {
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, Self::WriteConflict { .. })
    }

    pub fn invalid_field(field: &str, expected: &str) -> Self {
        Self::ValidationError(format!("Invalid {} format. Must be {}.", field, expected))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
