//! Voter Registration
//!
//! Registers voters and notarizes each registration on the ledger as
//! `REGISTER:<epic_id>`. Only digests of the Aadhaar number and phone are
//! persisted.

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::OnceLock;
use tracing::{error, info};
use uuid::Uuid;

use crate::database::models::Voter;
use crate::database::queries::Queries;
use crate::error::{LedgerError, Result};
use crate::ledger::{digest_str, ChainService, LedgerStore};

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationRequest {
    pub aadhaar: String,
    pub phone: String,
}

/// Result of a notarized registration.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub epic_id: String,
    /// Hash of the block that notarized this registration.
    pub receipt: String,
}

fn aadhaar_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{12}$").expect("valid regex"))
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{10}$").expect("valid regex"))
}

pub fn validate_aadhaar(aadhaar: &str) -> bool {
    aadhaar_pattern().is_match(aadhaar)
}

pub fn validate_phone(phone: &str) -> bool {
    phone_pattern().is_match(phone)
}

/// `EPIC-` followed by ten upper-case hex characters.
pub fn generate_epic_id() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("EPIC-{}", raw[..10].to_uppercase())
}

pub fn register_event_payload(epic_id: &str) -> String {
    format!("REGISTER:{}", epic_id)
}

pub struct VoterRegistry<S: LedgerStore> {
    pool: SqlitePool,
    chain: ChainService<S>,
}

impl<S: LedgerStore> VoterRegistry<S> {
    pub fn new(pool: SqlitePool, chain: ChainService<S>) -> Self {
        Self { pool, chain }
    }

    /// Store the voter, then notarize the registration.
    ///
    /// If the ledger append fails the voter row is removed again, so a
    /// registration either has a ledger receipt or does not exist.
    pub async fn register(&self, request: &RegistrationRequest) -> Result<Registration> {
        let aadhaar = request.aadhaar.trim();
        let phone = request.phone.trim();

        if !validate_aadhaar(aadhaar) {
            return Err(LedgerError::invalid_field("aadhaar", "12 digits"));
        }
        if !validate_phone(phone) {
            return Err(LedgerError::invalid_field("phone", "10 digits"));
        }

        let voter = Voter {
            id: Uuid::new_v4(),
            aadhaar_hash: digest_str(aadhaar),
            phone_hash: digest_str(phone),
            epic_id: generate_epic_id(),
            created_at: Utc::now(),
        };
        Queries::insert_voter(&self.pool, &voter).await?;

        match self.chain.append(&register_event_payload(&voter.epic_id)).await {
            Ok(receipt) => {
                info!("Registered voter {} (receipt {})", voter.epic_id, receipt);
                Ok(Registration {
                    epic_id: voter.epic_id,
                    receipt,
                })
            }
            Err(e) => {
                error!(
                    "Ledger append failed for {}, rolling back registration: {}",
                    voter.epic_id, e
                );
                if let Err(rollback) = Queries::delete_voter(&self.pool, voter.id).await {
                    error!(
                        "Rollback of {} failed, voter row left without ledger record: {}",
                        voter.epic_id, rollback
                    );
                }
                Err(e)
            }
        }
    }

    pub fn chain(&self) -> &ChainService<S> {
        &self.chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::ledger::MemoryLedgerStore;
    use std::sync::Arc;

    fn request(aadhaar: &str, phone: &str) -> RegistrationRequest {
        RegistrationRequest {
            aadhaar: aadhaar.to_string(),
            phone: phone.to_string(),
        }
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_aadhaar("123456789012"));
        assert!(!validate_aadhaar("12345678901"));
        assert!(!validate_aadhaar("12345678901a"));
        assert!(validate_phone("9876543210"));
        assert!(!validate_phone("98765 43210"));
    }

    #[test]
    fn test_epic_id_format() {
        let epic_id = generate_epic_id();
        assert_eq!(epic_id.len(), 15);
        assert!(epic_id.starts_with("EPIC-"));
        assert!(epic_id[5..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[tokio::test]
    async fn test_register_notarizes_event() {
        let db = Database::new_in_memory().await.unwrap();
        let chain = ChainService::new(Arc::new(MemoryLedgerStore::new()));
        chain.ensure_genesis().await.unwrap();
        let registry = VoterRegistry::new(db.pool().clone(), chain);

        let registration = registry
            .register(&request("123456789012", "9876543210"))
            .await
            .unwrap();

        let tail = registry.chain().store().tail().await.unwrap().unwrap();
        assert_eq!(tail.block_hash, registration.receipt);
        assert_eq!(
            tail.data_hash,
            digest_str(&format!("REGISTER:{}", registration.epic_id))
        );

        let voter = Queries::get_voter_by_epic_id(db.pool(), &registration.epic_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(voter.aadhaar_hash, digest_str("123456789012"));
        assert_eq!(voter.phone_hash, digest_str("9876543210"));
    }

    #[tokio::test]
    async fn test_invalid_input_writes_nothing() {
        let db = Database::new_in_memory().await.unwrap();
        let chain = ChainService::new(Arc::new(MemoryLedgerStore::new()));
        chain.ensure_genesis().await.unwrap();
        let registry = VoterRegistry::new(db.pool().clone(), chain);

        let err = registry
            .register(&request("1234", "9876543210"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ValidationError(_)));
        assert_eq!(Queries::count_voters(db.pool()).await.unwrap(), 0);
        assert_eq!(registry.chain().store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_append_rolls_back_voter() {
        let db = Database::new_in_memory().await.unwrap();
        // No genesis: append fails with UninitializedChain
        let chain = ChainService::new(Arc::new(MemoryLedgerStore::new()));
        let registry = VoterRegistry::new(db.pool().clone(), chain);

        let err = registry
            .register(&request("123456789012", "9876543210"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UninitializedChain));
        assert_eq!(Queries::count_voters(db.pool()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_rollback_keeps_append_error() {
        let db = Database::new_in_memory().await.unwrap();
        sqlx::query(
            "CREATE TRIGGER voters_no_delete BEFORE DELETE ON voters \
             BEGIN SELECT RAISE(ABORT, 'deletes disabled'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let chain = ChainService::new(Arc::new(MemoryLedgerStore::new()));
        let registry = VoterRegistry::new(db.pool().clone(), chain);

        let err = registry
            .register(&request("123456789012", "9876543210"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UninitializedChain));
        assert_eq!(Queries::count_voters(db.pool()).await.unwrap(), 1);
    }
}
