use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered voter. Identifiers are stored only as SHA-256 digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub id: Uuid,
    pub aadhaar_hash: String,
    pub phone_hash: String,
    pub epic_id: String,
    pub created_at: DateTime<Utc>,
}
