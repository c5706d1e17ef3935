//! Audit Log Entry
//!
//! Defines the persisted audit entry and its canonical hashing rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::SecurityError;

/// Anchor for a chain with no prior entries.
pub fn genesis_hash() -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"GENESIS");
    hex::encode(hasher.finalize())
}

/// Authenticated principal attached to an entry; absent for
/// unauthenticated events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    pub path: String,
    pub ip: String,
    pub user_agent: String,
    /// Sanitized before the entry is assembled; never holds raw secrets.
    pub body: Value,
    pub query: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSnapshot {
    pub status_code: u16,
    /// Milliseconds.
    pub duration: u64,
}

/// One line of the chained audit stream. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub correlation_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub user: Option<Actor>,
    pub request: RequestSnapshot,
    pub response: ResponseSnapshot,
    pub hash: String,
    pub previous_hash: String,
}

impl AuditEntry {
    /// Canonical JSON of the entry body, hash fields excluded. serde_json
    /// orders object keys deterministically, so this string is stable
    /// across serialize/deserialize round trips.
    pub fn canonical_string(&self) -> Result<String, SecurityError> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.remove("hash");
            map.remove("previousHash");
        }
        Ok(value.to_string())
    }

    /// `SHA256(canonical(entry) + previous_hash)`, hex-encoded.
    pub fn compute_hash(&self) -> Result<String, SecurityError> {
        let canonical = self.canonical_string()?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hasher.update(self.previous_hash.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    /// Recompute the hash from the stored body and stored previous hash.
    pub fn verify_hash(&self) -> bool {
        self.compute_hash()
            .map(|h| h == self.hash)
            .unwrap_or(false)
    }
}
