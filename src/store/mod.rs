//! Storage Backends
//!
//! Two tiers back the lockout tracker: a fast ephemeral KV store
//! (best-effort, TTL'd) and a durable account store (authoritative).
//! Both are traits so the coordinator can be exercised against in-memory
//! implementations and so "degrade when the cache is down" is testable.

pub mod database;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::SecurityError;

pub use database::Database;
pub use memory::{MemoryAccountStore, MemoryFastStore};

/// Fast ephemeral KV store contract. Every operation can fail with
/// `SecurityError::FastStoreUnavailable`; callers are expected to degrade
/// rather than propagate.
#[async_trait]
pub trait FastStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, SecurityError>;

    /// Atomic increment; sets `ttl` on the key when it is created.
    async fn incr(&self, key: &str, ttl: Duration) -> Result<u64, SecurityError>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), SecurityError>;

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), SecurityError>;

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, SecurityError>;

    async fn exists(&self, key: &str) -> Result<bool, SecurityError>;

    async fn del(&self, key: &str) -> Result<(), SecurityError>;
}

/// Durable security state carried on the account record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountSecurityRecord {
    pub login_attempts: u32,
    pub attempt_window_expiry: Option<DateTime<Utc>>,
    pub lock_until: Option<DateTime<Utc>>,
}

/// Authoritative account store contract. Keyed by user id; the email
/// lookup mirrors the CRM's identifier-based login.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn security_record(
        &self,
        user_id: &str,
    ) -> Result<Option<AccountSecurityRecord>, SecurityError>;

    async fn update_attempts(
        &self,
        user_id: &str,
        attempts: u32,
        window_expiry: DateTime<Utc>,
    ) -> Result<(), SecurityError>;

    /// Establish a lock: authoritative `lock_until` plus the attempt count
    /// pinned at the threshold.
    async fn establish_lock(
        &self,
        user_id: &str,
        lock_until: DateTime<Utc>,
        attempts: u32,
    ) -> Result<(), SecurityError>;

    /// Clear attempts and lock timestamp (successful login).
    async fn clear_security_state(&self, user_id: &str) -> Result<(), SecurityError>;

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<String>, SecurityError>;
}
