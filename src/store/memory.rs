//! In-memory store implementations.
//!
//! `MemoryFastStore` stands in for the production cache tier and doubles
//! as the memory-only fallback when no cache is deployed.
//! `MemoryAccountStore` backs tests and the degraded durable-less paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::SecurityError;
use crate::store::{AccountSecurityRecord, AccountStore, FastStore};

struct FastEntry {
    value: String,
    expires_at: Instant,
}

/// TTL'd in-memory KV store with the same contract as the cache tier.
#[derive(Default)]
pub struct MemoryFastStore {
    entries: Mutex<HashMap<String, FastEntry>>,
}

impl MemoryFastStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_value(entries: &HashMap<String, FastEntry>, key: &str) -> Option<String> {
        entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone())
    }
}

#[async_trait]
impl FastStore for MemoryFastStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SecurityError> {
        let entries = self.entries.lock().unwrap();
        Ok(Self::live_value(&entries, key))
    }

    async fn incr(&self, key: &str, ttl: Duration) -> Result<u64, SecurityError> {
        let mut entries = self.entries.lock().unwrap();
        let current: u64 = Self::live_value(&entries, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let next = current + 1;
        let expires_at = match entries.get(key) {
            // Keep the original window; TTL is only set on creation.
            Some(e) if e.expires_at > Instant::now() => e.expires_at,
            _ => Instant::now() + ttl,
        };
        entries.insert(
            key.to_string(),
            FastEntry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), SecurityError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            FastEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), SecurityError> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Instant::now() + ttl;
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, SecurityError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(key)
            .and_then(|e| e.expires_at.checked_duration_since(Instant::now())))
    }

    async fn exists(&self, key: &str) -> Result<bool, SecurityError> {
        let entries = self.entries.lock().unwrap();
        Ok(Self::live_value(&entries, key).is_some())
    }

    async fn del(&self, key: &str) -> Result<(), SecurityError> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        Ok(())
    }
}

/// In-memory account store, keyed by user id.
#[derive(Default)]
pub struct MemoryAccountStore {
    records: Mutex<HashMap<String, AccountSecurityRecord>>,
    emails: Mutex<HashMap<String, String>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user so `find_user_id_by_email` resolves it.
    pub fn register_user(&self, user_id: &str, email: &str) {
        self.emails
            .lock()
            .unwrap()
            .insert(email.to_lowercase(), user_id.to_string());
        self.records
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default();
    }

    /// Directly overwrite a record (test setup for expiry scenarios).
    pub fn set_record(&self, user_id: &str, record: AccountSecurityRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(user_id.to_string(), record);
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn security_record(
        &self,
        user_id: &str,
    ) -> Result<Option<AccountSecurityRecord>, SecurityError> {
        Ok(self.records.lock().unwrap().get(user_id).cloned())
    }

    async fn update_attempts(
        &self,
        user_id: &str,
        attempts: u32,
        window_expiry: DateTime<Utc>,
    ) -> Result<(), SecurityError> {
        let mut records = self.records.lock().unwrap();
        let record = records.entry(user_id.to_string()).or_default();
        record.login_attempts = attempts;
        record.attempt_window_expiry = Some(window_expiry);
        Ok(())
    }

    async fn establish_lock(
        &self,
        user_id: &str,
        lock_until: DateTime<Utc>,
        attempts: u32,
    ) -> Result<(), SecurityError> {
        let mut records = self.records.lock().unwrap();
        let record = records.entry(user_id.to_string()).or_default();
        record.lock_until = Some(lock_until);
        record.login_attempts = attempts;
        record.attempt_window_expiry = None;
        Ok(())
    }

    async fn clear_security_state(&self, user_id: &str) -> Result<(), SecurityError> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.get_mut(user_id) {
            *record = AccountSecurityRecord::default();
        }
        Ok(())
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<String>, SecurityError> {
        Ok(self.emails.lock().unwrap().get(&email.to_lowercase()).cloned())
    }
}
