#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crm_security_core::audit::{FileAuditSink, HashChainAuditTrail, RequestSnapshot, ResponseSnapshot};
use crm_security_core::config::AuditConfig;
use crm_security_core::error::SecurityError;
use crm_security_core::store::{AccountSecurityRecord, AccountStore, Database, FastStore};

/// In-memory SQLite database with one seeded account.
pub async fn setup_test_db() -> Database {
    let db = Database::new_in_memory()
        .await
        .expect("Failed to create test database");
    db.upsert_account("u1", "agent@example.com")
        .await
        .expect("Failed to seed account");
    db
}

/// Audit trail persisting to real segment files under `dir`.
pub fn trail_in(dir: &Path) -> HashChainAuditTrail {
    let config = AuditConfig {
        log_dir: dir.to_string_lossy().into_owned(),
        ..AuditConfig::default()
    };
    let sink = Arc::new(FileAuditSink::new(dir).expect("Failed to create sink"));
    HashChainAuditTrail::initialize(config, sink)
}

pub fn login_request(body: Value) -> RequestSnapshot {
    RequestSnapshot {
        method: "POST".to_string(),
        url: "/api/auth/login".to_string(),
        path: "/api/auth/login".to_string(),
        ip: "10.0.0.1".to_string(),
        user_agent: "crm-web/2.1".to_string(),
        body,
        query: json!({}),
    }
}

pub fn api_request(method: &str, path: &str, body: Value) -> RequestSnapshot {
    RequestSnapshot {
        method: method.to_string(),
        url: path.to_string(),
        path: path.to_string(),
        ip: "10.0.0.1".to_string(),
        user_agent: "crm-web/2.1".to_string(),
        body,
        query: json!({}),
    }
}

pub fn response(status_code: u16) -> ResponseSnapshot {
    ResponseSnapshot {
        status_code,
        duration: 15,
    }
}

/// Fast store that is permanently unreachable.
pub struct FailingFastStore;

#[async_trait]
impl FastStore for FailingFastStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, SecurityError> {
        Err(SecurityError::FastStoreUnavailable("connection refused".into()))
    }

    async fn incr(&self, _key: &str, _ttl: Duration) -> Result<u64, SecurityError> {
        Err(SecurityError::FastStoreUnavailable("connection refused".into()))
    }

    async fn set_with_ttl(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
    ) -> Result<(), SecurityError> {
        Err(SecurityError::FastStoreUnavailable("connection refused".into()))
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), SecurityError> {
        Err(SecurityError::FastStoreUnavailable("connection refused".into()))
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, SecurityError> {
        Err(SecurityError::FastStoreUnavailable("connection refused".into()))
    }

    async fn exists(&self, _key: &str) -> Result<bool, SecurityError> {
        Err(SecurityError::FastStoreUnavailable("connection refused".into()))
    }

    async fn del(&self, _key: &str) -> Result<(), SecurityError> {
        Err(SecurityError::FastStoreUnavailable("connection refused".into()))
    }
}

/// Account store that is permanently unreachable.
pub struct FailingAccountStore;

#[async_trait]
impl AccountStore for FailingAccountStore {
    async fn security_record(
        &self,
        _user_id: &str,
    ) -> Result<Option<AccountSecurityRecord>, SecurityError> {
        Err(SecurityError::DurableStoreError("database down".into()))
    }

    async fn update_attempts(
        &self,
        _user_id: &str,
        _attempts: u32,
        _window_expiry: DateTime<Utc>,
    ) -> Result<(), SecurityError> {
        Err(SecurityError::DurableStoreError("database down".into()))
    }

    async fn establish_lock(
        &self,
        _user_id: &str,
        _lock_until: DateTime<Utc>,
        _attempts: u32,
    ) -> Result<(), SecurityError> {
        Err(SecurityError::DurableStoreError("database down".into()))
    }

    async fn clear_security_state(&self, _user_id: &str) -> Result<(), SecurityError> {
        Err(SecurityError::DurableStoreError("database down".into()))
    }

    async fn find_user_id_by_email(&self, _email: &str) -> Result<Option<String>, SecurityError> {
        Err(SecurityError::DurableStoreError("database down".into()))
    }
}
