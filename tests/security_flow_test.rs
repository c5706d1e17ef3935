//! End-to-end flow of the security core around a login burst: duplicate
//! guard in front, lockout consulted before password verification, audit
//! trail recording every completed response.

mod common;

use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

use common::{login_request, response, setup_test_db, trail_in};
use crm_security_core::classify::{event_types, SecurityEventClassifier, Severity};
use crm_security_core::config::{DedupConfig, LockoutConfig};
use crm_security_core::dedup::{request_signature, DuplicateRequestGuard};
use crm_security_core::lockout::LockoutTracker;
use crm_security_core::store::MemoryFastStore;

#[tokio::test]
async fn test_login_burst_locks_account_and_audits_every_attempt() {
    let dir = tempdir().unwrap();
    let trail = trail_in(dir.path());
    let db = Arc::new(setup_test_db().await);
    let tracker = LockoutTracker::new(
        Arc::new(MemoryFastStore::new()),
        db.clone(),
        LockoutConfig::default(),
    );
    let classifier = SecurityEventClassifier::new();

    let mut last_hash = None;
    for attempt in 0..5 {
        // Lockout is consulted synchronously before password verification.
        let status = tracker.is_locked(Some("u1"), "agent@example.com").await;
        assert!(!status.is_locked, "locked too early at attempt {}", attempt);

        let outcome = tracker
            .record_failure(Some("u1"), "agent@example.com", "10.0.0.1", "crm-web/2.1")
            .await
            .unwrap();
        assert_eq!(outcome.locked, attempt == 4);

        // Response completion hook: classify and record.
        let (event_type, severity) = classifier.classify("POST", "/api/auth/login", 401);
        assert_eq!(event_type, event_types::USER_LOGIN);
        assert_eq!(severity, Severity::Warn);

        let entry = trail
            .record(
                login_request(json!({"email": "agent@example.com", "password": "guess"})),
                response(401),
                None,
            )
            .await;
        if let Some(prev) = last_hash {
            assert_eq!(entry.previous_hash, prev);
        }
        last_hash = Some(entry.hash.clone());
    }

    // Sixth attempt short-circuits on the lock; no password verification,
    // but the rejection itself is still auditable.
    let status = tracker.is_locked(Some("u1"), "agent@example.com").await;
    assert!(status.is_locked);
}

#[tokio::test]
async fn test_double_submit_is_flagged_before_the_handler_runs() {
    let guard = DuplicateRequestGuard::new(DedupConfig::default());
    let body = br#"{"email":"agent@example.com","password":"x"}"#;
    let sig = request_signature("10.0.0.1", "crm-web/2.1", body);

    // First submission reaches the handler, the replay is flagged; the
    // caller maps the verdict to a 429.
    assert!(!guard.check_and_record(&sig));
    assert!(guard.check_and_record(&sig));
}
