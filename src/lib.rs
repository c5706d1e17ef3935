//! Security State Core for the CRM backend.
//!
//! Every sensitive mutating request passes through this crate before
//! business logic runs: a hash-chained audit trail, a dual-backed login
//! lockout tracker, a duplicate-request guard, and the classification
//! and sanitization feeding them. HTTP routing, domain entities, and the
//! rest of the application integrate through the public surface
//! re-exported here.

pub mod audit;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod error;
pub mod lockout;
pub mod sanitize;
pub mod store;

pub use audit::{
    genesis_hash, verify_segment, Actor, AuditEntry, AuditSink, FileAuditSink,
    HashChainAuditTrail, RequestSnapshot, ResponseSnapshot,
};
pub use classify::{SecurityEventClassifier, Severity};
pub use config::SecurityConfig;
pub use dedup::{request_signature, DuplicateRequestGuard};
pub use error::SecurityError;
pub use lockout::{FailureOutcome, LockSource, LockStatus, LockoutTracker};
pub use sanitize::{Sanitizer, REDACTION_MARKER};
