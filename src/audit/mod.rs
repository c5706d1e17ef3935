//! Hash-Chained Audit Trail
//!
//! Tamper-evident logging for every sensitive request the CRM handles.
//! Each entry's hash covers the previous entry's hash, so retroactive
//! edits break the chain and are detectable by replay.

pub mod chain;
pub mod entry;
pub mod trail;
pub mod verify;

pub use chain::ChainState;
pub use entry::{genesis_hash, Actor, AuditEntry, RequestSnapshot, ResponseSnapshot};
pub use trail::{AuditSink, FileAuditSink, HashChainAuditTrail};
pub use verify::{verify_entries, verify_segment, SegmentVerification};
