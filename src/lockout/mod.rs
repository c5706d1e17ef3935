//! Login Attempt Tracking & Account Lockout
//!
//! Dual-backed counting (fast cache best-effort, durable store
//! authoritative) feeding a lockout state machine consulted on the
//! synchronous login path.

pub mod counter;
pub mod tracker;

pub use counter::{CounterSample, DualBackedCounter};
pub use tracker::{FailureOutcome, LockSource, LockStatus, LockoutTracker};
