//! Duplicate Request Guard
//!
//! Bounded in-memory fingerprint cache detecting near-simultaneous
//! duplicate submissions. Process-local: horizontally scaled deployments
//! that need exact-once semantics across instances need a shared backend.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;
use tracing::debug;

use crate::config::DedupConfig;

/// Fingerprint of a request: hash of client address, user agent, and the
/// body hash.
pub fn request_signature(ip: &str, user_agent: &str, body: &[u8]) -> String {
    let mut body_hasher = Sha256::new();
    body_hasher.update(body);
    let body_hash = hex::encode(body_hasher.finalize());

    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hasher.update(b"|");
    hasher.update(user_agent.as_bytes());
    hasher.update(b"|");
    hasher.update(body_hash.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct DuplicateRequestGuard {
    config: DedupConfig,
    seen: Mutex<HashMap<String, Instant>>,
}

impl DuplicateRequestGuard {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true when an identical signature was already accepted
    /// inside the window. Otherwise records the sighting (overwriting any
    /// expired entry) and returns false. The caller decides what to do
    /// with a duplicate verdict; this guard only computes it.
    pub fn check_and_record(&self, signature: &str) -> bool {
        if self.config.bypass {
            return false;
        }

        let now = Instant::now();
        let mut seen = self.seen.lock().unwrap();

        if let Some(&last_seen) = seen.get(signature) {
            if now.duration_since(last_seen) < self.config.window() {
                debug!(signature, "Duplicate request suppressed");
                return true;
            }
        }

        if seen.len() >= self.config.max_entries {
            let horizon = self.config.sweep_horizon();
            let before = seen.len();
            seen.retain(|_, last_seen| now.duration_since(*last_seen) < horizon);
            debug!("Swept duplicate table: {} -> {} entries", before, seen.len());
        }

        seen.insert(signature.to_string(), now);
        false
    }

    /// Current table size, for observability.
    pub fn tracked(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}
