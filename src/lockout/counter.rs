//! Dual-Backed Counter
//!
//! Counts events against two storage tiers: the fast store is a
//! best-effort accelerator, the durable store is authoritative. The
//! effective count is the maximum of the two, so losing either tier only
//! ever errs toward stricter lockout.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tracing::warn;

use crate::store::{AccountStore, FastStore};

#[derive(Debug, Clone, Copy, Default)]
pub struct CounterSample {
    pub fast: Option<u64>,
    pub durable: Option<u64>,
}

impl CounterSample {
    pub fn effective(&self) -> u64 {
        self.fast.unwrap_or(0).max(self.durable.unwrap_or(0))
    }
}

pub struct DualBackedCounter {
    fast: Arc<dyn FastStore>,
    durable: Arc<dyn AccountStore>,
    window: std::time::Duration,
}

impl DualBackedCounter {
    pub fn new(
        fast: Arc<dyn FastStore>,
        durable: Arc<dyn AccountStore>,
        window: std::time::Duration,
    ) -> Self {
        Self {
            fast,
            durable,
            window,
        }
    }

    /// Increment the fast counters for every given key; unavailability is
    /// logged once and skipped, never retried. Returns the highest count
    /// observed.
    pub async fn increment_fast(&self, keys: &[String]) -> Option<u64> {
        let mut highest: Option<u64> = None;
        for key in keys {
            match self.fast.incr(key, self.window).await {
                Ok(count) => highest = Some(highest.unwrap_or(0).max(count)),
                Err(e) => {
                    warn!("Fast store unavailable during counter increment: {}", e);
                    return highest;
                }
            }
        }
        highest
    }

    /// Read-modify-write increment of the durable attempt counter,
    /// honoring the attempt window. Not additionally locked: a small race
    /// window only affects a threshold comparison. Failures here are
    /// non-escalating and swallowed.
    pub async fn increment_durable(&self, user_id: &str) -> Option<u64> {
        let now = Utc::now();
        let record = match self.durable.security_record(user_id).await {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                warn!("Durable store unreachable reading attempt count: {}", e);
                return None;
            }
        };

        let window_live = record
            .attempt_window_expiry
            .map(|expiry| expiry > now)
            .unwrap_or(false);
        let attempts = if window_live { record.login_attempts + 1 } else { 1 };
        let expiry: DateTime<Utc> = if window_live {
            record.attempt_window_expiry.unwrap()
        } else {
            now + ChronoDuration::from_std(self.window).unwrap_or_else(|_| ChronoDuration::minutes(30))
        };

        if let Err(e) = self.durable.update_attempts(user_id, attempts, expiry).await {
            warn!("Durable store unreachable writing attempt count: {}", e);
            return None;
        }
        Some(attempts as u64)
    }

    /// Record one failure across both tiers.
    pub async fn record_attempt(
        &self,
        fast_keys: &[String],
        durable_id: Option<&str>,
    ) -> CounterSample {
        let fast = self.increment_fast(fast_keys).await;
        let durable = match durable_id {
            Some(user_id) => self.increment_durable(user_id).await,
            None => None,
        };
        CounterSample { fast, durable }
    }

    /// Best-effort removal of the fast counters.
    pub async fn clear_fast(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.fast.del(key).await {
                warn!("Fast store unavailable clearing counter {}: {}", key, e);
                return;
            }
        }
    }
}
