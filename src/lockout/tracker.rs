//! Lockout Tracker
//!
//! Login-attempt state machine. An identifier is locked iff a durable
//! lock-until timestamp is in the future or a fast-path lock marker
//! exists; attempt counts alone never gate access.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::LockoutConfig;
use crate::error::SecurityError;
use crate::lockout::counter::DualBackedCounter;
use crate::store::{AccountStore, FastStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockSource {
    Durable,
    FastPath,
    NotLocked,
}

#[derive(Debug, Clone, Serialize)]
pub struct LockStatus {
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
    pub source: LockSource,
}

impl LockStatus {
    fn unlocked() -> Self {
        Self {
            is_locked: false,
            locked_until: None,
            source: LockSource::NotLocked,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FailureOutcome {
    pub locked: bool,
    pub attempts_remaining: u32,
}

pub struct LockoutTracker {
    fast: Arc<dyn FastStore>,
    durable: Arc<dyn AccountStore>,
    counter: DualBackedCounter,
    config: LockoutConfig,
}

fn attempt_keys(user_id: Option<&str>, email: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(user_id) = user_id {
        keys.push(format!("lockout:attempts:user:{}", user_id));
    }
    keys.push(format!("lockout:attempts:email:{}", email.to_lowercase()));
    keys
}

fn lock_keys(user_id: Option<&str>, email: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(user_id) = user_id {
        keys.push(format!("lockout:lock:user:{}", user_id));
    }
    keys.push(format!("lockout:lock:email:{}", email.to_lowercase()));
    keys
}

impl LockoutTracker {
    pub fn new(
        fast: Arc<dyn FastStore>,
        durable: Arc<dyn AccountStore>,
        config: LockoutConfig,
    ) -> Self {
        let counter =
            DualBackedCounter::new(fast.clone(), durable.clone(), config.attempt_window());
        Self {
            fast,
            durable,
            counter,
            config,
        }
    }

    /// Record a failed login. Increments both tiers and escalates to a
    /// lock when the effective count reaches the threshold. A durable
    /// failure during the lock-establishing write is surfaced to the
    /// caller; silently dropping it would silently disable brute-force
    /// protection.
    pub async fn record_failure(
        &self,
        user_id: Option<&str>,
        email: &str,
        ip: &str,
        user_agent: &str,
    ) -> Result<FailureOutcome, SecurityError> {
        let attempt_keys = attempt_keys(user_id, email);
        let sample = self.counter.record_attempt(&attempt_keys, user_id).await;
        let effective = sample.effective();

        if effective < self.config.max_attempts as u64 {
            return Ok(FailureOutcome {
                locked: false,
                attempts_remaining: self.config.max_attempts - effective as u32,
            });
        }

        let lock_until = Utc::now()
            + ChronoDuration::from_std(self.config.lockout_duration())
                .unwrap_or_else(|_| ChronoDuration::minutes(30));

        warn!(
            user_id = user_id.unwrap_or("unknown"),
            email,
            ip,
            user_agent,
            attempts = effective,
            %lock_until,
            "Account lockout threshold reached"
        );

        // Fast-path marker first so protection holds even if the durable
        // write below fails.
        for key in lock_keys(user_id, email) {
            if let Err(e) = self
                .fast
                .set_with_ttl(&key, &lock_until.to_rfc3339(), self.config.lockout_duration())
                .await
            {
                warn!("Fast store unavailable setting lock marker: {}", e);
                break;
            }
        }
        self.counter.clear_fast(&attempt_keys).await;

        if let Some(user_id) = user_id {
            self.durable
                .establish_lock(user_id, lock_until, self.config.max_attempts)
                .await?;
        }

        Ok(FailureOutcome {
            locked: true,
            attempts_remaining: 0,
        })
    }

    /// Successful login: clear fast counters and markers plus the durable
    /// attempt state. An escalated durable lock is only cleared by time,
    /// never by a success while it is still active. Clearing is not a
    /// security-establishing write, so a durable hiccup degrades with a
    /// warning instead of failing the login.
    pub async fn record_success(&self, user_id: &str, email: &str) {
        let user = Some(user_id);
        self.counter.clear_fast(&attempt_keys(user, email)).await;
        for key in lock_keys(user, email) {
            if let Err(e) = self.fast.del(&key).await {
                warn!("Fast store unavailable clearing lock marker: {}", e);
                break;
            }
        }

        let lock_active = match self.durable.security_record(user_id).await {
            Ok(Some(record)) => record
                .lock_until
                .map(|until| until > Utc::now())
                .unwrap_or(false),
            Ok(None) => false,
            Err(e) => {
                warn!("Durable store unreachable clearing attempt state: {}", e);
                return;
            }
        };

        let result = if lock_active {
            // Reset the counter but leave lock_until untouched.
            self.durable.update_attempts(user_id, 0, Utc::now()).await
        } else {
            self.durable.clear_security_state(user_id).await
        };
        if let Err(e) = result {
            warn!("Durable store unreachable clearing attempt state: {}", e);
        }
    }

    /// Lock check on the synchronous login path. Durable first
    /// (authoritative), fast-path marker second, otherwise not locked.
    /// Store outages degrade rather than fail the request.
    pub async fn is_locked(&self, user_id: Option<&str>, email: &str) -> LockStatus {
        let now = Utc::now();

        if let Some(user_id) = user_id {
            match self.durable.security_record(user_id).await {
                Ok(Some(record)) => {
                    if let Some(lock_until) = record.lock_until {
                        if lock_until > now {
                            return LockStatus {
                                is_locked: true,
                                locked_until: Some(lock_until),
                                source: LockSource::Durable,
                            };
                        }
                        info!(user_id, "Durable lock expired, treating as unlocked");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        "Durable store unreachable during lock check, degrading to fast path: {}",
                        e
                    );
                }
            }
        }

        for key in lock_keys(user_id, email) {
            match self.fast.get(&key).await {
                Ok(Some(raw)) => {
                    let locked_until = DateTime::parse_from_rfc3339(&raw)
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc));
                    return LockStatus {
                        is_locked: true,
                        locked_until,
                        source: LockSource::FastPath,
                    };
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Fast store unavailable during lock check: {}", e);
                    break;
                }
            }
        }

        LockStatus::unlocked()
    }
}
