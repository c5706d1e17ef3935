use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::SecurityError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub audit: AuditConfig,
    pub lockout: LockoutConfig,
    pub dedup: DedupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Directory holding the date-stamped audit segments.
    pub log_dir: String,
    /// Filename prefix of the chained stream, e.g. `audit` for
    /// `audit-2026-08-30.log`.
    pub stream: String,
    /// Filename prefix of the non-chained security-event stream.
    pub security_stream: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutConfig {
    pub max_attempts: u32,
    pub attempt_window_secs: u64,
    pub lockout_duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    pub window_ms: u64,
    pub max_entries: usize,
    pub sweep_horizon_secs: u64,
    /// Development/test escape hatch: when set the guard accepts everything.
    pub bypass: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            stream: "audit".to_string(),
            security_stream: "security".to_string(),
        }
    }
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_window_secs: 30 * 60,
            lockout_duration_secs: 30 * 60,
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_ms: 2_000,
            max_entries: 10_000,
            sweep_horizon_secs: 60,
            bypass: false,
        }
    }
}

impl LockoutConfig {
    pub fn attempt_window(&self) -> Duration {
        Duration::from_secs(self.attempt_window_secs)
    }

    pub fn lockout_duration(&self) -> Duration {
        Duration::from_secs(self.lockout_duration_secs)
    }
}

impl DedupConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn sweep_horizon(&self) -> Duration {
        Duration::from_secs(self.sweep_horizon_secs)
    }
}

impl SecurityConfig {
    pub fn load() -> Result<Self, SecurityError> {
        let audit = AuditConfig {
            log_dir: env::var("AUDIT_LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            ..AuditConfig::default()
        };

        let lockout = LockoutConfig {
            max_attempts: parse_env("MAX_LOGIN_ATTEMPTS", 5)?,
            attempt_window_secs: parse_env("LOGIN_ATTEMPT_WINDOW_SECS", 30 * 60)?,
            lockout_duration_secs: parse_env("LOCKOUT_DURATION_SECS", 30 * 60)?,
        };

        let dedup = DedupConfig {
            window_ms: parse_env("DUPLICATE_WINDOW_MS", 2_000)?,
            max_entries: parse_env("DUPLICATE_MAX_ENTRIES", 10_000)?,
            sweep_horizon_secs: parse_env("DUPLICATE_SWEEP_HORIZON_SECS", 60)?,
            bypass: env::var("DUPLICATE_GUARD_BYPASS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        };

        Ok(SecurityConfig {
            audit,
            lockout,
            dedup,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, SecurityError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| SecurityError::ConfigError(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            audit: AuditConfig::default(),
            lockout: LockoutConfig::default(),
            dedup: DedupConfig::default(),
        }
    }
}
