use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecurityError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Chain recovery error: {0}")]
    ChainRecoveryError(String),

    #[error("Fast store unavailable: {0}")]
    FastStoreUnavailable(String),

    #[error("Durable store error: {0}")]
    DurableStoreError(String),

    #[error("Sanitization error: {0}")]
    SanitizationError(String),

    #[error("Audit persistence error: {0}")]
    AuditPersistError(String),
}

impl From<sqlx::Error> for SecurityError {
    fn from(err: sqlx::Error) -> Self {
        Self::DurableStoreError(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for SecurityError {
    fn from(err: serde_json::Error) -> Self {
        Self::SanitizationError(format!("JSON serialization error: {}", err))
    }
}

impl From<std::io::Error> for SecurityError {
    fn from(err: std::io::Error) -> Self {
        Self::AuditPersistError(format!("I/O error: {}", err))
    }
}
