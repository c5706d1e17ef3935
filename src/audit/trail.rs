//! Hash Chain Audit Trail
//!
//! Owns the chain state and the record pipeline: sanitize, assemble,
//! hash, chain, persist. Chain extension runs inside one critical
//! section so two requests finishing together can never fork the chain
//! by reading the same last hash.

use chrono::Utc;
use serde_json::{json, Value};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit::chain::{recover_chain_state, ChainState};
use crate::audit::entry::{Actor, AuditEntry, RequestSnapshot, ResponseSnapshot};
use crate::classify::{SecurityEventClassifier, Severity};
use crate::config::AuditConfig;
use crate::error::SecurityError;
use crate::sanitize::Sanitizer;

/// Append-only log sink. Rotation, compression, and retention are owned
/// by the logging infrastructure, not by this crate.
pub trait AuditSink: Send + Sync {
    fn write(&self, stream: &str, severity: Severity, line: &str) -> Result<(), SecurityError>;
}

/// File sink appending to one date-stamped segment per stream per day
/// (`<dir>/<stream>-YYYY-MM-DD.log`).
pub struct FileAuditSink {
    dir: PathBuf,
}

impl FileAuditSink {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, SecurityError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| SecurityError::AuditPersistError(format!(
                "Failed to create log directory {:?}: {}",
                dir, e
            )))?;
        Ok(Self { dir })
    }

    fn segment_path(&self, stream: &str) -> PathBuf {
        let date = Utc::now().format("%Y-%m-%d");
        self.dir.join(format!("{}-{}.log", stream, date))
    }
}

impl AuditSink for FileAuditSink {
    fn write(&self, stream: &str, _severity: Severity, line: &str) -> Result<(), SecurityError> {
        let path = self.segment_path(stream);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SecurityError::AuditPersistError(format!(
                "Failed to open segment {:?}: {}",
                path, e
            )))?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}

pub struct HashChainAuditTrail {
    config: AuditConfig,
    chain: Mutex<ChainState>,
    sink: Arc<dyn AuditSink>,
    sanitizer: Sanitizer,
    classifier: SecurityEventClassifier,
}

impl HashChainAuditTrail {
    /// One-time startup recovery of the chain state from persisted
    /// segments. Recovery itself never fails; corrupt or missing segments
    /// fall back to GENESIS.
    pub fn initialize(config: AuditConfig, sink: Arc<dyn AuditSink>) -> Self {
        let state = recover_chain_state(Path::new(&config.log_dir), &config.stream);
        info!(
            source = %state.source,
            last_hash = %state.last_hash,
            "Audit chain initialized"
        );
        Self {
            config,
            chain: Mutex::new(state),
            sink,
            sanitizer: Sanitizer::new(),
            classifier: SecurityEventClassifier::new(),
        }
    }

    pub async fn last_hash(&self) -> String {
        self.chain.lock().await.last_hash.clone()
    }

    /// Classify the request and record it. This is the path the response
    /// hook uses.
    pub async fn record(
        &self,
        request: RequestSnapshot,
        response: ResponseSnapshot,
        actor: Option<Actor>,
    ) -> AuditEntry {
        let event_type = self
            .classifier
            .event_type(&request.method, &request.path)
            .to_string();
        self.record_event(&event_type, request, response, actor).await
    }

    /// Record with an explicit event type. Sanitizes strictly before
    /// hashing, extends the chain under the mutex, and persists. Sink
    /// failures are logged and swallowed; the caller always gets the
    /// entry back.
    pub async fn record_event(
        &self,
        event_type: &str,
        mut request: RequestSnapshot,
        response: ResponseSnapshot,
        actor: Option<Actor>,
    ) -> AuditEntry {
        request.body = self.sanitizer.redact_serializable(&request.body);
        request.query = self.sanitizer.redact_serializable(&request.query);

        let severity = self.classifier.severity(event_type, response.status_code);

        let mut entry = AuditEntry {
            correlation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            user: actor,
            request,
            response,
            hash: String::new(),
            previous_hash: String::new(),
        };

        // Critical section: read last_hash, hash, advance, persist. The
        // sink write stays inside so segment order matches chain order.
        {
            let mut chain = self.chain.lock().await;
            entry.previous_hash = chain.last_hash.clone();
            match entry.compute_hash() {
                Ok(hash) => entry.hash = hash,
                Err(e) => {
                    // Unhashable entries must not fork the chain; keep
                    // last_hash untouched and record the failure only.
                    error!("Failed to hash audit entry: {}", e);
                    return entry;
                }
            }
            chain.last_hash = entry.hash.clone();

            match serde_json::to_string(&entry) {
                Ok(line) => {
                    if let Err(e) = self.sink.write(&self.config.stream, severity, &line) {
                        error!("Failed to persist audit entry: {}", e);
                    }
                }
                Err(e) => error!("Failed to serialize audit entry: {}", e),
            }
        }

        self.emit_log_event(&entry, severity);

        if self.classifier.is_high_value(&entry.event_type) {
            self.emit_security_event(&entry);
        }

        entry
    }

    fn emit_log_event(&self, entry: &AuditEntry, severity: Severity) {
        match severity {
            Severity::Error => error!(
                event_type = %entry.event_type,
                correlation_id = %entry.correlation_id,
                status = entry.response.status_code,
                "audit event"
            ),
            Severity::Warn => warn!(
                event_type = %entry.event_type,
                correlation_id = %entry.correlation_id,
                status = entry.response.status_code,
                "audit event"
            ),
            Severity::Info => info!(
                event_type = %entry.event_type,
                correlation_id = %entry.correlation_id,
                status = entry.response.status_code,
                "audit event"
            ),
        }
    }

    /// Parallel, non-chained record for the alerting pipeline. High-value
    /// events only.
    fn emit_security_event(&self, entry: &AuditEntry) {
        let record: Value = json!({
            "correlationId": entry.correlation_id,
            "timestamp": entry.timestamp,
            "eventType": entry.event_type,
            "user": entry.user,
            "ip": entry.request.ip,
            "path": entry.request.path,
            "statusCode": entry.response.status_code,
        });
        if let Err(e) = self
            .sink
            .write(&self.config.security_stream, Severity::Warn, &record.to_string())
        {
            error!("Failed to persist security event: {}", e);
        }
    }
}
