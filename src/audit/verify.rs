//! Audit Segment Verification
//!
//! Replays a persisted segment and confirms every hash and
//! previous-hash relationship, reporting the first break.

use std::path::Path;
use tracing::info;

use crate::audit::chain::read_segment_lines;
use crate::audit::entry::AuditEntry;
use crate::error::SecurityError;

#[derive(Debug, Clone)]
pub struct SegmentVerification {
    pub valid: bool,
    pub entries_checked: usize,
    pub first_break: Option<String>,
}

impl SegmentVerification {
    pub fn summary(&self) -> String {
        if self.valid {
            format!("valid ({} entries)", self.entries_checked)
        } else {
            format!(
                "INVALID after {} entries: {}",
                self.entries_checked,
                self.first_break.as_deref().unwrap_or("unknown break")
            )
        }
    }
}

/// Verify a slice of entries already in chain order. The first entry's
/// previous hash may point into an older segment, so only its self-hash
/// is checked; linkage is enforced from the second entry on.
pub fn verify_entries(entries: &[AuditEntry]) -> SegmentVerification {
    for (i, entry) in entries.iter().enumerate() {
        if !entry.verify_hash() {
            return SegmentVerification {
                valid: false,
                entries_checked: i,
                first_break: Some(format!(
                    "entry {} hash does not match its body (correlation {})",
                    i, entry.correlation_id
                )),
            };
        }

        if i > 0 && entry.previous_hash != entries[i - 1].hash {
            return SegmentVerification {
                valid: false,
                entries_checked: i,
                first_break: Some(format!(
                    "entry {} previousHash {} does not match entry {} hash {}",
                    i,
                    entry.previous_hash,
                    i - 1,
                    entries[i - 1].hash
                )),
            };
        }
    }

    SegmentVerification {
        valid: true,
        entries_checked: entries.len(),
        first_break: None,
    }
}

/// Load a segment (gzip-transparent) and verify it. An unparsable line is
/// a break, not an error.
pub fn verify_segment(path: &Path) -> Result<SegmentVerification, SecurityError> {
    let lines = read_segment_lines(path).map_err(|e| {
        SecurityError::ChainRecoveryError(format!("Failed to read segment {:?}: {}", path, e))
    })?;

    let mut entries = Vec::new();
    for (line_num, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<AuditEntry>(trimmed) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                return Ok(SegmentVerification {
                    valid: false,
                    entries_checked: entries.len(),
                    first_break: Some(format!("unparsable line {}: {}", line_num + 1, e)),
                });
            }
        }
    }

    let result = verify_entries(&entries);
    info!("Verified segment {:?}: {}", path, result.summary());
    Ok(result)
}
