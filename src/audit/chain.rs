//! Chain State Recovery
//!
//! The single mutable "last hash" pointer and its recovery from rotated,
//! possibly gzip-compressed audit segments after a restart.

use flate2::read::GzDecoder;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::audit::entry::genesis_hash;

/// Last hash of the chain plus where it was recovered from. Exactly one
/// per writer process; mutated only inside the trail's critical section.
#[derive(Debug, Clone)]
pub struct ChainState {
    pub last_hash: String,
    pub source: String,
}

impl ChainState {
    pub fn genesis() -> Self {
        Self {
            last_hash: genesis_hash(),
            source: "GENESIS".to_string(),
        }
    }
}

/// Read every line of a segment, decompressing transparently when the
/// filename ends in `.gz`.
pub(crate) fn read_segment_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    BufReader::new(reader).lines().collect()
}

/// Whether a directory entry is a segment of the given stream, rotated or
/// current (`<stream>-YYYY-MM-DD.log` or `.log.gz`).
fn is_stream_segment(path: &Path, stream: &str) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    name.starts_with(&format!("{}-", stream))
        && (name.ends_with(".log") || name.ends_with(".log.gz"))
}

/// List a stream's segments sorted newest-first by modification time.
pub fn list_segments_newest_first(dir: &Path, stream: &str) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Audit directory {:?} not readable: {}", dir, e);
            return Vec::new();
        }
    };

    let mut segments: Vec<(PathBuf, SystemTime)> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| is_stream_segment(p, stream))
        .filter_map(|p| {
            let mtime = p.metadata().and_then(|m| m.modified()).ok()?;
            Some((p, mtime))
        })
        .collect();

    segments.sort_by(|a, b| b.1.cmp(&a.1));
    segments.into_iter().map(|(p, _)| p).collect()
}

/// Extract the last usable `hash` field from a segment, walking backwards
/// over empty, truncated, or corrupt trailing lines.
fn last_hash_in_segment(path: &Path) -> Option<String> {
    let lines = match read_segment_lines(path) {
        Ok(lines) => lines,
        Err(e) => {
            warn!("Skipping unreadable audit segment {:?}: {}", path, e);
            return None;
        }
    };

    for line in lines.iter().rev() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => {
                if let Some(hash) = value.get("hash").and_then(|h| h.as_str()) {
                    return Some(hash.to_string());
                }
                debug!("Audit line without hash field in {:?}, trying previous", path);
            }
            Err(e) => {
                debug!("Corrupt audit line in {:?}: {}, trying previous", path, e);
            }
        }
    }
    None
}

/// Recover the chain state from persisted segments. Never fails: a
/// recovery problem falls through to older segments and ultimately to
/// GENESIS.
pub fn recover_chain_state(dir: &Path, stream: &str) -> ChainState {
    for segment in list_segments_newest_first(dir, stream) {
        if let Some(last_hash) = last_hash_in_segment(&segment) {
            let source = segment
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| segment.display().to_string());
            info!("Recovered audit chain from {} (last hash {})", source, last_hash);
            return ChainState { last_hash, source };
        }
    }

    info!("No usable audit segments found, starting chain from GENESIS");
    ChainState::genesis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_plain(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn write_gzip(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(contents.as_bytes()).unwrap();
        encoder.finish().unwrap();
        path
    }

    #[test]
    fn test_empty_directory_recovers_genesis() {
        let dir = tempdir().unwrap();
        let state = recover_chain_state(dir.path(), "audit");
        assert_eq!(state.last_hash, genesis_hash());
        assert_eq!(state.source, "GENESIS");
    }

    #[test]
    fn test_recovers_last_hash_from_plain_segment() {
        let dir = tempdir().unwrap();
        write_plain(
            dir.path(),
            "audit-2026-08-29.log",
            "{\"hash\":\"aaa\"}\n{\"hash\":\"bbb\"}\n",
        );
        let state = recover_chain_state(dir.path(), "audit");
        assert_eq!(state.last_hash, "bbb");
    }

    #[test]
    fn test_recovers_from_gzip_segment() {
        let dir = tempdir().unwrap();
        write_gzip(
            dir.path(),
            "audit-2026-08-28.log.gz",
            "{\"hash\":\"ccc\"}\n",
        );
        let state = recover_chain_state(dir.path(), "audit");
        assert_eq!(state.last_hash, "ccc");
        assert_eq!(state.source, "audit-2026-08-28.log.gz");
    }

    #[test]
    fn test_skips_corrupt_trailing_line() {
        let dir = tempdir().unwrap();
        write_plain(
            dir.path(),
            "audit-2026-08-29.log",
            "{\"hash\":\"good\"}\n{\"hash\":\"trunc",
        );
        let state = recover_chain_state(dir.path(), "audit");
        assert_eq!(state.last_hash, "good");
    }

    #[test]
    fn test_falls_through_unusable_newest_segment() {
        let dir = tempdir().unwrap();
        let older = write_plain(dir.path(), "audit-2026-08-28.log", "{\"hash\":\"older\"}\n");
        let newer = write_plain(dir.path(), "audit-2026-08-29.log", "not json at all\n");
        // Force mtime ordering: the corrupt segment must sort newest.
        let past = SystemTime::now() - std::time::Duration::from_secs(3600);
        std::fs::OpenOptions::new()
            .append(true)
            .open(&older)
            .unwrap()
            .set_modified(past)
            .unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&newer)
            .unwrap()
            .set_modified(SystemTime::now())
            .unwrap();

        let state = recover_chain_state(dir.path(), "audit");
        assert_eq!(state.last_hash, "older");
    }

    #[test]
    fn test_other_streams_are_ignored() {
        let dir = tempdir().unwrap();
        write_plain(dir.path(), "security-2026-08-29.log", "{\"hash\":\"sec\"}\n");
        write_plain(dir.path(), "app-2026-08-29.log", "{\"hash\":\"app\"}\n");
        let state = recover_chain_state(dir.path(), "audit");
        assert_eq!(state.last_hash, genesis_hash());
    }
}
