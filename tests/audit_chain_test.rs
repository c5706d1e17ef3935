mod common;

use common::{login_request, response, trail_in};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

use crm_security_core::audit::{genesis_hash, verify_segment, AuditEntry};

fn today_segment(dir: &Path) -> std::path::PathBuf {
    let date = chrono::Utc::now().format("%Y-%m-%d");
    dir.join(format!("audit-{}.log", date))
}

fn segment_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| l.to_string())
        .collect()
}

fn write_gzip_with_mtime(path: &Path, lines: &[String], age: Duration) {
    let file = File::create(path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    for line in lines {
        writeln!(encoder, "{}", line).unwrap();
    }
    encoder.finish().unwrap();
    std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() - age)
        .unwrap();
}

#[tokio::test]
async fn test_fresh_process_chains_from_genesis() {
    let dir = tempdir().unwrap();
    let trail = trail_in(dir.path());

    let first = trail.record(login_request(json!({})), response(200), None).await;
    assert_eq!(first.previous_hash, genesis_hash());

    let second = trail.record(login_request(json!({})), response(200), None).await;
    assert_eq!(second.previous_hash, first.hash);
}

#[tokio::test]
async fn test_persisted_segment_verifies_end_to_end() {
    let dir = tempdir().unwrap();
    let trail = trail_in(dir.path());

    for i in 0..5 {
        trail
            .record(
                common::api_request("PUT", &format!("/api/deals/{}", i), json!({"stage": "offer"})),
                response(200),
                None,
            )
            .await;
    }

    let result = verify_segment(&today_segment(dir.path())).unwrap();
    assert!(result.valid, "{:?}", result.first_break);
    assert_eq!(result.entries_checked, 5);
}

#[tokio::test]
async fn test_tampered_segment_fails_verification() {
    let dir = tempdir().unwrap();
    let trail = trail_in(dir.path());

    for _ in 0..3 {
        trail.record(login_request(json!({})), response(401), None).await;
    }

    let path = today_segment(dir.path());
    let mut lines = segment_lines(&path);
    // Rewrite the middle entry's response status in place.
    let mut entry: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
    entry["response"]["statusCode"] = json!(200);
    lines[1] = entry.to_string();
    std::fs::write(&path, lines.join("\n")).unwrap();

    let result = verify_segment(&path).unwrap();
    assert!(!result.valid);
}

#[tokio::test]
async fn test_restart_recovers_last_hash_across_gzipped_segments() {
    let dir = tempdir().unwrap();

    // Write three entries, then rebuild the directory as two rotated
    // segments: the first two entries gzip-compressed and older, the
    // third in a newer plain segment.
    let trail = trail_in(dir.path());
    let mut last_hash = String::new();
    for _ in 0..3 {
        let entry = trail.record(login_request(json!({})), response(200), None).await;
        last_hash = entry.hash.clone();
    }
    drop(trail);

    let current = today_segment(dir.path());
    let lines = segment_lines(&current);
    std::fs::remove_file(&current).unwrap();

    write_gzip_with_mtime(
        &dir.path().join("audit-2026-08-20.log.gz"),
        &lines[..2].to_vec(),
        Duration::from_secs(7200),
    );
    let newer = dir.path().join("audit-2026-08-21.log");
    std::fs::write(&newer, format!("{}\n", lines[2])).unwrap();

    let restarted = trail_in(dir.path());
    assert_eq!(restarted.last_hash().await, last_hash);

    // The next entry continues the recovered chain.
    let next = restarted.record(login_request(json!({})), response(200), None).await;
    assert_eq!(next.previous_hash, last_hash);
}

#[tokio::test]
async fn test_recovery_skips_partially_written_trailing_line() {
    let dir = tempdir().unwrap();
    let trail = trail_in(dir.path());
    let entry = trail.record(login_request(json!({})), response(200), None).await;
    drop(trail);

    // Simulate a crash mid-write: a truncated line at the end of the
    // segment.
    let path = today_segment(dir.path());
    let mut contents = std::fs::read_to_string(&path).unwrap();
    contents.push_str("{\"correlationId\":\"trunc");
    std::fs::write(&path, contents).unwrap();

    let restarted = trail_in(dir.path());
    assert_eq!(restarted.last_hash().await, entry.hash);
}

#[tokio::test]
async fn test_raw_secret_never_reaches_disk() {
    let dir = tempdir().unwrap();
    let trail = trail_in(dir.path());

    trail
        .record(
            login_request(json!({
                "email": "agent@example.com",
                "password": "hunter2-raw",
                "profile": {"nested": {"mfaSecret": "JBSWY3DP"}}
            })),
            response(401),
            None,
        )
        .await;

    let contents = std::fs::read_to_string(today_segment(dir.path())).unwrap();
    assert!(!contents.contains("hunter2-raw"));
    assert!(!contents.contains("JBSWY3DP"));
    assert!(contents.contains("[REDACTED]"));

    // The redacted persisted entry still reproduces its own hash.
    let entry: AuditEntry = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
    assert!(entry.verify_hash());
}

#[tokio::test]
async fn test_login_also_lands_on_security_stream() {
    let dir = tempdir().unwrap();
    let trail = trail_in(dir.path());
    trail.record(login_request(json!({})), response(200), None).await;

    let date = chrono::Utc::now().format("%Y-%m-%d");
    let security = dir.path().join(format!("security-{}.log", date));
    let contents = std::fs::read_to_string(security).unwrap();
    assert!(contents.contains("USER_LOGIN"));
}
