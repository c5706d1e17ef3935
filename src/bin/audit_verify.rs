use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, Command};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crm_security_core::audit::chain::list_segments_newest_first;
use crm_security_core::audit::verify_segment;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "audit_verify=info".into()),
        )
        .init();

    let matches = Command::new("audit-verify")
        .version("0.1.0")
        .about("Verify hash-chain integrity of audit log segments")
        .arg(
            Arg::new("segments")
                .value_name("SEGMENT")
                .help("Segment files to verify (.log or .log.gz)")
                .num_args(0..),
        )
        .arg(
            Arg::new("dir")
                .short('d')
                .long("dir")
                .value_name("DIR")
                .help("Verify every segment of a stream in this directory"),
        )
        .arg(
            Arg::new("stream")
                .short('s')
                .long("stream")
                .value_name("NAME")
                .default_value("audit")
                .help("Stream prefix used with --dir"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Suppress per-segment output"),
        )
        .get_matches();

    let quiet = matches.get_flag("quiet");

    let mut segments: Vec<PathBuf> = matches
        .get_many::<String>("segments")
        .map(|values| values.map(PathBuf::from).collect())
        .unwrap_or_default();

    if let Some(dir) = matches.get_one::<String>("dir") {
        let stream = matches.get_one::<String>("stream").unwrap();
        // Oldest first so the report reads in chain order.
        let mut listed = list_segments_newest_first(Path::new(dir), stream);
        listed.reverse();
        segments.extend(listed);
    }

    if segments.is_empty() {
        return Err(anyhow!("No segments given; pass paths or --dir"));
    }

    let mut failures = 0;
    for segment in &segments {
        if !segment.exists() {
            error!("Segment not found: {}", segment.display());
            failures += 1;
            continue;
        }
        match verify_segment(segment) {
            Ok(result) => {
                if !quiet {
                    println!("{}: {}", segment.display(), result.summary());
                }
                if !result.valid {
                    failures += 1;
                }
            }
            Err(e) => {
                error!("Failed to verify {}: {}", segment.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        error!("{} of {} segments failed verification", failures, segments.len());
        std::process::exit(1);
    }

    info!("All {} segments verified", segments.len());
    Ok(())
}
