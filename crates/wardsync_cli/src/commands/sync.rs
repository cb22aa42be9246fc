//! Sync command implementation.

use super::{load_store, request_for, save_store, CliError};
use crate::remote::FileRemote;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use wardsync_engine::{
    HealthFlag, StatusBroadcaster, SyncConfig, SyncEngine, SyncOutcome, SyncReport, SyncStatus,
};

/// Result of one CLI sync.
#[derive(Debug, Serialize)]
pub struct SyncSummary {
    /// Phases requested.
    pub request: String,
    /// How the sync ended.
    pub outcome: SyncOutcome,
    /// Counters and error flags.
    pub report: SyncReport,
    /// Every status broadcast, in order.
    pub statuses: Vec<SyncStatus>,
}

/// Runs the sync command.
pub fn run(
    store_path: &Path,
    remote_path: &Path,
    phases: Option<&str>,
    offline: bool,
    config: SyncConfig,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(load_store(store_path)?);
    let remote = Arc::new(FileRemote::open(remote_path)?);
    let broadcaster = Arc::new(StatusBroadcaster::new());
    let statuses = broadcaster.subscribe();
    let health = Arc::new(HealthFlag::new());
    health.set_unavailable(offline);

    let engine = SyncEngine::new(store.clone(), remote, broadcaster)
        .with_health(health)
        .with_config(config);

    let request = request_for(phases);
    let mut report = SyncReport::new();
    let outcome = engine.sync(&request, &mut report);

    if outcome == SyncOutcome::Completed {
        save_store(&store, store_path)?;
    }

    let summary = SyncSummary {
        request: request.to_string(),
        outcome,
        report,
        statuses: statuses.try_iter().collect(),
    };
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => print_text_output(&summary),
    }

    if outcome != SyncOutcome::Completed {
        return Err(CliError::SyncFailed(outcome.to_string().to_lowercase()).into());
    }
    Ok(())
}

fn print_text_output(summary: &SyncSummary) {
    println!("Wardsync");
    println!("========");
    println!();
    println!("Request: {}", summary.request);
    for status in &summary.statuses {
        println!("  {status}");
    }
    println!();
    let report = &summary.report;
    println!("Outcome: {}", summary.outcome);
    println!("  Entries examined: {}", report.num_entries);
    println!("  Inserts:          {}", report.num_inserts);
    println!("  Updates:          {}", report.num_updates);
    println!("  Deletes:          {}", report.num_deletes);
    println!("  Skipped:          {}", report.num_skipped);
    if report.database_error {
        println!("  Database error:   yes");
    }
    if report.num_io_exceptions > 0 {
        println!("  I/O errors:       {}", report.num_io_exceptions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wardsync_store::Table;

    const REMOTE: &str = r#"{
        "users": [{"uuid": "u1", "full_name": "Ana Nurse"}],
        "patients": [{"uuid": "p1", "given_name": "Jane"}]
    }"#;

    #[test]
    fn completed_sync_saves_store() {
        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("store.json");
        let remote_path = dir.path().join("remote.json");
        std::fs::write(&remote_path, REMOTE).unwrap();

        run(&store_path, &remote_path, None, false, SyncConfig::default(), "json").unwrap();

        let store = load_store(&store_path).unwrap();
        assert_eq!(store.count(Table::Users), 1);
        assert_eq!(store.count(Table::Patients), 1);
    }

    #[test]
    fn offline_sync_fails_without_writing() {
        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("store.json");
        let remote_path = dir.path().join("remote.json");
        std::fs::write(&remote_path, REMOTE).unwrap();

        let err = run(&store_path, &remote_path, None, true, SyncConfig::default(), "text")
            .unwrap_err();
        assert_eq!(err.to_string(), "sync failed");
        assert!(!store_path.exists());
    }
}
