//! Watch command implementation.

use super::{load_store, request_for, save_store};
use crate::remote::FileRemote;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wardsync_engine::{StatusBroadcaster, SyncConfig, SyncEngine, SyncRunner, SyncScheduler};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
const POLL: Duration = Duration::from_millis(100);

/// Runs the watch command: one sync now, then one per interval.
///
/// The store file is saved after every sync that finished without error.
pub fn run(
    store_path: &Path,
    remote_path: &Path,
    phases: Option<&str>,
    interval: Option<u64>,
    count: Option<u64>,
    config: SyncConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let interval = interval
        .map(Duration::from_secs)
        .or(config.periodic_interval)
        .unwrap_or(DEFAULT_INTERVAL);
    let count = count.unwrap_or(u64::MAX);

    let store = Arc::new(load_store(store_path)?);
    let remote = Arc::new(FileRemote::open(remote_path)?);
    let engine = Arc::new(
        SyncEngine::new(store.clone(), remote, Arc::new(StatusBroadcaster::new()))
            .with_config(config),
    );
    let runner = SyncRunner::start(engine)?;
    let request = request_for(phases);

    tracing::info!(%request, ?interval, "watching");
    runner.request_sync(request.clone());
    SyncScheduler::set_periodic_sync(&runner, interval, request.clone());

    let mut saved = 0;
    while saved < count {
        std::thread::sleep(POLL);
        let run = runner.syncs_run();
        if run == saved {
            continue;
        }
        saved = run;
        match runner.last_report() {
            Some(report) if report.has_error() => {
                tracing::warn!(syncs = run, "sync failed; store not saved");
            }
            Some(report) => {
                save_store(&store, store_path)?;
                println!(
                    "sync {run}: {} inserts, {} updates, {} deletes",
                    report.num_inserts, report.num_updates, report.num_deletes
                );
            }
            None => {}
        }
    }

    SyncScheduler::set_periodic_sync(&runner, Duration::ZERO, request);
    runner.shutdown();
    Ok(())
}
