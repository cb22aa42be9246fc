//! Inspect command implementation.

use super::{format_millis, load_store};
use serde::Serialize;
use std::path::Path;
use wardsync_engine::bookkeeping;
use wardsync_engine::FullSyncTimes;
use wardsync_store::{MemoryStore, Table};

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Row count per table, including empty ones.
    pub tables: Vec<TableStats>,
    /// Recorded full-sync times.
    pub full_sync: FullSyncTimes,
    /// Whether a full sync has completed.
    pub full_sync_completed: bool,
    /// Observation feed position.
    pub observations_bookmark: Option<String>,
}

/// Statistics for a single table.
#[derive(Debug, Serialize)]
pub struct TableStats {
    /// Table name.
    pub name: &'static str,
    /// Number of rows.
    pub rows: usize,
}

/// Collects the inspection result for a loaded store.
pub fn inspect(path: &Path, store: &MemoryStore) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let full_sync = bookkeeping::full_sync_times(store)?;
    Ok(InspectResult {
        path: path.display().to_string(),
        tables: Table::ALL
            .iter()
            .map(|table| TableStats {
                name: table.name(),
                rows: store.count(*table),
            })
            .collect(),
        full_sync,
        full_sync_completed: full_sync.end_millis.is_some(),
        observations_bookmark: bookkeeping::bookmark(store, Table::Observations)?,
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {:?}", path).into());
    }
    let store = load_store(path)?;
    let result = inspect(path, &store)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Wardsync Store Inspection");
    println!("=========================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Tables:");
    for table in &result.tables {
        println!("  {:<16} {}", table.name, table.rows);
    }
    println!();
    println!("Full sync:");
    println!("  Started:   {}", format_millis(result.full_sync.start_millis));
    println!("  Completed: {}", format_millis(result.full_sync.end_millis));
    println!();
    println!(
        "Observation bookmark: {}",
        result.observations_bookmark.as_deref().unwrap_or("-")
    );
}
