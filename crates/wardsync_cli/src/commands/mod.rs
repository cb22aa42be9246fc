//! CLI command implementations.

pub mod inspect;
pub mod sync;
pub mod watch;

use std::path::{Path, PathBuf};
use thiserror::Error;
use wardsync_engine::{SyncConfig, SyncRequest};
use wardsync_store::{MemoryStore, StoreError};

/// Errors surfaced by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// A file could not be read.
    #[error("cannot read {path:?}: {source}")]
    Read {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The configuration file is not valid.
    #[error("invalid config {path:?}: {source}")]
    Config {
        /// The file.
        path: PathBuf,
        /// The parse error.
        source: serde_json::Error,
    },

    /// The store file could not be loaded or saved.
    #[error("store {path:?}: {source}")]
    Store {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: StoreError,
    },

    /// A sync did not complete.
    #[error("sync {0}")]
    SyncFailed(String),
}

/// Loads the engine configuration, or the defaults if no file was given.
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig, CliError> {
    let Some(path) = path else {
        return Ok(SyncConfig::default());
    };
    let json = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_owned(),
        source,
    })?;
    SyncConfig::from_json(&json).map_err(|source| CliError::Config {
        path: path.to_owned(),
        source,
    })
}

/// Loads the store file; a missing file yields an empty store.
pub fn load_store(path: &Path) -> Result<MemoryStore, CliError> {
    MemoryStore::load(path).map_err(|source| CliError::Store {
        path: path.to_owned(),
        source,
    })
}

/// Saves the store file.
pub fn save_store(store: &MemoryStore, path: &Path) -> Result<(), CliError> {
    store.save(path).map_err(|source| CliError::Store {
        path: path.to_owned(),
        source,
    })
}

/// Builds a request from an optional phase list; none means a full sync.
pub fn request_for(phases: Option<&str>) -> SyncRequest {
    match phases {
        Some(names) => SyncRequest::from_phase_names(names),
        None => SyncRequest::full(),
    }
}

/// Renders epoch millis as RFC 3339, or `-` if unset.
pub fn format_millis(millis: Option<i64>) -> String {
    millis
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wardsync_engine::Phase;

    #[test]
    fn missing_config_uses_defaults() {
        assert_eq!(load_config(None).unwrap(), SyncConfig::default());
    }

    #[test]
    fn config_file_is_parsed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"savepoint_name": "CLI_SYNC"}"#).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().savepoint_name, "CLI_SYNC");

        std::fs::write(&path, r#"{"no_such_field": 1}"#).unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(CliError::Config { .. })
        ));
    }

    #[test]
    fn phases_default_to_full_sync() {
        assert!(request_for(None).is_full_sync());
        assert_eq!(
            request_for(Some("PATIENTS")).resolved_phases(),
            vec![Phase::Patients]
        );
    }

    #[test]
    fn millis_formatting() {
        assert_eq!(format_millis(None), "-");
        assert_eq!(format_millis(Some(0)), "1970-01-01T00:00:00+00:00");
    }
}
