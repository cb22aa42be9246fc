//! Configuration for the sync engine.

use serde::Deserialize;
use std::time::Duration;

/// Default savepoint name used for the sync transaction.
pub const DEFAULT_SAVEPOINT_NAME: &str = "SYNC_SAVEPOINT";

/// Configuration for sync operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Name of the savepoint each sync runs inside.
    pub savepoint_name: String,
    /// Interval for automatic full syncs, if any.
    pub periodic_interval: Option<Duration>,
    /// Upper bound on observation feed pages fetched in one phase.
    pub max_observation_pages: u32,
}

impl SyncConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            savepoint_name: DEFAULT_SAVEPOINT_NAME.to_owned(),
            periodic_interval: None,
            max_observation_pages: 1000,
        }
    }

    /// Sets the savepoint name.
    pub fn with_savepoint_name(mut self, name: impl Into<String>) -> Self {
        self.savepoint_name = name.into();
        self
    }

    /// Sets the interval for automatic full syncs.
    pub fn with_periodic_interval(mut self, interval: Duration) -> Self {
        self.periodic_interval = Some(interval).filter(|d| !d.is_zero());
        self
    }

    /// Sets the observation page bound.
    pub fn with_max_observation_pages(mut self, pages: u32) -> Self {
        self.max_observation_pages = pages.max(1);
        self
    }

    /// Parses a JSON configuration; absent fields keep their defaults.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use wardsync_engine::SyncConfig;
    ///
    /// let config = SyncConfig::from_json(r#"{"periodic_interval_secs": 300}"#).unwrap();
    /// assert_eq!(config.periodic_interval, Some(Duration::from_secs(300)));
    /// ```
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: ConfigFile = serde_json::from_str(json)?;
        let mut config = Self::new();
        if let Some(name) = file.savepoint_name {
            config = config.with_savepoint_name(name);
        }
        if let Some(secs) = file.periodic_interval_secs {
            config = config.with_periodic_interval(Duration::from_secs(secs));
        }
        if let Some(pages) = file.max_observation_pages {
            config = config.with_max_observation_pages(pages);
        }
        Ok(config)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    savepoint_name: Option<String>,
    periodic_interval_secs: Option<u64>,
    max_observation_pages: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new()
            .with_savepoint_name("NIGHTLY")
            .with_periodic_interval(Duration::from_secs(60))
            .with_max_observation_pages(5);

        assert_eq!(config.savepoint_name, "NIGHTLY");
        assert_eq!(config.periodic_interval, Some(Duration::from_secs(60)));
        assert_eq!(config.max_observation_pages, 5);
    }

    #[test]
    fn zero_interval_disables_periodic_sync() {
        let config = SyncConfig::new().with_periodic_interval(Duration::ZERO);
        assert_eq!(config.periodic_interval, None);
    }

    #[test]
    fn json_defaults() {
        let config = SyncConfig::from_json("{}").unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.savepoint_name, DEFAULT_SAVEPOINT_NAME);
    }

    #[test]
    fn json_rejects_unknown_fields() {
        assert!(SyncConfig::from_json(r#"{"period": 5}"#).is_err());
    }
}
