//! Per-sync statistics.

use serde::Serialize;

/// Statistics and error flags accumulated by one sync.
///
/// Phase workers add to the counters in place. The caller inspects the
/// report after [`crate::SyncEngine::sync`] returns to decide whether the
/// sync partially succeeded; the counters describe the operations that were
/// computed, even if the transaction was later rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Local rows examined.
    pub num_entries: u64,
    /// Rows inserted.
    pub num_inserts: u64,
    /// Rows updated.
    pub num_updates: u64,
    /// Rows deleted.
    pub num_deletes: u64,
    /// Remote records skipped as unusable.
    pub num_skipped: u64,
    /// Set when a batch could not be applied to the local store.
    pub database_error: bool,
    /// Number of I/O-class failures (remote fetches, savepoint errors).
    pub num_io_exceptions: u64,
}

impl SyncReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if any failure was recorded.
    pub fn has_error(&self) -> bool {
        self.database_error || self.num_io_exceptions > 0
    }

    /// Total rows changed.
    pub fn num_changes(&self) -> u64 {
        self.num_inserts + self.num_updates + self.num_deletes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_report_has_no_error() {
        let report = SyncReport::new();
        assert!(!report.has_error());
        assert_eq!(report.num_changes(), 0);
    }

    #[test]
    fn error_flags() {
        let mut report = SyncReport::new();
        report.num_io_exceptions += 1;
        assert!(report.has_error());

        let report = SyncReport {
            database_error: true,
            ..SyncReport::default()
        };
        assert!(report.has_error());
    }
}
