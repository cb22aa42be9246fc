//! A status sink that keeps every status it receives.

use parking_lot::Mutex;
use wardsync_engine::{StatusSink, SyncStatus};

/// Records broadcast statuses in order.
#[derive(Debug, Default)]
pub struct StatusRecorder {
    statuses: Mutex<Vec<SyncStatus>>,
}

impl StatusRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn statuses(&self) -> Vec<SyncStatus> {
        self.statuses.lock().clone()
    }

    /// Recorded statuses rendered with `Display`, handy for assertions.
    pub fn rendered(&self) -> Vec<String> {
        self.statuses.lock().iter().map(ToString::to_string).collect()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.statuses.lock().clear();
    }
}

impl StatusSink for StatusRecorder {
    fn broadcast(&self, status: SyncStatus) {
        self.statuses.lock().push(status);
    }
}
