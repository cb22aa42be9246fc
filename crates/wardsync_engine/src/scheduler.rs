//! The scheduling surface used by the rest of an application.

use crate::request::{Phase, SyncRequest};
use crate::runner::SyncRunner;
use std::time::Duration;

/// Starts, stops, and schedules syncs.
///
/// No method blocks on a sync or fails for ordinary conditions such as a
/// missing network; connectivity is checked inside the engine.
pub trait SyncScheduler {
    /// Queues an immediate sync.
    fn request_sync(&self, request: SyncRequest);

    /// Cancels the running sync, if any, and drops queued ones.
    fn stop_syncing(&self);

    /// Establishes, replaces, or cancels (zero period) the periodic loop
    /// identified by the value of `request`.
    fn set_periodic_sync(&self, period: Duration, request: SyncRequest);

    /// Returns true if a sync is running or queued.
    fn is_running_or_pending(&self) -> bool;

    /// Queues a sync of every phase.
    fn start_full_sync(&self) {
        self.request_sync(SyncRequest::full());
    }

    /// Queues a sync of observations only.
    fn start_observations_sync(&self) {
        self.request_sync(SyncRequest::phases([Phase::Observations]));
    }
}

impl SyncScheduler for SyncRunner {
    fn request_sync(&self, request: SyncRequest) {
        SyncRunner::request_sync(self, request);
    }

    fn stop_syncing(&self) {
        SyncRunner::stop_syncing(self);
    }

    fn set_periodic_sync(&self, period: Duration, request: SyncRequest) {
        SyncRunner::set_periodic_sync(self, request, period);
    }

    fn is_running_or_pending(&self) -> bool {
        SyncRunner::is_running_or_pending(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<SyncRequest>>,
    }

    impl SyncScheduler for Recorder {
        fn request_sync(&self, request: SyncRequest) {
            self.requests.lock().push(request);
        }

        fn stop_syncing(&self) {
            self.requests.lock().clear();
        }

        fn set_periodic_sync(&self, _period: Duration, _request: SyncRequest) {}

        fn is_running_or_pending(&self) -> bool {
            !self.requests.lock().is_empty()
        }
    }

    #[test]
    fn convenience_requests() {
        let recorder = Recorder::default();
        recorder.start_full_sync();
        recorder.start_observations_sync();

        let requests = recorder.requests.lock().clone();
        assert!(requests[0].is_full_sync());
        assert_eq!(requests[1].resolved_phases(), vec![Phase::Observations]);
        assert!(recorder.is_running_or_pending());

        recorder.stop_syncing();
        assert!(!recorder.is_running_or_pending());
    }
}
