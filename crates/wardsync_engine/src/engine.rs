//! The sync orchestrator.

use crate::bookkeeping;
use crate::config::SyncConfig;
use crate::error::{FailureKind, SyncError, SyncResult};
use crate::phases::{worker_for, PhaseContext};
use crate::report::SyncReport;
use crate::request::{Phase, SyncRequest};
use crate::status::{ApiHealth, HealthFlag, StatusSink, SyncStatus};
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wardsync_protocol::RemoteSource;
use wardsync_store::LocalStore;

/// Label broadcast with the initial 0% progress.
pub const STARTING_LABEL: &str = "Sync in progress";

/// Label broadcast with the final 100% progress.
pub const COMPLETING_LABEL: &str = "Completing sync";

/// How a sync ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Every phase ran and the savepoint was released.
    Completed,
    /// The sync failed; nothing it did was kept.
    Failed,
    /// The sync was cancelled; nothing it did was kept.
    Canceled,
}

impl SyncOutcome {
    fn status(self) -> SyncStatus {
        match self {
            SyncOutcome::Completed => SyncStatus::Completed,
            SyncOutcome::Failed => SyncStatus::Failed,
            SyncOutcome::Canceled => SyncStatus::Canceled,
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.status(), f)
    }
}

/// What the engine is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No sync is running.
    Idle,
    /// A sync is preparing its transaction or finishing up.
    Running,
    /// A sync is inside the given phase.
    InPhase(Phase),
}

impl EngineState {
    /// Returns true while a sync is running.
    pub fn is_active(&self) -> bool {
        !matches!(self, EngineState::Idle)
    }
}

/// Runs something that the background runner can execute and cancel.
///
/// [`SyncEngine`] is the production implementation; tests substitute
/// slow or counting executors.
pub trait SyncExecutor: Send + Sync {
    /// Runs one sync to completion and returns its report.
    fn execute(&self, request: &SyncRequest) -> SyncReport;

    /// Asks the in-flight sync, if any, to stop at the next phase boundary.
    fn cancel(&self);
}

/// An open named savepoint.
///
/// Consumed by [`Savepoint::release`] or [`Savepoint::rollback`]. If
/// dropped while still open, it rolls back and releases, so the savepoint
/// is closed exactly once on every path.
struct Savepoint<'a> {
    store: &'a dyn LocalStore,
    name: &'a str,
    open: bool,
}

impl<'a> Savepoint<'a> {
    fn open(store: &'a dyn LocalStore, name: &'a str) -> SyncResult<Self> {
        store.start_named_transaction(name)?;
        tracing::debug!(savepoint = name, "opened savepoint");
        Ok(Self {
            store,
            name,
            open: true,
        })
    }

    fn release(mut self) -> SyncResult<()> {
        self.open = false;
        self.store.release_named_transaction(self.name)?;
        tracing::debug!(savepoint = self.name, "released savepoint");
        Ok(())
    }

    fn rollback(mut self) -> SyncResult<()> {
        self.open = false;
        let rolled_back = self.store.rollback_named_transaction(self.name);
        let released = self.store.release_named_transaction(self.name);
        tracing::debug!(savepoint = self.name, "rolled back savepoint");
        rolled_back?;
        released?;
        Ok(())
    }
}

impl Drop for Savepoint<'_> {
    fn drop(&mut self) {
        if self.open {
            tracing::error!(savepoint = self.name, "savepoint dropped while open; rolling back");
            if let Err(e) = self
                .store
                .rollback_named_transaction(self.name)
                .and_then(|()| self.store.release_named_transaction(self.name))
            {
                tracing::error!(error = %e, "failed to close savepoint");
            }
        }
    }
}

/// Orchestrates one sync across the requested phases.
///
/// # State machine
///
/// ```text
/// Idle -> Started -> phase loop -> Completed | Failed | Canceled -> Idle
/// ```
///
/// All phases of one sync share a single named savepoint: any failure rolls
/// back every phase run so far. No error escapes [`SyncEngine::sync`]; the
/// caller sees only the returned [`SyncOutcome`], the [`SyncReport`], and the
/// status broadcasts.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use wardsync_engine::{StatusBroadcaster, SyncEngine, SyncOutcome, SyncReport, SyncRequest};
/// use wardsync_protocol::{MemoryRemote, RemoteSnapshot};
/// use wardsync_store::MemoryStore;
///
/// let engine = SyncEngine::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(MemoryRemote::new(RemoteSnapshot::default())),
///     Arc::new(StatusBroadcaster::new()),
/// );
///
/// let mut report = SyncReport::new();
/// assert_eq!(engine.sync(&SyncRequest::full(), &mut report), SyncOutcome::Completed);
/// ```
pub struct SyncEngine {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteSource>,
    status: Arc<dyn StatusSink>,
    health: Arc<dyn ApiHealth>,
    config: SyncConfig,
    cancelled: AtomicBool,
    state: RwLock<EngineState>,
}

impl SyncEngine {
    /// Creates an engine with default configuration and an always-available
    /// health flag.
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteSource>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            store,
            remote,
            status,
            health: Arc::new(HealthFlag::new()),
            config: SyncConfig::default(),
            cancelled: AtomicBool::new(false),
            state: RwLock::new(EngineState::Idle),
        }
    }

    /// Sets the health flag consulted before each sync.
    pub fn with_health(mut self, health: Arc<dyn ApiHealth>) -> Self {
        self.health = health;
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns what the engine is doing right now.
    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    /// Requests cancellation at the next phase boundary.
    ///
    /// The flag is one-shot: the first check that sees it clears it, and a
    /// sync that ends without seeing it clears it on the way out. A cancel
    /// issued while idle applies to the next sync.
    pub fn cancel(&self) {
        tracing::info!("sync cancellation requested");
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn check_cancelled(&self, when: &str) -> SyncResult<()> {
        if self.cancelled.swap(false, Ordering::SeqCst) {
            return Err(SyncError::Cancelled(when.to_owned()));
        }
        Ok(())
    }

    fn clear_cancel(&self) {
        if self.cancelled.swap(false, Ordering::SeqCst) {
            tracing::debug!("dropping cancellation that arrived after the last phase boundary");
        }
    }

    fn set_state(&self, state: EngineState) {
        *self.state.write() = state;
    }

    fn broadcast(&self, status: SyncStatus) {
        tracing::debug!(%status, "broadcasting sync status");
        self.status.broadcast(status);
    }

    /// Runs one sync, accumulating statistics into `report`.
    pub fn sync(&self, request: &SyncRequest, report: &mut SyncReport) -> SyncOutcome {
        tracing::info!(%request, "sync started");
        self.broadcast(SyncStatus::Started);

        if self.health.is_api_unavailable() {
            tracing::warn!("server unavailable; abandoning sync");
            self.clear_cancel();
            self.broadcast(SyncStatus::Failed);
            return SyncOutcome::Failed;
        }

        if let Err(e) = self.check_cancelled("before start") {
            tracing::info!(error = %e, "sync canceled before start");
            self.broadcast(SyncStatus::Canceled);
            return SyncOutcome::Canceled;
        }

        self.set_state(EngineState::Running);
        let started = std::time::Instant::now();
        let outcome = self.run(request, report);
        // A cancel aimed at this sync must not outlive it.
        self.clear_cancel();
        self.set_state(EngineState::Idle);

        tracing::info!(
            outcome = %outcome,
            elapsed_ms = started.elapsed().as_millis() as u64,
            inserts = report.num_inserts,
            updates = report.num_updates,
            deletes = report.num_deletes,
            "sync finished"
        );
        self.broadcast(outcome.status());
        outcome
    }

    fn run(&self, request: &SyncRequest, report: &mut SyncReport) -> SyncOutcome {
        let phases = request.resolved_phases();
        let full_sync = request.is_full_sync();
        self.broadcast(SyncStatus::progress(0, STARTING_LABEL));

        let store = self.store.as_ref();
        let savepoint = match Savepoint::open(store, &self.config.savepoint_name) {
            Ok(savepoint) => savepoint,
            Err(e) => return Self::classify(e, report),
        };

        match self.run_phases(&phases, full_sync, report) {
            Ok(()) => match savepoint.release() {
                Ok(()) => SyncOutcome::Completed,
                Err(e) => Self::classify(e, report),
            },
            Err(e) => {
                if let Err(rollback_error) = savepoint.rollback() {
                    tracing::error!(error = %rollback_error, "rollback failed");
                    report.num_io_exceptions += 1;
                }
                Self::classify(e, report)
            }
        }
    }

    fn run_phases(
        &self,
        phases: &[Phase],
        full_sync: bool,
        report: &mut SyncReport,
    ) -> SyncResult<()> {
        let store = self.store.as_ref();
        if full_sync {
            bookkeeping::record_full_sync_start(store, now_millis())?;
        }

        let ctx = PhaseContext {
            remote: self.remote.as_ref(),
            store,
            config: &self.config,
        };
        let total = phases.len().max(1);
        for (completed, &phase) in phases.iter().enumerate() {
            self.check_cancelled(&format!("before {phase}"))?;
            self.set_state(EngineState::InPhase(phase));
            self.broadcast(SyncStatus::progress(
                (completed * 100 / total) as u8,
                phase.label(),
            ));

            let phase_start = std::time::Instant::now();
            worker_for(phase).sync(&ctx, report)?;
            tracing::info!(
                %phase,
                elapsed_ms = phase_start.elapsed().as_millis() as u64,
                "phase complete"
            );
        }

        self.set_state(EngineState::Running);
        self.broadcast(SyncStatus::progress(100, COMPLETING_LABEL));
        if full_sync {
            bookkeeping::record_full_sync_end(store, now_millis())?;
        }
        Ok(())
    }

    fn classify(error: SyncError, report: &mut SyncReport) -> SyncOutcome {
        match error.kind() {
            FailureKind::Cancelled => {
                tracing::info!(error = %error, "sync canceled");
                SyncOutcome::Canceled
            }
            FailureKind::Database => {
                tracing::error!(error = %error, "sync failed applying changes");
                report.database_error = true;
                SyncOutcome::Failed
            }
            FailureKind::Io => {
                tracing::error!(error = %error, "sync failed");
                report.num_io_exceptions += 1;
                SyncOutcome::Failed
            }
        }
    }
}

impl SyncExecutor for SyncEngine {
    fn execute(&self, request: &SyncRequest) -> SyncReport {
        let mut report = SyncReport::new();
        self.sync(request, &mut report);
        report
    }

    fn cancel(&self) {
        SyncEngine::cancel(self);
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusBroadcaster;
    use wardsync_protocol::{MemoryRemote, RemoteSnapshot, RemoteUser, Resource};
    use wardsync_store::{MemoryStore, Table};

    struct Fixture {
        store: Arc<MemoryStore>,
        remote: Arc<MemoryRemote>,
        broadcaster: Arc<StatusBroadcaster>,
        engine: SyncEngine,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(MemoryRemote::new(RemoteSnapshot {
            users: vec![RemoteUser {
                uuid: "u1".into(),
                full_name: "Ana Nurse".into(),
            }],
            ..RemoteSnapshot::default()
        }));
        let broadcaster = Arc::new(StatusBroadcaster::new());
        let engine = SyncEngine::new(store.clone(), remote.clone(), broadcaster.clone());
        Fixture {
            store,
            remote,
            broadcaster,
            engine,
        }
    }

    #[test]
    fn outcome_display_matches_status() {
        assert_eq!(SyncOutcome::Completed.to_string(), "COMPLETED");
        assert_eq!(SyncOutcome::Canceled.to_string(), "CANCELED");
    }

    #[test]
    fn completed_sync_releases_savepoint() {
        let f = fixture();
        let mut report = SyncReport::new();
        let outcome = f
            .engine
            .sync(&SyncRequest::phases([Phase::Users]), &mut report);

        assert_eq!(outcome, SyncOutcome::Completed);
        assert_eq!(f.store.count(Table::Users), 1);
        assert!(f.store.open_savepoints().is_empty());
        assert_eq!(f.engine.state(), EngineState::Idle);
        assert_eq!(f.broadcaster.last_status(), Some(SyncStatus::Completed));
    }

    #[test]
    fn remote_failure_counts_io_exception() {
        let f = fixture();
        f.remote.fail(Resource::Users, "connection refused");
        let mut report = SyncReport::new();
        let outcome = f
            .engine
            .sync(&SyncRequest::phases([Phase::Users]), &mut report);

        assert_eq!(outcome, SyncOutcome::Failed);
        assert_eq!(report.num_io_exceptions, 1);
        assert!(!report.database_error);
        assert!(f.store.open_savepoints().is_empty());
    }

    #[test]
    fn cancel_is_one_shot() {
        let f = fixture();
        f.engine.cancel();
        let mut report = SyncReport::new();
        assert_eq!(
            f.engine.sync(&SyncRequest::full(), &mut report),
            SyncOutcome::Canceled
        );
        assert_eq!(
            f.engine.sync(&SyncRequest::full(), &mut report),
            SyncOutcome::Completed
        );
    }

    #[test]
    fn dropped_savepoint_rolls_back() {
        let store = MemoryStore::new();
        {
            let _savepoint = Savepoint::open(&store, "SP").unwrap();
            store
                .apply_batch(&[wardsync_store::DbOperation::insert(
                    Table::Forms,
                    wardsync_store::Row::new().with("uuid", "f1"),
                )])
                .unwrap();
        }
        assert_eq!(store.count(Table::Forms), 0);
        assert!(store.open_savepoints().is_empty());
    }
}
