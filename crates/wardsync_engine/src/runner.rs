//! Serialized background execution of sync requests.
//!
//! [`SyncRunner`] owns one dedicated worker thread driving a single-threaded
//! tokio runtime. Every scheduling call is turned into a message on one
//! ordered queue, so at most one sync runs at a time and two syncs are never
//! interleaved. Callers never block, except in [`SyncRunner::flush`].
//!
//! ## Periodic loops
//!
//! A periodic loop is identified by its [`SyncRequest`] value. Each loop has
//! a generation counter:
//! - setting the same period again is a no-op
//! - setting a different period (or zero, which cancels) bumps the generation
//! - a tick carries the generation it was scheduled under; on arrival it runs
//!   the sync and reschedules only if that generation is still current
//!
//! Stale ticks are dropped silently, so already scheduled timers never need
//! to be cancelled.

use crate::engine::SyncExecutor;
use crate::error::{SyncError, SyncResult};
use crate::report::SyncReport;
use crate::request::SyncRequest;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Messages processed by the worker, in order.
#[derive(Debug)]
enum Command {
    /// Requests were queued; run them.
    RunPending,
    /// Establish, replace, or cancel a periodic loop.
    SetPeriodic {
        request: SyncRequest,
        period: Duration,
    },
    /// A periodic timer fired.
    Tick {
        request: SyncRequest,
        generation: u64,
    },
    /// Reply once every earlier message is handled.
    Flush(oneshot::Sender<()>),
    /// Stop the worker.
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
struct PeriodicLoop {
    period: Duration,
    generation: u64,
}

#[derive(Default)]
struct Shared {
    pending: VecDeque<SyncRequest>,
    running: bool,
    loops: HashMap<SyncRequest, PeriodicLoop>,
    syncs_run: u64,
    last_report: Option<SyncReport>,
}

/// A single worker that executes sync requests one at a time.
///
/// Dropping the runner stops the worker after the current sync finishes;
/// queued syncs are dropped.
pub struct SyncRunner {
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<Mutex<Shared>>,
    executor: Arc<dyn SyncExecutor>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SyncRunner {
    /// Starts the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Runner`] if the runtime or thread cannot be
    /// created.
    pub fn start(executor: Arc<dyn SyncExecutor>) -> SyncResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| SyncError::Runner(format!("cannot build runtime: {e}")))?;

        let (commands, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Mutex::new(Shared::default()));
        let worker = Worker {
            receiver,
            commands: commands.clone(),
            shared: Arc::clone(&shared),
            executor: Arc::clone(&executor),
        };

        let handle = thread::Builder::new()
            .name("wardsync-runner".into())
            .spawn(move || runtime.block_on(worker.run()))
            .map_err(|e| SyncError::Runner(format!("cannot spawn worker: {e}")))?;

        Ok(Self {
            commands,
            shared,
            executor,
            worker: Some(handle),
        })
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::error!("sync runner has stopped; dropping command");
        }
    }

    /// Queues a sync. An equal request already waiting is not queued twice.
    pub fn request_sync(&self, request: SyncRequest) {
        {
            let mut shared = self.shared.lock();
            if shared.pending.contains(&request) {
                tracing::debug!(%request, "sync already pending");
                return;
            }
            tracing::debug!(%request, "queueing sync");
            shared.pending.push_back(request);
        }
        self.send(Command::RunPending);
    }

    /// Drops queued syncs and cancels the running one, if any.
    pub fn stop_syncing(&self) {
        let mut shared = self.shared.lock();
        let dropped = shared.pending.len();
        shared.pending.clear();
        if shared.running {
            self.executor.cancel();
        }
        tracing::info!(dropped, running = shared.running, "stopping sync");
    }

    /// Establishes, replaces, or (with a zero period) cancels the periodic
    /// loop for `request`.
    pub fn set_periodic_sync(&self, request: SyncRequest, period: Duration) {
        self.send(Command::SetPeriodic { request, period });
    }

    /// Returns true if a sync is running or queued.
    pub fn is_running_or_pending(&self) -> bool {
        let shared = self.shared.lock();
        shared.running || !shared.pending.is_empty()
    }

    /// Blocks until every command sent before this call has been handled.
    ///
    /// Must not be called from inside an async runtime.
    pub fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Flush(tx));
        if rx.blocking_recv().is_err() {
            tracing::warn!("sync runner stopped before flush completed");
        }
    }

    /// The current generation of the periodic loop for `request`.
    pub fn loop_generation(&self, request: &SyncRequest) -> Option<u64> {
        self.shared.lock().loops.get(request).map(|l| l.generation)
    }

    /// The active period of the loop for `request`, if one is scheduled.
    pub fn loop_period(&self, request: &SyncRequest) -> Option<Duration> {
        self.shared
            .lock()
            .loops
            .get(request)
            .map(|l| l.period)
            .filter(|p| !p.is_zero())
    }

    /// Number of syncs executed so far.
    pub fn syncs_run(&self) -> u64 {
        self.shared.lock().syncs_run
    }

    /// Report of the most recent sync.
    pub fn last_report(&self) -> Option<SyncReport> {
        self.shared.lock().last_report.clone()
    }

    /// Stops the worker after the current sync and waits for it to exit.
    ///
    /// Queued syncs that have not started are dropped.
    pub fn shutdown(mut self) {
        self.stop_worker();
    }

    fn stop_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            let dropped = {
                let mut shared = self.shared.lock();
                let dropped = shared.pending.len();
                shared.pending.clear();
                dropped
            };
            tracing::debug!(dropped, "shutting down sync runner");
            self.send(Command::Shutdown);
            if handle.join().is_err() {
                tracing::error!("sync runner thread panicked");
            }
        }
    }
}

impl Drop for SyncRunner {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

struct Worker {
    receiver: mpsc::UnboundedReceiver<Command>,
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<Mutex<Shared>>,
    executor: Arc<dyn SyncExecutor>,
}

impl Worker {
    async fn run(mut self) {
        tracing::debug!("sync runner started");
        while let Some(command) = self.receiver.recv().await {
            match command {
                Command::RunPending => self.run_pending(),
                Command::SetPeriodic { request, period } => self.set_periodic(request, period),
                Command::Tick {
                    request,
                    generation,
                } => self.tick(request, generation),
                Command::Flush(reply) => {
                    let _ = reply.send(());
                }
                Command::Shutdown => break,
            }
        }
        tracing::info!("sync runner stopped");
    }

    fn run_pending(&self) {
        loop {
            let request = {
                let mut shared = self.shared.lock();
                let Some(request) = shared.pending.pop_front() else {
                    return;
                };
                shared.running = true;
                request
            };
            self.execute(&request);
        }
    }

    fn execute(&self, request: &SyncRequest) {
        self.shared.lock().running = true;
        let report = self.executor.execute(request);
        let mut shared = self.shared.lock();
        shared.running = false;
        shared.syncs_run += 1;
        shared.last_report = Some(report);
    }

    fn set_periodic(&self, request: SyncRequest, period: Duration) {
        let generation = {
            let mut shared = self.shared.lock();
            let entry = shared.loops.entry(request.clone()).or_insert(PeriodicLoop {
                period: Duration::ZERO,
                generation: 0,
            });
            if entry.period == period {
                tracing::debug!(%request, ?period, "periodic sync unchanged");
                return;
            }
            entry.period = period;
            entry.generation += 1;
            entry.generation
        };

        if period.is_zero() {
            tracing::info!(%request, "periodic sync cancelled");
        } else {
            tracing::info!(%request, ?period, generation, "periodic sync scheduled");
            self.schedule_tick(request, period, generation);
        }
    }

    fn schedule_tick(&self, request: SyncRequest, period: Duration, generation: u64) {
        let commands = self.commands.clone();
        tokio::spawn(async move {
            tokio::time::sleep(period).await;
            let _ = commands.send(Command::Tick {
                request,
                generation,
            });
        });
    }

    fn tick(&self, request: SyncRequest, generation: u64) {
        let current = self.shared.lock().loops.get(&request).copied();
        match current {
            Some(l) if l.generation == generation && !l.period.is_zero() => {
                tracing::debug!(%request, generation, "periodic sync tick");
                self.execute(&request);
                self.schedule_tick(request, l.period, generation);
            }
            _ => tracing::debug!(%request, generation, "dropping stale periodic tick"),
        }
    }
}
