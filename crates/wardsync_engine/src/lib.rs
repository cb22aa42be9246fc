//! # Wardsync Engine
//!
//! Phase-ordered, all-or-nothing reconciliation of a local store against a
//! remote source of truth.
//!
//! This crate provides:
//! - [`SyncEngine`]: runs the requested phases inside one named savepoint
//! - Phase workers (users, locations, charts, concepts, patients,
//!   observations, orders, forms)
//! - [`reconcile`]: the UUID-keyed three-way diff and its variants
//! - [`SyncRunner`]: a single serialized worker with periodic loops
//! - [`SyncScheduler`]: the fire-and-forget scheduling surface
//! - Status broadcasting and full-sync bookkeeping
//!
//! ## Architecture
//!
//! ```text
//! SyncScheduler ──> SyncRunner (one worker thread, one queue)
//!                       │
//!                       ▼
//!                   SyncEngine ──> PhaseWorker × N ──> LocalStore
//!                       │                 ▲
//!                       ▼                 └── RemoteSource
//!                   StatusSink
//! ```
//!
//! ## Key Invariants
//!
//! - Phases always run in canonical order: users, locations, chart items,
//!   concepts, patients, observations, orders, forms
//! - A failure in any phase rolls back every phase of that sync
//! - No error escapes [`SyncEngine::sync`]
//! - Cancellation is cooperative, checked at phase boundaries, and one-shot
//! - At most one sync runs at a time per runner

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bookkeeping;
mod config;
mod engine;
mod error;
mod phases;
pub mod reconcile;
mod report;
mod request;
mod runner;
mod scheduler;
mod status;

pub use bookkeeping::FullSyncTimes;
pub use config::{SyncConfig, DEFAULT_SAVEPOINT_NAME};
pub use engine::{
    EngineState, SyncEngine, SyncExecutor, SyncOutcome, COMPLETING_LABEL, STARTING_LABEL,
};
pub use error::{FailureKind, SyncError, SyncResult};
pub use phases::{worker_for, PhaseContext, PhaseWorker};
pub use report::SyncReport;
pub use request::{Phase, SyncRequest};
pub use runner::SyncRunner;
pub use scheduler::SyncScheduler;
pub use status::{ApiHealth, HealthFlag, StatusBroadcaster, StatusSink, SyncStatus};
