//! Error types for the sync engine.

use thiserror::Error;
use wardsync_protocol::RemoteError;
use wardsync_store::StoreError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a sync.
///
/// None of these escape [`crate::SyncEngine::sync`]; the engine classifies
/// them into a status broadcast and flags on the [`crate::SyncReport`].
#[derive(Error, Debug)]
pub enum SyncError {
    /// Fetching from the remote source failed.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// The local store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A remote record could not be turned into local rows.
    #[error("malformed {resource} record: {reason}")]
    MalformedRecord {
        /// Resource the record came from.
        resource: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// The sync was cancelled at a phase boundary.
    #[error("sync cancelled {0}")]
    Cancelled(String),

    /// The background runner could not be started or has stopped.
    #[error("runner error: {0}")]
    Runner(String),
}

/// How a failed sync is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Cooperative cancellation.
    Cancelled,
    /// A batch could not be applied to the local store.
    Database,
    /// Anything else, including remote fetch failures.
    Io,
}

impl SyncError {
    /// Creates a malformed-record error.
    pub fn malformed(resource: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            resource,
            reason: reason.into(),
        }
    }

    /// Classifies this error for reporting.
    pub fn kind(&self) -> FailureKind {
        match self {
            SyncError::Cancelled(_) => FailureKind::Cancelled,
            SyncError::MalformedRecord { .. } => FailureKind::Database,
            SyncError::Store(e) if e.is_apply() => FailureKind::Database,
            SyncError::Store(_) | SyncError::Remote(_) | SyncError::Runner(_) => FailureKind::Io,
        }
    }
}
