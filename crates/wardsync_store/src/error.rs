//! Error types for store operations.

use crate::table::Table;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the local store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An operation in a batch could not be applied.
    ///
    /// The whole batch is discarded when this is returned.
    #[error("cannot apply operation to table {table}: {reason}")]
    Apply {
        /// Table the operation targeted.
        table: Table,
        /// Why the operation was rejected.
        reason: String,
    },

    /// The named savepoint is not open.
    #[error("no open savepoint named {0:?}")]
    NoSuchSavepoint(String),

    /// An I/O error occurred while persisting or loading the store.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates an apply error for the given table.
    pub fn apply(table: Table, reason: impl Into<String>) -> Self {
        Self::Apply {
            table,
            reason: reason.into(),
        }
    }

    /// Returns true if this error means a batch was rejected.
    pub fn is_apply(&self) -> bool {
        matches!(self, StoreError::Apply { .. })
    }
}
