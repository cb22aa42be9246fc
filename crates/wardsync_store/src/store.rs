//! Local store trait definition.

use crate::error::StoreResult;
use crate::operation::{DbOperation, Filter};
use crate::table::Table;
use crate::value::Row;

/// The local cache the sync engine reconciles against.
///
/// Savepoints follow SQL `SAVEPOINT` semantics:
/// - `start_named_transaction` opens a savepoint, possibly nested
/// - `rollback_named_transaction` discards every change made since the
///   savepoint was opened but leaves the savepoint open
/// - `release_named_transaction` closes the savepoint (and any opened after
///   it), keeping the changes
///
/// # Invariants
///
/// - `apply_batch` is all-or-nothing: on error no operation in the batch is
///   visible
/// - A rolled-back savepoint leaves every table exactly as it was when the
///   savepoint was opened
/// - Implementations must be `Send + Sync`; the engine holds exclusive use for
///   the duration of one sync by construction, not by locking
pub trait LocalStore: Send + Sync {
    /// Opens a named savepoint.
    fn start_named_transaction(&self, name: &str) -> StoreResult<()>;

    /// Releases (commits) a named savepoint.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NoSuchSavepoint`] if `name` is not open.
    fn release_named_transaction(&self, name: &str) -> StoreResult<()>;

    /// Rolls back to a named savepoint without closing it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NoSuchSavepoint`] if `name` is not open.
    fn rollback_named_transaction(&self, name: &str) -> StoreResult<()>;

    /// Returns the rows of `table` matching `filter`, in insertion order.
    fn query(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>>;

    /// Applies a batch of operations atomically.
    ///
    /// Returns the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Apply`] if any operation is rejected;
    /// nothing from the batch is kept in that case.
    fn apply_batch(&self, operations: &[DbOperation]) -> StoreResult<usize>;
}
