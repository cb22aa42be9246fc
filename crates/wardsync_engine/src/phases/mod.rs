//! Phase workers, one per [`Phase`].
//!
//! A worker fetches the complete remote set for its resource, computes
//! operations against the local table, and applies them as one batch. It
//! never opens or closes savepoints; the engine owns the transaction.

mod charts;
mod concepts;
mod forms;
mod locations;
mod observations;
mod orders;
mod patients;
mod users;

pub use charts::ChartsWorker;
pub use concepts::ConceptsWorker;
pub use forms::FormsWorker;
pub use locations::LocationsWorker;
pub use observations::ObservationsWorker;
pub use orders::OrdersWorker;
pub use patients::PatientsWorker;
pub use users::UsersWorker;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::report::SyncReport;
use crate::request::Phase;
use wardsync_protocol::RemoteSource;
use wardsync_store::{DbOperation, LocalStore, Table};

/// What a worker may touch while it runs.
pub struct PhaseContext<'a> {
    /// Where remote records come from.
    pub remote: &'a dyn RemoteSource,
    /// The store being reconciled, inside the engine's savepoint.
    pub store: &'a dyn LocalStore,
    /// Engine configuration.
    pub config: &'a SyncConfig,
}

/// Reconciles one resource.
pub trait PhaseWorker: Send + Sync {
    /// The phase this worker implements.
    fn phase(&self) -> Phase;

    /// Runs the phase, adding its statistics to `report`.
    ///
    /// # Errors
    ///
    /// Any error aborts the whole sync; the engine rolls back.
    fn sync(&self, ctx: &PhaseContext<'_>, report: &mut SyncReport) -> SyncResult<()>;
}

/// Returns the worker for `phase`.
pub fn worker_for(phase: Phase) -> &'static dyn PhaseWorker {
    match phase {
        Phase::Users => &UsersWorker,
        Phase::Locations => &LocationsWorker,
        Phase::ChartItems => &ChartsWorker,
        Phase::Concepts => &ConceptsWorker,
        Phase::Patients => &PatientsWorker,
        Phase::Observations => &ObservationsWorker,
        Phase::Orders => &OrdersWorker,
        Phase::Forms => &FormsWorker,
    }
}

/// Rejects records whose UUID is empty.
fn require_uuid(resource: &'static str, uuid: &str) -> SyncResult<()> {
    if uuid.trim().is_empty() {
        return Err(SyncError::malformed(resource, "empty uuid"));
    }
    Ok(())
}

/// Applies a worker's operations as one batch.
fn apply(store: &dyn LocalStore, table: Table, ops: &[DbOperation]) -> SyncResult<()> {
    if ops.is_empty() {
        tracing::debug!(%table, "no changes");
        return Ok(());
    }
    let affected = store.apply_batch(ops)?;
    tracing::debug!(%table, operations = ops.len(), affected, "applied batch");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_phase_has_its_worker() {
        for phase in Phase::ALL {
            assert_eq!(worker_for(phase).phase(), phase);
        }
    }

    #[test]
    fn empty_uuid_is_malformed() {
        assert!(require_uuid("patients", "p1").is_ok());
        let err = require_uuid("patients", " ").unwrap_err();
        assert!(matches!(err, SyncError::MalformedRecord { resource: "patients", .. }));
    }
}
