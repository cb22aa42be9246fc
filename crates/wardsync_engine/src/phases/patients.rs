//! Patients: keyed three-way diff.

use super::{apply, require_uuid, PhaseContext, PhaseWorker};
use crate::error::SyncResult;
use crate::reconcile::diff_by_key;
use crate::report::SyncReport;
use crate::request::Phase;
use wardsync_protocol::RemotePatient;
use wardsync_store::{Filter, Row, Table};

/// Reconciles the patient table.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatientsWorker;

fn patient_row(patient: RemotePatient) -> Row {
    Row::new()
        .with("uuid", patient.uuid)
        .with("id", patient.id)
        .with("given_name", patient.given_name)
        .with("family_name", patient.family_name)
        .with("sex", patient.sex)
        .with("birthdate", patient.birthdate)
        .with("location_uuid", patient.location_uuid)
}

impl PhaseWorker for PatientsWorker {
    fn phase(&self) -> Phase {
        Phase::Patients
    }

    fn sync(&self, ctx: &PhaseContext<'_>, report: &mut SyncReport) -> SyncResult<()> {
        let patients = ctx.remote.list_patients()?;
        let mut rows = Vec::with_capacity(patients.len());
        for patient in patients {
            require_uuid("patients", &patient.uuid)?;
            rows.push(patient_row(patient));
        }

        let local = ctx.store.query(Table::Patients, &Filter::all())?;
        let ops = diff_by_key(Table::Patients, "uuid", &local, rows, report);
        apply(ctx.store, Table::Patients, &ops)
    }
}
