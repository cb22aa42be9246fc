//! Concepts: same shape as locations, with names in their own table.

use super::{apply, require_uuid, PhaseContext, PhaseWorker};
use crate::error::SyncResult;
use crate::reconcile::{diff_with_names, NameTable, NamedRecord};
use crate::report::SyncReport;
use crate::request::Phase;
use wardsync_store::{Filter, Row, Table};

const NAMES: NameTable = NameTable {
    table: Table::ConceptNames,
    owner_column: "concept_uuid",
};

/// Reconciles concepts and their localized names.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConceptsWorker;

impl PhaseWorker for ConceptsWorker {
    fn phase(&self) -> Phase {
        Phase::Concepts
    }

    fn sync(&self, ctx: &PhaseContext<'_>, report: &mut SyncReport) -> SyncResult<()> {
        let mut records = Vec::new();
        for concept in ctx.remote.list_concepts()? {
            require_uuid("concepts", &concept.uuid)?;
            records.push(NamedRecord {
                row: Row::new()
                    .with("uuid", concept.uuid)
                    .with("xform_id", concept.xform_id)
                    .with("concept_type", concept.concept_type),
                names: concept.names,
            });
        }

        let local = ctx.store.query(Table::Concepts, &Filter::all())?;
        let local_names = ctx.store.query(Table::ConceptNames, &Filter::all())?;
        let ops = diff_with_names(
            Table::Concepts,
            "uuid",
            NAMES,
            &local,
            &local_names,
            records,
            report,
        );
        apply(ctx.store, Table::Concepts, &ops)
    }
}
