//! Locations: keyed diff of the tree plus wholesale replacement of changed
//! name maps.

use super::{apply, require_uuid, PhaseContext, PhaseWorker};
use crate::error::SyncResult;
use crate::reconcile::{diff_with_names, NameTable, NamedRecord};
use crate::report::SyncReport;
use crate::request::Phase;
use wardsync_store::{Filter, Row, Table};

const NAMES: NameTable = NameTable {
    table: Table::LocationNames,
    owner_column: "location_uuid",
};

/// Reconciles the location tree and its localized names.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationsWorker;

impl PhaseWorker for LocationsWorker {
    fn phase(&self) -> Phase {
        Phase::Locations
    }

    fn sync(&self, ctx: &PhaseContext<'_>, report: &mut SyncReport) -> SyncResult<()> {
        let mut records = Vec::new();
        for location in ctx.remote.list_locations()? {
            require_uuid("locations", &location.uuid)?;
            records.push(NamedRecord {
                row: Row::new()
                    .with("uuid", location.uuid)
                    .with("parent_uuid", location.parent_uuid),
                names: location.names,
            });
        }

        let local = ctx.store.query(Table::Locations, &Filter::all())?;
        let local_names = ctx.store.query(Table::LocationNames, &Filter::all())?;
        let ops = diff_with_names(
            Table::Locations,
            "uuid",
            NAMES,
            &local,
            &local_names,
            records,
            report,
        );
        apply(ctx.store, Table::Locations, &ops)
    }
}
