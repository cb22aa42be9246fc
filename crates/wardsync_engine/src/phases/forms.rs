//! Forms: keyed three-way diff.

use super::{apply, require_uuid, PhaseContext, PhaseWorker};
use crate::error::SyncResult;
use crate::reconcile::diff_by_key;
use crate::report::SyncReport;
use crate::request::Phase;
use wardsync_store::{Filter, Row, Table};

/// Reconciles the form table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormsWorker;

impl PhaseWorker for FormsWorker {
    fn phase(&self) -> Phase {
        Phase::Forms
    }

    fn sync(&self, ctx: &PhaseContext<'_>, report: &mut SyncReport) -> SyncResult<()> {
        let forms = ctx.remote.list_forms()?;
        let mut rows = Vec::with_capacity(forms.len());
        for form in forms {
            require_uuid("forms", &form.uuid)?;
            rows.push(
                Row::new()
                    .with("uuid", form.uuid)
                    .with("name", form.name)
                    .with("version", form.version),
            );
        }

        let local = ctx.store.query(Table::Forms, &Filter::all())?;
        let ops = diff_by_key(Table::Forms, "uuid", &local, rows, report);
        apply(ctx.store, Table::Forms, &ops)
    }
}
