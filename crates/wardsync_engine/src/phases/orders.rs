//! Orders: keyed three-way diff.

use super::{apply, require_uuid, PhaseContext, PhaseWorker};
use crate::error::SyncResult;
use crate::reconcile::diff_by_key;
use crate::report::SyncReport;
use crate::request::Phase;
use wardsync_store::{Filter, Row, Table};

/// Reconciles the order table.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrdersWorker;

impl PhaseWorker for OrdersWorker {
    fn phase(&self) -> Phase {
        Phase::Orders
    }

    fn sync(&self, ctx: &PhaseContext<'_>, report: &mut SyncReport) -> SyncResult<()> {
        let orders = ctx.remote.list_orders()?;
        let mut rows = Vec::with_capacity(orders.len());
        for order in orders {
            require_uuid("orders", &order.uuid)?;
            rows.push(
                Row::new()
                    .with("uuid", order.uuid)
                    .with("patient_uuid", order.patient_uuid)
                    .with("instructions", order.instructions)
                    .with("start_millis", order.start_millis)
                    .with("stop_millis", order.stop_millis),
            );
        }

        let local = ctx.store.query(Table::Orders, &Filter::all())?;
        let ops = diff_by_key(Table::Orders, "uuid", &local, rows, report);
        apply(ctx.store, Table::Orders, &ops)
    }
}
