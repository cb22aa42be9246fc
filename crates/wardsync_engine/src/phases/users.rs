//! Users: replaced wholesale on every sync.

use super::{apply, require_uuid, PhaseContext, PhaseWorker};
use crate::error::SyncResult;
use crate::reconcile::full_replace;
use crate::report::SyncReport;
use crate::request::Phase;
use wardsync_store::{Filter, Row, Table};

/// Replaces the user table with the server's user list.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsersWorker;

impl PhaseWorker for UsersWorker {
    fn phase(&self) -> Phase {
        Phase::Users
    }

    fn sync(&self, ctx: &PhaseContext<'_>, report: &mut SyncReport) -> SyncResult<()> {
        let users = ctx.remote.list_users()?;
        let mut rows = Vec::with_capacity(users.len());
        for user in users {
            require_uuid("users", &user.uuid)?;
            rows.push(
                Row::new()
                    .with("uuid", user.uuid)
                    .with("full_name", user.full_name),
            );
        }

        let local_count = ctx.store.query(Table::Users, &Filter::all())?.len();
        tracing::info!(local = local_count, remote = rows.len(), "replacing users");
        let ops = full_replace(Table::Users, local_count, rows, report);
        apply(ctx.store, Table::Users, &ops)
    }
}
