//! Sync bookkeeping kept in the local store.
//!
//! - Full-sync start/end times live in the [`Table::Misc`] row keyed `sync`.
//!   A non-null end time means a full sync completed against this store.
//! - Incremental feed positions live in [`Table::Bookmarks`], one row per
//!   table.

use crate::error::SyncResult;
use serde::Serialize;
use wardsync_store::{DbOperation, Filter, LocalStore, Row, Table, Value};

/// Key of the [`Table::Misc`] row holding sync times.
pub const SYNC_MISC_KEY: &str = "sync";

const START_COLUMN: &str = "full_sync_start_millis";
const END_COLUMN: &str = "full_sync_end_millis";
const BOOKMARK_COLUMN: &str = "bookmark";

/// Recorded full-sync times, in epoch millis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FullSyncTimes {
    /// When the last full sync started.
    pub start_millis: Option<i64>,
    /// When the last full sync finished, if it finished cleanly.
    pub end_millis: Option<i64>,
}

fn sync_row(store: &dyn LocalStore) -> SyncResult<Option<Row>> {
    Ok(store
        .query(Table::Misc, &Filter::eq("key", SYNC_MISC_KEY))?
        .into_iter()
        .next())
}

/// Reads the recorded full-sync times.
pub fn full_sync_times(store: &dyn LocalStore) -> SyncResult<FullSyncTimes> {
    let row = sync_row(store)?;
    let millis = |column: &str| row.as_ref().and_then(|r| r.get(column)).and_then(Value::as_integer);
    Ok(FullSyncTimes {
        start_millis: millis(START_COLUMN),
        end_millis: millis(END_COLUMN),
    })
}

/// Returns true once a full sync has completed against this store.
pub fn has_completed_full_sync(store: &dyn LocalStore) -> SyncResult<bool> {
    Ok(full_sync_times(store)?.end_millis.is_some())
}

/// Records the start of a full sync, keeping any previous end time.
pub fn record_full_sync_start(store: &dyn LocalStore, now_millis: i64) -> SyncResult<()> {
    let mut row = sync_row(store)?.unwrap_or_default();
    row.set("key", SYNC_MISC_KEY);
    row.set(START_COLUMN, now_millis);
    tracing::info!(start_millis = now_millis, "recording full sync start time");
    store.apply_batch(&[DbOperation::replace(Table::Misc, row)])?;
    Ok(())
}

/// Records the end of a full sync.
///
/// If the start time has vanished, the store was cleared while the sync
/// ran; the end time is then stored as null so the sync does not count.
pub fn record_full_sync_end(store: &dyn LocalStore, now_millis: i64) -> SyncResult<()> {
    let mut row = sync_row(store)?.unwrap_or_default();
    let started = row.get(START_COLUMN).is_some_and(|v| !v.is_null());
    let end = if started {
        Value::Integer(now_millis)
    } else {
        tracing::error!("store was cleared during sync; not recording full sync end");
        Value::Null
    };
    tracing::info!(end_millis = %end, "recording full sync end time");
    row.set("key", SYNC_MISC_KEY);
    row.set(END_COLUMN, end);
    store.apply_batch(&[DbOperation::replace(Table::Misc, row)])?;
    Ok(())
}

/// Reads the feed position stored for `table`.
pub fn bookmark(store: &dyn LocalStore, table: Table) -> SyncResult<Option<String>> {
    Ok(store
        .query(Table::Bookmarks, &Filter::eq("table_name", table.name()))?
        .into_iter()
        .next()
        .and_then(|row| row.text(BOOKMARK_COLUMN).map(str::to_owned)))
}

/// The operation that stores `token` as the feed position for `table`.
pub fn set_bookmark_op(table: Table, token: &str) -> DbOperation {
    DbOperation::replace(
        Table::Bookmarks,
        Row::new()
            .with("table_name", table.name())
            .with(BOOKMARK_COLUMN, token),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardsync_store::MemoryStore;

    #[test]
    fn fresh_store_has_no_full_sync() {
        let store = MemoryStore::new();
        assert_eq!(full_sync_times(&store).unwrap(), FullSyncTimes::default());
        assert!(!has_completed_full_sync(&store).unwrap());
    }

    #[test]
    fn start_then_end() {
        let store = MemoryStore::new();
        record_full_sync_start(&store, 1_000).unwrap();
        assert!(!has_completed_full_sync(&store).unwrap());

        record_full_sync_end(&store, 2_000).unwrap();
        assert_eq!(
            full_sync_times(&store).unwrap(),
            FullSyncTimes {
                start_millis: Some(1_000),
                end_millis: Some(2_000),
            }
        );
        assert!(has_completed_full_sync(&store).unwrap());

        // A later start keeps the previous end.
        record_full_sync_start(&store, 3_000).unwrap();
        assert_eq!(full_sync_times(&store).unwrap().end_millis, Some(2_000));
    }

    #[test]
    fn end_without_start_is_null() {
        let store = MemoryStore::new();
        record_full_sync_end(&store, 2_000).unwrap();
        assert_eq!(full_sync_times(&store).unwrap().end_millis, None);
        assert!(!has_completed_full_sync(&store).unwrap());
    }

    #[test]
    fn bookmarks() {
        let store = MemoryStore::new();
        assert_eq!(bookmark(&store, Table::Observations).unwrap(), None);

        store
            .apply_batch(&[set_bookmark_op(Table::Observations, "seq:4")])
            .unwrap();
        store
            .apply_batch(&[set_bookmark_op(Table::Observations, "seq:9")])
            .unwrap();
        assert_eq!(
            bookmark(&store, Table::Observations).unwrap().as_deref(),
            Some("seq:9")
        );
        assert_eq!(store.count(Table::Bookmarks), 1);
    }
}
