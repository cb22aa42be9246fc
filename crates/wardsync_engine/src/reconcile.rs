//! Reconciliation: turning local and remote sets into store operations.
//!
//! The main algorithm is a three-way set diff keyed by a stable identifier
//! (the UUID column):
//! - local and remote both have the key: update if any remote column differs
//! - only local has it: delete
//! - only remote has it: insert
//!
//! Records with localized names ([`diff_with_names`]) diff their structural
//! columns and their name map independently; a changed name map is replaced
//! wholesale. Server-owned tables use [`full_replace`], and the append-only
//! observation table uses [`AppendSet`].
//!
//! Every function here is pure: it reads rows and returns operations, adding
//! to the [`SyncReport`] counters as it goes.

use crate::report::SyncReport;
use std::collections::{BTreeMap, HashMap, HashSet};
use wardsync_store::{DbOperation, Filter, Row, Table, Value};

/// Column holding the locale in name tables.
pub const LOCALE_COLUMN: &str = "locale";

/// Column holding the localized name in name tables.
pub const NAME_COLUMN: &str = "name";

/// A remote record plus its localized names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRecord {
    /// Structural columns, including the key.
    pub row: Row,
    /// Names keyed by locale.
    pub names: BTreeMap<String, String>,
}

/// Where a record type keeps its localized names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameTable {
    /// The child table.
    pub table: Table,
    /// Column in the child table that references the owner's key.
    pub owner_column: &'static str,
}

enum Pairing<'a, T> {
    Both(&'a Row, T),
    LocalOnly(&'a Row, String),
    RemoteOnly(T),
}

/// Pairs local rows with remote items by key.
///
/// Local rows without a key are left alone: some tables tolerate rows that
/// were written before the server assigned an identifier. A remote key seen
/// twice keeps the later item.
fn pair_by_key<'a, T>(
    key_column: &str,
    local: &'a [Row],
    remote: Vec<(String, T)>,
    report: &mut SyncReport,
) -> Vec<Pairing<'a, T>> {
    let mut pending: Vec<Option<T>> = Vec::with_capacity(remote.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(remote.len());
    for (key, item) in remote {
        if let Some(previous) = index.insert(key.clone(), pending.len()) {
            tracing::warn!(key, "remote set contains a duplicate key; keeping the later record");
            pending[previous] = None;
        }
        pending.push(Some(item));
    }

    let mut pairs = Vec::new();
    for row in local {
        report.num_entries += 1;
        let Some(key) = row.text(key_column) else {
            tracing::debug!(column = key_column, "leaving local row without key untouched");
            continue;
        };
        match index.remove(key).and_then(|i| pending[i].take()) {
            Some(item) => pairs.push(Pairing::Both(row, item)),
            None => pairs.push(Pairing::LocalOnly(row, key.to_owned())),
        }
    }
    pairs.extend(pending.into_iter().flatten().map(Pairing::RemoteOnly));
    pairs
}

fn keyed_rows(key_column: &str, rows: Vec<Row>) -> Vec<(String, Row)> {
    rows.into_iter()
        .filter_map(|row| row.text(key_column).map(str::to_owned).map(|k| (k, row)))
        .collect()
}

/// Three-way diff of `local` against the complete `remote` set.
///
/// Remote rows without a key are ignored. Running the returned operations
/// and diffing again against the same remote set yields no operations.
pub fn diff_by_key(
    table: Table,
    key_column: &str,
    local: &[Row],
    remote: Vec<Row>,
    report: &mut SyncReport,
) -> Vec<DbOperation> {
    let mut ops = Vec::new();
    for pairing in pair_by_key(key_column, local, keyed_rows(key_column, remote), report) {
        match pairing {
            Pairing::Both(local_row, remote_row) => {
                if !local_row.contains(&remote_row) {
                    let key = remote_row.get(key_column).cloned().unwrap_or(Value::Null);
                    tracing::debug!(%table, %key, "will update");
                    ops.push(DbOperation::update(
                        table,
                        Filter::eq(key_column, key),
                        remote_row,
                    ));
                    report.num_updates += 1;
                }
            }
            Pairing::LocalOnly(_, key) => {
                tracing::debug!(%table, key, "will delete");
                ops.push(DbOperation::delete(table, Filter::eq(key_column, key)));
                report.num_deletes += 1;
            }
            Pairing::RemoteOnly(row) => {
                tracing::debug!(%table, key = ?row.get(key_column), "will insert");
                ops.push(DbOperation::insert(table, row));
                report.num_inserts += 1;
            }
        }
    }
    ops
}

fn group_names(names: NameTable, rows: &[Row]) -> HashMap<String, BTreeMap<String, String>> {
    let mut grouped: HashMap<String, BTreeMap<String, String>> = HashMap::new();
    for row in rows {
        let (Some(owner), Some(locale), Some(name)) = (
            row.text(names.owner_column),
            row.text(LOCALE_COLUMN),
            row.text(NAME_COLUMN),
        ) else {
            continue;
        };
        grouped
            .entry(owner.to_owned())
            .or_default()
            .insert(locale.to_owned(), name.to_owned());
    }
    grouped
}

/// Deletes the stored names of `owner`, counting one delete per name row.
fn delete_names(
    names: NameTable,
    owner: &str,
    stored: &BTreeMap<String, String>,
    ops: &mut Vec<DbOperation>,
    report: &mut SyncReport,
) {
    if stored.is_empty() {
        return;
    }
    ops.push(DbOperation::delete(
        names.table,
        Filter::eq(names.owner_column, owner),
    ));
    report.num_deletes += stored.len() as u64;
}

fn insert_names(
    names: NameTable,
    owner: &str,
    map: &BTreeMap<String, String>,
    ops: &mut Vec<DbOperation>,
    report: &mut SyncReport,
) {
    for (locale, name) in map {
        ops.push(DbOperation::insert(
            names.table,
            Row::new()
                .with(names.owner_column, owner)
                .with(LOCALE_COLUMN, locale.as_str())
                .with(NAME_COLUMN, name.as_str()),
        ));
        report.num_inserts += 1;
    }
}

/// Diff for records that carry a locale-keyed name map in a child table.
///
/// Structural columns are diffed as in [`diff_by_key`]. Independently, if a
/// record's name map differs from the stored one, every stored name for the
/// record is deleted and the full new map inserted; names are never patched
/// one by one. Deleting a record also deletes its names.
pub fn diff_with_names(
    table: Table,
    key_column: &str,
    names: NameTable,
    local_rows: &[Row],
    local_names: &[Row],
    remote: Vec<NamedRecord>,
    report: &mut SyncReport,
) -> Vec<DbOperation> {
    let stored_names = group_names(names, local_names);
    let empty = BTreeMap::new();

    let keyed: Vec<(String, NamedRecord)> = remote
        .into_iter()
        .filter_map(|r| r.row.text(key_column).map(str::to_owned).map(|k| (k, r)))
        .collect();

    let mut ops = Vec::new();
    for pairing in pair_by_key(key_column, local_rows, keyed, report) {
        match pairing {
            Pairing::Both(local_row, record) => {
                let key = record.row.text(key_column).unwrap_or_default().to_owned();
                if !local_row.contains(&record.row) {
                    tracing::debug!(%table, key, "will update");
                    ops.push(DbOperation::update(
                        table,
                        Filter::eq(key_column, key.as_str()),
                        record.row.clone(),
                    ));
                    report.num_updates += 1;
                }
                let stored = stored_names.get(&key).unwrap_or(&empty);
                if stored != &record.names {
                    tracing::debug!(%table, key, "will replace names");
                    delete_names(names, &key, stored, &mut ops, report);
                    insert_names(names, &key, &record.names, &mut ops, report);
                }
            }
            Pairing::LocalOnly(_, key) => {
                tracing::debug!(%table, key, "will delete");
                ops.push(DbOperation::delete(table, Filter::eq(key_column, key.as_str())));
                report.num_deletes += 1;
                let stored = stored_names.get(&key).unwrap_or(&empty);
                delete_names(names, &key, stored, &mut ops, report);
            }
            Pairing::RemoteOnly(record) => {
                let key = record.row.text(key_column).unwrap_or_default().to_owned();
                tracing::debug!(%table, key, "will insert");
                ops.push(DbOperation::insert(table, record.row));
                report.num_inserts += 1;
                insert_names(names, &key, &record.names, &mut ops, report);
            }
        }
    }
    ops
}

/// Replaces a whole table: delete everything, insert every remote row.
///
/// Any purely local data in the table is lost; use only for tables the
/// server owns outright.
pub fn full_replace(
    table: Table,
    local_count: usize,
    remote: Vec<Row>,
    report: &mut SyncReport,
) -> Vec<DbOperation> {
    report.num_entries += local_count as u64;
    report.num_deletes += local_count as u64;
    let mut ops = Vec::with_capacity(remote.len() + 1);
    ops.push(DbOperation::delete(table, Filter::all()));
    for row in remote {
        ops.push(DbOperation::insert(table, row));
        report.num_inserts += 1;
    }
    ops
}

fn composite_key(row: &Row, key_columns: &[&str]) -> Vec<Value> {
    key_columns
        .iter()
        .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
        .collect()
}

/// Inserts candidate rows whose composite key is not stored yet.
///
/// Used for append-only tables: existing rows are never updated or deleted,
/// and a candidate repeated within one batch is inserted once. The set
/// remembers what it has appended, so one instance can serve several pages
/// of candidates without querying the table again.
pub struct AppendSet<'k> {
    table: Table,
    key_columns: &'k [&'k str],
    seen: HashSet<Vec<Value>>,
}

impl<'k> AppendSet<'k> {
    /// Seeds the set with the rows already stored and counts them as
    /// examined entries.
    pub fn new(
        table: Table,
        key_columns: &'k [&'k str],
        local: &[Row],
        report: &mut SyncReport,
    ) -> Self {
        let seen = local
            .iter()
            .map(|row| composite_key(row, key_columns))
            .collect();
        report.num_entries += local.len() as u64;
        Self {
            table,
            key_columns,
            seen,
        }
    }

    /// Returns inserts for the candidates not seen so far.
    pub fn append(&mut self, candidates: Vec<Row>, report: &mut SyncReport) -> Vec<DbOperation> {
        let mut ops = Vec::new();
        for row in candidates {
            if self.seen.insert(composite_key(&row, self.key_columns)) {
                ops.push(DbOperation::insert(self.table, row));
                report.num_inserts += 1;
            }
        }
        ops
    }
}
