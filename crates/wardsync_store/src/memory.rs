//! In-memory store with savepoint snapshots.

use crate::error::{StoreError, StoreResult};
use crate::operation::{DbOperation, Filter};
use crate::store::LocalStore;
use crate::table::Table;
use crate::value::{Row, Value};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The full contents of a [`MemoryStore`].
///
/// Serializes as a JSON object keyed by table name. Empty tables are
/// omitted so two snapshots with the same rows are byte-identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreSnapshot {
    tables: BTreeMap<Table, Vec<Row>>,
}

impl StoreSnapshot {
    /// Rows of one table.
    pub fn rows(&self, table: Table) -> &[Row] {
        self.tables.get(&table).map_or(&[], Vec::as_slice)
    }

    fn prune(&mut self) {
        self.tables.retain(|_, rows| !rows.is_empty());
    }
}

#[derive(Debug)]
struct Savepoint {
    name: String,
    snapshot: StoreSnapshot,
}

#[derive(Debug, Default)]
struct Inner {
    data: StoreSnapshot,
    savepoints: Vec<Savepoint>,
}

/// An in-memory [`LocalStore`].
///
/// Each open savepoint keeps a copy of the tables taken when it was opened,
/// so rollback restores them exactly. This is suitable for:
/// - Unit and integration tests
/// - The CLI, which loads and saves the store as a JSON file
///
/// # Thread Safety
///
/// All state sits behind one lock; every trait method is atomic with
/// respect to the others.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given snapshot.
    #[must_use]
    pub fn from_snapshot(mut snapshot: StoreSnapshot) -> Self {
        snapshot.prune();
        Self {
            inner: RwLock::new(Inner {
                data: snapshot,
                savepoints: Vec::new(),
            }),
        }
    }

    /// Loads a store from a JSON snapshot file.
    ///
    /// A missing file yields an empty store.
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let json = fs::read_to_string(path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&json)?;
        tracing::debug!(path = %path.display(), "loaded store snapshot");
        Ok(Self::from_snapshot(snapshot))
    }

    /// Writes the committed contents to a JSON snapshot file.
    ///
    /// Changes made inside a savepoint that is still open are not written;
    /// see [`MemoryStore::committed_snapshot`].
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(&self.committed_snapshot())?;
        fs::write(path, json)?;
        tracing::debug!(path = %path.display(), "saved store snapshot");
        Ok(())
    }

    /// Returns a copy of every table as of the outermost open savepoint, or
    /// the current contents if no savepoint is open.
    pub fn committed_snapshot(&self) -> StoreSnapshot {
        let inner = self.inner.read();
        match inner.savepoints.first() {
            Some(outermost) => outermost.snapshot.clone(),
            None => inner.data.clone(),
        }
    }

    /// Returns a canonical JSON dump of every table.
    ///
    /// Two stores with equal contents produce identical dumps.
    pub fn dump(&self) -> String {
        // Row and table maps are ordered, so encoding is deterministic.
        serde_json::to_string(&self.inner.read().data).unwrap_or_default()
    }

    /// Number of rows in a table.
    pub fn count(&self, table: Table) -> usize {
        self.inner.read().data.rows(table).len()
    }

    /// Names of the currently open savepoints, outermost first.
    pub fn open_savepoints(&self) -> Vec<String> {
        self.inner
            .read()
            .savepoints
            .iter()
            .map(|sp| sp.name.clone())
            .collect()
    }

    fn find_savepoint(inner: &Inner, name: &str) -> StoreResult<usize> {
        inner
            .savepoints
            .iter()
            .rposition(|sp| sp.name == name)
            .ok_or_else(|| StoreError::NoSuchSavepoint(name.to_owned()))
    }
}

impl LocalStore for MemoryStore {
    fn start_named_transaction(&self, name: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let snapshot = inner.data.clone();
        inner.savepoints.push(Savepoint {
            name: name.to_owned(),
            snapshot,
        });
        Ok(())
    }

    fn release_named_transaction(&self, name: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let index = Self::find_savepoint(&inner, name)?;
        inner.savepoints.truncate(index);
        Ok(())
    }

    fn rollback_named_transaction(&self, name: &str) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let index = Self::find_savepoint(&inner, name)?;
        inner.savepoints.truncate(index + 1);
        inner.data = inner.savepoints[index].snapshot.clone();
        Ok(())
    }

    fn query(&self, table: Table, filter: &Filter) -> StoreResult<Vec<Row>> {
        let inner = self.inner.read();
        Ok(inner
            .data
            .rows(table)
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect())
    }

    fn apply_batch(&self, operations: &[DbOperation]) -> StoreResult<usize> {
        let mut inner = self.inner.write();

        // Work on a copy so a rejected operation leaves nothing behind.
        let mut staged = inner.data.clone();
        let mut affected = 0;
        for op in operations {
            affected += apply_one(&mut staged, op)?;
        }
        staged.prune();
        inner.data = staged;
        Ok(affected)
    }
}

fn key_of<'a>(table: Table, row: &'a Row) -> StoreResult<Option<(&'static str, &'a Value)>> {
    let Some(column) = table.key_column() else {
        return Ok(None);
    };
    match row.get(column) {
        None | Some(Value::Null) => Err(StoreError::apply(
            table,
            format!("missing key column {column}"),
        )),
        Some(Value::Text(s)) if s.is_empty() => Err(StoreError::apply(
            table,
            format!("empty key column {column}"),
        )),
        Some(value) => Ok(Some((column, value))),
    }
}

fn apply_one(data: &mut StoreSnapshot, op: &DbOperation) -> StoreResult<usize> {
    let table = op.table();
    let rows = data.tables.entry(table).or_default();

    match op {
        DbOperation::Insert { row, .. } => {
            if let Some((column, key)) = key_of(table, row)? {
                if rows.iter().any(|r| r.get(column) == Some(key)) {
                    return Err(StoreError::apply(table, format!("duplicate key {key}")));
                }
            }
            rows.push(row.clone());
            Ok(1)
        }
        DbOperation::Replace { row, .. } => {
            let Some((column, key)) = key_of(table, row)? else {
                return Err(StoreError::apply(table, "replace requires a key column"));
            };
            match rows.iter_mut().find(|r| r.get(column) == Some(key)) {
                Some(existing) => *existing = row.clone(),
                None => rows.push(row.clone()),
            }
            Ok(1)
        }
        DbOperation::Update { filter, values, .. } => {
            let mut matched = 0;
            for row in rows.iter_mut().filter(|r| filter.matches(r)) {
                row.merge(values);
                matched += 1;
            }
            if matched == 0 {
                return Err(StoreError::apply(table, "update matched no rows"));
            }
            Ok(matched)
        }
        DbOperation::Delete { filter, .. } => {
            let before = rows.len();
            rows.retain(|r| !filter.matches(r));
            Ok(before - rows.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn patient(uuid: &str, name: &str) -> Row {
        Row::new().with("uuid", uuid).with("given_name", name)
    }

    #[test]
    fn new_store_is_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.count(Table::Patients), 0);
        assert_eq!(store.dump(), "{}");
    }

    #[test]
    fn insert_update_delete() {
        let store = MemoryStore::new();
        let affected = store
            .apply_batch(&[
                DbOperation::insert(Table::Patients, patient("p1", "Jan")),
                DbOperation::insert(Table::Patients, patient("p2", "Bob")),
            ])
            .unwrap();
        assert_eq!(affected, 2);

        store
            .apply_batch(&[
                DbOperation::update(
                    Table::Patients,
                    Filter::eq("uuid", "p1"),
                    Row::new().with("given_name", "Jane"),
                ),
                DbOperation::delete(Table::Patients, Filter::eq("uuid", "p2")),
            ])
            .unwrap();

        let rows = store.query(Table::Patients, &Filter::all()).unwrap();
        assert_eq!(rows, vec![patient("p1", "Jane")]);
    }

    #[test]
    fn rejected_batch_leaves_no_trace() {
        let store = MemoryStore::new();
        store
            .apply_batch(&[DbOperation::insert(Table::Patients, patient("p1", "Jan"))])
            .unwrap();
        let before = store.dump();

        let err = store
            .apply_batch(&[
                DbOperation::insert(Table::Patients, patient("p2", "Bob")),
                DbOperation::insert(Table::Patients, patient("p1", "Dup")),
            ])
            .unwrap_err();
        assert!(err.is_apply());
        assert_eq!(store.dump(), before);
    }

    #[test]
    fn insert_requires_key() {
        let store = MemoryStore::new();
        let err = store
            .apply_batch(&[DbOperation::insert(
                Table::Patients,
                Row::new().with("given_name", "Nobody"),
            )])
            .unwrap_err();
        assert!(err.is_apply());

        let err = store
            .apply_batch(&[DbOperation::insert(Table::Patients, patient("", "Empty"))])
            .unwrap_err();
        assert!(err.is_apply());
    }

    #[test]
    fn keyless_tables_accept_duplicates() {
        let store = MemoryStore::new();
        let obs = Row::new()
            .with("patient_uuid", "p1")
            .with("concept_uuid", "c1");
        store
            .apply_batch(&[
                DbOperation::insert(Table::Observations, obs.clone()),
                DbOperation::insert(Table::Observations, obs),
            ])
            .unwrap();
        assert_eq!(store.count(Table::Observations), 2);
    }

    #[test]
    fn update_without_match_is_rejected() {
        let store = MemoryStore::new();
        let err = store
            .apply_batch(&[DbOperation::update(
                Table::Orders,
                Filter::eq("uuid", "missing"),
                Row::new().with("instructions", "x"),
            )])
            .unwrap_err();
        assert!(err.is_apply());
    }

    #[test]
    fn replace_upserts_by_key() {
        let store = MemoryStore::new();
        let fact = |v: i64| Row::new().with("key", "sync").with("full_sync_start_millis", v);
        store
            .apply_batch(&[DbOperation::replace(Table::Misc, fact(1))])
            .unwrap();
        store
            .apply_batch(&[DbOperation::replace(Table::Misc, fact(2))])
            .unwrap();
        let rows = store.query(Table::Misc, &Filter::all()).unwrap();
        assert_eq!(rows, vec![fact(2)]);
    }

    #[test]
    fn rollback_restores_state_and_keeps_savepoint() {
        let store = MemoryStore::new();
        store
            .apply_batch(&[DbOperation::insert(Table::Users, Row::new().with("uuid", "u1"))])
            .unwrap();
        let before = store.dump();

        store.start_named_transaction("SYNC").unwrap();
        store
            .apply_batch(&[
                DbOperation::delete(Table::Users, Filter::all()),
                DbOperation::insert(Table::Users, Row::new().with("uuid", "u2")),
            ])
            .unwrap();
        assert_ne!(store.dump(), before);

        store.rollback_named_transaction("SYNC").unwrap();
        assert_eq!(store.dump(), before);
        assert_eq!(store.open_savepoints(), vec!["SYNC".to_string()]);

        store.release_named_transaction("SYNC").unwrap();
        assert!(store.open_savepoints().is_empty());
    }

    #[test]
    fn release_keeps_changes() {
        let store = MemoryStore::new();
        store.start_named_transaction("SYNC").unwrap();
        store
            .apply_batch(&[DbOperation::insert(Table::Forms, Row::new().with("uuid", "f1"))])
            .unwrap();
        store.release_named_transaction("SYNC").unwrap();
        assert_eq!(store.count(Table::Forms), 1);
    }

    #[test]
    fn release_closes_nested_savepoints() {
        let store = MemoryStore::new();
        store.start_named_transaction("outer").unwrap();
        store.start_named_transaction("inner").unwrap();
        store.release_named_transaction("outer").unwrap();
        assert!(store.open_savepoints().is_empty());
        assert!(matches!(
            store.rollback_named_transaction("inner"),
            Err(StoreError::NoSuchSavepoint(_))
        ));
    }

    #[test]
    fn unknown_savepoint() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.release_named_transaction("nope"),
            Err(StoreError::NoSuchSavepoint(_))
        ));
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryStore::new();
        store
            .apply_batch(&[DbOperation::insert(Table::Patients, patient("p1", "Jan"))])
            .unwrap();
        store.save(&path).unwrap();

        let loaded = MemoryStore::load(&path).unwrap();
        assert_eq!(loaded.dump(), store.dump());
    }

    #[test]
    fn save_skips_changes_in_open_savepoint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryStore::new();
        store
            .apply_batch(&[DbOperation::insert(Table::Users, Row::new().with("uuid", "u1"))])
            .unwrap();
        store.start_named_transaction("SYNC").unwrap();
        store
            .apply_batch(&[DbOperation::insert(Table::Forms, Row::new().with("uuid", "f1"))])
            .unwrap();
        store.save(&path).unwrap();
        store.rollback_named_transaction("SYNC").unwrap();
        store.release_named_transaction("SYNC").unwrap();

        let loaded = MemoryStore::load(&path).unwrap();
        assert_eq!(loaded.count(Table::Forms), 0);
        assert_eq!(loaded.count(Table::Users), 1);
        assert_eq!(loaded.dump(), store.dump());
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(store.dump(), "{}");
    }
}
