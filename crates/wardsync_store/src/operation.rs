//! Typed mutations applied to the local store.

use crate::table::Table;
use crate::value::{Row, Value};

/// Selects rows by column equality. An empty filter selects every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Selects every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Selects rows where `column == value`.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(column, value)
    }

    /// Adds another equality condition.
    #[must_use]
    pub fn and(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    /// Returns true if `row` satisfies every condition.
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(column, value)| row.get(column).unwrap_or(&Value::Null) == value)
    }
}

/// A single mutation against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbOperation {
    /// Inserts a new row. Fails if the table's key is missing or taken.
    Insert {
        /// Target table.
        table: Table,
        /// Row to insert.
        row: Row,
    },
    /// Inserts a row, replacing any row with the same key.
    Replace {
        /// Target table (must have a key column).
        table: Table,
        /// Row to store.
        row: Row,
    },
    /// Overwrites columns on matching rows. Fails if nothing matches.
    Update {
        /// Target table.
        table: Table,
        /// Rows to update.
        filter: Filter,
        /// Columns to overwrite.
        values: Row,
    },
    /// Deletes matching rows.
    Delete {
        /// Target table.
        table: Table,
        /// Rows to delete.
        filter: Filter,
    },
}

impl DbOperation {
    /// Creates an insert.
    pub fn insert(table: Table, row: Row) -> Self {
        Self::Insert { table, row }
    }

    /// Creates a replace.
    pub fn replace(table: Table, row: Row) -> Self {
        Self::Replace { table, row }
    }

    /// Creates an update.
    pub fn update(table: Table, filter: Filter, values: Row) -> Self {
        Self::Update {
            table,
            filter,
            values,
        }
    }

    /// Creates a delete.
    pub fn delete(table: Table, filter: Filter) -> Self {
        Self::Delete { table, filter }
    }

    /// The table this operation targets.
    pub fn table(&self) -> Table {
        match self {
            DbOperation::Insert { table, .. }
            | DbOperation::Replace { table, .. }
            | DbOperation::Update { table, .. }
            | DbOperation::Delete { table, .. } => *table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::all().matches(&Row::new()));
    }

    #[test]
    fn conjunctive_filter() {
        let row = Row::new().with("location_uuid", "l1").with("locale", "fr");
        assert!(Filter::eq("location_uuid", "l1").matches(&row));
        assert!(Filter::eq("location_uuid", "l1").and("locale", "fr").matches(&row));
        assert!(!Filter::eq("location_uuid", "l1").and("locale", "en").matches(&row));
    }

    #[test]
    fn operation_table() {
        let op = DbOperation::delete(Table::Forms, Filter::all());
        assert_eq!(op.table(), Table::Forms);
    }
}
