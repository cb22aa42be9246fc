//! Local tables known to the sync engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A table in the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// Server-owned user accounts.
    Users,
    /// Location tree (uuid, parent_uuid).
    Locations,
    /// Localized location names (location_uuid, locale, name).
    LocationNames,
    /// Clinical concepts (uuid, xform_id, concept_type).
    Concepts,
    /// Localized concept names (concept_uuid, locale, name).
    ConceptNames,
    /// Chart layout, one row per charted concept.
    ChartItems,
    /// Patients.
    Patients,
    /// Observations, append-only, keyed by (patient, encounter, concept).
    Observations,
    /// Treatment orders.
    Orders,
    /// Data-entry forms.
    Forms,
    /// Single-row bookkeeping facts such as full-sync timestamps.
    Misc,
    /// Per-table incremental sync tokens.
    Bookmarks,
}

impl Table {
    /// Every table, in declaration order.
    pub const ALL: [Table; 12] = [
        Table::Users,
        Table::Locations,
        Table::LocationNames,
        Table::Concepts,
        Table::ConceptNames,
        Table::ChartItems,
        Table::Patients,
        Table::Observations,
        Table::Orders,
        Table::Forms,
        Table::Misc,
        Table::Bookmarks,
    ];

    /// The table's name.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Locations => "locations",
            Table::LocationNames => "location_names",
            Table::Concepts => "concepts",
            Table::ConceptNames => "concept_names",
            Table::ChartItems => "chart_items",
            Table::Patients => "patients",
            Table::Observations => "observations",
            Table::Orders => "orders",
            Table::Forms => "forms",
            Table::Misc => "misc",
            Table::Bookmarks => "bookmarks",
        }
    }

    /// Parses a table name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// The unique key column, if the table has one.
    ///
    /// Child collections and observations have no single-column key.
    pub fn key_column(&self) -> Option<&'static str> {
        match self {
            Table::Users
            | Table::Locations
            | Table::Concepts
            | Table::Patients
            | Table::Orders
            | Table::Forms => Some("uuid"),
            Table::Misc => Some("key"),
            Table::Bookmarks => Some("table_name"),
            Table::LocationNames
            | Table::ConceptNames
            | Table::ChartItems
            | Table::Observations => None,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for table in Table::ALL {
            assert_eq!(Table::from_name(table.name()), Some(table));
        }
        assert_eq!(Table::from_name("nope"), None);
    }

    #[test]
    fn child_tables_have_no_key() {
        assert_eq!(Table::Patients.key_column(), Some("uuid"));
        assert_eq!(Table::LocationNames.key_column(), None);
        assert_eq!(Table::Observations.key_column(), None);
    }
}
