//! Column values and rows.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single column value.
///
/// Only the shapes the sync tables need are supported: text, integers,
/// and null. Floats are carried as text by the remote records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL-style null.
    Null,
    /// Signed integer.
    Integer(i64),
    /// UTF-8 text.
    Text(String),
}

impl Value {
    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content, if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A table row: column name to value.
///
/// Columns are kept sorted so two rows with the same content compare
/// and serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column setter.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Sets a column.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    /// Gets a column value; missing columns read as `None`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Gets a column as text.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_text)
    }

    /// Iterates over `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if every column in `other` has the same value here.
    ///
    /// A column missing on this side matches only a null in `other`.
    pub fn contains(&self, other: &Row) -> bool {
        other
            .iter()
            .all(|(column, value)| self.get(column).unwrap_or(&Value::Null) == value)
    }

    /// Overwrites the columns present in `values`, keeping the rest.
    pub fn merge(&mut self, values: &Row) {
        for (column, value) in values.iter() {
            self.0.insert(column.clone(), value.clone());
        }
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_converts_to_null() {
        let none: Option<&str> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn contains_ignores_extra_local_columns() {
        let local = Row::new()
            .with("uuid", "p1")
            .with("given_name", "Jan")
            .with("local_note", "seen");
        let remote = Row::new().with("uuid", "p1").with("given_name", "Jan");
        assert!(local.contains(&remote));

        let changed = Row::new().with("uuid", "p1").with("given_name", "Jane");
        assert!(!local.contains(&changed));
    }

    #[test]
    fn missing_column_matches_null_only() {
        let local = Row::new().with("uuid", "o1");
        let remote = Row::new().with("uuid", "o1").with("stop_millis", Value::Null);
        assert!(local.contains(&remote));

        let remote = Row::new().with("uuid", "o1").with("stop_millis", 5);
        assert!(!local.contains(&remote));
    }

    #[test]
    fn merge_overwrites_only_given_columns() {
        let mut row = Row::new().with("uuid", "l1").with("parent_uuid", "root");
        row.merge(&Row::new().with("parent_uuid", "ward-a"));
        assert_eq!(row.text("uuid"), Some("l1"));
        assert_eq!(row.text("parent_uuid"), Some("ward-a"));
    }

    #[test]
    fn json_shape_is_flat() {
        let row = Row::new().with("uuid", "u1").with("age", 40).with("note", Value::Null);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"age":40,"note":null,"uuid":"u1"}"#);
        let back: Row = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }
}
