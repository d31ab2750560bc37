//! Rows: ordered column-name-to-value maps.

use super::Value;

/// An ordered mapping from column name to value. A missing key denotes
/// SQL NULL. Rows are cheap to copy and immutable once built; mutations
/// (`Update`) always produce a new row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// An empty row.
    #[must_use]
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Builds a row from ordered `(column, value)` pairs.
    #[must_use]
    pub fn from_pairs(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// Looks up a column by exact (possibly table-qualified) key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Looks up a column the way predicate/projection resolution does:
    /// try `table.col` first (if a table is given), then the bare
    /// column name.
    #[must_use]
    pub fn resolve(&self, table: Option<&str>, column: &str) -> Option<&Value> {
        if let Some(table) = table {
            let qualified = format!("{table}.{column}");
            if let Some(v) = self.get(&qualified) {
                return Some(v);
            }
        }
        self.get(column)
    }

    /// Inserts or overwrites a column's value, preserving the existing
    /// position if the key is already present.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(entry) = self.columns.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.columns.push((key, value));
        }
    }

    /// Iterates the row's `(column, value)` pairs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns present (not counting implicit NULLs for
    /// missing keys).
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Re-keys every column by prefixing it with `table.`, as the hash
    /// join does when assembling a joined row's namespace.
    #[must_use]
    pub fn qualify(&self, table: &str) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (format!("{table}.{k}"), v.clone()))
                .collect(),
        }
    }

    /// Merges `other`'s columns into a copy of `self`. Used to combine
    /// the two sides of a joined row.
    #[must_use]
    pub fn merged_with(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (k, v) in &other.columns {
            merged.set(k.clone(), v.clone());
        }
        merged
    }

    /// Encodes the row as a JSON object, in column order.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Decodes a row from a JSON object, in the column order given by
    /// `schema_order` (falling back to the object's own key order for
    /// any keys not named there).
    #[must_use]
    pub fn from_json(value: &serde_json::Value, schema_order: &[String]) -> Self {
        let serde_json::Value::Object(map) = value else {
            return Self::new();
        };
        let mut columns = Vec::with_capacity(map.len());
        for name in schema_order {
            if let Some(v) = map.get(name) {
                columns.push((name.clone(), Value::from_json(v)));
            }
        }
        for (k, v) in map {
            if !schema_order.contains(k) {
                columns.push((k.clone(), Value::from_json(v)));
            }
        }
        Self { columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_qualified_then_bare() {
        let mut row = Row::new();
        row.set("users.id", Value::Int(1));
        row.set("id", Value::Int(2));
        assert_eq!(row.resolve(Some("users"), "id"), Some(&Value::Int(1)));
        assert_eq!(row.resolve(Some("orders"), "id"), Some(&Value::Int(2)));
        assert_eq!(row.resolve(None, "id"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_qualify_and_merge() {
        let mut left = Row::new();
        left.set("id", Value::Int(1));
        let mut right = Row::new();
        right.set("id", Value::Int(2));

        let joined = left.qualify("users").merged_with(&right.qualify("orders"));
        assert_eq!(joined.get("users.id"), Some(&Value::Int(1)));
        assert_eq!(joined.get("orders.id"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_json_roundtrip_preserves_schema_order() {
        let schema_order = vec!["id".to_string(), "name".to_string()];
        let json = serde_json::json!({"name": "bob", "id": 1});
        let row = Row::from_json(&json, &schema_order);
        let mut it = row.iter();
        assert_eq!(it.next(), Some(("id", &Value::Int(1))));
        assert_eq!(it.next(), Some(("name", &Value::Text("bob".to_string()))));
    }
}
