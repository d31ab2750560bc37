//! Column definitions: declared types and constraints.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Value;

/// The declared type of a column. `Date`/`Time`/`Email` are stored as
/// `TEXT` at the value level but are checked against the typed literal
/// they came from at insert/update time.
///
/// Serializes as its uppercase SQL keyword (`INT`, `FLOAT`, ...), the
/// same spelling `meta.json`'s `columns[].type` field uses on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Int,
    Float,
    Text,
    Bool,
    Date,
    Time,
    Email,
}

impl ColumnType {
    /// Whether `value` is an acceptable runtime representation of this
    /// column type. `Null` is always acceptable here; `NOT NULL` is
    /// checked separately.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Int, Value::Int(_))
            | (Self::Float, Value::Int(_) | Value::Float(_))
            | (Self::Bool, Value::Bool(_))
            | (Self::Text | Self::Date | Self::Time | Self::Email, Value::Text(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "INT",
            Self::Float => "FLOAT",
            Self::Text => "TEXT",
            Self::Bool => "BOOL",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Email => "EMAIL",
        };
        write!(f, "{name}")
    }
}

/// A single column's declaration within a table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub unique: bool,
    pub not_null: bool,
    pub auto_increment: bool,
}

impl Column {
    /// A plain, unconstrained column.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
            unique: false,
            not_null: false,
            auto_increment: false,
        }
    }

    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self.unique = true;
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}

/// Validates the whole-table constraints that don't belong to a single
/// column: at most one primary key, and an auto-increment column, if
/// any, must be the integer-typed primary key.
///
/// # Errors
///
/// Returns a message naming the violated invariant.
pub fn validate_columns(columns: &[Column]) -> Result<(), String> {
    let primary_keys: Vec<&Column> = columns.iter().filter(|c| c.primary_key).collect();
    if primary_keys.len() > 1 {
        return Err(format!(
            "table has {} primary key columns, at most one is allowed",
            primary_keys.len()
        ));
    }

    let auto_increments: Vec<&Column> = columns.iter().filter(|c| c.auto_increment).collect();
    if auto_increments.len() > 1 {
        return Err("table declares more than one auto-increment column".to_string());
    }
    if let Some(col) = auto_increments.first() {
        if !col.primary_key {
            return Err(format!(
                "auto-increment column '{}' must also be the primary key",
                col.name
            ));
        }
        if col.column_type != ColumnType::Int {
            return Err(format!(
                "auto-increment column '{}' must be INT, found {}",
                col.name, col.column_type
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_implies_not_null_and_unique() {
        let col = Column::new("id", ColumnType::Int).primary_key();
        assert!(col.not_null);
        assert!(col.unique);
    }

    #[test]
    fn test_column_type_accepts_null_always() {
        assert!(ColumnType::Int.accepts(&Value::Null));
    }

    #[test]
    fn test_float_column_accepts_int_value() {
        assert!(ColumnType::Float.accepts(&Value::Int(3)));
    }

    #[test]
    fn test_validate_rejects_two_primary_keys() {
        let columns = vec![
            Column::new("a", ColumnType::Int).primary_key(),
            Column::new("b", ColumnType::Int).primary_key(),
        ];
        assert!(validate_columns(&columns).is_err());
    }

    #[test]
    fn test_validate_rejects_auto_increment_not_primary_key() {
        let columns = vec![Column::new("a", ColumnType::Int).auto_increment()];
        assert!(validate_columns(&columns).is_err());
    }

    #[test]
    fn test_validate_rejects_non_int_auto_increment() {
        let columns = vec![Column::new("a", ColumnType::Text)
            .primary_key()
            .auto_increment()];
        assert!(validate_columns(&columns).is_err());
    }

    #[test]
    fn test_validate_accepts_well_formed_schema() {
        let columns = vec![
            Column::new("id", ColumnType::Int).primary_key().auto_increment(),
            Column::new("email", ColumnType::Email).unique().not_null(),
        ];
        assert!(validate_columns(&columns).is_ok());
    }
}
