//! In-memory tables: rows, indexes, and constraint-checked mutation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use super::{Column, ColumnType, Index, Row, Value};

/// A constraint violation raised by `Table` mutation methods.
#[derive(Debug, thiserror::Error)]
pub enum ConstraintError {
    #[error("column '{table}.{column}' expects {expected} but got {found}")]
    TypeMismatch {
        table: String,
        column: String,
        expected: ColumnType,
        found: &'static str,
    },

    #[error("column '{table}.{column}' is NOT NULL")]
    NotNullViolation { table: String, column: String },

    #[error("value '{value}' already exists for unique column '{table}.{column}'")]
    UniqueViolation {
        table: String,
        column: String,
        value: String,
    },

    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },

    #[error("table '{table}' has no index on column '{column}'")]
    NoSuchIndex { table: String, column: String },

    #[error(
        "value for auto-increment column '{table}.{column}' must be an integer strictly \
         greater than the current last-inserted id"
    )]
    AutoIncrementConflict { table: String, column: String },
}

/// An in-memory table: its schema, its rows, and the indexes built over
/// primary-key and unique columns. Reads take a shared lock over the
/// row vector; writes (`insert`/`update`/`delete`) take an exclusive
/// lock, giving table-level reader/writer concurrency.
pub struct Table {
    name: String,
    columns: Vec<Column>,
    rows: RwLock<Vec<Row>>,
    indexes: RwLock<HashMap<String, Index>>,
    last_insert_id: Mutex<i64>,
    dirty: AtomicBool,
}

impl Table {
    /// Builds an empty table from a validated column list. Indexes are
    /// created eagerly for every primary-key or unique column.
    ///
    /// # Errors
    ///
    /// Returns the message from [`super::column::validate_columns`] if
    /// the schema is ill-formed.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self, String> {
        super::column::validate_columns(&columns)?;

        let mut indexes = HashMap::new();
        for col in &columns {
            if col.primary_key || col.unique {
                indexes.insert(col.name.clone(), Index::new(true));
            }
        }

        Ok(Self {
            name: name.into(),
            columns,
            rows: RwLock::new(Vec::new()),
            indexes: RwLock::new(indexes),
            last_insert_id: Mutex::new(0),
            dirty: AtomicBool::new(false),
        })
    }

    /// Rebuilds a table from a snapshot's already-validated rows, the
    /// way the registry's loader does: the rows were written by a
    /// prior, already-constraint-checked session, so they are trusted
    /// as-is and only the indexes need building.
    ///
    /// # Errors
    ///
    /// Returns the message from [`super::column::validate_columns`] if
    /// the schema is ill-formed.
    pub fn from_snapshot(
        name: impl Into<String>,
        columns: Vec<Column>,
        rows: Vec<Row>,
        last_insert_id: i64,
    ) -> Result<Self, String> {
        let table = Self::new(name, columns)?;
        *table.rows.write().expect("row lock poisoned") = rows;
        *table.last_insert_id.lock().expect("id lock poisoned") = last_insert_id;
        table.rebuild_indexes();
        Ok(table)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn primary_key_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }

    #[must_use]
    pub fn last_insert_id(&self) -> i64 {
        *self.last_insert_id.lock().expect("id lock poisoned")
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.read().expect("row lock poisoned").len()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::Release);
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Rebuilds every primary-key/unique index from the current row
    /// vector. Used after loading a snapshot and after WAL replay,
    /// since both paths populate the row vector directly rather than
    /// through `insert`.
    pub fn rebuild_indexes(&self) {
        let rows = self.rows.read().expect("row lock poisoned");
        let mut indexes = self.indexes.write().expect("index lock poisoned");
        for col in &self.columns {
            if !(col.primary_key || col.unique) {
                continue;
            }
            let Some(index) = indexes.get_mut(&col.name) else {
                continue;
            };
            let keys: Vec<(usize, String)> = rows
                .iter()
                .enumerate()
                .map(|(pos, row)| (pos, row.get(&col.name).unwrap_or(&Value::Null).canonical_key()))
                .filter(|(_, key)| !key.is_empty())
                .collect();
            index.rebuild(keys.iter().map(|(pos, key)| (*pos, key.as_str())));
        }
    }

    /// Appends `row` to the table with no constraint checking, as WAL
    /// replay requires — validation and constraint checks are skipped,
    /// since they ran when the record was originally written. If the
    /// table has an auto-increment primary key and `row`'s value for it
    /// exceeds the tracked `last_insert_id`, the counter is advanced to
    /// match, preserving the invariant that `last_insert_id` is at
    /// least every existing value.
    pub fn replay_insert(&self, row: Row) {
        if let Some(col) = self.columns.iter().find(|c| c.auto_increment) {
            if let Some(Value::Int(id)) = row.get(&col.name) {
                let mut last_id = self.last_insert_id.lock().expect("id lock poisoned");
                if *id > *last_id {
                    *last_id = *id;
                }
            }
        }
        self.rows.write().expect("row lock poisoned").push(row);
        self.mark_dirty();
    }

    /// Replaces the row whose primary key's canonical textual form
    /// equals `key`, as WAL replay's Update step requires. Returns
    /// `false` (logged and skipped by the caller) if no such row exists.
    #[must_use]
    pub fn replay_update(&self, key_column: &str, key: &str, row: Row) -> bool {
        let mut rows = self.rows.write().expect("row lock poisoned");
        let Some(position) = rows
            .iter()
            .position(|r| r.get(key_column).unwrap_or(&Value::Null).canonical_key() == key)
        else {
            return false;
        };
        rows[position] = row;
        drop(rows);
        self.mark_dirty();
        true
    }

    /// Removes the row whose primary key's canonical textual form
    /// equals `key`, as WAL replay's Delete step requires. Returns
    /// `false` if no such row exists.
    #[must_use]
    pub fn replay_delete(&self, key_column: &str, key: &str) -> bool {
        let mut rows = self.rows.write().expect("row lock poisoned");
        let before = rows.len();
        rows.retain(|r| r.get(key_column).unwrap_or(&Value::Null).canonical_key() != key);
        let removed = rows.len() != before;
        drop(rows);
        if removed {
            self.mark_dirty();
        }
        removed
    }

    /// Returns all rows, in insertion order. Takes the shared read lock.
    #[must_use]
    pub fn select_all(&self) -> Vec<Row> {
        self.rows.read().expect("row lock poisoned").clone()
    }

    /// Returns every row matching `predicate`.
    pub fn select<F>(&self, predicate: F) -> Vec<Row>
    where
        F: Fn(&Row) -> bool,
    {
        self.rows
            .read()
            .expect("row lock poisoned")
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    /// Returns rows whose `column` value canonically equals `value`,
    /// using the column's index when one exists, falling back to a
    /// linear scan otherwise.
    pub fn select_by_index(&self, column: &str, value: &Value) -> Vec<Row> {
        let key = value.canonical_key();
        let indexes = self.indexes.read().expect("index lock poisoned");
        let rows = self.rows.read().expect("row lock poisoned");
        if let Some(index) = indexes.get(column) {
            index
                .positions(&key)
                .iter()
                .filter_map(|&pos| rows.get(pos).cloned())
                .collect()
        } else {
            rows.iter()
                .filter(|r| r.get(column).is_some_and(|v| v.values_equal(value)))
                .cloned()
                .collect()
        }
    }

    fn validate_row_against_schema(&self, row: &Row) -> Result<(), ConstraintError> {
        for col in &self.columns {
            let value = row.get(&col.name).unwrap_or(&Value::Null);
            if col.not_null && matches!(value, Value::Null) {
                return Err(ConstraintError::NotNullViolation {
                    table: self.name.clone(),
                    column: col.name.clone(),
                });
            }
            if !col.column_type.accepts(value) {
                return Err(ConstraintError::TypeMismatch {
                    table: self.name.clone(),
                    column: col.name.clone(),
                    expected: col.column_type,
                    found: value.type_name(),
                });
            }
        }
        Ok(())
    }

    fn check_unique_constraints(
        &self,
        row: &Row,
        indexes: &HashMap<String, Index>,
    ) -> Result<(), ConstraintError> {
        for col in &self.columns {
            if !col.unique {
                continue;
            }
            let value = row.get(&col.name).unwrap_or(&Value::Null);
            if matches!(value, Value::Null) {
                continue;
            }
            let key = value.canonical_key();
            if indexes
                .get(&col.name)
                .is_some_and(|idx| idx.would_violate_unique(&key))
            {
                return Err(ConstraintError::UniqueViolation {
                    table: self.name.clone(),
                    column: col.name.clone(),
                    value: key,
                });
            }
        }
        Ok(())
    }

    /// Inserts a row. An auto-increment column is either left for this
    /// method to assign (`last_insert_id + 1`) or, when the caller
    /// supplies a value, that value must be a strictly greater integer
    /// than the tracked `last_insert_id` — it then becomes the new
    /// `last_insert_id`. All other constraints (`NOT NULL`, type,
    /// uniqueness) are checked before the row is committed to the row
    /// vector.
    ///
    /// # Errors
    ///
    /// Returns a [`ConstraintError`] and leaves the table unmodified.
    pub fn insert(&self, mut row: Row) -> Result<Row, ConstraintError> {
        let auto_increment_column = self
            .columns
            .iter()
            .find(|c| c.auto_increment)
            .map(|c| c.name.clone());

        if let Some(ref col_name) = auto_increment_column {
            let mut last_id = self.last_insert_id.lock().expect("id lock poisoned");
            match row.get(col_name) {
                None | Some(Value::Null) => {
                    *last_id += 1;
                    row.set(col_name.clone(), Value::Int(*last_id));
                }
                Some(Value::Int(supplied)) if *supplied > *last_id => {
                    *last_id = *supplied;
                }
                _ => {
                    return Err(ConstraintError::AutoIncrementConflict {
                        table: self.name.clone(),
                        column: col_name.clone(),
                    });
                }
            }
        }

        self.validate_row_against_schema(&row)?;

        let mut rows = self.rows.write().expect("row lock poisoned");
        let mut indexes = self.indexes.write().expect("index lock poisoned");
        self.check_unique_constraints(&row, &indexes)?;

        let position = rows.len();
        for col in &self.columns {
            if col.primary_key || col.unique {
                let value = row.get(&col.name).unwrap_or(&Value::Null);
                if !matches!(value, Value::Null) {
                    if let Some(index) = indexes.get_mut(&col.name) {
                        index.insert(&value.canonical_key(), position);
                    }
                }
            }
        }
        rows.push(row.clone());
        drop(rows);
        drop(indexes);
        self.mark_dirty();
        Ok(row)
    }

    /// Updates every row matching `predicate` by applying `assignments`
    /// (column name to new value). Validates every resulting row before
    /// committing any of them, so a batch update is all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns a [`ConstraintError`] naming the first row/column to fail
    /// validation; no rows are modified in that case.
    pub fn update<F>(
        &self,
        predicate: F,
        assignments: &[(String, Value)],
    ) -> Result<usize, ConstraintError>
    where
        F: Fn(&Row) -> bool,
    {
        for (column, _) in assignments {
            if self.column(column).is_none() {
                return Err(ConstraintError::UnknownColumn {
                    table: self.name.clone(),
                    column: column.clone(),
                });
            }
        }

        let mut rows = self.rows.write().expect("row lock poisoned");
        let mut indexes = self.indexes.write().expect("index lock poisoned");

        let mut matched: Vec<(usize, Row)> = Vec::new();
        for (position, row) in rows.iter().enumerate() {
            if predicate(row) {
                let mut updated = row.clone();
                for (column, value) in assignments {
                    updated.set(column.clone(), value.clone());
                }
                matched.push((position, updated));
            }
        }

        for (position, updated) in &matched {
            self.validate_row_against_schema(updated)?;
            for col in &self.columns {
                if !col.unique {
                    continue;
                }
                let new_value = updated.get(&col.name).unwrap_or(&Value::Null);
                if matches!(new_value, Value::Null) {
                    continue;
                }
                let old_value = rows[*position].get(&col.name).unwrap_or(&Value::Null);
                if old_value.values_equal(new_value) {
                    continue;
                }
                let key = new_value.canonical_key();
                if indexes
                    .get(&col.name)
                    .is_some_and(|idx| idx.would_violate_unique(&key))
                {
                    return Err(ConstraintError::UniqueViolation {
                        table: self.name.clone(),
                        column: col.name.clone(),
                        value: key,
                    });
                }
            }
        }

        let count = matched.len();
        for (position, updated) in matched {
            for col in &self.columns {
                if col.primary_key || col.unique {
                    let old_value = rows[position].get(&col.name).unwrap_or(&Value::Null);
                    if let Some(index) = indexes.get_mut(&col.name) {
                        index.remove_position(&old_value.canonical_key(), position);
                    }
                }
            }
            rows[position] = updated;
            for col in &self.columns {
                if col.primary_key || col.unique {
                    let new_value = rows[position].get(&col.name).unwrap_or(&Value::Null);
                    if !matches!(new_value, Value::Null) {
                        if let Some(index) = indexes.get_mut(&col.name) {
                            index.insert(&new_value.canonical_key(), position);
                        }
                    }
                }
            }
        }

        if count > 0 {
            drop(rows);
            drop(indexes);
            self.mark_dirty();
        }
        Ok(count)
    }

    /// Deletes every row matching `predicate`. Removing rows shifts the
    /// positions of every row after them, so all indexes are rebuilt
    /// from scratch afterward rather than patched incrementally.
    pub fn delete<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Row) -> bool,
    {
        let mut rows = self.rows.write().expect("row lock poisoned");
        let before = rows.len();
        rows.retain(|row| !predicate(row));
        let removed = before - rows.len();

        if removed > 0 {
            let mut indexes = self.indexes.write().expect("index lock poisoned");
            for col in &self.columns {
                if !(col.primary_key || col.unique) {
                    continue;
                }
                if let Some(index) = indexes.get_mut(&col.name) {
                    let keys: Vec<(usize, String)> = rows
                        .iter()
                        .enumerate()
                        .map(|(pos, row)| {
                            (pos, row.get(&col.name).unwrap_or(&Value::Null).canonical_key())
                        })
                        .filter(|(_, key)| !key.is_empty())
                        .collect();
                    index.rebuild(keys.iter().map(|(pos, key)| (*pos, key.as_str())));
                }
            }
        }

        if removed > 0 {
            self.mark_dirty();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_table() -> Table {
        Table::new(
            "users",
            vec![
                Column::new("id", ColumnType::Int).primary_key().auto_increment(),
                Column::new("email", ColumnType::Email).unique().not_null(),
                Column::new("age", ColumnType::Int),
            ],
        )
        .unwrap()
    }

    fn row(email: &str, age: i64) -> Row {
        let mut r = Row::new();
        r.set("email", Value::Text(email.to_string()));
        r.set("age", Value::Int(age));
        r
    }

    #[test]
    fn test_insert_assigns_auto_increment() {
        let table = users_table();
        let r1 = table.insert(row("a@x.com", 20)).unwrap();
        let r2 = table.insert(row("b@x.com", 30)).unwrap();
        assert_eq!(r1.get("id"), Some(&Value::Int(1)));
        assert_eq!(r2.get("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_insert_accepts_explicit_auto_increment_value_greater_than_last() {
        let table = users_table();
        let mut r = row("a@x.com", 20);
        r.set("id", Value::Int(99));
        let inserted = table.insert(r).unwrap();
        assert_eq!(inserted.get("id"), Some(&Value::Int(99)));
        assert_eq!(table.last_insert_id(), 99);

        // The counter now tracks the supplied value, so the next
        // auto-assigned id continues from there.
        let next = table.insert(row("b@x.com", 30)).unwrap();
        assert_eq!(next.get("id"), Some(&Value::Int(100)));
    }

    #[test]
    fn test_insert_rejects_explicit_auto_increment_value_not_greater_than_last() {
        let table = users_table();
        table.insert(row("a@x.com", 20)).unwrap(); // assigns id=1

        let mut r = row("b@x.com", 30);
        r.set("id", Value::Int(1));
        assert!(matches!(
            table.insert(r),
            Err(ConstraintError::AutoIncrementConflict { .. })
        ));
    }

    #[test]
    fn test_insert_rejects_non_integer_auto_increment_value() {
        let table = users_table();
        let mut r = row("a@x.com", 20);
        r.set("id", Value::Text("not-a-number".to_string()));
        assert!(matches!(
            table.insert(r),
            Err(ConstraintError::AutoIncrementConflict { .. })
        ));
    }

    #[test]
    fn test_insert_rejects_unique_violation() {
        let table = users_table();
        table.insert(row("a@x.com", 20)).unwrap();
        let err = table.insert(row("a@x.com", 40)).unwrap_err();
        assert!(matches!(err, ConstraintError::UniqueViolation { .. }));
    }

    #[test]
    fn test_insert_rejects_not_null_violation() {
        let table = users_table();
        let mut r = Row::new();
        r.set("age", Value::Int(5));
        assert!(matches!(
            table.insert(r),
            Err(ConstraintError::NotNullViolation { .. })
        ));
    }

    #[test]
    fn test_select_by_index_uses_index() {
        let table = users_table();
        table.insert(row("a@x.com", 20)).unwrap();
        table.insert(row("b@x.com", 30)).unwrap();
        let found = table.select_by_index("email", &Value::Text("b@x.com".into()));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("age"), Some(&Value::Int(30)));
    }

    #[test]
    fn test_update_is_all_or_nothing() {
        let table = users_table();
        table.insert(row("a@x.com", 20)).unwrap();
        table.insert(row("b@x.com", 30)).unwrap();

        let err = table
            .update(|_| true, &[("email".to_string(), Value::Text("a@x.com".into()))])
            .unwrap_err();
        assert!(matches!(err, ConstraintError::UniqueViolation { .. }));

        let rows = table.select_all();
        assert_eq!(rows[0].get("email"), Some(&Value::Text("a@x.com".into())));
        assert_eq!(rows[1].get("email"), Some(&Value::Text("b@x.com".into())));
    }

    #[test]
    fn test_update_keeps_index_consistent() {
        let table = users_table();
        table.insert(row("a@x.com", 20)).unwrap();
        table
            .update(
                |r| r.get("email") == Some(&Value::Text("a@x.com".into())),
                &[("email".to_string(), Value::Text("c@x.com".into()))],
            )
            .unwrap();
        assert!(table
            .select_by_index("email", &Value::Text("a@x.com".into()))
            .is_empty());
        assert_eq!(
            table
                .select_by_index("email", &Value::Text("c@x.com".into()))
                .len(),
            1
        );
    }

    #[test]
    fn test_delete_rebuilds_index_positions() {
        let table = users_table();
        table.insert(row("a@x.com", 20)).unwrap();
        table.insert(row("b@x.com", 30)).unwrap();
        table.insert(row("c@x.com", 40)).unwrap();

        let removed = table.delete(|r| r.get("email") == Some(&Value::Text("a@x.com".into())));
        assert_eq!(removed, 1);

        let found = table.select_by_index("email", &Value::Text("c@x.com".into()));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("age"), Some(&Value::Int(40)));
    }
}
