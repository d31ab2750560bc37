//! Dispatches a plan node's table-level effect against a live
//! [`Table`](joydb_core::schema::Table) and reports what happened so the
//! executor can log matching WAL records.
//!
//! Everything here is WAL-agnostic: it never touches a
//! [`joydb_wal::Writer`]. The executor pairs each returned
//! [`Mutation`] with the corresponding `log_insert`/`log_update`/
//! `log_delete` call.

use joydb_core::planner::PlannedAssignment;
use joydb_core::predicate::Predicate;
use joydb_core::schema::{ConstraintError, Row, Table, Value};

/// One row's before/after state, keyed by its primary key's canonical
/// textual form — the same form [`joydb_wal::Writer::log_update`]/
/// `log_delete` key on and [`Table::replay_update`]/`replay_delete`
/// match against.
pub struct Mutation {
    pub key: String,
    pub old_row: Option<Row>,
    pub new_row: Option<Row>,
}

fn primary_key_value(table: &Table, row: &Row) -> String {
    table
        .primary_key_column()
        .and_then(|c| row.get(&c.name))
        .map_or_else(String::new, Value::canonical_key)
}

fn build_row(assignments: &[PlannedAssignment]) -> Row {
    let mut row = Row::new();
    for assignment in assignments {
        row.set(assignment.column.clone(), assignment.value.clone());
    }
    row
}

/// Runs an `Insert` plan node's effect. Returns the inserted row's
/// mutation record (no `old_row`).
///
/// # Errors
///
/// Returns [`ConstraintError`] and leaves the table unmodified.
pub fn insert(table: &Table, assignments: &[PlannedAssignment]) -> Result<Mutation, ConstraintError> {
    let row = build_row(assignments);
    let inserted = table.insert(row)?;
    Ok(Mutation {
        key: primary_key_value(table, &inserted),
        old_row: None,
        new_row: Some(inserted),
    })
}

/// Runs an `Update` plan node's effect: every row the predicate matches
/// gets `assignments` applied, all-or-nothing. Returns one [`Mutation`]
/// per affected row, keyed by its **pre-update** primary key (the value
/// [`Table::replay_update`] needs to find it again).
///
/// # Errors
///
/// Returns [`ConstraintError`] naming the first row/column to fail
/// validation; no rows are modified in that case.
pub fn update(
    table: &Table,
    predicate: Option<&Predicate>,
    assignments: &[PlannedAssignment],
) -> Result<Vec<Mutation>, ConstraintError> {
    let matches = |row: &Row| predicate.map_or(true, |p| p.eval(row));

    let before: Vec<Row> = table.select(matches);
    let owned_assignments: Vec<(String, Value)> = assignments
        .iter()
        .map(|a| (a.column.clone(), a.value.clone()))
        .collect();

    table.update(matches, &owned_assignments)?;

    Ok(before
        .into_iter()
        .map(|old_row| {
            let mut new_row = old_row.clone();
            for (column, value) in &owned_assignments {
                new_row.set(column.clone(), value.clone());
            }
            Mutation {
                key: primary_key_value(table, &old_row),
                old_row: Some(old_row),
                new_row: Some(new_row),
            }
        })
        .collect())
}

/// Runs a `Delete` plan node's effect. Returns one [`Mutation`] per
/// removed row (no `new_row`), keyed by its primary key.
pub fn delete(table: &Table, predicate: Option<&Predicate>) -> Vec<Mutation> {
    let matches = |row: &Row| predicate.map_or(true, |p| p.eval(row));
    let before: Vec<Row> = table.select(matches);
    table.delete(matches);
    before
        .into_iter()
        .map(|old_row| Mutation {
            key: primary_key_value(table, &old_row),
            old_row: Some(old_row),
            new_row: None,
        })
        .collect()
}

/// Runs a `Scan` plan node: every row matching an optional predicate,
/// in insertion order. Takes only the table's read lock.
#[must_use]
pub fn scan(table: &Table, predicate: Option<&Predicate>) -> Vec<Row> {
    match predicate {
        Some(p) => table.select(|row| p.eval(row)),
        None => table.select_all(),
    }
}

#[cfg(test)]
mod tests {
    use joydb_core::schema::{Column, ColumnType};

    use super::*;

    fn users_table() -> Table {
        Table::new(
            "users",
            vec![
                Column::new("id", ColumnType::Int).primary_key().auto_increment(),
                Column::new("name", ColumnType::Text).not_null(),
            ],
        )
        .unwrap()
    }

    fn assignment(column: &str, value: Value) -> PlannedAssignment {
        PlannedAssignment {
            column: column.to_string(),
            value,
        }
    }

    #[test]
    fn test_insert_reports_key_and_new_row() {
        let table = users_table();
        let mutation = insert(&table, &[assignment("name", Value::Text("a".to_string()))]).unwrap();
        assert_eq!(mutation.key, "1");
        assert!(mutation.old_row.is_none());
        assert_eq!(mutation.new_row.unwrap().get("id"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_update_reports_pre_update_key() {
        let table = users_table();
        insert(&table, &[assignment("name", Value::Text("a".to_string()))]).unwrap();

        let mutations = update(&table, None, &[assignment("name", Value::Text("b".to_string()))]).unwrap();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].key, "1");
        assert_eq!(
            mutations[0].new_row.as_ref().unwrap().get("name"),
            Some(&Value::Text("b".to_string()))
        );
    }

    #[test]
    fn test_delete_reports_removed_rows() {
        let table = users_table();
        insert(&table, &[assignment("name", Value::Text("a".to_string()))]).unwrap();
        let mutations = delete(&table, None);
        assert_eq!(mutations.len(), 1);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_scan_returns_all_rows_without_predicate() {
        let table = users_table();
        insert(&table, &[assignment("name", Value::Text("a".to_string()))]).unwrap();
        insert(&table, &[assignment("name", Value::Text("b".to_string()))]).unwrap();
        assert_eq!(scan(&table, None).len(), 2);
    }
}
