//! Walks a plan tree and applies its effect against live tables,
//! pairing each DML mutation with a matching WAL record when a writer
//! is attached for this statement.

use joydb_core::planner::{PlanNode, ProjectedColumn, Projection};
use joydb_core::schema::{Database, Row, Table};
use joydb_wal::Writer;

use crate::error::{EngineError, Result};
use crate::join;
use crate::result::ExecutionResult;
use crate::table_ops::{self, Mutation};

/// Runs one plan tree against `database`, logging to `wal` (a
/// `(writer, txid)` pair) when the statement is mutating. `wal` is
/// `None` for read statements, which never touch the WAL.
pub struct Executor<'a> {
    database: &'a Database,
    wal: Option<(&'a Writer, u64)>,
}

impl<'a> Executor<'a> {
    #[must_use]
    pub const fn new(database: &'a Database, wal: Option<(&'a Writer, u64)>) -> Self {
        Self { database, wal }
    }

    /// # Errors
    ///
    /// Returns [`EngineError::TableNotFound`] (should not happen for a
    /// planner-produced node), a constraint violation from a table
    /// operation, or a WAL error from logging.
    pub fn execute(&self, plan: &PlanNode) -> Result<ExecutionResult> {
        match plan {
            PlanNode::Select {
                table,
                predicate,
                projection,
                children,
                ..
            } => self.execute_select(table, predicate.as_ref(), projection, &children[0]),
            PlanNode::Insert { table, assignments, .. } => {
                let t = self.table(table)?;
                let mutation = table_ops::insert(t, assignments)?;
                self.log(table, &mutation)?;
                Ok(ExecutionResult::RowsAffected(1))
            }
            PlanNode::Update {
                table,
                predicate,
                assignments,
                ..
            } => {
                let t = self.table(table)?;
                let mutations = table_ops::update(t, predicate.as_ref(), assignments)?;
                for mutation in &mutations {
                    self.log(table, mutation)?;
                }
                Ok(ExecutionResult::RowsAffected(mutations.len()))
            }
            PlanNode::Delete { table, predicate, .. } => {
                let t = self.table(table)?;
                let mutations = table_ops::delete(t, predicate.as_ref());
                for mutation in &mutations {
                    self.log(table, mutation)?;
                }
                Ok(ExecutionResult::RowsAffected(mutations.len()))
            }
            PlanNode::Scan { .. } | PlanNode::Join { .. } => {
                unreachable!("Scan/Join only ever appear nested under a Select")
            }
        }
    }

    fn table(&self, name: &str) -> Result<&'a Table> {
        self.database
            .table(name)
            .ok_or_else(|| EngineError::TableNotFound(name.to_string()))
    }

    fn execute_select(
        &self,
        from_table: &str,
        predicate: Option<&joydb_core::predicate::Predicate>,
        projection: &Projection,
        child: &PlanNode,
    ) -> Result<ExecutionResult> {
        let rows = self.eval_rows(child)?;
        let rows: Vec<Row> = match predicate {
            Some(p) => rows.into_iter().filter(|row| p.eval(row)).collect(),
            None => rows,
        };

        let (columns, rows) = match projection {
            Projection::All => {
                let columns = all_columns(self.database, from_table, child, &rows);
                (columns, rows)
            }
            Projection::Columns(projected) => project(projected, &rows),
        };

        Ok(ExecutionResult::Rows { columns, rows })
    }

    /// Evaluates a `Select`'s source subtree into a row stream. A
    /// `Scan` yields bare-keyed rows; a `Join` yields rows qualified
    /// `table.column` on both sides.
    fn eval_rows(&self, node: &PlanNode) -> Result<Vec<Row>> {
        match node {
            PlanNode::Scan { table, predicate, .. } => {
                let t = self.table(table)?;
                Ok(table_ops::scan(t, predicate.as_ref()))
            }
            PlanNode::Join {
                join_type,
                left_table,
                left_column,
                right_table,
                right_column,
                left,
                ..
            } => {
                let left_rows = self.eval_rows(left)?;
                let left_rows: Vec<Row> = if matches!(left.as_ref(), PlanNode::Scan { .. }) {
                    left_rows.into_iter().map(|row| row.qualify(left_table)).collect()
                } else {
                    left_rows
                };
                let right_table_schema = self.table(right_table)?;
                Ok(join::hash_join(
                    *join_type,
                    left_table,
                    left_column,
                    &left_rows,
                    right_table_schema,
                    right_column,
                ))
            }
            PlanNode::Insert { .. } | PlanNode::Update { .. } | PlanNode::Delete { .. } | PlanNode::Select { .. } => {
                unreachable!("a Select's source subtree is always a Scan or Join")
            }
        }
    }

    fn log(&self, table: &str, mutation: &Mutation) -> Result<()> {
        let Some((writer, txid)) = self.wal else {
            return Ok(());
        };
        match (&mutation.old_row, &mutation.new_row) {
            (None, Some(new_row)) => {
                writer.log_insert(txid, table, &mutation.key, encode(new_row))?;
            }
            (Some(old_row), Some(new_row)) => {
                writer.log_update(txid, table, &mutation.key, encode(old_row), encode(new_row))?;
            }
            (Some(old_row), None) => {
                writer.log_delete(txid, table, &mutation.key, encode(old_row))?;
            }
            (None, None) => unreachable!("a Mutation always carries at least one side"),
        }
        Ok(())
    }
}

fn encode(row: &Row) -> Vec<u8> {
    row.to_json().to_string().into_bytes()
}

/// Projects `rows` down to `projected`'s aliased columns, resolving
/// unqualified references left-then-right (via [`Row::resolve`]).
fn project(projected: &[ProjectedColumn], rows: &[Row]) -> (Vec<String>, Vec<Row>) {
    let columns = projected.iter().map(|p| p.alias.clone()).collect();
    let rows = rows
        .iter()
        .map(|row| {
            let mut projected_row = Row::new();
            for column in projected {
                let value = row
                    .resolve(column.table.as_deref(), &column.column)
                    .cloned()
                    .unwrap_or(joydb_core::schema::Value::Null);
                projected_row.set(column.alias.clone(), value);
            }
            projected_row
        })
        .collect();
    (columns, rows)
}

/// Header for `SELECT *`. Prefers the shape of the rows actually
/// produced; falls back to the declared schema (qualified on both
/// sides for a join) when the result set is empty.
fn all_columns(database: &Database, from_table: &str, child: &PlanNode, rows: &[Row]) -> Vec<String> {
    if let Some(first) = rows.first() {
        return first.iter().map(|(k, _)| k.to_string()).collect();
    }
    match child {
        PlanNode::Scan { .. } => database
            .table(from_table)
            .map(|t| t.columns().iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default(),
        PlanNode::Join {
            left_table,
            right_table,
            ..
        } => {
            let mut columns = Vec::new();
            if let Some(t) = database.table(left_table) {
                columns.extend(t.columns().iter().map(|c| format!("{left_table}.{}", c.name)));
            }
            if let Some(t) = database.table(right_table) {
                columns.extend(t.columns().iter().map(|c| format!("{right_table}.{}", c.name)));
            }
            columns
        }
        PlanNode::Insert { .. } | PlanNode::Update { .. } | PlanNode::Delete { .. } | PlanNode::Select { .. } => {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use joydb_core::ast::JoinType;
    use joydb_core::planner::{Metadata, PlannedAssignment};
    use joydb_core::schema::{Column, ColumnType, Value};

    use super::*;

    fn shop() -> Database {
        let mut db = Database::new("shop");
        db.add_table(
            Table::new(
                "users",
                vec![
                    Column::new("id", ColumnType::Int).primary_key().auto_increment(),
                    Column::new("username", ColumnType::Text).not_null(),
                ],
            )
            .unwrap(),
        );
        db.add_table(
            Table::new(
                "orders",
                vec![
                    Column::new("id", ColumnType::Int).primary_key().auto_increment(),
                    Column::new("user_id", ColumnType::Int),
                    Column::new("product", ColumnType::Text),
                ],
            )
            .unwrap(),
        );
        db
    }

    fn assignment(column: &str, value: Value) -> PlannedAssignment {
        PlannedAssignment {
            column: column.to_string(),
            value,
        }
    }

    #[test]
    fn test_insert_then_select_star_round_trips() {
        let db = shop();
        let executor = Executor::new(&db, None);

        executor
            .execute(&PlanNode::Insert {
                table: "users".into(),
                assignments: vec![assignment("username", Value::Text("alice".into()))],
                metadata: Metadata::new(),
            })
            .unwrap();

        let select = PlanNode::Select {
            table: "users".into(),
            predicate: None,
            projection: Projection::All,
            children: vec![PlanNode::Scan {
                table: "users".into(),
                predicate: None,
                metadata: Metadata::new(),
            }],
            metadata: Metadata::new(),
        };
        match executor.execute(&select).unwrap() {
            ExecutionResult::Rows { columns, rows } => {
                assert_eq!(columns, vec!["id", "username"]);
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].get("username"), Some(&Value::Text("alice".into())));
            }
            other => panic!("expected Rows, got {other:?}"),
        }
    }

    #[test]
    fn test_join_select_projects_qualified_columns() {
        let db = shop();
        let executor = Executor::new(&db, None);
        executor
            .execute(&PlanNode::Insert {
                table: "users".into(),
                assignments: vec![assignment("username", Value::Text("alice".into()))],
                metadata: Metadata::new(),
            })
            .unwrap();
        executor
            .execute(&PlanNode::Insert {
                table: "orders".into(),
                assignments: vec![
                    assignment("user_id", Value::Int(1)),
                    assignment("product", Value::Text("Laptop".into())),
                ],
                metadata: Metadata::new(),
            })
            .unwrap();

        let select = PlanNode::Select {
            table: "users".into(),
            predicate: None,
            projection: Projection::Columns(vec![
                ProjectedColumn {
                    table: Some("users".into()),
                    column: "username".into(),
                    alias: "username".into(),
                },
                ProjectedColumn {
                    table: Some("orders".into()),
                    column: "product".into(),
                    alias: "product".into(),
                },
            ]),
            children: vec![PlanNode::Join {
                join_type: JoinType::Inner,
                left_table: "users".into(),
                left_column: "id".into(),
                right_table: "orders".into(),
                right_column: "user_id".into(),
                left: Box::new(PlanNode::Scan {
                    table: "users".into(),
                    predicate: None,
                    metadata: Metadata::new(),
                }),
                right: Box::new(PlanNode::Scan {
                    table: "orders".into(),
                    predicate: None,
                    metadata: Metadata::new(),
                }),
                metadata: Metadata::new(),
            }],
            metadata: Metadata::new(),
        };

        match executor.execute(&select).unwrap() {
            ExecutionResult::Rows { columns, rows } => {
                assert_eq!(columns, vec!["username", "product"]);
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].get("username"), Some(&Value::Text("alice".into())));
                assert_eq!(rows[0].get("product"), Some(&Value::Text("Laptop".into())));
            }
            other => panic!("expected Rows, got {other:?}"),
        }
    }

    #[test]
    fn test_delete_reports_rows_affected() {
        let db = shop();
        let executor = Executor::new(&db, None);
        executor
            .execute(&PlanNode::Insert {
                table: "users".into(),
                assignments: vec![assignment("username", Value::Text("alice".into()))],
                metadata: Metadata::new(),
            })
            .unwrap();
        let result = executor
            .execute(&PlanNode::Delete {
                table: "users".into(),
                predicate: None,
                metadata: Metadata::new(),
            })
            .unwrap();
        assert!(matches!(result, ExecutionResult::RowsAffected(1)));
    }
}
