//! Lowers AST statements into plan trees.

use crate::ast::{
    DeleteStatement, Expr, InsertStatement, JoinClause, Literal, SelectColumn, SelectStatement,
    Statement, UpdateStatement,
};
use crate::parser::{validate_date, validate_email, validate_time};
use crate::predicate::{self, literal_to_value};
use crate::schema::{Column, ColumnType, Database, Value};

use super::error::{PlanError, Result};
use super::plan::{Metadata, PlanNode, PlannedAssignment, ProjectedColumn, Projection};

/// Stateless plan builder: every call takes the database it plans
/// against, since the planner itself holds no session state.
pub struct Planner;

impl Planner {
    /// Lowers a single statement into a plan tree.
    ///
    /// # Errors
    ///
    /// Returns a [`PlanError`] naming the unresolved table/column or
    /// the unsupported construct. DDL statements are not planned here —
    /// the engine dispatches them to the registry directly.
    pub fn plan(statement: &Statement, database: &Database) -> Result<PlanNode> {
        match statement {
            Statement::Select(s) => Self::plan_select(s, database),
            Statement::Insert(s) => Self::plan_insert(s, database),
            Statement::Update(s) => Self::plan_update(s, database),
            Statement::Delete(s) => Self::plan_delete(s, database),
            Statement::CreateDatabase(_)
            | Statement::DropDatabase(_)
            | Statement::AlterDatabase(_)
            | Statement::UseDatabase(_) => Err(PlanError::NoDatabaseSelected),
        }
    }

    fn resolve_table<'a>(database: &'a Database, name: &str) -> Result<&'a crate::schema::Table> {
        database
            .table(name)
            .ok_or_else(|| PlanError::TableNotFound(name.to_string()))
    }

    fn plan_select(statement: &SelectStatement, database: &Database) -> Result<PlanNode> {
        Self::resolve_table(database, &statement.from)?;

        let mut scan = PlanNode::Scan {
            table: statement.from.clone(),
            predicate: None,
            metadata: Metadata::new(),
        };

        for join in &statement.joins {
            scan = Self::plan_join(join, &statement.from, scan, database)?;
        }

        let predicate = statement
            .where_clause
            .as_ref()
            .map(predicate::compile)
            .transpose()?;

        let projection = Self::plan_projection(&statement.columns);

        Ok(PlanNode::Select {
            table: statement.from.clone(),
            predicate,
            projection,
            children: vec![scan],
            metadata: Metadata::new(),
        })
    }

    fn plan_join(
        join: &JoinClause,
        left_table: &str,
        left: PlanNode,
        database: &Database,
    ) -> Result<PlanNode> {
        let right_table_schema = Self::resolve_table(database, &join.table)?;

        let Some((left_field, right_field)) = join.on.as_field_equality() else {
            return Err(PlanError::UnsupportedJoinCondition);
        };

        let (left_field, right_field) =
            Self::orient_join_fields(left_field, right_field, left_table, &join.table)?;

        let left_table_schema = Self::resolve_table(database, left_table)?;

        let left_column = left_table_schema
            .columns()
            .iter()
            .find(|c| c.name == left_field.column)
            .ok_or_else(|| PlanError::UnknownJoinColumn {
                table: left_table.to_string(),
                column: left_field.column.clone(),
            })?;
        let right_column = right_table_schema
            .columns()
            .iter()
            .find(|c| c.name == right_field.column)
            .ok_or_else(|| PlanError::UnknownJoinColumn {
                table: join.table.clone(),
                column: right_field.column.clone(),
            })?;

        if left_column.column_type != right_column.column_type {
            return Err(PlanError::JoinColumnTypeMismatch {
                left_table: left_table.to_string(),
                left_column: left_column.name.clone(),
                left_type: left_column.column_type.to_string(),
                right_table: join.table.clone(),
                right_column: right_column.name.clone(),
                right_type: right_column.column_type.to_string(),
            });
        }

        Ok(PlanNode::Join {
            join_type: join.join_type,
            left_table: left_table.to_string(),
            left_column: left_column.name.clone(),
            right_table: join.table.clone(),
            right_column: right_column.name.clone(),
            left: Box::new(left),
            right: Box::new(PlanNode::Scan {
                table: join.table.clone(),
                predicate: None,
                metadata: Metadata::new(),
            }),
            metadata: Metadata::new(),
        })
    }

    /// A JOIN ON's equality may name the right table's column first
    /// (e.g. `ON orders.user_id = users.id`); this reorders the pair so
    /// the left operand always names `left_table`.
    fn orient_join_fields<'a>(
        a: &'a crate::ast::FieldRef,
        b: &'a crate::ast::FieldRef,
        left_table: &str,
        right_table: &str,
    ) -> Result<(&'a crate::ast::FieldRef, &'a crate::ast::FieldRef)> {
        let a_is_left = a.table.as_deref() == Some(left_table) || a.table.is_none();
        let a_is_right = a.table.as_deref() == Some(right_table);
        let b_is_left = b.table.as_deref() == Some(left_table);
        let b_is_right = b.table.as_deref() == Some(right_table) || b.table.is_none();

        if a_is_left && b_is_right {
            Ok((a, b))
        } else if a_is_right && b_is_left {
            Ok((b, a))
        } else {
            Err(PlanError::UnsupportedJoinCondition)
        }
    }

    fn plan_projection(columns: &[SelectColumn]) -> Projection {
        if columns.iter().any(|c| matches!(c, SelectColumn::All)) {
            return Projection::All;
        }
        let projected = columns
            .iter()
            .map(|c| match c {
                SelectColumn::Field(field) => ProjectedColumn {
                    table: field.table.clone(),
                    column: field.column.clone(),
                    alias: field.column.clone(),
                },
                SelectColumn::All => unreachable!("handled above"),
            })
            .collect();
        Projection::Columns(projected)
    }

    fn plan_insert(statement: &InsertStatement, database: &Database) -> Result<PlanNode> {
        let table = Self::resolve_table(database, &statement.table)?;

        let columns: Vec<String> = match &statement.columns {
            Some(cols) => cols.clone(),
            None => table.columns().iter().map(|c| c.name.clone()).collect(),
        };

        if columns.len() != statement.values.len() {
            return Err(PlanError::ColumnError {
                table: statement.table.clone(),
                column: statement.table.clone(),
                reason: format!(
                    "expected {} values, found {}",
                    columns.len(),
                    statement.values.len()
                ),
            });
        }

        let mut assignments = Vec::with_capacity(columns.len());
        for (column_name, expr) in columns.iter().zip(&statement.values) {
            let column = table
                .columns()
                .iter()
                .find(|c| &c.name == column_name)
                .ok_or_else(|| PlanError::ColumnError {
                    table: statement.table.clone(),
                    column: column_name.clone(),
                    reason: "no such column".to_string(),
                })?;
            let value = coerce_literal(expr, column).map_err(|reason| PlanError::ColumnError {
                table: statement.table.clone(),
                column: column_name.clone(),
                reason,
            })?;
            assignments.push(PlannedAssignment {
                column: column_name.clone(),
                value,
            });
        }

        Ok(PlanNode::Insert {
            table: statement.table.clone(),
            assignments,
            metadata: Metadata::new(),
        })
    }

    fn plan_update(statement: &UpdateStatement, database: &Database) -> Result<PlanNode> {
        let table = Self::resolve_table(database, &statement.table)?;

        let mut assignments = Vec::with_capacity(statement.assignments.len());
        for assignment in &statement.assignments {
            let column = table
                .columns()
                .iter()
                .find(|c| c.name == assignment.column)
                .ok_or_else(|| PlanError::ColumnError {
                    table: statement.table.clone(),
                    column: assignment.column.clone(),
                    reason: "no such column".to_string(),
                })?;
            let value =
                coerce_literal(&assignment.value, column).map_err(|reason| PlanError::ColumnError {
                    table: statement.table.clone(),
                    column: assignment.column.clone(),
                    reason,
                })?;
            assignments.push(PlannedAssignment {
                column: assignment.column.clone(),
                value,
            });
        }

        let predicate = statement
            .where_clause
            .as_ref()
            .map(predicate::compile)
            .transpose()?;

        Ok(PlanNode::Update {
            table: statement.table.clone(),
            predicate,
            assignments,
            metadata: Metadata::new(),
        })
    }

    fn plan_delete(statement: &DeleteStatement, database: &Database) -> Result<PlanNode> {
        Self::resolve_table(database, &statement.table)?;
        let predicate = statement
            .where_clause
            .as_ref()
            .map(predicate::compile)
            .transpose()?;
        Ok(PlanNode::Delete {
            table: statement.table.clone(),
            predicate,
            metadata: Metadata::new(),
        })
    }
}

/// Coerces a literal expression to the value expected by `column`'s
/// declared type. Integer literals widen to `FLOAT` columns; string
/// literals bound for `DATE`/`TIME`/`EMAIL` columns are validated here
/// just as the typed-literal syntax is validated in the parser.
///
/// # Errors
///
/// Returns a human-readable reason suitable for a `PlanError::ColumnError`.
fn coerce_literal(expr: &Expr, column: &Column) -> core::result::Result<Value, String> {
    let Expr::Literal(literal) = expr else {
        return Err("INSERT/UPDATE values must be literals".to_string());
    };

    if matches!(literal, Literal::Null) {
        return Ok(Value::Null);
    }

    match (column.column_type, literal) {
        (ColumnType::Int, Literal::Integer(i)) => Ok(Value::Int(*i)),
        (ColumnType::Float, Literal::Integer(i)) => Ok(Value::Float(*i as f64)),
        (ColumnType::Float, Literal::Float(f)) => Ok(Value::Float(*f)),
        (ColumnType::Bool, Literal::Boolean(b)) => Ok(Value::Bool(*b)),
        (ColumnType::Text, Literal::String(s)) => Ok(Value::Text(s.clone())),
        (ColumnType::Date, Literal::Date(s)) => Ok(Value::Text(s.clone())),
        (ColumnType::Date, Literal::String(s)) => {
            validate_date(s).map(|()| Value::Text(s.clone()))
        }
        (ColumnType::Time, Literal::Time(s)) => Ok(Value::Text(s.clone())),
        (ColumnType::Time, Literal::String(s)) => {
            validate_time(s).map(|()| Value::Text(s.clone()))
        }
        (ColumnType::Email, Literal::Email(s)) => Ok(Value::Text(s.clone())),
        (ColumnType::Email, Literal::String(s)) => {
            validate_email(s).map(|()| Value::Text(s.clone()))
        }
        (expected, found) => Err(format!(
            "expected {expected}, found {}",
            literal_type_name(found)
        )),
    }
}

const fn literal_type_name(literal: &Literal) -> &'static str {
    match literal {
        Literal::Integer(_) => "INT",
        Literal::Float(_) => "FLOAT",
        Literal::String(_) => "TEXT",
        Literal::Boolean(_) => "BOOL",
        Literal::Null => "NULL",
        Literal::Date(_) => "DATE",
        Literal::Time(_) => "TIME",
        Literal::Email(_) => "EMAIL",
    }
}
