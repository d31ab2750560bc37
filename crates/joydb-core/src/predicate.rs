//! Compiled predicate trees.
//!
//! The planner lowers a `WHERE`/`ON` [`Expr`](crate::ast::Expr) into a
//! `Predicate` tree that the executor evaluates directly against a
//! [`Row`](crate::schema::Row), without re-walking the AST on every
//! row.

use crate::ast::{BinaryOp, Expr, Literal};
use crate::schema::{Row, Value};

/// A compiled predicate: either a boolean combination of sub-predicates
/// or a leaf comparison between two operands.
#[derive(Debug, Clone)]
pub enum Predicate {
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
}

/// A leaf-level comparison operator (the comparison subset of
/// [`BinaryOp`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// One side of a leaf comparison: either a column reference, resolved
/// against a row at evaluation time, or a literal value fixed at plan
/// time.
#[derive(Debug, Clone)]
pub enum Operand {
    Column { table: Option<String>, column: String },
    Literal(Value),
}

impl Operand {
    fn resolve<'a>(&'a self, row: &'a Row) -> std::borrow::Cow<'a, Value> {
        match self {
            Self::Column { table, column } => row
                .resolve(table.as_deref(), column)
                .map_or(std::borrow::Cow::Owned(Value::Null), std::borrow::Cow::Borrowed),
            Self::Literal(v) => std::borrow::Cow::Borrowed(v),
        }
    }
}

impl Predicate {
    /// Evaluates the predicate against `row`. Comparisons against NULL,
    /// or between incomparable operands, evaluate to `false` (three-
    /// valued NULL semantics collapsed to boolean, per the planner's
    /// evaluation contract).
    #[must_use]
    pub fn eval(&self, row: &Row) -> bool {
        match self {
            Self::And(l, r) => l.eval(row) && r.eval(row),
            Self::Or(l, r) => l.eval(row) || r.eval(row),
            Self::Compare { left, op, right } => {
                let left = left.resolve(row);
                let right = right.resolve(row);
                match op {
                    CompareOp::Eq => left.values_equal(&right),
                    CompareOp::NotEq => {
                        !matches!(*left, Value::Null) && !matches!(*right, Value::Null) && !left.values_equal(&right)
                    }
                    CompareOp::Lt => left.partial_compare(&right) == Some(std::cmp::Ordering::Less),
                    CompareOp::LtEq => matches!(
                        left.partial_compare(&right),
                        Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
                    ),
                    CompareOp::Gt => left.partial_compare(&right) == Some(std::cmp::Ordering::Greater),
                    CompareOp::GtEq => matches!(
                        left.partial_compare(&right),
                        Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
                    ),
                }
            }
        }
    }
}

/// Error lowering an [`Expr`] into a [`Predicate`]: the expression tree
/// contains a node that is not itself boolean (e.g. a bare literal or
/// column reference used outside a comparison).
#[derive(Debug, thiserror::Error)]
#[error("expression is not a valid boolean predicate: {0}")]
pub struct PredicateError(pub String);

/// Lowers an [`Expr`] into a [`Predicate`] tree. The expression must be
/// built entirely from `AND`/`OR`/comparison nodes; any other shape at
/// the top level is an error.
///
/// # Errors
///
/// Returns [`PredicateError`] if `expr` is not a boolean expression.
pub fn compile(expr: &Expr) -> Result<Predicate, PredicateError> {
    match expr {
        Expr::Binary { left, op, right } if matches!(op, BinaryOp::And | BinaryOp::Or) => {
            let left = compile(left)?;
            let right = compile(right)?;
            Ok(match op {
                BinaryOp::And => Predicate::And(Box::new(left), Box::new(right)),
                BinaryOp::Or => Predicate::Or(Box::new(left), Box::new(right)),
                _ => unreachable!("guarded above"),
            })
        }
        Expr::Binary { left, op, right } if op.is_comparison() => {
            let compare_op = match op {
                BinaryOp::Eq => CompareOp::Eq,
                BinaryOp::NotEq => CompareOp::NotEq,
                BinaryOp::Lt => CompareOp::Lt,
                BinaryOp::LtEq => CompareOp::LtEq,
                BinaryOp::Gt => CompareOp::Gt,
                BinaryOp::GtEq => CompareOp::GtEq,
                BinaryOp::And | BinaryOp::Or => unreachable!("guarded above"),
            };
            Ok(Predicate::Compare {
                left: operand_of(left)?,
                op: compare_op,
                right: operand_of(right)?,
            })
        }
        other => Err(PredicateError(format!("expected AND/OR/comparison, found {other:?}"))),
    }
}

fn operand_of(expr: &Expr) -> Result<Operand, PredicateError> {
    match expr {
        Expr::Field(field_ref, _) => Ok(Operand::Column {
            table: field_ref.table.clone(),
            column: field_ref.column.clone(),
        }),
        Expr::Literal(lit) => Ok(Operand::Literal(literal_to_value(lit))),
        Expr::Binary { .. } => Err(PredicateError(
            "nested boolean expression cannot appear as a comparison operand".to_string(),
        )),
    }
}

/// Converts a parsed [`Literal`] to a runtime [`Value`]. Typed literals
/// (`DATE`/`TIME`/`EMAIL`) were already format-validated by the parser
/// and collapse to `Value::Text` here.
#[must_use]
pub fn literal_to_value(literal: &Literal) -> Value {
    match literal {
        Literal::Integer(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) | Literal::Date(s) | Literal::Time(s) | Literal::Email(s) => {
            Value::Text(s.clone())
        }
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn row_with(column: &str, value: Value) -> Row {
        let mut row = Row::new();
        row.set(column, value);
        row
    }

    #[test]
    fn test_compile_and_eval_simple_equality() {
        let expr = Expr::column("age").eq(Expr::integer(30));
        let predicate = compile(&expr).unwrap();
        assert!(predicate.eval(&row_with("age", Value::Int(30))));
        assert!(!predicate.eval(&row_with("age", Value::Int(31))));
    }

    #[test]
    fn test_and_short_circuits_correctly() {
        let expr = Expr::column("age")
            .gt(Expr::integer(18))
            .and(Expr::column("active").eq(Expr::boolean(true)));
        let predicate = compile(&expr).unwrap();

        let mut row = Row::new();
        row.set("age", Value::Int(20));
        row.set("active", Value::Bool(false));
        assert!(!predicate.eval(&row));

        row.set("active", Value::Bool(true));
        assert!(predicate.eval(&row));
    }

    #[test]
    fn test_null_comparisons_are_false() {
        let expr = Expr::column("age").eq(Expr::integer(30));
        let predicate = compile(&expr).unwrap();
        assert!(!predicate.eval(&Row::new()));
    }

    #[test]
    fn test_not_eq_is_false_when_either_side_null() {
        let expr = Expr::column("age").not_eq(Expr::integer(30));
        let predicate = compile(&expr).unwrap();
        assert!(!predicate.eval(&Row::new()));
    }

    #[test]
    fn test_qualified_column_resolves_against_joined_row() {
        let expr = Expr::qualified_column("users", "id").eq(Expr::qualified_column("orders", "user_id"));
        let predicate = compile(&expr).unwrap();

        let mut row = Row::new();
        row.set("users.id", Value::Int(1));
        row.set("orders.user_id", Value::Int(1));
        assert!(predicate.eval(&row));
    }

    #[test]
    fn test_compile_rejects_bare_literal_at_top_level() {
        assert!(compile(&Expr::boolean(true)).is_err());
    }
}
