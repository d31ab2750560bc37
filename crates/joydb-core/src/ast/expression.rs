//! Expression AST types.

use crate::lexer::Span;

/// A literal value as produced by the parser. Typed literals
/// (`DATE`/`TIME`/`EMAIL`) are validated for format at parse time and
/// carried as their own variants so the planner never has to re-derive
/// the author's intent from a bare string.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer literal, e.g. `42`.
    Integer(i64),
    /// Fixed-point literal, e.g. `3.14`.
    Float(f64),
    /// Single-quoted string literal.
    String(String),
    /// `TRUE` / `FALSE`.
    Boolean(bool),
    /// `NULL`.
    Null,
    /// `DATE 'YYYY-MM-DD'`, already validated.
    Date(String),
    /// `TIME 'HH:MM[:SS]'`, already validated.
    Time(String),
    /// `EMAIL '...'`, already validated.
    Email(String),
}

/// A (possibly table-qualified) column reference, e.g. `col` or `t.col`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    /// Table name or alias, if the reference was qualified.
    pub table: Option<String>,
    /// Column name.
    pub column: String,
}

impl FieldRef {
    /// Creates an unqualified field reference.
    #[must_use]
    pub fn unqualified(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    /// Creates a table-qualified field reference.
    #[must_use]
    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

/// Binary operators over the supported precedence chain: OR, AND,
/// comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// Returns true if this is a comparison operator rather than a
    /// logical connective.
    #[must_use]
    pub const fn is_comparison(&self) -> bool {
        !matches!(self, Self::And | Self::Or)
    }
}

/// An SQL expression: a small tree of literals, field references, and
/// binary operators. There is deliberately no captured-closure
/// representation — planner and diagnostics both walk this tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Literal),
    /// A (possibly qualified) column reference.
    Field(FieldRef, Span),
    /// A binary expression (comparison or logical connective).
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Creates an unqualified column reference.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self::Field(FieldRef::unqualified(name), Span::default())
    }

    /// Creates a table-qualified column reference.
    #[must_use]
    pub fn qualified_column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Field(FieldRef::qualified(table, name), Span::default())
    }

    /// Creates an integer literal.
    #[must_use]
    pub const fn integer(value: i64) -> Self {
        Self::Literal(Literal::Integer(value))
    }

    /// Creates a float literal.
    #[must_use]
    pub const fn float(value: f64) -> Self {
        Self::Literal(Literal::Float(value))
    }

    /// Creates a string literal.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal::String(value.into()))
    }

    /// Creates a boolean literal.
    #[must_use]
    pub const fn boolean(value: bool) -> Self {
        Self::Literal(Literal::Boolean(value))
    }

    /// Creates a NULL literal.
    #[must_use]
    pub const fn null() -> Self {
        Self::Literal(Literal::Null)
    }

    /// Combines this expression with another via `op`.
    #[must_use]
    pub fn binary(self, op: BinaryOp, right: Self) -> Self {
        Self::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn eq(self, right: Self) -> Self {
        self.binary(BinaryOp::Eq, right)
    }

    #[must_use]
    pub fn not_eq(self, right: Self) -> Self {
        self.binary(BinaryOp::NotEq, right)
    }

    #[must_use]
    pub fn lt(self, right: Self) -> Self {
        self.binary(BinaryOp::Lt, right)
    }

    #[must_use]
    pub fn lt_eq(self, right: Self) -> Self {
        self.binary(BinaryOp::LtEq, right)
    }

    #[must_use]
    pub fn gt(self, right: Self) -> Self {
        self.binary(BinaryOp::Gt, right)
    }

    #[must_use]
    pub fn gt_eq(self, right: Self) -> Self {
        self.binary(BinaryOp::GtEq, right)
    }

    #[must_use]
    pub fn and(self, right: Self) -> Self {
        self.binary(BinaryOp::And, right)
    }

    #[must_use]
    pub fn or(self, right: Self) -> Self {
        self.binary(BinaryOp::Or, right)
    }

    /// True if this expression is, at the top level, an equality between
    /// two field references — the only shape a JOIN ON clause accepts.
    #[must_use]
    pub fn as_field_equality(&self) -> Option<(&FieldRef, &FieldRef)> {
        match self {
            Self::Binary {
                left,
                op: BinaryOp::Eq,
                right,
            } => match (left.as_ref(), right.as_ref()) {
                (Self::Field(l, _), Self::Field(r, _)) => Some((l, r)),
                _ => None,
            },
            _ => None,
        }
    }
}
