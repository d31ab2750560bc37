//! SQL statement AST types.

use core::fmt;

use super::expression::Expr;

/// Join type. Bare `JOIN` parses as `Inner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `[INNER|LEFT|RIGHT|FULL] [OUTER] JOIN <ident> ON <expr>` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    /// The joined table's name.
    pub table: String,
    /// The ON condition. The planner requires this to be an equality
    /// between two field references.
    pub on: Expr,
}

/// A column the SELECT list projects.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    /// `*`
    All,
    /// An unqualified or `table.col` column reference.
    Field(super::FieldRef),
}

/// `SELECT <fields> FROM <ident> {join-clause}* [WHERE <expr>] [;]`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub columns: Vec<SelectColumn>,
    pub from: String,
    pub joins: Vec<JoinClause>,
    pub where_clause: Option<Expr>,
}

/// `INSERT INTO <ident> [(cols)] VALUES (<exprs>)`
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    /// Explicit column list, if given. `None` means "all columns in
    /// declared order".
    pub columns: Option<Vec<String>>,
    pub values: Vec<Expr>,
}

/// A single `col=lit` assignment in an UPDATE's SET clause.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateAssignment {
    pub column: String,
    pub value: Expr,
}

/// `UPDATE <ident> SET col=lit{,col=lit}* [WHERE <expr>]`
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<UpdateAssignment>,
    pub where_clause: Option<Expr>,
}

/// `DELETE FROM <ident> [WHERE <expr>]`
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub where_clause: Option<Expr>,
}

/// `CREATE DATABASE <ident>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDatabaseStatement {
    pub name: String,
}

/// `DROP DATABASE <ident>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropDatabaseStatement {
    pub name: String,
}

/// `ALTER DATABASE <ident> RENAME TO <ident>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterDatabaseStatement {
    pub name: String,
    pub new_name: String,
}

/// `USE DATABASE <ident>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseDatabaseStatement {
    pub name: String,
}

/// Any statement the parser can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    CreateDatabase(CreateDatabaseStatement),
    DropDatabase(DropDatabaseStatement),
    AlterDatabase(AlterDatabaseStatement),
    UseDatabase(UseDatabaseStatement),
}

impl Statement {
    /// True for statements the engine treats as DDL, dispatched straight
    /// to the registry rather than the planner.
    #[must_use]
    pub const fn is_ddl(&self) -> bool {
        matches!(
            self,
            Self::CreateDatabase(_)
                | Self::DropDatabase(_)
                | Self::AlterDatabase(_)
                | Self::UseDatabase(_)
        )
    }
}
