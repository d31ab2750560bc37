//! Abstract Syntax Tree (AST) types for SQL statements.

mod expression;
mod statement;

pub use expression::{BinaryOp, Expr, FieldRef, Literal};
pub use statement::{
    AlterDatabaseStatement, CreateDatabaseStatement, DeleteStatement, DropDatabaseStatement,
    InsertStatement, JoinClause, JoinType, SelectColumn, SelectStatement, Statement,
    UpdateAssignment, UpdateStatement, UseDatabaseStatement,
};
