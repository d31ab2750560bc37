//! SQL Parser
//!
//! A hand-written recursive-descent parser producing an AST of
//! statements: `Select`, `Insert`, `Update`, `Delete`,
//! `CreateDatabase`, `DropDatabase`, `AlterDatabase` (rename), and
//! `UseDatabase`.
//!
//! # Grammar
//!
//! - **Select:** `SELECT <fields> FROM <ident> {join-clause}* [WHERE <expr>] [;]`;
//!   fields are `*` or a comma-separated list of unqualified or
//!   `table.col` identifiers.
//! - **Join:** `[INNER|LEFT|RIGHT|FULL] [OUTER] JOIN <ident> ON <expr>`;
//!   bare `JOIN` is INNER.
//! - **Update:** `UPDATE <ident> SET col=lit{,col=lit}* [WHERE <expr>]`.
//! - **Delete:** `DELETE FROM <ident> [WHERE <expr>]`.
//! - **Insert:** `INSERT INTO <ident> [(cols)] VALUES (<exprs>)`.
//! - **Expressions** (precedence low to high): OR, AND, comparison
//!   (`=`, `<`, `>`, `<=`, `>=`, `!=`, `<>`), atom; atoms are literals,
//!   identifiers, qualified identifiers, parenthesized expressions, and
//!   typed literals `DATE '...'`, `TIME '...'`, `EMAIL '...'` which
//!   validate format at parse time.
//! - **DDL:** `CREATE DATABASE <ident>`, `DROP DATABASE <ident>`,
//!   `ALTER DATABASE <ident> RENAME TO <ident>`, `USE DATABASE <ident>`.
//!
//! Identifiers and keywords are case-insensitive on match and lower-cased
//! for storage. A parse error names the offending token and its
//! line/column.

mod error;
mod parser;
mod pratt;

pub use error::ParseError;
pub use parser::Parser;

pub(crate) use parser::{validate_date, validate_email, validate_time};
