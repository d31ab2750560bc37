//! # joydb-core
//!
//! The execution pipeline and storage substrate of a small relational
//! database engine: SQL lexing and parsing into an AST, planning into a
//! tree of physical operators, and the in-memory table/index/database
//! model the planner and executor operate on.
//!
//! This crate provides:
//! - A hand-written recursive-descent SQL parser with Pratt expression
//!   parsing over a narrow grammar (SELECT/INSERT/UPDATE/DELETE, a
//!   single JOIN per statement, and database-level DDL)
//! - A planner that resolves names against a live [`schema::Database`],
//!   coerces literals to declared column types, and compiles predicates
//! - A dynamically-typed [`schema::Value`]/[`schema::Row`] model backed
//!   by primary-key/unique indexes with table-level RW-lock concurrency
//!
//! ## Example
//!
//! ```rust
//! use joydb_core::Parser;
//!
//! let sql = "SELECT * FROM users WHERE id = 1";
//! let mut parser = Parser::new(sql);
//! let statement = parser.parse_statement().unwrap();
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod planner;
pub mod predicate;
pub mod schema;

pub use ast::{Expr, Statement};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseError, Parser};
pub use planner::{PlanError, PlanNode, Planner};
pub use predicate::{Predicate, PredicateError};
pub use schema::{Column, ColumnType, Database, Row, Table, Value};
