//! # joydb-engine
//!
//! Per-statement execution: the executor that walks a
//! [`joydb_core::planner::PlanNode`] tree against live tables, the
//! hash-join driver, the table-operation layer that pairs mutations
//! with WAL records, the process-wide database [`Registry`], and the
//! [`Engine`]/[`Session`] façade that orchestrates lex → parse → plan →
//! (WAL begin) → execute → (WAL commit/abort) for one statement at a
//! time.
//!
//! This crate is where `joydb-core` (SQL + in-memory tables),
//! `joydb-wal` (durability), and `joydb-storage` (snapshots) meet.

mod engine;
mod error;
mod executor;
mod join;
mod observer;
mod registry;
mod result;
mod table_ops;

pub use engine::{Engine, Session};
pub use error::{EngineError, Result};
pub use executor::Executor;
pub use observer::{notify, Observer, ObserverEvent};
pub use registry::{LoadedDatabase, Registry, RegistryConfig};
pub use result::ExecutionResult;
pub use table_ops::Mutation;
