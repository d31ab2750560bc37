//! The façade's unified fallible surface: every error kind the engine
//! can hand back to a caller, named by kind rather than wrapped opaquely.

use joydb_core::schema::ConstraintError;
use joydb_core::{ParseError, PlanError};

/// Errors the engine's per-statement pipeline can raise.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("lex/parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("constraint violation: {0}")]
    Constraint(#[from] ConstraintError),

    #[error("wal error: {0}")]
    Wal(#[from] joydb_wal::WalError),

    #[error("storage error: {0}")]
    Storage(#[from] joydb_storage::StorageError),

    #[error("no database selected")]
    NoDatabaseSelected,

    #[error("database '{0}' not found")]
    DatabaseNotFound(String),

    #[error("database '{0}' already exists")]
    DatabaseAlreadyExists(String),

    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("unsupported join construct: {0}")]
    UnsupportedJoin(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
