//! Errors raised by the snapshot store.

use std::path::PathBuf;

/// Errors the snapshot store's save/load paths can raise.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("i/o error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("table '{0}' has an ill-formed schema: {1}")]
    InvalidSchema(String, String),

    #[error("database directory '{0}' does not exist")]
    NoSuchDatabase(PathBuf),

    #[error("table directory '{0}' does not exist")]
    NoSuchTable(PathBuf),
}

pub type Result<T> = std::result::Result<T, StorageError>;
