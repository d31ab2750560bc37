//! What `Engine::execute` hands back for a single statement.

use joydb_core::schema::Row;

/// The outcome of one statement, shaped for a wire protocol's
/// `Columns`/`Rows`/`RowsAffected`/`Message` fields without committing
/// to any particular serialization — that boundary belongs to the
/// network server and CLI, both out of scope here.
#[derive(Debug, Clone)]
pub enum ExecutionResult {
    /// A `SELECT`'s output rows, with the column order the projection
    /// decided.
    Rows { columns: Vec<String>, rows: Vec<Row> },
    /// An `INSERT`/`UPDATE`/`DELETE`'s effect count.
    RowsAffected(usize),
    /// A DDL acknowledgement (`CREATE`/`DROP`/`ALTER`/`USE DATABASE`).
    Message(String),
}
