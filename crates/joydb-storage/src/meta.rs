//! On-disk metadata shapes: `<db>/meta.json` and each table's
//! `<db>/<table>/meta.json`. These mirror `joydb_core::schema`
//! types but exist as their own serializable structs so the storage
//! format stays decoupled from in-memory representation choices.

use joydb_core::schema::Column;
use serde::{Deserialize, Serialize};

/// The database root's `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseMeta {
    pub name: String,
    pub version: i64,
    pub tables: Vec<String>,
}

/// A table directory's `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub columns: Vec<Column>,
    pub last_insert_id: i64,
    pub row_count: usize,
}
