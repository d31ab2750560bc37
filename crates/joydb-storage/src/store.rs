//! Save/load a [`Database`] and its [`Table`]s to the on-disk snapshot
//! layout: a directory per database, a subdirectory per table,
//! `meta.json`/`data.json` pairs, atomic `*.tmp`-then-rename writes.

use std::path::Path;

use joydb_core::schema::{Database, Row, Table};
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::io::{database_dir, read_json, table_dir, write_json_atomic};
use crate::meta::{DatabaseMeta, TableMeta};

/// The on-disk metadata format version written to every `meta.json`.
/// Bumped only if the snapshot layout itself changes shape, never on a
/// per-save basis.
pub const META_FORMAT_VERSION: i64 = 1;

/// Saves `table` into `database_dir/<table.name()>/`, writing
/// `meta.json` and `data.json` atomically.
///
/// # Errors
///
/// Returns [`StorageError::Io`] or [`StorageError::Json`] on failure.
pub fn save_table(database_dir: &Path, table: &Table) -> Result<()> {
    let dir = table_dir(database_dir, table.name());
    let rows = table.select_all();

    let meta = TableMeta {
        name: table.name().to_string(),
        columns: table.columns().to_vec(),
        last_insert_id: table.last_insert_id(),
        row_count: rows.len(),
    };
    write_json_atomic(&dir.join("meta.json"), &meta)?;

    let data: Vec<serde_json::Value> = rows.iter().map(Row::to_json).collect();
    write_json_atomic(&dir.join("data.json"), &data)?;

    debug!(table = table.name(), rows = meta.row_count, "saved table snapshot");
    Ok(())
}

/// Loads a table previously saved by [`save_table`] from
/// `database_dir/<table_name>/`.
///
/// # Errors
///
/// Returns [`StorageError::NoSuchTable`] if the directory is missing,
/// [`StorageError::Io`]/[`StorageError::Json`] on a read failure, or
/// [`StorageError::InvalidSchema`] if the stored columns don't form a
/// valid schema.
pub fn load_table(database_dir: &Path, table_name: &str) -> Result<Table> {
    let dir = table_dir(database_dir, table_name);
    if !dir.exists() {
        return Err(StorageError::NoSuchTable(dir));
    }

    let meta: TableMeta = read_json(&dir.join("meta.json"))?;
    let data: Vec<serde_json::Value> = read_json(&dir.join("data.json"))?;

    let schema_order: Vec<String> = meta.columns.iter().map(|c| c.name.clone()).collect();
    let rows: Vec<Row> = data.iter().map(|v| Row::from_json(v, &schema_order)).collect();

    let table = Table::from_snapshot(meta.name, meta.columns, rows, meta.last_insert_id)
        .map_err(|msg| StorageError::InvalidSchema(table_name.to_string(), msg))?;
    table.clear_dirty();
    Ok(table)
}

/// Saves every table of `database` under `base_path/<database.name()>/`,
/// then writes the database root's `meta.json` last so a reader never
/// observes a `meta.json` naming a table whose own files aren't there
/// yet.
///
/// # Errors
///
/// Returns [`StorageError::Io`] or [`StorageError::Json`] on failure.
pub fn save_database(base_path: &Path, database: &Database) -> Result<()> {
    let dir = database_dir(base_path, database.name());

    let mut table_names: Vec<String> = database.table_names().iter().map(|s| (*s).to_string()).collect();
    table_names.sort();

    for name in &table_names {
        let table = database
            .table(name)
            .expect("table_names only names tables present in the database");
        save_table(&dir, table)?;
        table.clear_dirty();
    }

    let meta = DatabaseMeta {
        name: database.name().to_string(),
        version: META_FORMAT_VERSION,
        tables: table_names,
    };
    write_json_atomic(&dir.join("meta.json"), &meta)?;

    info!(database = database.name(), tables = meta.tables.len(), "saved database snapshot");
    Ok(())
}

/// Loads a database previously saved by [`save_database`] from
/// `base_path/<name>/`.
///
/// # Errors
///
/// Returns [`StorageError::NoSuchDatabase`] if the directory is
/// missing, or a table-load error if any table fails to load.
pub fn load_database(base_path: &Path, name: &str) -> Result<Database> {
    let dir = database_dir(base_path, name);
    if !dir.exists() {
        return Err(StorageError::NoSuchDatabase(dir));
    }

    let meta: DatabaseMeta = read_json(&dir.join("meta.json"))?;
    let mut database = Database::new(meta.name.clone());
    for table_name in &meta.tables {
        let table = load_table(&dir, table_name)?;
        database.add_table(table);
    }

    info!(database = meta.name, tables = meta.tables.len(), "loaded database snapshot");
    Ok(database)
}

#[cfg(test)]
mod tests {
    use joydb_core::schema::{Column, ColumnType, Value};

    use super::*;

    fn sample_table() -> Table {
        let table = Table::new(
            "users",
            vec![
                Column::new("id", ColumnType::Int).primary_key().auto_increment(),
                Column::new("email", ColumnType::Email).unique().not_null(),
            ],
        )
        .unwrap();
        let mut row = Row::new();
        row.set("email", Value::Text("a@x.com".to_string()));
        table.insert(row).unwrap();
        table
    }

    #[test]
    fn test_save_then_load_table_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let table = sample_table();
        save_table(dir.path(), &table).unwrap();

        let loaded = load_table(dir.path(), "users").unwrap();
        assert_eq!(loaded.row_count(), 1);
        assert_eq!(loaded.last_insert_id(), 1);
        let rows = loaded.select_all();
        assert_eq!(rows[0].get("email"), Some(&Value::Text("a@x.com".to_string())));
    }

    #[test]
    fn test_load_table_missing_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_table(dir.path(), "nope"),
            Err(StorageError::NoSuchTable(_))
        ));
    }

    #[test]
    fn test_save_then_load_database_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut database = Database::new("shop");
        database.add_table(sample_table());
        save_database(dir.path(), &database).unwrap();

        let loaded = load_database(dir.path(), "shop").unwrap();
        assert_eq!(loaded.name(), "shop");
        assert!(loaded.table("users").is_some());
        assert_eq!(loaded.table("users").unwrap().row_count(), 1);
    }

    #[test]
    fn test_load_database_missing_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_database(dir.path(), "nope"),
            Err(StorageError::NoSuchDatabase(_))
        ));
    }

    #[test]
    fn test_save_database_clears_dirty_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut database = Database::new("shop");
        database.add_table(sample_table());
        assert!(database.is_dirty());
        save_database(dir.path(), &database).unwrap();
        assert!(!database.is_dirty());
    }
}
