//! The process-wide set of loaded databases: load→recover→cache→save→
//! close. The registry serializes load/create/
//! drop/rename under its own lock but releases it before returning a
//! handle, so concurrent statements on an already-loaded database
//! proceed without registry contention.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use joydb_core::schema::{Database, Row, Table};
use joydb_wal::{Record, TableCrc, Writer};
use tracing::{info, warn};

use crate::error::{EngineError, Result};

/// Where the registry keeps every database's directory and WAL file.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_path: PathBuf,
}

/// A loaded database paired with the WAL writer it was recovered
/// against. Table-level concurrency lives inside [`Table`] itself;
/// `database` is only taken exclusively for schema-shape changes
/// (load/create/drop/rename), never for row-level DML.
pub struct LoadedDatabase {
    database: RwLock<Database>,
    writer: Writer,
}

impl LoadedDatabase {
    #[must_use]
    pub fn with_database<R>(&self, f: impl FnOnce(&Database) -> R) -> R {
        f(&self.database.read().expect("database lock poisoned"))
    }

    pub fn with_database_mut<R>(&self, f: impl FnOnce(&mut Database) -> R) -> R {
        f(&mut self.database.write().expect("database lock poisoned"))
    }

    #[must_use]
    pub fn writer(&self) -> &Writer {
        &self.writer
    }
}

pub struct Registry {
    config: RegistryConfig,
    databases: RwLock<HashMap<String, Arc<LoadedDatabase>>>,
}

impl Registry {
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            databases: RwLock::new(HashMap::new()),
        }
    }

    fn wal_path(&self, database_dir: &Path, name: &str) -> PathBuf {
        database_dir.join(format!("{name}.wal"))
    }

    /// Returns an already-loaded database, or loads it from disk
    /// (running WAL recovery) and caches it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DatabaseNotFound`] if no such database
    /// exists on disk, or a storage/WAL error from recovery.
    pub fn load(&self, name: &str) -> Result<Arc<LoadedDatabase>> {
        if let Some(loaded) = self.databases.read().expect("registry lock poisoned").get(name) {
            return Ok(loaded.clone());
        }

        let mut databases = self.databases.write().expect("registry lock poisoned");
        if let Some(loaded) = databases.get(name) {
            return Ok(loaded.clone());
        }

        let database_dir = joydb_storage::database_dir(&self.config.base_path, name);
        if !database_dir.exists() {
            return Err(EngineError::DatabaseNotFound(name.to_string()));
        }

        let mut database = joydb_storage::load_database(&self.config.base_path, name)?;
        let wal_path = self.wal_path(&database_dir, name);
        let writer = self.recover_and_open(&database_dir, &wal_path, &mut database)?;

        let loaded = Arc::new(LoadedDatabase {
            database: RwLock::new(database),
            writer,
        });
        databases.insert(name.to_string(), loaded.clone());
        Ok(loaded)
    }

    fn recover_and_open(
        &self,
        database_dir: &Path,
        wal_path: &Path,
        database: &mut Database,
    ) -> Result<Writer> {
        if !wal_path.exists() {
            info!(database = database.name(), "no WAL file found, starting fresh");
            return Ok(Writer::create(wal_path, database.name(), now_unix())?);
        }

        let mut table_names: Vec<String> = database.table_names().iter().map(|s| (*s).to_string()).collect();
        table_names.sort();
        let meta = joydb_storage::DatabaseMeta {
            name: database.name().to_string(),
            version: joydb_storage::META_FORMAT_VERSION,
            tables: table_names,
        };
        let dir = database_dir.to_path_buf();
        let meta_for_closure = meta.clone();

        let result = joydb_wal::recover(wal_path, |checkpoint_db_crc, checkpoint_tables: &[TableCrc]| {
            checkpoint_trusted(&dir, checkpoint_db_crc, checkpoint_tables, &meta_for_closure)
        })?;

        info!(
            database = database.name(),
            committed = result.committed_operations.len(),
            trusted = result.checkpoint_trusted,
            "WAL recovery complete"
        );

        apply_committed_operations(database, &result.committed_operations);

        Ok(Writer::open_for_append(
            wal_path,
            result.next_lsn,
            result.resume_offset,
            result.flushed_lsn,
            result.last_checkpoint_lsn,
        )?)
    }

    /// Creates a brand-new, empty database: an on-disk directory with
    /// an empty `meta.json` and a fresh WAL file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DatabaseAlreadyExists`] if the directory
    /// already exists.
    pub fn create(&self, name: &str) -> Result<()> {
        let mut databases = self.databases.write().expect("registry lock poisoned");
        let database_dir = joydb_storage::database_dir(&self.config.base_path, name);
        if database_dir.exists() || databases.contains_key(name) {
            return Err(EngineError::DatabaseAlreadyExists(name.to_string()));
        }

        let database = Database::new(name);
        joydb_storage::save_database(&self.config.base_path, &database)?;

        let wal_path = self.wal_path(&database_dir, name);
        let writer = Writer::create(&wal_path, name, now_unix())?;

        info!(database = name, "created database");
        databases.insert(
            name.to_string(),
            Arc::new(LoadedDatabase {
                database: RwLock::new(database),
                writer,
            }),
        );
        Ok(())
    }

    /// Drops a database: closes its WAL writer (if loaded) and deletes
    /// its entire directory from disk.
    ///
    /// # Errors
    ///
    /// Returns a storage/I/O error if the directory cannot be removed.
    pub fn drop_database(&self, name: &str) -> Result<()> {
        let mut databases = self.databases.write().expect("registry lock poisoned");
        if let Some(loaded) = databases.remove(name) {
            loaded.writer.close()?;
        }
        let database_dir = joydb_storage::database_dir(&self.config.base_path, name);
        if database_dir.exists() {
            fs::remove_dir_all(&database_dir)?;
        }
        info!(database = name, "dropped database");
        Ok(())
    }

    /// Renames a loaded database in place. The WAL file descriptor
    /// stays open and valid across the directory rename (POSIX rename
    /// does not invalidate open handles).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DatabaseNotFound`] if `old_name` isn't
    /// loaded, or an I/O error moving the directory.
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<()> {
        let mut databases = self.databases.write().expect("registry lock poisoned");
        let loaded = databases
            .remove(old_name)
            .ok_or_else(|| EngineError::DatabaseNotFound(old_name.to_string()))?;

        let old_dir = joydb_storage::database_dir(&self.config.base_path, old_name);
        let new_dir = joydb_storage::database_dir(&self.config.base_path, new_name);
        loaded.with_database_mut(|db| db.rename(new_name));

        if old_dir.exists() {
            fs::rename(&old_dir, &new_dir)?;
            let old_wal = new_dir.join(format!("{old_name}.wal"));
            let new_wal = new_dir.join(format!("{new_name}.wal"));
            if old_wal.exists() {
                fs::rename(&old_wal, &new_wal)?;
            }
        }

        loaded.with_database(|db| joydb_storage::save_database(&self.config.base_path, db))?;
        databases.insert(new_name.to_string(), loaded);
        info!(old_name, new_name, "renamed database");
        Ok(())
    }

    /// Saves every loaded database's snapshot, appends a trusting
    /// Checkpoint record for it, and closes its WAL writer.
    ///
    /// # Errors
    ///
    /// Returns a storage/WAL error from the first database that fails.
    pub fn close_all(&self) -> Result<()> {
        let databases = self.databases.write().expect("registry lock poisoned");
        for (name, loaded) in databases.iter() {
            self.checkpoint_and_save(name, loaded)?;
            loaded.writer.close()?;
        }
        Ok(())
    }

    fn checkpoint_and_save(&self, name: &str, loaded: &LoadedDatabase) -> Result<()> {
        loaded.with_database(|database| -> Result<()> {
            joydb_storage::save_database(&self.config.base_path, database)?;
            let database_dir = joydb_storage::database_dir(&self.config.base_path, name);
            let db_crc = joydb_storage::database_meta_crc32(&database_dir)?;

            let mut table_names: Vec<String> = database.table_names().iter().map(|s| (*s).to_string()).collect();
            table_names.sort();
            let meta = joydb_storage::DatabaseMeta {
                name: database.name().to_string(),
                version: joydb_storage::META_FORMAT_VERSION,
                tables: table_names,
            };
            let table_crcs = joydb_storage::table_crcs(&database_dir, &meta)?
                .into_iter()
                .map(|(name, meta_crc32, data_crc32)| TableCrc {
                    name,
                    data_crc32,
                    meta_crc32,
                })
                .collect();

            loaded.writer.write_checkpoint(db_crc, table_crcs, now_unix())?;
            Ok(())
        })
    }
}

fn checkpoint_trusted(
    database_dir: &Path,
    checkpoint_db_crc: u32,
    checkpoint_tables: &[TableCrc],
    meta: &joydb_storage::DatabaseMeta,
) -> bool {
    let Ok(actual_db_crc) = joydb_storage::database_meta_crc32(database_dir) else {
        return false;
    };
    if actual_db_crc != checkpoint_db_crc {
        return false;
    }
    let Ok(actual_tables) = joydb_storage::table_crcs(database_dir, meta) else {
        return false;
    };
    if actual_tables.len() != checkpoint_tables.len() {
        return false;
    }
    actual_tables.iter().all(|(name, meta_crc, data_crc)| {
        checkpoint_tables
            .iter()
            .any(|tc| &tc.name == name && tc.meta_crc32 == *meta_crc && tc.data_crc32 == *data_crc)
    })
}

/// Applies REDO-only recovered operations to the freshly loaded
/// in-memory tables, then rebuilds every index. A missing table or
/// missing key is warned and skipped.
fn apply_committed_operations(database: &Database, operations: &[Record]) {
    for record in operations {
        match record {
            Record::Insert { table, key, value, .. } => {
                replay_insert(database, table, key, value);
            }
            Record::Update {
                table,
                key,
                new_value,
                ..
            } => {
                replay_update(database, table, key, new_value);
            }
            Record::Delete { table, key, .. } => {
                replay_delete(database, table, key);
            }
            Record::BeginTxn { .. } | Record::Commit { .. } | Record::Abort { .. } | Record::Checkpoint { .. } => {
                unreachable!("recover() only returns committed Insert/Update/Delete records")
            }
        }
    }
    for (_, table) in database.tables() {
        table.rebuild_indexes();
    }
}

fn decode_row(table: &Table, bytes: &[u8]) -> Option<Row> {
    let json: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(json) => json,
        Err(err) => {
            warn!(error = %err, "WAL replay: malformed row payload, skipping");
            return None;
        }
    };
    let schema_order: Vec<String> = table.columns().iter().map(|c| c.name.clone()).collect();
    Some(Row::from_json(&json, &schema_order))
}

fn replay_insert(database: &Database, table_name: &str, _key: &str, value: &[u8]) {
    let Some(table) = database.table(table_name) else {
        warn!(table = table_name, "WAL replay: Insert references missing table, skipping");
        return;
    };
    let Some(row) = decode_row(table, value) else {
        return;
    };
    table.replay_insert(row);
}

fn replay_update(database: &Database, table_name: &str, key: &str, new_value: &[u8]) {
    let Some(table) = database.table(table_name) else {
        warn!(table = table_name, "WAL replay: Update references missing table, skipping");
        return;
    };
    let Some(pk_column) = table.primary_key_column() else {
        warn!(table = table_name, "WAL replay: Update on table with no primary key, skipping");
        return;
    };
    let Some(row) = decode_row(table, new_value) else {
        return;
    };
    if !table.replay_update(&pk_column.name, key, row) {
        warn!(table = table_name, key, "WAL replay: Update found no matching row, skipping");
    }
}

fn replay_delete(database: &Database, table_name: &str, key: &str) {
    let Some(table) = database.table(table_name) else {
        warn!(table = table_name, "WAL replay: Delete references missing table, skipping");
        return;
    };
    let Some(pk_column) = table.primary_key_column() else {
        warn!(table = table_name, "WAL replay: Delete on table with no primary key, skipping");
        return;
    };
    if !table.replay_delete(&pk_column.name, key) {
        warn!(table = table_name, key, "WAL replay: Delete found no matching row, skipping");
    }
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use joydb_core::schema::{Column, ColumnType, Value};

    use super::*;

    fn config(dir: &Path) -> RegistryConfig {
        RegistryConfig {
            base_path: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_create_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(config(dir.path()));
        registry.create("shop").unwrap();

        let loaded = registry.load("shop").unwrap();
        loaded.with_database(|db| assert_eq!(db.name(), "shop"));
    }

    #[test]
    fn test_create_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(config(dir.path()));
        registry.create("shop").unwrap();
        assert!(matches!(
            registry.create("shop"),
            Err(EngineError::DatabaseAlreadyExists(_))
        ));
    }

    #[test]
    fn test_load_missing_database_fails() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(config(dir.path()));
        assert!(matches!(
            registry.load("ghosts"),
            Err(EngineError::DatabaseNotFound(_))
        ));
    }

    #[test]
    fn test_committed_wal_insert_is_replayed_on_reload() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(config(dir.path()));
        registry.create("shop").unwrap();
        let loaded = registry.load("shop").unwrap();

        loaded.with_database_mut(|db| {
            db.add_table(
                Table::new(
                    "users",
                    vec![Column::new("id", ColumnType::Int).primary_key().auto_increment()],
                )
                .unwrap(),
            );
        });
        // Persist the (still empty) schema so the table directory exists
        // on disk for the next load, without a checkpoint yet covering
        // the row the WAL is about to record below.
        loaded.with_database(|db| joydb_storage::save_database(&config(dir.path()).base_path, db)).unwrap();

        let row = loaded
            .with_database(|db| db.table("users").unwrap().insert(Row::new()))
            .unwrap();
        assert_eq!(row.get("id"), Some(&Value::Int(1)));

        loaded.writer().begin(1).unwrap();
        loaded
            .writer()
            .log_insert(1, "users", "1", row.to_json().to_string().into_bytes())
            .unwrap();
        loaded.writer().commit(1).unwrap();

        // No close_all()/checkpoint here: the snapshot on disk still
        // reflects the pre-insert (empty) state, so only a fresh
        // registry's WAL recovery can reproduce the row.
        drop(loaded);
        drop(registry);

        let registry2 = Registry::new(config(dir.path()));
        let loaded2 = registry2.load("shop").unwrap();
        loaded2.with_database(|db| {
            assert_eq!(db.table("users").unwrap().row_count(), 1);
        });
    }

    #[test]
    fn test_drop_database_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(config(dir.path()));
        registry.create("shop").unwrap();
        registry.drop_database("shop").unwrap();
        assert!(!dir.path().join("shop").exists());
    }
}
