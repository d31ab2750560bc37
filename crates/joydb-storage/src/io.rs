//! Filesystem primitives shared by the snapshot store: path layout and
//! the write-temp-then-rename discipline required for every save.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};

#[must_use]
pub fn database_dir(base_path: &Path, database: &str) -> PathBuf {
    base_path.join(database)
}

#[must_use]
pub fn table_dir(database_dir: &Path, table: &str) -> PathBuf {
    database_dir.join(table)
}

pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = read_file(path)?;
    serde_json::from_slice(&bytes).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Serializes `value` and writes it to `path` atomically: the bytes
/// land in a sibling `*.tmp` file first, which is then renamed over the
/// final name. On POSIX, rename is atomic, so a crash mid-save never
/// leaves a half-written `meta.json`/`data.json` behind.
///
/// # Errors
///
/// Returns [`StorageError::Io`] if the directory cannot be created or
/// the file cannot be written/renamed.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp_path = path.with_extension(tmp_extension(path));
    fs::write(&tmp_path, &bytes).map_err(|source| StorageError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn tmp_extension(path: &Path) -> String {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{ext}.tmp"),
        None => "tmp".to_string(),
    }
}
