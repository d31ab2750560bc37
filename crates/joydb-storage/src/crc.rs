//! CRC32 helpers used both to validate a loaded snapshot against itself
//! and to compare against a WAL checkpoint's recorded CRCs.
//! `joydb-engine` is the one that packages these into
//! `joydb_wal::TableCrc` values when it writes a checkpoint record.

use std::path::Path;

use crate::error::Result;
use crate::io::{read_file, table_dir};
use crate::meta::DatabaseMeta;

/// CRC32 of a file's raw bytes. Returns 0 if the file does not exist,
/// matching the "absent table" case a freshly created database hits.
///
/// # Errors
///
/// Returns [`crate::error::StorageError::Io`] on any I/O failure other
/// than the file being absent.
pub fn crc32_of_file(path: impl AsRef<Path>) -> Result<u32> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(0);
    }
    let bytes = read_file(path)?;
    Ok(crc32fast::hash(&bytes))
}

/// CRC32 of a database's root `meta.json`.
///
/// # Errors
///
/// Returns [`crate::error::StorageError`] on I/O failure.
pub fn database_meta_crc32(database_dir: impl AsRef<Path>) -> Result<u32> {
    crc32_of_file(database_dir.as_ref().join("meta.json"))
}

/// CRC32 pairs of `(table, meta_crc32, data_crc32)` for every table a
/// [`DatabaseMeta`] names, in its declared table order.
///
/// # Errors
///
/// Returns [`crate::error::StorageError`] on I/O failure.
pub fn table_crcs(database_dir: impl AsRef<Path>, meta: &DatabaseMeta) -> Result<Vec<(String, u32, u32)>> {
    let database_dir = database_dir.as_ref();
    meta.tables
        .iter()
        .map(|table| {
            let dir = table_dir(database_dir, table);
            let meta_crc = crc32_of_file(dir.join("meta.json"))?;
            let data_crc = crc32_of_file(dir.join("data.json"))?;
            Ok((table.clone(), meta_crc, data_crc))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_crc32_of_missing_file_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(crc32_of_file(dir.path().join("nope.json")).unwrap(), 0);
    }

    #[test]
    fn test_crc32_of_file_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        fs::write(&path, b"{\"a\":1}").unwrap();
        let first = crc32_of_file(&path).unwrap();
        let second = crc32_of_file(&path).unwrap();
        assert_eq!(first, second);
        assert_ne!(first, 0);
    }
}
