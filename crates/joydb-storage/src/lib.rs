//! Human-readable on-disk snapshot layout for joydb databases and
//! tables: a directory per database, `meta.json`/`data.json` per
//! table, written atomically via write-temp-then-rename.
//!
//! This crate is the engine's only path to durable storage besides the
//! WAL; it knows nothing about SQL or the WAL's binary record format,
//! only the bit-exact JSON shapes and the CRC32s `joydb-engine` needs
//! to decide whether a WAL checkpoint is still trustworthy.

mod crc;
mod error;
mod io;
mod meta;
mod store;

pub use crc::{crc32_of_file, database_meta_crc32, table_crcs};
pub use error::{Result, StorageError};
pub use io::database_dir;
pub use meta::{DatabaseMeta, TableMeta};
pub use store::{load_database, load_table, save_database, save_table, META_FORMAT_VERSION};
