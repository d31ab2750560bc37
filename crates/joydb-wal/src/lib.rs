//! Binary write-ahead log for joydb: CRC-checked records, a single-writer
//! append path, and REDO-only crash recovery.
//!
//! This crate knows nothing about SQL, rows, or tables beyond opaque
//! already-serialized payload bytes and the table names/keys used to
//! index them during replay. `joydb-engine` is the only crate that
//! interprets what a `value`/`old_value`/`new_value` byte string means.

mod error;
mod header;
mod reader;
mod record;
mod recovery;
mod writer;

pub use error::{Result, WalError};
pub use header::{FileHeader, FORMAT_VERSION, HEADER_SIZE, MAGIC};
pub use reader::Reader;
pub use record::{Record, RecordType, TableCrc, MAX_RECORD_SIZE, MIN_RECORD_SIZE, RECORD_HEADER_SIZE};
pub use recovery::{recover, RecoveryResult};
pub use writer::Writer;
