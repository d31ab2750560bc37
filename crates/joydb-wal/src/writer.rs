//! The WAL writer: single-mutex LSN allocation, record encoding, and
//! file append, with `Commit`/`WriteCheckpoint` fsyncing inside the
//! same critical section.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::{Result, WalError};
use crate::header::{FileHeader, HEADER_SIZE};
use crate::record::{Record, TableCrc};

struct WriterState {
    file: File,
    next_lsn: u64,
    flushed_lsn: u64,
    last_checkpoint_lsn: Option<u64>,
    offset: u64,
    active_txns: HashSet<u64>,
}

/// Append-only WAL writer for one database. All mutation methods take
/// `&self`; the internal mutex is the single critical section —
/// LSN allocation, encoding, the file write, and
/// `flushed_lsn` advancement all happen under one lock, so concurrent
/// statements' writes serialize here without any of them blocking on
/// I/O while holding a table lock.
pub struct Writer {
    path: PathBuf,
    inner: Mutex<WriterState>,
}

impl Writer {
    /// Creates a brand-new WAL file with a fresh header, truncating any
    /// existing file at `path`. LSNs start at 1.
    ///
    /// # Errors
    ///
    /// Returns [`WalError::Io`] on any filesystem failure.
    pub fn create(path: impl AsRef<Path>, database_name: &str, created_at_unix: i64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .read(true)
            .open(&path)?;

        let header = FileHeader::new(database_name, 1, created_at_unix);
        file.write_all(&header.encode())?;
        file.sync_all()?;

        Ok(Self {
            path,
            inner: Mutex::new(WriterState {
                file,
                next_lsn: 1,
                flushed_lsn: 0,
                last_checkpoint_lsn: None,
                offset: HEADER_SIZE,
                active_txns: HashSet::new(),
            }),
        })
    }

    /// Reopens an existing WAL file for append, resuming LSN allocation
    /// and the append offset from a prior [`crate::recovery::recover`]
    /// call's results.
    ///
    /// # Errors
    ///
    /// Returns [`WalError::Io`] on any filesystem failure.
    pub fn open_for_append(
        path: impl AsRef<Path>,
        resume_next_lsn: u64,
        resume_offset: u64,
        resume_flushed_lsn: u64,
        resume_last_checkpoint_lsn: Option<u64>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new().write(true).read(true).open(&path)?;
        file.seek(SeekFrom::Start(resume_offset))?;
        // A crash can leave a torn tail past the last intact record;
        // truncate to the recovered boundary so new appends don't leave
        // a gap of garbage bytes behind them.
        file.set_len(resume_offset)?;

        Ok(Self {
            path,
            inner: Mutex::new(WriterState {
                file,
                next_lsn: resume_next_lsn,
                flushed_lsn: resume_flushed_lsn,
                last_checkpoint_lsn: resume_last_checkpoint_lsn,
                offset: resume_offset,
                active_txns: HashSet::new(),
            }),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn flushed_lsn(&self) -> u64 {
        self.inner.lock().expect("wal writer lock poisoned").flushed_lsn
    }

    #[must_use]
    pub fn last_checkpoint_lsn(&self) -> Option<u64> {
        self.inner
            .lock()
            .expect("wal writer lock poisoned")
            .last_checkpoint_lsn
    }

    fn append(&self, state: &mut WriterState, build: impl FnOnce(u64) -> Record) -> Result<u64> {
        let lsn = state.next_lsn;
        let record = build(lsn);
        let bytes = record.encode(state.offset)?;
        state.file.write_all(&bytes)?;
        state.offset += bytes.len() as u64;
        state.next_lsn += 1;
        Ok(lsn)
    }

    /// Registers `txid` as Active. A second `Begin` for the same id is
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`WalError::TransactionAlreadyActive`] or
    /// [`WalError::MaxRecordSize`]/[`WalError::Io`] on write failure.
    pub fn begin(&self, txid: u64) -> Result<u64> {
        let mut state = self.inner.lock().expect("wal writer lock poisoned");
        if state.active_txns.contains(&txid) {
            return Err(WalError::TransactionAlreadyActive(txid));
        }
        let lsn = self.append(&mut state, |lsn| Record::BeginTxn { lsn, txid })?;
        state.active_txns.insert(txid);
        debug!(txid, lsn, "WAL Begin");
        Ok(lsn)
    }

    fn require_active(state: &WriterState, txid: u64) -> Result<()> {
        if !state.active_txns.contains(&txid) {
            return Err(WalError::TransactionNotActive(txid));
        }
        Ok(())
    }

    /// Logs an `Insert` for an Active transaction.
    ///
    /// # Errors
    ///
    /// Returns [`WalError::TransactionNotActive`] if `txid` has no open
    /// `Begin`, or an encoding/I/O error.
    pub fn log_insert(&self, txid: u64, table: &str, key: &str, value: Vec<u8>) -> Result<u64> {
        let mut state = self.inner.lock().expect("wal writer lock poisoned");
        Self::require_active(&state, txid)?;
        let lsn = self.append(&mut state, |lsn| Record::Insert {
            lsn,
            txid,
            table: table.to_string(),
            key: key.to_string(),
            value,
        })?;
        debug!(txid, lsn, table, key, "WAL Insert");
        Ok(lsn)
    }

    /// Logs an `Update` for an Active transaction.
    ///
    /// # Errors
    ///
    /// See [`Writer::log_insert`].
    pub fn log_update(
        &self,
        txid: u64,
        table: &str,
        key: &str,
        old_value: Vec<u8>,
        new_value: Vec<u8>,
    ) -> Result<u64> {
        let mut state = self.inner.lock().expect("wal writer lock poisoned");
        Self::require_active(&state, txid)?;
        let lsn = self.append(&mut state, |lsn| Record::Update {
            lsn,
            txid,
            table: table.to_string(),
            key: key.to_string(),
            old_value,
            new_value,
        })?;
        debug!(txid, lsn, table, key, "WAL Update");
        Ok(lsn)
    }

    /// Logs a `Delete` for an Active transaction.
    ///
    /// # Errors
    ///
    /// See [`Writer::log_insert`].
    pub fn log_delete(&self, txid: u64, table: &str, key: &str, old_value: Vec<u8>) -> Result<u64> {
        let mut state = self.inner.lock().expect("wal writer lock poisoned");
        Self::require_active(&state, txid)?;
        let lsn = self.append(&mut state, |lsn| Record::Delete {
            lsn,
            txid,
            table: table.to_string(),
            key: key.to_string(),
            old_value,
        })?;
        debug!(txid, lsn, table, key, "WAL Delete");
        Ok(lsn)
    }

    /// Appends a `Commit` record, fsyncs, advances `flushed_lsn` to the
    /// commit's LSN, and marks the transaction committed (no longer
    /// Active).
    ///
    /// # Errors
    ///
    /// Returns [`WalError::TransactionNotActive`] if `txid` was never
    /// begun, or an I/O error from the write or the fsync.
    pub fn commit(&self, txid: u64) -> Result<u64> {
        let mut state = self.inner.lock().expect("wal writer lock poisoned");
        Self::require_active(&state, txid)?;
        let lsn = self.append(&mut state, |lsn| Record::Commit { lsn, txid })?;
        state.file.sync_data()?;
        state.flushed_lsn = lsn;
        state.active_txns.remove(&txid);
        debug!(txid, lsn, "WAL Commit");
        Ok(lsn)
    }

    /// Appends an `Abort` record without requiring an fsync, and marks
    /// the transaction aborted (no longer Active).
    ///
    /// # Errors
    ///
    /// Returns [`WalError::TransactionNotActive`] if `txid` was never
    /// begun, or an I/O error from the write.
    pub fn abort(&self, txid: u64) -> Result<u64> {
        let mut state = self.inner.lock().expect("wal writer lock poisoned");
        Self::require_active(&state, txid)?;
        let lsn = self.append(&mut state, |lsn| Record::Abort { lsn, txid })?;
        state.active_txns.remove(&txid);
        warn!(txid, lsn, "WAL Abort");
        Ok(lsn)
    }

    /// Appends a `Checkpoint` record referencing the given snapshot
    /// CRCs, fsyncs, raises `flushed_lsn`, and updates
    /// `last_checkpoint_lsn`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error from the write or the fsync.
    pub fn write_checkpoint(
        &self,
        database_meta_crc32: u32,
        tables: Vec<TableCrc>,
        unix_ts: i64,
    ) -> Result<u64> {
        let mut state = self.inner.lock().expect("wal writer lock poisoned");
        let checkpoint_offset = state.offset;
        let lsn = self.append(&mut state, |lsn| Record::Checkpoint {
            lsn,
            checkpoint_lsn: lsn,
            checkpoint_offset,
            last_flushed_lsn: state.flushed_lsn,
            unix_ts,
            database_meta_crc32,
            tables,
        })?;
        state.file.sync_data()?;
        state.flushed_lsn = lsn;
        state.last_checkpoint_lsn = Some(lsn);
        debug!(lsn, "WAL Checkpoint");
        Ok(lsn)
    }

    /// Fsyncs the WAL file without appending anything.
    ///
    /// # Errors
    ///
    /// Returns [`WalError::Io`] on failure.
    pub fn sync(&self) -> Result<()> {
        let state = self.inner.lock().expect("wal writer lock poisoned");
        state.file.sync_data()?;
        Ok(())
    }

    /// Flushes and closes the underlying file handle.
    ///
    /// # Errors
    ///
    /// Returns [`WalError::Io`] on failure.
    pub fn close(&self) -> Result<()> {
        let state = self.inner.lock().expect("wal writer lock poisoned");
        state.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;

    #[test]
    fn test_begin_insert_commit_roundtrips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.wal");
        let writer = Writer::create(&path, "shop", 0).unwrap();

        writer.begin(1).unwrap();
        writer
            .log_insert(1, "users", "1", br#"{"id":1}"#.to_vec())
            .unwrap();
        writer.commit(1).unwrap();

        assert_eq!(writer.flushed_lsn(), 3);

        let records = Reader::scan_from(&path, HEADER_SIZE).unwrap();
        assert_eq!(records.len(), 3);
        assert!(matches!(records[0], Record::BeginTxn { txid: 1, .. }));
        assert!(matches!(records[1], Record::Insert { txid: 1, .. }));
        assert!(matches!(records[2], Record::Commit { txid: 1, .. }));
    }

    #[test]
    fn test_double_begin_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Writer::create(dir.path().join("shop.wal"), "shop", 0).unwrap();
        writer.begin(1).unwrap();
        assert!(matches!(
            writer.begin(1),
            Err(WalError::TransactionAlreadyActive(1))
        ));
    }

    #[test]
    fn test_dml_on_inactive_txn_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Writer::create(dir.path().join("shop.wal"), "shop", 0).unwrap();
        assert!(matches!(
            writer.log_insert(1, "users", "1", vec![]),
            Err(WalError::TransactionNotActive(1))
        ));
    }

    #[test]
    fn test_abort_does_not_advance_flushed_lsn() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Writer::create(dir.path().join("shop.wal"), "shop", 0).unwrap();
        writer.begin(1).unwrap();
        writer.abort(1).unwrap();
        assert_eq!(writer.flushed_lsn(), 0);
    }

    #[test]
    fn test_checkpoint_advances_flushed_lsn_and_marker() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Writer::create(dir.path().join("shop.wal"), "shop", 0).unwrap();
        let lsn = writer.write_checkpoint(1, vec![], 0).unwrap();
        assert_eq!(writer.flushed_lsn(), lsn);
        assert_eq!(writer.last_checkpoint_lsn(), Some(lsn));
    }
}
