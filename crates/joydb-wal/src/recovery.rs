//! REDO-only crash recovery.
//!
//! `joydb-wal` knows nothing about rows, tables, or snapshots beyond
//! the bytes the checkpoint record carries; deciding whether a
//! checkpoint's CRCs still match the on-disk snapshot is the caller's
//! job (`joydb-storage` computes the CRCs, `joydb-engine::Registry`
//! wires the two together). `recover` takes that decision as a
//! callback so this crate stays free of a `joydb-storage` dependency.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;
use crate::header::{FileHeader, HEADER_SIZE};
use crate::reader::Reader;
use crate::record::{Record, TableCrc};

/// The outcome of a `recover` call: everything a database loader needs
/// to bring its in-memory tables up to date and everything a
/// [`crate::writer::Writer`] needs to resume appending.
#[derive(Debug, Clone)]
pub struct RecoveryResult {
    pub database_name: String,
    /// Committed Insert/Update/Delete records, sorted strictly by LSN.
    pub committed_operations: Vec<Record>,
    /// The LSN the resumed writer should assign to its next record.
    pub next_lsn: u64,
    /// The byte offset the resumed writer should append at (the true
    /// end of the last intact record; any torn tail beyond it is
    /// truncated away by [`crate::writer::Writer::open_for_append`]).
    pub resume_offset: u64,
    pub flushed_lsn: u64,
    pub last_checkpoint_lsn: Option<u64>,
    /// Whether a checkpoint was found and its CRCs matched the on-disk
    /// snapshot (informational, for logging/diagnostics).
    pub checkpoint_trusted: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TxnState {
    Active,
    Committed,
    Aborted,
}

/// Runs the REDO-only recovery algorithm against the WAL file at
/// `path`. `checkpoint_trusted` is called with the latest checkpoint's
/// `(database_meta_crc32, table_crcs)` only if a checkpoint exists; it
/// should recompute CRCs of the on-disk snapshot and report whether
/// they still match.
///
/// # Errors
///
/// Returns [`crate::error::WalError::InvalidHeader`] if the file header
/// fails validation — recovery refuses to proceed in that case, and the
/// engine refuses to start.
pub fn recover(
    path: impl AsRef<Path>,
    checkpoint_trusted: impl FnOnce(u32, &[TableCrc]) -> bool,
) -> Result<RecoveryResult> {
    let path = path.as_ref();

    let mut header_buf = [0u8; HEADER_SIZE as usize];
    File::open(path)?.read_exact(&mut header_buf)?;
    let header = FileHeader::decode(&header_buf)?;

    let (scanned, stop_offset) = Reader::scan_with_offsets(path, HEADER_SIZE)?;

    let max_lsn = scanned.iter().map(|(_, r)| r.lsn()).max().unwrap_or(0);
    let mut flushed_lsn = 0u64;
    let mut last_checkpoint_lsn = None;
    for (_, record) in &scanned {
        match record {
            Record::Commit { lsn, .. } | Record::Checkpoint { lsn, .. } => {
                flushed_lsn = flushed_lsn.max(*lsn);
            }
            _ => {}
        }
        if let Record::Checkpoint { lsn, .. } = record {
            last_checkpoint_lsn = Some(*lsn);
        }
    }

    let checkpoint_index = scanned
        .iter()
        .enumerate()
        .rev()
        .find(|(_, (_, r))| matches!(r, Record::Checkpoint { .. }))
        .map(|(i, _)| i);

    let (replay_start_offset, checkpoint_trusted_flag) = match checkpoint_index {
        Some(idx) => {
            let Record::Checkpoint {
                database_meta_crc32,
                tables,
                ..
            } = &scanned[idx].1
            else {
                unreachable!("filtered above")
            };
            let trusted = checkpoint_trusted(*database_meta_crc32, tables);
            let start = if trusted {
                scanned.get(idx + 1).map_or(stop_offset, |(off, _)| *off)
            } else {
                HEADER_SIZE
            };
            info!(trusted, start, "WAL recovery: checkpoint located");
            (start, trusted)
        }
        None => (HEADER_SIZE, false),
    };

    let mut states: HashMap<u64, TxnState> = HashMap::new();
    let mut buffers: HashMap<u64, Vec<Record>> = HashMap::new();
    let mut committed = Vec::new();

    for (offset, record) in &scanned {
        if *offset < replay_start_offset {
            continue;
        }
        match record {
            Record::BeginTxn { txid, .. } => {
                states.insert(*txid, TxnState::Active);
                buffers.insert(*txid, Vec::new());
            }
            Record::Insert { txid, .. } | Record::Update { txid, .. } | Record::Delete { txid, .. } => {
                if states.get(txid) == Some(&TxnState::Active) {
                    buffers.entry(*txid).or_default().push(record.clone());
                }
            }
            Record::Commit { txid, .. } => {
                states.insert(*txid, TxnState::Committed);
                if let Some(buffered) = buffers.remove(txid) {
                    committed.extend(buffered);
                }
            }
            Record::Abort { txid, .. } => {
                states.insert(*txid, TxnState::Aborted);
                buffers.remove(txid);
            }
            Record::Checkpoint { .. } => {}
        }
    }

    let abandoned: Vec<u64> = states
        .iter()
        .filter(|(_, state)| **state == TxnState::Active)
        .map(|(txid, _)| *txid)
        .collect();
    for txid in abandoned {
        warn!(txid, "WAL recovery: transaction still Active at EOF, treated as aborted");
    }

    committed.sort_by_key(Record::lsn);

    Ok(RecoveryResult {
        database_name: header.database_name,
        committed_operations: committed,
        next_lsn: max_lsn + 1,
        resume_offset: stop_offset,
        flushed_lsn,
        last_checkpoint_lsn,
        checkpoint_trusted: checkpoint_trusted_flag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Writer;

    fn insert_value(id: i64) -> Vec<u8> {
        format!(r#"{{"id":{id}}}"#).into_bytes()
    }

    #[test]
    fn test_uncommitted_transaction_is_invisible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.wal");
        let writer = Writer::create(&path, "shop", 0).unwrap();
        writer.begin(1).unwrap();
        writer.log_insert(1, "t", "1", insert_value(1)).unwrap();
        drop(writer);

        let result = recover(&path, |_, _| false).unwrap();
        assert!(result.committed_operations.is_empty());
    }

    #[test]
    fn test_committed_transaction_is_replayed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.wal");
        let writer = Writer::create(&path, "shop", 0).unwrap();
        writer.begin(1).unwrap();
        writer.log_insert(1, "t", "1", insert_value(1)).unwrap();
        writer.commit(1).unwrap();
        drop(writer);

        let result = recover(&path, |_, _| false).unwrap();
        assert_eq!(result.committed_operations.len(), 1);
        assert!(matches!(result.committed_operations[0], Record::Insert { .. }));
    }

    #[test]
    fn test_aborted_transaction_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.wal");
        let writer = Writer::create(&path, "shop", 0).unwrap();
        writer.begin(1).unwrap();
        writer.log_insert(1, "t", "1", insert_value(1)).unwrap();
        writer.abort(1).unwrap();
        drop(writer);

        let result = recover(&path, |_, _| false).unwrap();
        assert!(result.committed_operations.is_empty());
    }

    #[test]
    fn test_trusted_checkpoint_skips_earlier_commits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.wal");
        let writer = Writer::create(&path, "shop", 0).unwrap();

        writer.begin(1).unwrap();
        writer.log_insert(1, "t", "1", insert_value(1)).unwrap();
        writer.commit(1).unwrap();

        writer.write_checkpoint(0, vec![], 0).unwrap();

        writer.begin(2).unwrap();
        writer.log_insert(2, "t", "2", insert_value(2)).unwrap();
        writer.commit(2).unwrap();
        drop(writer);

        let result = recover(&path, |_, _| true).unwrap();
        assert_eq!(result.committed_operations.len(), 1);
        assert!(matches!(
            &result.committed_operations[0],
            Record::Insert { key, .. } if key == "2"
        ));
        assert!(result.checkpoint_trusted);
    }

    #[test]
    fn test_untrusted_checkpoint_replays_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.wal");
        let writer = Writer::create(&path, "shop", 0).unwrap();

        writer.begin(1).unwrap();
        writer.log_insert(1, "t", "1", insert_value(1)).unwrap();
        writer.commit(1).unwrap();

        writer.write_checkpoint(0, vec![], 0).unwrap();

        writer.begin(2).unwrap();
        writer.log_insert(2, "t", "2", insert_value(2)).unwrap();
        writer.commit(2).unwrap();
        drop(writer);

        let result = recover(&path, |_, _| false).unwrap();
        assert_eq!(result.committed_operations.len(), 2);
        assert!(!result.checkpoint_trusted);
    }

    #[test]
    fn test_recovery_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.wal");
        let writer = Writer::create(&path, "shop", 0).unwrap();
        writer.begin(1).unwrap();
        writer.log_insert(1, "t", "1", insert_value(1)).unwrap();
        writer.commit(1).unwrap();
        drop(writer);

        let first = recover(&path, |_, _| false).unwrap();
        let second = recover(&path, |_, _| false).unwrap();
        assert_eq!(first.committed_operations.len(), second.committed_operations.len());
        assert_eq!(first.next_lsn, second.next_lsn);
    }

    #[test]
    fn test_truncation_still_replays_intact_committed_transactions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.wal");
        let writer = Writer::create(&path, "shop", 0).unwrap();
        writer.begin(1).unwrap();
        writer.log_insert(1, "t", "1", insert_value(1)).unwrap();
        writer.commit(1).unwrap();
        writer.begin(2).unwrap();
        writer.log_insert(2, "t", "2", insert_value(2)).unwrap();
        drop(writer);

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[7; 4]).unwrap();
        drop(file);

        let result = recover(&path, |_, _| false).unwrap();
        assert_eq!(result.committed_operations.len(), 1);
    }

    #[test]
    fn test_invalid_header_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.wal");
        std::fs::write(&path, b"not a wal file at all, too short").unwrap();
        assert!(recover(&path, |_, _| false).is_err());
    }
}
