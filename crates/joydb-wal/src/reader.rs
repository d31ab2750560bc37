//! Sequential WAL scanning.
//!
//! The reader never seeks backward and never builds an index: WAL
//! files are small enough that a full linear scan is always
//! acceptable, including to locate the most recent checkpoint.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::warn;

use crate::error::Result;
use crate::record::{Record, RECORD_HEADER_SIZE};

/// Stateless sequential WAL scanner.
pub struct Reader;

impl Reader {
    /// Scans every record from `start_offset` to the true end of file,
    /// tolerating a torn tail: the scan stops (without error) at the
    /// first record that fails length/type/offset/CRC validation, or at
    /// a partial trailing header, and reports the byte offset at which
    /// it stopped. A stop offset at the true end of file therefore
    /// means every stored byte decoded cleanly; anything short of that
    /// means the tail was corrupt or torn and is the caller's
    /// (recovery's) job to interpret.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::WalError::Io`] only if the file itself
    /// cannot be opened, seeked, or read — never for record-level
    /// corruption.
    pub fn scan_tolerant(path: impl AsRef<Path>, start_offset: u64) -> Result<(Vec<Record>, u64)> {
        let (pairs, stop_offset) = Self::scan_with_offsets(path, start_offset)?;
        Ok((pairs.into_iter().map(|(_, r)| r).collect(), stop_offset))
    }

    /// Like [`Reader::scan_tolerant`], but also reports the file offset
    /// each record was read from — recovery needs this to locate "the
    /// byte immediately after the checkpoint record".
    ///
    /// # Errors
    ///
    /// See [`Reader::scan_tolerant`].
    pub fn scan_with_offsets(
        path: impl AsRef<Path>,
        start_offset: u64,
    ) -> Result<(Vec<(u64, Record)>, u64)> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(start_offset))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        let mut records = Vec::new();
        let mut pos = 0usize;
        let mut offset = start_offset;

        loop {
            if pos == buf.len() {
                // Clean EOF: stopped exactly on a record boundary.
                break;
            }
            if pos + RECORD_HEADER_SIZE as usize > buf.len() {
                warn!(offset, "WAL truncated inside a record header, stopping replay here");
                break;
            }
            match Record::decode(&buf[pos..]) {
                Ok((record, stored_offset, framed_len)) => {
                    if stored_offset != offset {
                        warn!(
                            offset,
                            stored_offset, "WAL record file-offset mismatch, stopping replay here"
                        );
                        break;
                    }
                    records.push((offset, record));
                    pos += framed_len as usize;
                    offset += framed_len;
                }
                Err(error) => {
                    warn!(offset, %error, "WAL record failed validation, stopping replay here");
                    break;
                }
            }
        }

        Ok((records, offset))
    }

    /// Scans every record from `start_offset`, requiring the scan to
    /// reach the file's true end cleanly. Used by tests and by any
    /// caller that wants a strict round-trip read-back rather than
    /// recovery's truncation-tolerant one.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::WalError::Truncated`] if the scan stops
    /// short of the file's end, or an I/O error.
    pub fn scan_from(path: impl AsRef<Path>, start_offset: u64) -> Result<Vec<Record>> {
        let path = path.as_ref();
        let (records, stop_offset) = Self::scan_tolerant(path, start_offset)?;
        let file_len = std::fs::metadata(path)?.len();
        if stop_offset != file_len {
            return Err(crate::error::WalError::Truncated { offset: stop_offset });
        }
        Ok(records)
    }
}
