//! The fixed 64-byte WAL file header.

use crate::error::{Result, WalError};

/// Magic bytes identifying a joydb WAL file.
pub const MAGIC: [u8; 8] = *b"JOYDBWAL";
/// The only format version this crate writes or reads.
pub const FORMAT_VERSION: u32 = 1;
/// Size of the file header, in bytes. The first record begins here.
pub const HEADER_SIZE: u64 = 64;

const DB_NAME_FIELD_LEN: usize = 32;

/// The 64-byte header every WAL file opens with: magic, format version,
/// a null-padded database name, the first LSN this file will ever hold,
/// and the creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u32,
    pub database_name: String,
    pub initial_lsn: u64,
    pub created_at_unix: i64,
}

impl FileHeader {
    /// Builds a fresh header for a new WAL file.
    ///
    /// # Panics
    ///
    /// Panics if `database_name` does not fit in the 32-byte field. This
    /// is a programmer error (database names are short identifiers),
    /// not a runtime condition callers should recover from.
    #[must_use]
    pub fn new(database_name: impl Into<String>, initial_lsn: u64, created_at_unix: i64) -> Self {
        let database_name = database_name.into();
        assert!(
            database_name.len() <= DB_NAME_FIELD_LEN,
            "database name '{database_name}' exceeds the {DB_NAME_FIELD_LEN}-byte WAL header field"
        );
        Self {
            version: FORMAT_VERSION,
            database_name,
            initial_lsn,
            created_at_unix,
        }
    }

    /// Encodes the header to its fixed 64-byte on-disk form.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        let mut offset = 0;

        buf[offset..offset + 8].copy_from_slice(&MAGIC);
        offset += 8;

        buf[offset..offset + 4].copy_from_slice(&self.version.to_le_bytes());
        offset += 4;

        let name_bytes = self.database_name.as_bytes();
        buf[offset..offset + name_bytes.len()].copy_from_slice(name_bytes);
        offset += DB_NAME_FIELD_LEN;

        buf[offset..offset + 8].copy_from_slice(&self.initial_lsn.to_le_bytes());
        offset += 8;

        buf[offset..offset + 8].copy_from_slice(&self.created_at_unix.to_le_bytes());
        offset += 8;

        debug_assert_eq!(offset, 60);
        // remaining 4 bytes are reserved and stay zero.
        buf
    }

    /// Decodes and validates a header, failing database load if the
    /// magic or version does not match — if file-header validation
    /// fails, the engine refuses to start.
    ///
    /// # Errors
    ///
    /// Returns [`WalError::InvalidHeader`] if `bytes` is short, the
    /// magic does not match, or the format version is unsupported.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE as usize {
            return Err(WalError::InvalidHeader(format!(
                "header is {} bytes, expected {HEADER_SIZE}",
                bytes.len()
            )));
        }

        let mut offset = 0;
        let magic = &bytes[offset..offset + 8];
        if magic != MAGIC {
            return Err(WalError::InvalidHeader(format!(
                "bad magic: {magic:02x?}"
            )));
        }
        offset += 8;

        let version = u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
        if version != FORMAT_VERSION {
            return Err(WalError::InvalidHeader(format!(
                "unsupported WAL format version {version}"
            )));
        }
        offset += 4;

        let name_bytes = &bytes[offset..offset + DB_NAME_FIELD_LEN];
        let nul = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
        let database_name = String::from_utf8_lossy(&name_bytes[..nul]).into_owned();
        offset += DB_NAME_FIELD_LEN;

        let initial_lsn = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
        offset += 8;

        let created_at_unix = i64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());

        Ok(Self {
            version,
            database_name,
            initial_lsn,
            created_at_unix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let header = FileHeader::new("shop", 1, 1_700_000_000);
        let bytes = header.encode();
        assert_eq!(bytes.len(), HEADER_SIZE as usize);
        let decoded = FileHeader::decode(&bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = FileHeader::new("shop", 1, 0).encode();
        bytes[0] = b'X';
        assert!(matches!(FileHeader::decode(&bytes), Err(WalError::InvalidHeader(_))));
    }

    #[test]
    fn test_rejects_short_buffer() {
        assert!(matches!(FileHeader::decode(&[0u8; 10]), Err(WalError::InvalidHeader(_))));
    }

    #[test]
    fn test_name_padding_is_null_terminated_on_decode() {
        let header = FileHeader::new("x", 1, 0);
        let bytes = header.encode();
        assert_eq!(bytes[8 + 4 + 1], 0);
        let decoded = FileHeader::decode(&bytes).unwrap();
        assert_eq!(decoded.database_name, "x");
    }
}
