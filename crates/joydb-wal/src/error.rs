//! WAL error types.

/// Errors raised while writing, reading, or recovering a WAL file.
#[derive(Debug, thiserror::Error)]
pub enum WalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid WAL file header: {0}")]
    InvalidHeader(String),

    #[error("record length {length} outside allowed range [{min}, {max}]")]
    RecordLengthOutOfRange { length: u32, min: u32, max: u32 },

    #[error("unknown WAL record type {0}")]
    UnknownRecordType(u8),

    #[error("record at offset {expected} carries stored offset {found}")]
    OffsetMismatch { expected: u64, found: u64 },

    #[error("CRC32 mismatch for record at offset {offset}: stored {stored:08x}, computed {computed:08x}")]
    CrcMismatch {
        offset: u64,
        stored: u32,
        computed: u32,
    },

    #[error("WAL file truncated at offset {offset}")]
    Truncated { offset: u64 },

    #[error("record of {size} bytes exceeds MaxRecordSize ({max} bytes)")]
    MaxRecordSize { size: usize, max: usize },

    #[error("transaction {0} already has an active Begin record")]
    TransactionAlreadyActive(u64),

    #[error("transaction {0} is not active")]
    TransactionNotActive(u64),

    #[error("malformed record payload: {0}")]
    MalformedPayload(String),
}

pub type Result<T> = core::result::Result<T, WalError>;
