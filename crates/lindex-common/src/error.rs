//! Error types for lindex.

use thiserror::Error;

/// Result type alias using LindexError.
pub type Result<T> = std::result::Result<T, LindexError>;

/// Errors that can occur in lindex operations.
#[derive(Debug, Error)]
pub enum LindexError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Block store errors
    #[error("Offset {offset} is not on the {block_size}-byte block grid")]
    UnalignedOffset { offset: i64, block_size: usize },

    #[error("Offset {offset} out of range (file length {len})")]
    OffsetOutOfRange { offset: i64, len: u64 },

    #[error("Block buffer is {actual} bytes, expected {expected}")]
    BlockSizeMismatch { expected: usize, actual: usize },

    // Codec errors
    #[error("Encoded node needs {needed} bytes, block holds {block_size}")]
    NodeOverflow { needed: usize, block_size: usize },

    #[error("Corrupt node at offset {offset}: {reason}")]
    CorruptNode { offset: i64, reason: String },

    #[error("Corrupt metadata header: {0}")]
    CorruptHeader(String),

    // Configuration errors
    #[error("Data filename is {len} bytes, exceeds the {max}-byte header field")]
    FilenameTooLong { len: usize, max: usize },

    #[error("Invalid key length: {0}")]
    InvalidKeyLength(i32),

    #[error("Block size {block_size} too small for key length {key_len}")]
    DegreeTooSmall { block_size: usize, key_len: i32 },

    // Input errors
    #[error("Key is {len} bytes, shorter than the configured key length {key_len}")]
    KeyTooShort { len: usize, key_len: i32 },

    #[error("Key already exists in the index")]
    DuplicateKey,
}
