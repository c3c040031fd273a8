//! # Error Types
//!
//! Errors raised while decoding CryptoNote binary records and hex text.

use thiserror::Error;

/// Errors that can occur while reading or writing the binary format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input ended before the record was complete.
    #[error("Unexpected end of data: needed {needed} more bytes at offset {offset}")]
    UnexpectedEof { offset: usize, needed: usize },

    /// A varint used more than 64 bits.
    #[error("Varint overflow at offset {offset}")]
    VarintOverflow { offset: usize },

    /// A varint carries a zero continuation byte, so it has a shorter
    /// encoding of the same value.
    #[error("Non-canonical varint at offset {offset}")]
    NonCanonicalVarint { offset: usize },

    /// A varint value does not fit the target integer width.
    #[error("Value {value} out of range for {target}")]
    OutOfRange { value: u64, target: &'static str },

    /// Unknown input or output variant tag.
    #[error("Unknown {kind} tag 0x{tag:02x}")]
    UnknownTag { kind: &'static str, tag: u8 },

    /// A declared element count exceeds what the remaining input could hold.
    #[error("Declared count {count} exceeds remaining input of {remaining} bytes")]
    CountTooLarge { count: u64, remaining: usize },

    /// Bytes left over after the top-level record.
    #[error("Trailing data: {0} bytes after record")]
    TrailingData(usize),

    /// Malformed transaction extra field.
    #[error("Malformed extra field: {0}")]
    MalformedExtra(String),

    /// Hex text could not be decoded.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Decoded bytes had the wrong length for a fixed-size value.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

impl From<hex::FromHexError> for CodecError {
    fn from(e: hex::FromHexError) -> Self {
        CodecError::InvalidHex(e.to_string())
    }
}
