//! Error types for dynflate operations.
//!
//! Every decode failure is fatal for the whole stream: there is no partial
//! block recovery, so each variant carries enough context (bit position,
//! offending value) to diagnose the corruption.

use std::io;
use thiserror::Error;

/// The main error type for dynflate operations.
#[derive(Debug, Error)]
pub enum DynflateError {
    /// I/O error from the underlying byte source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The bitstream does not describe a valid block.
    #[error("Malformed bitstream at bit {bit_position}: {message}")]
    MalformedBitstream {
        /// Bit position where the problem was detected.
        bit_position: u64,
        /// Description of the problem.
        message: String,
    },

    /// Block type 01 (fixed Huffman) or 11 (reserved).
    #[error("Unsupported block type {btype:#04b} at bit {bit_position}")]
    UnsupportedBlockType {
        /// The two-bit BTYPE value.
        btype: u8,
        /// Bit position just after the block header.
        bit_position: u64,
    },

    /// The source ended in the middle of a block.
    #[error("Truncated input: stream ended at bit {bit_position}")]
    TruncatedInput {
        /// Number of bits consumed before the source ran dry.
        bit_position: u64,
    },

    /// A code-length symbol sequence cannot be run-length expanded.
    #[error("Corrupt code lengths at symbol {index}: {message}")]
    CorruptCodeLengths {
        /// Index of the offending symbol in the sequence.
        index: usize,
        /// Description of the problem.
        message: String,
    },

    /// Invalid codec configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },
}

/// Result type alias for dynflate operations.
pub type Result<T> = std::result::Result<T, DynflateError>;

impl DynflateError {
    /// Create a malformed bitstream error.
    pub fn malformed(bit_position: u64, message: impl Into<String>) -> Self {
        Self::MalformedBitstream {
            bit_position,
            message: message.into(),
        }
    }

    /// Create an unsupported block type error.
    pub fn unsupported_block_type(btype: u8, bit_position: u64) -> Self {
        Self::UnsupportedBlockType {
            btype,
            bit_position,
        }
    }

    /// Create a truncated input error.
    pub fn truncated(bit_position: u64) -> Self {
        Self::TruncatedInput { bit_position }
    }

    /// Create a corrupt code lengths error.
    pub fn corrupt_code_lengths(index: usize, message: impl Into<String>) -> Self {
        Self::CorruptCodeLengths {
            index,
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether this error means the stream itself is bad, as opposed to an
    /// I/O or configuration failure.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::MalformedBitstream { .. }
                | Self::UnsupportedBlockType { .. }
                | Self::TruncatedInput { .. }
                | Self::CorruptCodeLengths { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DynflateError::malformed(42, "code exceeds 15 bits");
        assert!(err.to_string().contains("bit 42"));
        assert!(err.to_string().contains("15 bits"));

        let err = DynflateError::unsupported_block_type(0b01, 3);
        assert!(err.to_string().contains("0b01"));

        let err = DynflateError::truncated(17);
        assert!(err.to_string().contains("Truncated"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "sink closed");
        let err: DynflateError = io_err.into();
        assert!(matches!(err, DynflateError::Io(_)));
        assert!(!err.is_corruption());
    }

    #[test]
    fn test_corruption_classification() {
        assert!(DynflateError::truncated(0).is_corruption());
        assert!(DynflateError::corrupt_code_lengths(0, "16 first").is_corruption());
        assert!(!DynflateError::invalid_config("chunk size").is_corruption());
    }
}
