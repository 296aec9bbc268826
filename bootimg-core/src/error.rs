//! Error types for boot image and UPDATA codec operations

use std::io::ErrorKind;

/// Errors that can occur while encoding or decoding a container
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Bad magic value, truncated header or out-of-bounds field
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Header CRC or per-block CRC disagrees with the recomputed value
    #[error("Checksum mismatch in {location}: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch {
        /// Which structure failed verification.
        location: String,
        /// The value stored in the container.
        expected: u16,
        /// The value calculated from the data.
        actual: u16,
    },

    /// Caller supplied an unusable parameter (alignment, manifest line, string)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error from the underlying source or sink
    #[error("IO error: {0}")]
    Io(String),
}

impl CodecError {
    /// Map a failed fixed-size header read, reporting a short read as truncation.
    pub(crate) fn truncated(what: &str, err: std::io::Error) -> Self {
        if err.kind() == ErrorKind::UnexpectedEof {
            CodecError::InvalidFormat(format!("truncated {}", what))
        } else {
            CodecError::from(err)
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Io(err.to_string())
    }
}
