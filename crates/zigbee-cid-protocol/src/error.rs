//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when working with the CID protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The buffer does not start with the SOP marker.
    #[error("framing error: expected SOP 0x02, found 0x{found:02X}")]
    Framing {
        /// The byte found where SOP was expected.
        found: u8,
    },

    /// The FCS byte does not match the XOR of the frame contents.
    #[error("checksum mismatch: computed 0x{expected:02X}, frame carries 0x{actual:02X}")]
    ChecksumMismatch {
        /// Checksum computed over command, length and payload.
        expected: u8,
        /// Checksum carried by the frame.
        actual: u8,
    },

    /// A field runs past the end of the payload.
    #[error("payload truncated: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes required to read the field.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// Malformed input handed to an encoder.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
