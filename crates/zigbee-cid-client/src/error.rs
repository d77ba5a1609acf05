//! Error types for the client crate.

use std::time::Duration;

use thiserror::Error;
use zigbee_cid_protocol::{ProtocolError, ResponseKind};

/// Errors surfaced by [`CidClient`](crate::CidClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// No matching response arrived in time.
    #[error("timed out after {after:?} waiting for {kind}")]
    Timeout {
        /// Response kind that was awaited.
        kind: ResponseKind,
        /// How long the call waited.
        after: Duration,
    },

    /// A reply of a different kind than the one requested was delivered.
    #[error("expected a {expected} response, got {got}")]
    UnexpectedResponse {
        /// Kind that was requested.
        expected: ResponseKind,
        /// Kind that arrived.
        got: ResponseKind,
    },

    /// The packet could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Writing to the byte sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client has been shut down.
    #[error("client is shut down")]
    Closed,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
