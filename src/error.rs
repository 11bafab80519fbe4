//! # Error Types
//!
//! Error handling for the end point protocol client.
//!
//! Every failed exchange surfaces exactly one [`ProtocolError`] kind. The
//! frame and protocol codecs fail fast and never substitute default values;
//! the transport maps raw I/O failures onto the connection/timeout kinds so
//! that `?` on an I/O call never leaks an untyped error.
//!
//! ## Error Categories
//! - **MalformedRequest**: caller supplied bad input while building or sending a request
//! - **ContextMismatch**: a response answered something other than the request
//! - **MalformedResponse**: a response has a bad length or inconsistent fields
//! - **ConnectionFailure**: connection could not be set up or broke mid-exchange
//! - **Timeout**: a read or connect deadline expired
//!
//! ## Example Usage
//! ```rust
//! use endpoint_protocol::error::{ProtocolError, Result};
//! use endpoint_protocol::core::frame::MessageFrame;
//! use tracing::{error, info};
//!
//! fn decode(bytes: &[u8]) -> Result<MessageFrame> {
//!     MessageFrame::from_bytes(bytes)
//! }
//!
//! match decode(&[0u8; 4]) {
//!     Ok(frame) => info!(length = frame.length(), "Decoded frame"),
//!     Err(e @ ProtocolError::MalformedResponse(_)) => error!(error = %e, "Bad frame"),
//!     Err(e) => error!(error = %e, "Unexpected failure"),
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Request building errors
    pub const ERR_EMPTY_BLOB: &str = "Payload must not be empty";
    pub const ERR_OVERSIZED_BLOB: &str = "Payload exceeds maximum size";
    pub const ERR_INVALID_FRAME_LENGTH: &str = "Frame length outside valid bounds";

    /// Response validation errors
    pub const ERR_BAD_RESPONSE: &str = "Invalid response or request denied";
    pub const ERR_REQUEST_DENIED: &str = "Request denied by remote host";
    pub const ERR_UNEXPECTED_SOURCE: &str = "Response not attributed to the broker";
    pub const ERR_BAD_RESPONSE_LENGTH: &str = "Unexpected response length";
    pub const ERR_BAD_FIELD_LENGTHS: &str = "Inconsistent payload field lengths";
    pub const ERR_OUT_OF_BOUNDS: &str = "Read beyond the declared payload";

    /// Connection errors
    pub const ERR_NOT_CONNECTED: &str = "Invalid connection";
    pub const ERR_UNEXPECTED_EOF: &str = "Connection closed before a complete frame was read";
    pub const ERR_BAD_HOST: &str = "Invalid host description";
}

/// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Context mismatch: {0}")]
    ContextMismatch(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("TLS error: {0}")]
    TlsError(String),
}

impl ProtocolError {
    /// True for failures after which the connection is no longer usable.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::ConnectionFailure(_) | ProtocolError::MalformedResponse(_)
        )
    }
}

impl From<io::Error> for ProtocolError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ProtocolError::Timeout,
            io::ErrorKind::UnexpectedEof => {
                ProtocolError::ConnectionFailure(constants::ERR_UNEXPECTED_EOF.into())
            }
            _ => ProtocolError::ConnectionFailure(e.to_string()),
        }
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
