//! # Transport Layer
//!
//! Connection lifecycle and request/response correlation.
//!
//! ## Components
//! - **Connection**: framed byte-stream transport with sequence-number correlation
//! - **Host**: `host:port` description of a connection target
//! - **TLS**: rustls client settings for secure connections
//!
//! ## Model
//! One connection, one caller, one outstanding request. Plain TCP or TLS
//! over TCP; any other reliable stream can be attached directly.

pub mod connection;
pub mod host;
pub mod tls;

pub use connection::{ByteStream, Transport};
pub use host::HostInfo;
