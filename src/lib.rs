//! # endpoint-protocol
//!
//! Client side of a fixed binary request/response protocol spoken by end
//! points to a broker: identity exchange, challenge authentication,
//! registration, session-key negotiation, root discovery and topic
//! publish/subscribe.
//!
//! ## Layers
//! - [`core`]: the 1024-byte [`MessageFrame`] and its stream codec
//! - [`protocol`]: per-connection request builders and response validators
//! - [`transport`]: TCP/TLS connection with sequence-number correlation
//! - [`service`]: one async call per protocol operation
//!
//! ## Example
//! ```ignore
//! let config = EndpointConfig::from_file("endpoint.toml")?;
//! let mut client = Client::connect_with_config(&config.client).await?;
//! let root = client.find_root(0x0102_0304).await?;
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod session;
pub mod transport;
pub mod utils;

pub use crate::config::EndpointConfig;
pub use crate::core::frame::{MessageContext, MessageFrame, HEADER_SIZE, MESSAGE_SIZE, PAYLOAD_SIZE};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::codec::ProtocolCodec;
pub use crate::service::client::Client;
pub use crate::session::{ClientSession, MemorySession};
pub use crate::transport::{HostInfo, Transport};
