//! # Protocol Layer
//!
//! Builders for every request the end point sends and validators for the
//! matching responses.
//!
//! ## Components
//! - **Context**: command/qualifier/status constants and the shared matching rule
//! - **Codec**: per-connection request builder and response decoder
//! - **Message**: typed results decoded from responses
//!
//! ## Exchanges
//! identify, authenticate, register, get-key, find-root, publish,
//! subscribe, unsubscribe

pub mod codec;
pub mod context;
pub mod message;
