//! # Service Layer
//!
//! High-level client API built on the protocol codec and the transport.

pub mod client;

pub use client::Client;
