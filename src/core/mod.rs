//! # Core Protocol Components
//!
//! Low-level frame handling and stream framing.
//!
//! ## Components
//! - **MessageFrame**: fixed-capacity binary frame with header accessors
//! - **FrameCodec**: Tokio codec for framing over byte streams
//!
//! ## Wire Format
//! ```text
//! [Length(2)] [Source(8)] [Destination(8)] [Sequence(2)]
//! [Session(1)] [Command(1)] [Qualifier(1)] [Status(1)] [Payload(N)]
//! ```
//!
//! ## Limits
//! - Maximum frame size: 1024 bytes, header included
//! - Length validation before any payload is awaited

pub mod codec;
pub mod frame;
