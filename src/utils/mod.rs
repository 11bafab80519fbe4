//! # Utility Modules
//!
//! Supporting utilities used by the transport and client layers.
//!
//! ## Components
//! - **Logging**: structured logging setup driven by `LoggingConfig`
//! - **Metrics**: per-connection frame and failure counters
//! - **Timeout**: optional-deadline wrapper mapping expiry to `ProtocolError::Timeout`

pub mod logging;
pub mod metrics;
pub mod timeout;

pub use metrics::{Metrics, MetricsSnapshot};
