//! Deadline helpers.
//!
//! A zero duration means "no deadline" everywhere in this crate, matching
//! the socket convention of a zero read timeout blocking indefinitely.

use std::future::Future;
use std::time::Duration;

use crate::error::{ProtocolError, Result};

/// Default connect and read timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on a best-effort connection shutdown, whatever the read timeout
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Map a configured duration to an optional deadline; zero disables it
pub fn deadline(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

/// Run `future`, failing with [`ProtocolError::Timeout`] once `timeout` elapses
pub async fn with_timeout_error<F, T>(future: F, timeout: Option<Duration>) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| ProtocolError::Timeout)?,
        None => future.await,
    }
}
