//! Description of a host to connect to.
//!
//! Directories that supply candidate hosts live outside this crate; they hand
//! the transport a [`HostInfo`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{constants, ProtocolError};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostInfo {
    pub host: String,
    pub port: u16,
}

impl HostInfo {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl FromStr for HostInfo {
    type Err = ProtocolError;

    /// Parse `host:port`; IPv6 literals must be bracketed (`[::1]:9000`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ProtocolError::ConfigError(format!("{}: '{s}'", constants::ERR_BAD_HOST));

        let (host, port) = s.rsplit_once(':').ok_or_else(bad)?;
        let host = match host.strip_prefix('[') {
            Some(inner) => inner.strip_suffix(']').ok_or_else(bad)?,
            None if host.contains(':') => return Err(bad()),
            None => host,
        };
        if host.is_empty() || host.contains(['[', ']']) {
            return Err(bad());
        }

        let port = port.parse::<u16>().map_err(|_| bad())?;
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for HostInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
