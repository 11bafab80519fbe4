//! # Configuration Management
//!
//! Client-side configuration for endpoint connections.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! Durations are stored as milliseconds. A zero timeout disables the
//! corresponding deadline.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::{ProtocolError, Result};
use crate::transport::host::HostInfo;
use crate::transport::tls::TlsClientConfig;
use crate::utils::timeout;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EndpointConfig {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EndpointConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Defaults overridden by `ENDPOINT_PROTOCOL_*` environment variables.
    ///
    /// Unparseable values are rejected rather than silently ignored.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(address) = std::env::var("ENDPOINT_PROTOCOL_ADDRESS") {
            config.client.address = address;
        }

        if let Ok(value) = std::env::var("ENDPOINT_PROTOCOL_TIMEOUT_MS") {
            let millis = value.parse::<u64>().map_err(|_| {
                ProtocolError::ConfigError(format!(
                    "ENDPOINT_PROTOCOL_TIMEOUT_MS is not a number: '{value}'"
                ))
            })?;
            config.client.connection_timeout = Duration::from_millis(millis);
            config.client.response_timeout = Duration::from_millis(millis);
        }

        if let Ok(value) = std::env::var("ENDPOINT_PROTOCOL_SECURE") {
            config.client.secure = match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ProtocolError::ConfigError(format!(
                        "ENDPOINT_PROTOCOL_SECURE is not a boolean: '{value}'"
                    )))
                }
            };
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))
    }

    /// Returns every validation problem found; empty means valid
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.client.validate();
        errors.extend(self.logging.validate());
        errors
    }

    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Connection settings for one broker
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Broker address, `host:port`
    pub address: String,

    /// Bound on TCP connect and TLS handshake
    #[serde(with = "duration_serde")]
    pub connection_timeout: Duration,

    /// Bound on each read while waiting for a response
    #[serde(with = "duration_serde")]
    pub response_timeout: Duration,

    /// Connect over TLS
    #[serde(default)]
    pub secure: bool,

    /// Certificate name to verify instead of the address host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    /// PEM file with extra trusted CA certificates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert_path: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:9000"),
            connection_timeout: timeout::DEFAULT_TIMEOUT,
            response_timeout: timeout::DEFAULT_TIMEOUT,
            secure: false,
            server_name: None,
            ca_cert_path: None,
        }
    }
}

impl ClientConfig {
    pub fn host(&self) -> Result<HostInfo> {
        self.address.parse()
    }

    pub fn tls(&self) -> TlsClientConfig {
        let mut tls = TlsClientConfig::new();
        if let Some(name) = &self.server_name {
            tls = tls.with_server_name(name.clone());
        }
        if let Some(path) = &self.ca_cert_path {
            tls = tls.with_ca_file(path.clone());
        }
        tls
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Client address cannot be empty".to_string());
        } else if self.host().is_err() {
            errors.push(format!(
                "Invalid client address format: '{}' (expected format: 'broker.example.com:9000')",
                self.address
            ));
        }

        if !self.connection_timeout.is_zero() && self.connection_timeout.as_millis() < 10 {
            errors.push("Connection timeout too short (minimum: 10ms, or 0 to disable)".to_string());
        }
        if !self.response_timeout.is_zero() && self.response_timeout.as_millis() < 10 {
            errors.push("Response timeout too short (minimum: 10ms, or 0 to disable)".to_string());
        }

        if !self.secure && (self.server_name.is_some() || self.ca_cert_path.is_some()) {
            errors.push("TLS settings are ignored unless secure is enabled".to_string());
        }
        if let Some(name) = &self.server_name {
            if name.is_empty() {
                errors.push("TLS server name cannot be empty".to_string());
            }
        }
        if let Some(path) = &self.ca_cert_path {
            if !Path::new(path).exists() {
                errors.push(format!("CA certificate file does not exist: {path}"));
            }
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name recorded when logging starts
    pub app_name: String,

    /// Default level; `RUST_LOG` overrides it
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("endpoint-protocol"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Durations as integer milliseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// `tracing::Level` as a lowercase string
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        level.as_str().to_lowercase().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level = String::deserialize(deserializer)?;
        Level::from_str(&level)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level}")))
    }
}
