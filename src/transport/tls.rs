//! # TLS Client Settings
//!
//! Builds the rustls client configuration used when a connection is opened
//! in secure mode. Server certificates are verified against the platform
//! trust store, optionally extended with a PEM bundle of extra CAs.

use std::fs::File;
use std::io::BufReader;

use rustls::{Certificate, ClientConfig, RootCertStore, ServerName};
use tracing::{debug, warn};

use crate::error::{ProtocolError, Result};

/// TLS Client Configuration
#[derive(Debug, Clone, Default)]
pub struct TlsClientConfig {
    /// Name presented for SNI and certificate checks; defaults to the host
    server_name: Option<String>,
    /// Optional PEM file with extra trusted CA certificates
    ca_cert_path: Option<String>,
}

impl TlsClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the name used to verify the server certificate
    pub fn with_server_name<S: Into<String>>(mut self, server_name: S) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    /// Trust the CA certificates found in a PEM file, in addition to the platform roots
    pub fn with_ca_file<S: Into<String>>(mut self, path: S) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    /// Resolve the server name to verify for a connection to `host`
    pub fn server_name(&self, host: &str) -> Result<ServerName> {
        let name = self.server_name.as_deref().unwrap_or(host);
        ServerName::try_from(name)
            .map_err(|e| ProtocolError::TlsError(format!("Invalid server name '{name}': {e}")))
    }

    /// Load the TLS client configuration
    pub fn load_client_config(&self) -> Result<ClientConfig> {
        let mut root_store = RootCertStore::empty();

        match rustls_native_certs::load_native_certs() {
            Ok(native_certs) => {
                for cert in native_certs {
                    if let Err(e) = root_store.add(&Certificate(cert.0)) {
                        debug!(error = %e, "Skipping unusable platform certificate");
                    }
                }
            }
            Err(e) => warn!(error = %e, "Failed to load platform certificates"),
        }

        if let Some(path) = &self.ca_cert_path {
            let file = File::open(path)
                .map_err(|e| ProtocolError::TlsError(format!("Failed to open CA file: {e}")))?;
            let mut reader = BufReader::new(file);
            let certs = rustls_pemfile::certs(&mut reader)
                .map_err(|_| ProtocolError::TlsError("Failed to parse CA certificate".into()))?;

            if certs.is_empty() {
                return Err(ProtocolError::TlsError(format!(
                    "No certificates found in {path}"
                )));
            }

            for cert in certs {
                root_store.add(&Certificate(cert)).map_err(|e| {
                    ProtocolError::TlsError(format!("Failed to add CA certificate: {e}"))
                })?;
            }
        }

        if root_store.is_empty() {
            return Err(ProtocolError::TlsError(
                "No trusted root certificates available".into(),
            ));
        }

        Ok(ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(root_store)
            .with_no_client_auth())
    }
}
