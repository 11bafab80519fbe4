//! Integration tests for configuration loading and validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use endpoint_protocol::config::{ClientConfig, EndpointConfig, LoggingConfig};
use endpoint_protocol::error::ProtocolError;
use serial_test::serial;
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let errors = EndpointConfig::default().validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
}

#[test]
fn test_empty_address() {
    let config = EndpointConfig::default_with_overrides(|c| c.client.address = String::new());

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_invalid_address() {
    for address in [
        "broker.local",
        "broker.local:port",
        "::1:9000",
        "[broker.local:9000",
        "[::1]x:9000",
    ] {
        let config = EndpointConfig::default_with_overrides(|c| c.client.address = address.into());
        let errors = config.validate();
        assert!(
            errors.iter().any(|e| e.contains("Invalid client address")),
            "{address} should be rejected"
        );
    }
}

#[test]
fn test_hostname_address_is_accepted() {
    let client = ClientConfig {
        address: "broker.example.com:7000".into(),
        ..ClientConfig::default()
    };
    assert!(client.validate().is_empty());
    assert_eq!(client.host().unwrap().port, 7000);
}

#[test]
fn test_tiny_timeout_rejected_zero_allowed() {
    let mut client = ClientConfig {
        response_timeout: Duration::from_millis(1),
        ..ClientConfig::default()
    };
    assert!(client
        .validate()
        .iter()
        .any(|e| e.contains("Response timeout too short")));

    client.response_timeout = Duration::ZERO;
    assert!(client.validate().is_empty());
}

#[test]
fn test_tls_settings_without_secure() {
    let client = ClientConfig {
        server_name: Some("broker.example.com".into()),
        ..ClientConfig::default()
    };
    assert!(client.validate().iter().any(|e| e.contains("TLS settings")));
}

#[test]
fn test_missing_ca_file() {
    let client = ClientConfig {
        secure: true,
        ca_cert_path: Some("/nonexistent/ca.pem".into()),
        ..ClientConfig::default()
    };
    assert!(client
        .validate()
        .iter()
        .any(|e| e.contains("CA certificate file does not exist")));
}

#[test]
fn test_logging_app_name_bounds() {
    let mut logging = LoggingConfig {
        app_name: String::new(),
        ..LoggingConfig::default()
    };
    assert!(!logging.validate().is_empty());

    logging.app_name = "x".repeat(65);
    assert!(logging.validate().iter().any(|e| e.contains("too long")));
}

#[test]
fn test_validate_strict_collects_errors() {
    let config = EndpointConfig::default_with_overrides(|c| {
        c.client.address = String::new();
        c.logging.app_name = String::new();
    });

    match config.validate_strict() {
        Err(ProtocolError::ConfigError(message)) => {
            assert!(message.contains("address"));
            assert!(message.contains("Application name"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn test_from_toml() {
    let config = EndpointConfig::from_toml(
        r#"
        [client]
        address = "10.0.0.2:9100"
        connection_timeout = 250
        response_timeout = 0
        secure = true
        server_name = "broker.internal"

        [logging]
        app_name = "sensor-17"
        log_level = "debug"
        json_format = true
        "#,
    )
    .unwrap();

    assert_eq!(config.client.connection_timeout, Duration::from_millis(250));
    assert_eq!(config.client.response_timeout, Duration::ZERO);
    assert!(config.client.secure);
    assert_eq!(config.client.server_name.as_deref(), Some("broker.internal"));
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(config.logging.json_format);
}

#[test]
fn test_from_toml_rejects_bad_level() {
    let result = EndpointConfig::from_toml(
        r#"
        [logging]
        app_name = "x"
        log_level = "loud"
        "#,
    );
    assert!(matches!(result, Err(ProtocolError::ConfigError(_))));
}

#[test]
fn test_save_and_reload() {
    let path = std::env::temp_dir().join(format!("endpoint-config-{}.toml", std::process::id()));
    let config = EndpointConfig::default_with_overrides(|c| {
        c.client.address = "127.0.0.1:9555".into();
        c.logging.log_level = Level::WARN;
    });

    config.save_to_file(&path).unwrap();
    let loaded = EndpointConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.client.address, "127.0.0.1:9555");
    assert_eq!(loaded.logging.log_level, Level::WARN);
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        EndpointConfig::from_file("/nonexistent/endpoint.toml"),
        Err(ProtocolError::ConfigError(_))
    ));
}

#[test]
#[serial]
fn test_from_env_overrides() {
    std::env::set_var("ENDPOINT_PROTOCOL_ADDRESS", "10.1.2.3:4000");
    std::env::set_var("ENDPOINT_PROTOCOL_TIMEOUT_MS", "1500");
    std::env::set_var("ENDPOINT_PROTOCOL_SECURE", "true");

    let config = EndpointConfig::from_env();

    std::env::remove_var("ENDPOINT_PROTOCOL_ADDRESS");
    std::env::remove_var("ENDPOINT_PROTOCOL_TIMEOUT_MS");
    std::env::remove_var("ENDPOINT_PROTOCOL_SECURE");

    let config = config.unwrap();
    assert_eq!(config.client.address, "10.1.2.3:4000");
    assert_eq!(config.client.connection_timeout, Duration::from_millis(1500));
    assert_eq!(config.client.response_timeout, Duration::from_millis(1500));
    assert!(config.client.secure);
}

#[test]
#[serial]
fn test_from_env_rejects_garbage() {
    std::env::set_var("ENDPOINT_PROTOCOL_SECURE", "maybe");
    let result = EndpointConfig::from_env();
    std::env::remove_var("ENDPOINT_PROTOCOL_SECURE");

    assert!(matches!(result, Err(ProtocolError::ConfigError(_))));
}
