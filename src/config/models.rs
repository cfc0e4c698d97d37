//! Configuration data structures for Kalium.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files and
//! carry defaults for every field, so an empty file (or none at all) yields a
//! server on `0.0.0.0:8000` using the axum backend.
use std::{net::SocketAddr, time::Duration};

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

/// Which HTTP adapter serves the gate.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// axum router; dispatch runs on tokio's blocking pool
    #[default]
    Axum,
    /// Bare hyper connections; dispatch runs inline on the connection task
    Hyper,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `kalium=debug,tower_http=info`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub backend: BackendKind,
    pub logging: LoggingConfig,
    /// How long in-flight connections get to finish after a shutdown signal
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Create a new server configuration builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// `host:port` as written in the config.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr()
            .parse()
            .wrap_err_with(|| format!("Invalid listen address: {}", self.listen_addr()))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            backend: BackendKind::default(),
            logging: LoggingConfig::default(),
            shutdown_timeout_secs: 30,
        }
    }
}

/// Builder for ServerConfig to allow for cleaner configuration creation
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn json_logs(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    pub fn shutdown_timeout_secs(mut self, secs: u64) -> Self {
        self.config.shutdown_timeout_secs = secs;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:8000");
        assert_eq!(config.backend, BackendKind::Axum);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::builder()
            .host("127.0.0.1")
            .port(9000)
            .backend(BackendKind::Hyper)
            .log_level("debug")
            .json_logs(true)
            .build();

        assert_eq!(config.socket_addr().unwrap().port(), 9000);
        assert_eq!(config.backend, BackendKind::Hyper);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_socket_addr_rejects_hostnames() {
        let config = ServerConfig::builder().host("not a host").build();
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_backend_kind_serde() {
        let kind: BackendKind = serde_json::from_str("\"hyper\"").unwrap();
        assert_eq!(kind, BackendKind::Hyper);
        assert_eq!(serde_json::to_string(&BackendKind::Axum).unwrap(), "\"axum\"");
    }
}
