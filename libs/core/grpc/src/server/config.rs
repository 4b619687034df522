//! Server configuration loaded from environment variables.

use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or_default};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Configuration for the gRPC server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to (default: 0.0.0.0, all interfaces)
    pub host: String,
    /// Port to listen on (default: 0, picked by the OS)
    pub port: u16,
    /// HTTP/2 keep-alive ping interval (default: 60s)
    pub http2_keepalive_interval: Option<Duration>,
    /// Per-request timeout (default: none)
    pub request_timeout: Option<Duration>,
    /// Concurrent requests allowed per connection (default: unlimited)
    pub concurrency_limit_per_connection: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::UNSPECIFIED.to_string(),
            port: 0,
            http2_keepalive_interval: Some(Duration::from_secs(60)),
            request_timeout: None,
            concurrency_limit_per_connection: None,
        }
    }
}

impl FromEnv for ServerConfig {
    /// Reads:
    /// - `SERVICE_PORT` (default: 0, any free port)
    /// - `SERVICE_HOST` (default: 0.0.0.0)
    /// - `GRPC_KEEPALIVE_SECS` (default: 60, 0 disables)
    /// - `GRPC_REQUEST_TIMEOUT_SECS` (default: unset)
    /// - `GRPC_CONCURRENCY_LIMIT` (default: unset)
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("SERVICE_HOST", &Ipv4Addr::UNSPECIFIED.to_string());
        let port = env_parse_or_default("SERVICE_PORT", 0u16)?;
        let keepalive_secs = env_parse_or_default("GRPC_KEEPALIVE_SECS", 60u64)?;
        let timeout_secs = env_parse_or_default("GRPC_REQUEST_TIMEOUT_SECS", 0u64)?;
        let concurrency = env_parse_or_default("GRPC_CONCURRENCY_LIMIT", 0usize)?;

        Ok(Self {
            host,
            port,
            http2_keepalive_interval: (keepalive_secs > 0)
                .then(|| Duration::from_secs(keepalive_secs)),
            request_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            concurrency_limit_per_connection: (concurrency > 0).then_some(concurrency),
        })
    }
}

impl ServerConfig {
    /// Create a new server config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host to bind to.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port to listen on.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set or disable the HTTP/2 keep-alive interval.
    pub fn with_http2_keepalive(mut self, interval: Option<Duration>) -> Self {
        self.http2_keepalive_interval = interval;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Limit concurrent requests per connection.
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit_per_connection = Some(limit);
        self
    }

    /// Get the address string (for binding and logging).
    pub fn addr_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
