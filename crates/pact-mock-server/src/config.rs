//! Server configuration

use crate::error::{MockServerError, MockServerResult};
use pact_matching::MatchConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Mock server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on; 0 lets the OS choose
    #[serde(default)]
    pub port: u16,

    /// Directory verified pacts are written to
    #[serde(default)]
    pub pact_dir: Option<PathBuf>,

    /// Answer CORS preflight requests and add permissive CORS headers
    #[serde(default)]
    pub cors: bool,

    /// How long to wait for in-flight requests when a server stops
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Matcher options
    #[serde(default)]
    pub matching: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
            pact_dir: None,
            cors: false,
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            matching: MatchConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> MockServerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MockServerError::io(format!("Failed to read config {}", path.display()), e)
        })?;
        Self::from_yaml_str(&content).map_err(|e| {
            MockServerError::io(
                format!("Invalid config {}", path.display()),
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Socket address for the given port on the configured host
    pub fn socket_addr(&self, port: u16) -> MockServerResult<SocketAddr> {
        let addr = format!("{}:{}", self.host, port);
        addr.parse().map_err(|e| {
            MockServerError::io(
                format!("Invalid socket address {addr}"),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
            )
        })
    }

    /// Graceful shutdown timeout
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_shutdown_timeout_ms() -> u64 {
    5000
}
