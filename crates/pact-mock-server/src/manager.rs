//! Mock server registry keyed by port
//!
//! The manager is an owned value: callers share it by reference (or `Arc`)
//! instead of reaching for process-wide state. Each live port maps to exactly
//! one [`MockServer`] and its session.

use crate::config::ServerConfig;
use crate::error::{MockServerError, MockServerResult};
use crate::pact_file;
use crate::server::MockServer;
use crate::session::MockSession;
use crate::verification::VerificationReport;
use pact_matching::Mismatch;
use pact_models::Pact;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Handle to a running mock server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockServerHandle {
    addr: SocketAddr,
}

impl MockServerHandle {
    /// Port the server is bound to
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Bound socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL for requests to the server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Result of [`MockServerManager::verify`]
#[derive(Debug)]
pub struct Verification {
    /// Pass/fail and ordered mismatches
    pub report: VerificationReport,
    /// Pact persistence outcome; `None` when nothing was written because
    /// verification failed or no directory was configured
    pub pact_file: Option<MockServerResult<PathBuf>>,
}

impl Verification {
    /// Whether the contract was satisfied
    pub fn passed(&self) -> bool {
        self.report.passed
    }

    /// Ordered mismatches
    pub fn mismatches(&self) -> &[Mismatch] {
        &self.report.mismatches
    }
}

/// Creates, verifies and tears down mock servers
#[derive(Debug, Default)]
pub struct MockServerManager {
    config: ServerConfig,
    servers: Mutex<HashMap<u16, MockServer>>,
}

impl MockServerManager {
    /// Create a manager with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            servers: Mutex::new(HashMap::new()),
        }
    }

    /// Configuration in effect
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Load a pact from JSON and start serving it on `port`
    pub async fn create(&self, pact_json: &str, port: u16) -> MockServerResult<MockServerHandle> {
        let pact = Pact::from_json_str(pact_json)?;
        self.create_from_pact(pact, port).await
    }

    /// Start serving an already loaded pact on `port` (0 for any free port)
    pub async fn create_from_pact(&self, pact: Pact, port: u16) -> MockServerResult<MockServerHandle> {
        if port != 0 && self.servers.lock().contains_key(&port) {
            return Err(MockServerError::PortInUse { port });
        }

        let addr = self.config.socket_addr(port)?;
        let session = Arc::new(MockSession::new(pact, self.config.matching.clone()));
        let server = MockServer::start(session, addr, self.config.cors).await?;
        let handle = MockServerHandle { addr: server.addr() };

        let mut servers = self.servers.lock();
        if servers.contains_key(&handle.port()) {
            // the OS handed out a port we still track; the new listener is dropped
            return Err(MockServerError::PortInUse { port: handle.port() });
        }
        servers.insert(handle.port(), server);
        info!(port = handle.port(), "mock server created");
        Ok(handle)
    }

    /// Whether all interactions matched so far and nothing unexpected arrived
    pub fn matched(&self, handle: &MockServerHandle) -> MockServerResult<bool> {
        Ok(self.session(handle)?.all_matched())
    }

    /// Current mismatch report without stopping the server
    pub fn mismatches(&self, handle: &MockServerHandle) -> MockServerResult<Vec<Mismatch>> {
        Ok(self.session(handle)?.mismatches())
    }

    /// Stop the server, verify its traffic, persist the pact on success and
    /// release the server
    ///
    /// The listener is drained before the report is built. The server is
    /// released on every path. A persistence failure is reported in
    /// [`Verification::pact_file`] and does not change the report. `pact_dir`
    /// falls back to the configured directory.
    pub async fn verify(
        &self,
        handle: &MockServerHandle,
        pact_dir: Option<&Path>,
    ) -> MockServerResult<Verification> {
        let mut server = self
            .servers
            .lock()
            .remove(&handle.port())
            .ok_or(MockServerError::UnknownServer { port: handle.port() })?;

        server.shutdown(self.config.shutdown_timeout()).await;
        let report = server.session().finalize();

        let dir = pact_dir.or(self.config.pact_dir.as_deref());
        let pact_file = match dir {
            Some(dir) if report.passed => Some(pact_file::write_pact(server.session().pact(), dir).await),
            _ => None,
        };
        if let Some(Err(e)) = &pact_file {
            warn!(port = handle.port(), "failed to persist pact: {e}");
        }

        info!(
            port = handle.port(),
            passed = report.passed,
            mismatches = report.mismatches.len(),
            "mock server verified"
        );
        Ok(Verification { report, pact_file })
    }

    /// Stop the server and discard its session
    ///
    /// Returns whether a server was running; unknown ports are a no-op.
    pub async fn cleanup(&self, handle: &MockServerHandle) -> bool {
        let server = self.servers.lock().remove(&handle.port());
        match server {
            Some(mut server) => {
                server.shutdown(self.config.shutdown_timeout()).await;
                info!(port = handle.port(), "mock server cleaned up");
                true
            }
            None => false,
        }
    }

    /// Write the served pact's original document into `dir`
    pub async fn write_pact_file(&self, handle: &MockServerHandle, dir: &Path) -> MockServerResult<PathBuf> {
        let session = self.session(handle)?;
        pact_file::write_pact(session.pact(), dir).await
    }

    /// Ports with a live server, ascending
    pub fn active_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self.servers.lock().keys().copied().collect();
        ports.sort_unstable();
        ports
    }

    /// Stop every server
    pub async fn shutdown_all(&self) {
        let servers: Vec<MockServer> = self.servers.lock().drain().map(|(_, server)| server).collect();
        for mut server in servers {
            server.shutdown(self.config.shutdown_timeout()).await;
        }
    }

    fn session(&self, handle: &MockServerHandle) -> MockServerResult<Arc<MockSession>> {
        self.servers
            .lock()
            .get(&handle.port())
            .map(|server| Arc::clone(server.session()))
            .ok_or(MockServerError::UnknownServer { port: handle.port() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACT: &str = r#"{
        "consumer": {"name": "web"},
        "provider": {"name": "users"},
        "interactions": [
            {"description": "list users", "request": {"method": "GET", "path": "/users"}, "response": {"status": 200}}
        ]
    }"#;

    #[tokio::test]
    async fn test_create_and_cleanup() {
        let manager = MockServerManager::default();
        let handle = manager.create(PACT, 0).await.unwrap();
        assert_ne!(handle.port(), 0);
        assert_eq!(manager.active_ports(), vec![handle.port()]);
        assert_eq!(handle.url(), format!("http://127.0.0.1:{}", handle.port()));

        assert!(manager.cleanup(&handle).await);
        assert!(!manager.cleanup(&handle).await);
        assert!(manager.active_ports().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_pact() {
        let manager = MockServerManager::default();
        let err = manager.create(r#"{"consumer":{"name":"a"}"#, 0).await.unwrap_err();
        assert!(matches!(err, MockServerError::MalformedPact(_)));
        assert!(manager.active_ports().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_server() {
        let manager = MockServerManager::default();
        let handle = manager.create(PACT, 0).await.unwrap();
        manager.cleanup(&handle).await;

        assert!(matches!(manager.matched(&handle), Err(MockServerError::UnknownServer { .. })));
        assert!(matches!(
            manager.verify(&handle, None).await,
            Err(MockServerError::UnknownServer { .. })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_all() {
        let manager = MockServerManager::default();
        let first = manager.create(PACT, 0).await.unwrap();
        let second = manager.create(PACT, 0).await.unwrap();
        assert_eq!(manager.active_ports().len(), 2);

        manager.shutdown_all().await;
        assert!(manager.active_ports().is_empty());
        assert!(!manager.cleanup(&first).await);
        assert!(tokio::net::TcpStream::connect(second.addr()).await.is_err());
    }

    #[tokio::test]
    async fn test_verify_without_traffic_releases_server() {
        let manager = MockServerManager::default();
        let handle = manager.create(PACT, 0).await.unwrap();
        assert!(!manager.matched(&handle).unwrap());

        let verification = manager.verify(&handle, None).await.unwrap();
        assert!(!verification.passed());
        assert_eq!(verification.mismatches().len(), 1);
        assert!(verification.pact_file.is_none());
        assert!(manager.active_ports().is_empty());
    }
}
