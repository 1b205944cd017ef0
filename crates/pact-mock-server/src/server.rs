//! Listener lifecycle for one session

use crate::api::MockApi;
use crate::error::{MockServerError, MockServerResult};
use crate::handlers::AppState;
use crate::session::MockSession;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// A running listener bound to one session
pub struct MockServer {
    addr: SocketAddr,
    session: Arc<MockSession>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MockServer {
    /// Bind `addr` and start serving the session
    ///
    /// Port 0 binds an OS-assigned port; [`MockServer::addr`] reports it.
    pub async fn start(session: Arc<MockSession>, addr: SocketAddr, cors: bool) -> MockServerResult<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                MockServerError::PortInUse { port: addr.port() }
            } else {
                MockServerError::io(format!("Failed to bind to address {addr}"), e)
            }
        })?;
        let addr = listener
            .local_addr()
            .map_err(|e| MockServerError::io("Failed to read bound address", e))?;

        let app = MockApi::router(AppState::new(Arc::clone(&session)), cors);
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
                .await;
            if let Err(e) = result {
                error!(%addr, "mock server failed: {e}");
            }
        });

        info!(%addr, interactions = session.pact().interactions.len(), "mock server listening");
        Ok(MockServer {
            addr,
            session,
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }

    /// Bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Session being served
    pub fn session(&self) -> &Arc<MockSession> {
        &self.session
    }

    /// Whether the listener is still accepting connections
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop accepting connections and wait for in-flight requests
    ///
    /// Waits at most `timeout` before aborting the listener. Calling this
    /// again is a no-op.
    pub async fn shutdown(&mut self, timeout: Duration) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let Some(mut task) = self.task.take() else {
            return;
        };
        if tokio::time::timeout(timeout, &mut task).await.is_err() {
            warn!(addr = %self.addr, "graceful shutdown timed out, aborting listener");
            task.abort();
        }
        info!(addr = %self.addr, "mock server stopped");
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl std::fmt::Debug for MockServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockServer")
            .field("addr", &self.addr)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
