//! Mock server error types
//!
//! These are infrastructure failures only. A request that does not match the
//! contract is never an error: it is recorded as a mismatch and answered.

use pact_models::PactModelError;
use thiserror::Error;

/// Errors surfaced by mock server lifecycle operations
#[derive(Debug, Error)]
pub enum MockServerError {
    /// The pact document could not be loaded
    #[error(transparent)]
    MalformedPact(#[from] PactModelError),

    /// Another session or process already holds the port
    #[error("Port {port} is already in use")]
    PortInUse {
        /// Requested port
        port: u16,
    },

    /// No live session is bound to the port
    #[error("No mock server is running on port {port}")]
    UnknownServer {
        /// Requested port
        port: u16,
    },

    /// File system or socket failure
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted
        context: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl MockServerError {
    /// Wrap an I/O error with a description of the failed operation
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        MockServerError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result alias for mock server operations
pub type MockServerResult<T> = Result<T, MockServerError>;
