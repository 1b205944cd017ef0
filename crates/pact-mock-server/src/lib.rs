//! Pact Mock Server
//!
//! This crate serves the interactions of a pact over HTTP, records every
//! request it receives and reports where the traffic diverged from the
//! contract.
//!
//! A [`MockServerManager`] owns the running servers, keyed by port. Each
//! server routes requests through a [`MockSession`], which picks the best
//! matching interaction, answers with its canned response and logs the
//! outcome. Verification drains the listener and folds the log into a
//! [`VerificationReport`].

pub mod api;
pub mod config;
pub mod error;
pub mod handlers;
pub mod manager;
pub mod pact_file;
pub mod server;
pub mod session;
pub mod verification;


// Re-export main types
pub use api::MockApi;
pub use config::ServerConfig;
pub use error::{MockServerError, MockServerResult};
pub use manager::{MockServerHandle, MockServerManager, Verification};
pub use pact_file::{read_pact, write_pact};
pub use server::MockServer;
pub use session::{InteractionState, MatchOutcome, MockSession, RouteResult};
pub use verification::VerificationReport;
