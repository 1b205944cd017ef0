//! Pact document model
//!
//! This crate holds the data side of consumer-driven contract testing:
//!
//! - **Pact**: the contract document, its consumer/provider identity and the
//!   ordered list of expected interactions (`pact` module)
//! - **Requests**: expected request/response specifications and the request
//!   actually observed by a mock server (`request` module)
//! - **Matching rules**: per-field rules that relax exact comparison to
//!   type-only or regex matching (`rules` module)
//!
//! Loading validates everything up front, so downstream matching code can treat
//! a [`Pact`] as well-formed and never fail.

pub mod error;
pub mod pact;
pub mod query;
pub mod request;
pub mod rules;

pub use error::{PactModelError, PactModelResult};
pub use pact::{Interaction, Pact, Party, ProviderState};
pub use query::{encode_query, parse_query, QueryParams};
pub use request::{Headers, HttpRequest, ObservedRequest, RequestSpec, ResponseSpec};
pub use rules::{DocPath, MatchingRule, MatchingRules, PathSegment, RulePath};
