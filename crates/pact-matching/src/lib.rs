//! Structural request matching
//!
//! Compares an observed HTTP request against the expected request of an
//! interaction and classifies every discrepancy into a typed [`Mismatch`].
//!
//! - **Method**: case-insensitive equality
//! - **Path**: exact equality, or a regex when a `$.path` rule is present
//! - **Query**: expected parameters must be present with equal values; extra
//!   parameters are tolerated unless [`QueryMatching::Strict`] is configured
//! - **Headers**: expected headers are a required subset, names compared
//!   case-insensitively and values case-sensitively
//! - **Body**: recursive diff; objects are subset-matched, arrays are compared
//!   index by index up to the expected length, scalars exactly unless a
//!   matching rule says otherwise
//!
//! Matching is a pure function and never fails: every problem is reported as
//! data. All mismatches of one request are collected in a single pass, in
//! field order (method, path, query, headers, body) and depth-first within the
//! body.

pub mod body;
pub mod config;
pub mod matcher;
pub mod mismatch;


pub use config::{MatchConfig, QueryMatching};
pub use matcher::{match_request, matches_route};
pub use mismatch::{Mismatch, MismatchDetails, MismatchRequest, MismatchType};
