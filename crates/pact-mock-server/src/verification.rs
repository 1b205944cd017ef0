//! Verification report aggregation

use crate::session::{InteractionState, MatchOutcome};
use pact_matching::{Mismatch, MismatchType};
use pact_models::Pact;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of verifying a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// True iff `mismatches` is empty
    pub passed: bool,
    /// Missing requests in registration order, then per-request mismatches
    /// in arrival order
    pub mismatches: Vec<Mismatch>,
}

impl VerificationReport {
    /// Build a report from an ordered mismatch list
    pub fn from_mismatches(mismatches: Vec<Mismatch>) -> Self {
        VerificationReport {
            passed: mismatches.is_empty(),
            mismatches,
        }
    }

    /// Number of mismatches of the given type
    pub fn count(&self, kind: MismatchType) -> usize {
        self.mismatches.iter().filter(|m| m.kind == kind).count()
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed {
            return write!(f, "all interactions matched");
        }
        write!(f, "{} mismatch(es)", self.mismatches.len())?;
        for mismatch in &self.mismatches {
            write!(f, "\n  {mismatch}")?;
        }
        Ok(())
    }
}

/// Combine interaction states and the outcome log into a report
///
/// An interaction that was never routed to is a `missing-request`. One that
/// received only mismatching requests is reported through those requests'
/// mismatches instead.
pub fn aggregate(pact: &Pact, states: &[InteractionState], outcomes: &[MatchOutcome]) -> VerificationReport {
    let missing = pact
        .interactions
        .iter()
        .zip(states)
        .filter(|(_, state)| !state.attempted)
        .map(|(interaction, _)| Mismatch::missing_request(&interaction.request));

    let mut ordered: Vec<&MatchOutcome> = outcomes.iter().collect();
    ordered.sort_by_key(|outcome| outcome.request.sequence);
    let observed = ordered
        .into_iter()
        .flat_map(|outcome| outcome.mismatches.iter().cloned());

    VerificationReport::from_mismatches(missing.chain(observed).collect())
}
