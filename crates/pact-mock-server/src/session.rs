//! Server session: interaction registry, request router and outcome log
//!
//! Matching runs against the immutable pact without holding any lock. Only
//! the selection of the winning candidate, the consumption of its interaction,
//! sequence stamping and the log append happen under the session lock, as one
//! critical section per request.

use crate::verification::{self, VerificationReport};
use pact_matching::{match_request, matches_route, MatchConfig, Mismatch};
use pact_models::{HttpRequest, ObservedRequest, Pact, ResponseSpec};
use parking_lot::Mutex;
use tracing::debug;

/// Routing state of one registered interaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionState {
    /// A request matched this interaction exactly; it no longer routes
    pub consumed: bool,
    /// A request was routed to this interaction, matching or not
    pub attempted: bool,
}

/// The result of routing one observed request
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    /// The captured request
    pub request: ObservedRequest,
    /// Index of the best matching interaction, if any candidate existed
    pub interaction: Option<usize>,
    /// Discrepancies; empty for a full match
    pub mismatches: Vec<Mismatch>,
}

impl MatchOutcome {
    /// Whether the request matched an interaction exactly
    pub fn is_match(&self) -> bool {
        self.interaction.is_some() && self.mismatches.is_empty()
    }
}

/// What the listener should answer
#[derive(Debug, Clone, PartialEq)]
pub enum RouteResult {
    /// Exact match: serve the canned response
    Matched {
        /// Interaction index
        interaction: usize,
        /// Canned response
        response: ResponseSpec,
    },
    /// A candidate with the same route exists but differs
    Mismatched {
        /// Best candidate index
        interaction: usize,
        /// Its discrepancies
        mismatches: Vec<Mismatch>,
    },
    /// No interaction is registered for this route
    Unexpected {
        /// The recorded `unexpected-request` mismatch
        mismatch: Mismatch,
    },
}

#[derive(Debug)]
struct SessionState {
    interactions: Vec<InteractionState>,
    outcomes: Vec<MatchOutcome>,
    next_sequence: u64,
    report: Option<VerificationReport>,
}

/// One pact being served: its interactions, their state and the traffic log
#[derive(Debug)]
pub struct MockSession {
    pact: Pact,
    config: MatchConfig,
    state: Mutex<SessionState>,
}

impl MockSession {
    /// Create a session over a loaded pact
    pub fn new(pact: Pact, config: MatchConfig) -> Self {
        let state = SessionState {
            interactions: vec![InteractionState::default(); pact.interactions.len()],
            outcomes: Vec::new(),
            next_sequence: 0,
            report: None,
        };
        MockSession {
            pact,
            config,
            state: Mutex::new(state),
        }
    }

    /// The pact being served
    pub fn pact(&self) -> &Pact {
        &self.pact
    }

    /// Matcher options in effect
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Route an observed request to the best matching interaction
    ///
    /// Candidates are the interactions whose method and path match. The one
    /// with the fewest mismatches wins, the earliest registered on a tie.
    /// Every call appends exactly one outcome to the log.
    pub fn route(&self, request: HttpRequest) -> RouteResult {
        let scored: Vec<(usize, Vec<Mismatch>)> = self
            .pact
            .interactions
            .iter()
            .enumerate()
            .filter(|(_, interaction)| matches_route(&request, &interaction.request))
            .map(|(index, interaction)| {
                (index, match_request(&request, &interaction.request, &self.config))
            })
            .collect();

        let mut state = self.state.lock();
        if state.report.is_some() {
            debug!(method = %request.method, path = %request.path, "request after verification ignored");
            return RouteResult::Unexpected {
                mismatch: Mismatch::unexpected_request(&request),
            };
        }

        let mut best: Option<(usize, Vec<Mismatch>)> = None;
        for (index, mismatches) in scored {
            if state.interactions[index].consumed {
                continue;
            }
            let better = best
                .as_ref()
                .map_or(true, |(_, current)| mismatches.len() < current.len());
            if better {
                best = Some((index, mismatches));
            }
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let (interaction, mismatches, result) = match best {
            Some((index, mismatches)) if mismatches.is_empty() => {
                let slot = &mut state.interactions[index];
                slot.consumed = true;
                slot.attempted = true;
                let response = self.pact.interactions[index].response.clone();
                (
                    Some(index),
                    Vec::new(),
                    RouteResult::Matched {
                        interaction: index,
                        response,
                    },
                )
            }
            Some((index, mismatches)) => {
                state.interactions[index].attempted = true;
                (
                    Some(index),
                    mismatches.clone(),
                    RouteResult::Mismatched {
                        interaction: index,
                        mismatches,
                    },
                )
            }
            None => {
                let mismatch = Mismatch::unexpected_request(&request);
                (None, vec![mismatch.clone()], RouteResult::Unexpected { mismatch })
            }
        };

        debug!(
            sequence,
            method = %request.method,
            path = %request.path,
            interaction = ?interaction,
            mismatches = mismatches.len(),
            "routed request"
        );

        state.outcomes.push(MatchOutcome {
            request: ObservedRequest { sequence, request },
            interaction,
            mismatches,
        });
        result
    }

    /// Snapshot of the outcome log, in arrival order
    pub fn outcomes(&self) -> Vec<MatchOutcome> {
        self.state.lock().outcomes.clone()
    }

    /// Snapshot of the per-interaction state, in registration order
    pub fn interaction_states(&self) -> Vec<InteractionState> {
        self.state.lock().interactions.clone()
    }

    /// Mismatch report of the traffic so far
    pub fn mismatches(&self) -> Vec<Mismatch> {
        let state = self.state.lock();
        match &state.report {
            Some(report) => report.mismatches.clone(),
            None => verification::aggregate(&self.pact, &state.interactions, &state.outcomes).mismatches,
        }
    }

    /// Whether every interaction is satisfied and no mismatch was recorded
    pub fn all_matched(&self) -> bool {
        self.mismatches().is_empty()
    }

    /// Finalize the session and return its verification report
    ///
    /// After the first call the session is read-only: later requests are
    /// answered as unexpected but not recorded, and later calls return the
    /// same report.
    pub fn finalize(&self) -> VerificationReport {
        let mut state = self.state.lock();
        if let Some(report) = &state.report {
            return report.clone();
        }
        let report = verification::aggregate(&self.pact, &state.interactions, &state.outcomes);
        state.report = Some(report.clone());
        report
    }

    /// Whether the session has been finalized
    pub fn is_finalized(&self) -> bool {
        self.state.lock().report.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pact_matching::MismatchType;
    use pact_models::{parse_query, Interaction, RequestSpec};
    use serde_json::json;
    use std::sync::Arc;

    fn pact_of(interactions: Vec<Interaction>) -> Pact {
        let value = json!({
            "consumer": {"name": "web"},
            "provider": {"name": "users"},
            "interactions": [],
        });
        let mut pact = Pact::from_value(value).unwrap();
        pact.interactions = interactions;
        pact
    }

    fn interaction(description: &str, request: RequestSpec, status: u16) -> Interaction {
        Interaction::new(description, request, ResponseSpec::with_status(status))
    }

    fn session(interactions: Vec<Interaction>) -> MockSession {
        MockSession::new(pact_of(interactions), MatchConfig::default())
    }

    #[test]
    fn test_exact_match_consumes() {
        let session = session(vec![interaction("list", RequestSpec::new("GET", "/users"), 200)]);

        let result = session.route(HttpRequest::new("GET", "/users"));
        assert!(matches!(result, RouteResult::Matched { interaction: 0, ref response } if response.status == 200));
        assert_eq!(session.interaction_states()[0], InteractionState { consumed: true, attempted: true });
        assert!(session.all_matched());

        // consumed interactions drop out of routing
        let result = session.route(HttpRequest::new("GET", "/users"));
        assert!(matches!(result, RouteResult::Unexpected { .. }));
        assert!(!session.all_matched());
    }

    #[test]
    fn test_partial_match_is_attempted_not_consumed() {
        let expected = RequestSpec::new("GET", "/users").with_query(parse_query("active=true"));
        let session = session(vec![interaction("active users", expected, 200)]);

        let result = session.route(HttpRequest::new("GET", "/users"));
        let RouteResult::Mismatched { interaction, mismatches } = result else {
            panic!("expected a mismatch");
        };
        assert_eq!(interaction, 0);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].kind, MismatchType::QueryMismatch);

        let states = session.interaction_states();
        assert!(states[0].attempted);
        assert!(!states[0].consumed);

        let report = session.finalize();
        assert!(!report.passed);
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches[0].kind, MismatchType::QueryMismatch);
    }

    #[test]
    fn test_unexpected_request() {
        let session = session(vec![interaction("list", RequestSpec::new("GET", "/users"), 200)]);

        let result = session.route(HttpRequest::new("DELETE", "/unknown"));
        let RouteResult::Unexpected { mismatch } = result else {
            panic!("expected unexpected-request");
        };
        assert_eq!(mismatch.kind, MismatchType::UnexpectedRequest);
        assert_eq!(mismatch.request.path, "/unknown");

        let outcomes = session.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].interaction, None);
        assert!(!outcomes[0].is_match());
    }

    #[test]
    fn test_fewest_mismatches_wins() {
        let loose = RequestSpec::new("POST", "/users").with_body(json!({"name": "a", "age": 1}));
        let close = RequestSpec::new("POST", "/users").with_body(json!({"name": "b", "age": 1}));
        let session = session(vec![interaction("loose", loose, 201), interaction("close", close, 202)]);

        let observed = HttpRequest::new("POST", "/users").with_body(json!({"name": "b", "age": 2}));
        let result = session.route(observed);
        assert!(matches!(result, RouteResult::Mismatched { interaction: 1, ref mismatches } if mismatches.len() == 1));
    }

    #[test]
    fn test_tie_goes_to_first_registered() {
        let a = RequestSpec::new("GET", "/items");
        let b = RequestSpec::new("GET", "/items");
        let session = session(vec![interaction("first", a, 200), interaction("second", b, 201)]);

        let first = session.route(HttpRequest::new("GET", "/items"));
        assert!(matches!(first, RouteResult::Matched { interaction: 0, .. }));
        let second = session.route(HttpRequest::new("GET", "/items"));
        assert!(matches!(second, RouteResult::Matched { interaction: 1, ref response } if response.status == 201));
        assert!(session.finalize().passed);
    }

    #[test]
    fn test_method_is_case_insensitive_for_routing() {
        let session = session(vec![interaction("list", RequestSpec::new("get", "/users"), 200)]);
        assert!(matches!(
            session.route(HttpRequest::new("GET", "/users")),
            RouteResult::Matched { .. }
        ));
    }

    #[test]
    fn test_sequence_numbers_are_monotonic() {
        let session = session(vec![]);
        for _ in 0..3 {
            let _ = session.route(HttpRequest::new("GET", "/"));
        }
        let sequences: Vec<u64> = session.outcomes().iter().map(|o| o.request.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn test_finalize_is_stable() {
        let session = session(vec![interaction("list", RequestSpec::new("GET", "/users"), 200)]);
        let first = session.finalize();
        assert!(session.is_finalized());

        // traffic after finalization is not recorded
        let _ = session.route(HttpRequest::new("GET", "/users"));
        assert!(session.outcomes().is_empty());
        assert_eq!(session.finalize(), first);
        assert_eq!(session.mismatches(), first.mismatches);
    }

    #[test]
    fn test_concurrent_requests_do_not_double_claim() {
        let interactions = (0..4)
            .map(|i| interaction(&format!("slot {i}"), RequestSpec::new("GET", "/slot"), 200))
            .collect();
        let session = Arc::new(session(interactions));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || session.route(HttpRequest::new("GET", "/slot")))
            })
            .collect();
        let results: Vec<RouteResult> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let mut claimed: Vec<usize> = results
            .iter()
            .filter_map(|r| match r {
                RouteResult::Matched { interaction, .. } => Some(*interaction),
                _ => None,
            })
            .collect();
        claimed.sort_unstable();
        assert_eq!(claimed, vec![0, 1, 2, 3]);

        let unexpected = results
            .iter()
            .filter(|r| matches!(r, RouteResult::Unexpected { .. }))
            .count();
        assert_eq!(unexpected, 12);

        let mut sequences: Vec<u64> = session.outcomes().iter().map(|o| o.request.sequence).collect();
        sequences.sort_unstable();
        assert_eq!(sequences, (0..16).collect::<Vec<u64>>());
    }
}
