//! Matcher configuration

use serde::{Deserialize, Serialize};

/// How observed query parameters are compared with expected ones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMatching {
    /// Expected parameters must be present; extra ones are tolerated
    #[default]
    Subset,
    /// Observed parameters must be exactly the expected ones
    Strict,
}

/// Options that apply to every comparison made by the matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Query parameter policy
    #[serde(default)]
    pub query: QueryMatching,

    /// Tolerate object keys in the observed body that the expectation does
    /// not mention
    #[serde(default = "default_allow_unexpected_keys")]
    pub allow_unexpected_keys: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            query: QueryMatching::default(),
            allow_unexpected_keys: default_allow_unexpected_keys(),
        }
    }
}

impl MatchConfig {
    /// Configuration with strict query matching
    pub fn strict_query() -> Self {
        MatchConfig {
            query: QueryMatching::Strict,
            ..Default::default()
        }
    }
}

fn default_allow_unexpected_keys() -> bool {
    true
}
