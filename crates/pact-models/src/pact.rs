//! Pact documents
//!
//! A [`Pact`] is loaded from its JSON form, validated, and kept together with
//! the original JSON value so that it can be written back out unchanged.

use crate::error::{PactModelError, PactModelResult};
use crate::query::{parse_query, QueryParams};
use crate::request::{Headers, RequestSpec, ResponseSpec};
use crate::rules::MatchingRules;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Consumer or provider identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Service name
    pub name: String,
}

impl Party {
    /// Create a party with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Party { name: name.into() }
    }
}

/// Precondition the provider must be in for an interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderState {
    /// State description
    pub name: String,
    /// Optional state parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// One expected request/response pair
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    /// Free-text description
    pub description: String,
    /// Provider states scoping this interaction
    pub provider_states: Vec<ProviderState>,
    /// Expected request
    pub request: RequestSpec,
    /// Canned response
    pub response: ResponseSpec,
}

impl Interaction {
    /// Create an interaction from its request and response
    pub fn new(description: impl Into<String>, request: RequestSpec, response: ResponseSpec) -> Self {
        Interaction {
            description: description.into(),
            provider_states: Vec::new(),
            request,
            response,
        }
    }
}

/// A contract between one consumer and one provider
#[derive(Debug, Clone, PartialEq)]
pub struct Pact {
    /// Consuming service
    pub consumer: Party,
    /// Providing service
    pub provider: Party,
    /// Expected interactions, in document order
    pub interactions: Vec<Interaction>,
    /// Document metadata (`pactSpecification` etc.)
    pub metadata: Option<Value>,
    source: Value,
}

impl Pact {
    /// Parse and validate a pact from JSON text
    pub fn from_json_str(json: &str) -> PactModelResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Pact::from_value(value)
    }

    /// Validate a pact from an already parsed JSON value
    pub fn from_value(value: Value) -> PactModelResult<Self> {
        if !value.is_object() {
            return Err(PactModelError::malformed("pact document must be a JSON object"));
        }
        let raw = RawPact::deserialize(&value)?;

        let interactions = raw
            .interactions
            .into_iter()
            .enumerate()
            .map(|(index, interaction)| interaction.validate(index))
            .collect::<PactModelResult<Vec<_>>>()?;

        Ok(Pact {
            consumer: raw.consumer,
            provider: raw.provider,
            interactions,
            metadata: raw.metadata,
            source: value,
        })
    }

    /// The JSON document this pact was loaded from
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Conventional file name: `<consumer>-<provider>.json`
    pub fn default_file_name(&self) -> String {
        format!(
            "{}-{}.json",
            sanitize_file_component(&self.consumer.name),
            sanitize_file_component(&self.provider.name)
        )
    }

    /// Pretty-printed JSON of the original document
    pub fn to_json_pretty(&self) -> PactModelResult<String> {
        Ok(serde_json::to_string_pretty(&self.source)?)
    }

    /// Iterate over interactions in document order
    pub fn iter(&self) -> std::slice::Iter<'_, Interaction> {
        self.interactions.iter()
    }
}

impl<'a> IntoIterator for &'a Pact {
    type Item = &'a Interaction;
    type IntoIter = std::slice::Iter<'a, Interaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn sanitize_file_component(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[derive(Deserialize)]
struct RawPact {
    consumer: Party,
    provider: Party,
    #[serde(default)]
    interactions: Vec<RawInteraction>,
    #[serde(default)]
    metadata: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInteraction {
    #[serde(default)]
    description: String,
    #[serde(default)]
    provider_state: Option<String>,
    #[serde(default)]
    provider_states: Vec<ProviderState>,
    request: Option<RawRequest>,
    #[serde(default)]
    response: Option<RawResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    method: Option<String>,
    path: Option<String>,
    #[serde(default)]
    query: Option<RawQuery>,
    #[serde(default)]
    headers: Option<Headers>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    matching_rules: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawQuery {
    Encoded(String),
    Map(IndexMap<String, RawQueryValue>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawQueryValue {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    headers: Headers,
    #[serde(default)]
    body: Option<Value>,
}

impl RawInteraction {
    fn validate(self, index: usize) -> PactModelResult<Interaction> {
        let label = if self.description.is_empty() {
            format!("interaction {index}")
        } else {
            format!("interaction {index} ('{}')", self.description)
        };
        let missing = |field: &str| PactModelError::malformed(format!("{label}: {field} is required"));

        let request = self.request.ok_or_else(|| missing("request"))?;
        let method = request
            .method
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| missing("request.method"))?;
        let path = request
            .path
            .filter(|p| !p.is_empty())
            .ok_or_else(|| missing("request.path"))?;

        let query = request.query.map(|q| match q {
            RawQuery::Encoded(raw) => parse_query(&raw),
            RawQuery::Map(map) => map
                .into_iter()
                .map(|(key, value)| {
                    let values = match value {
                        RawQueryValue::One(v) => vec![v],
                        RawQueryValue::Many(vs) => vs,
                    };
                    (key, values)
                })
                .collect::<QueryParams>(),
        });

        let matching_rules = match &request.matching_rules {
            Some(rules) => MatchingRules::from_json(rules)
                .map_err(|e| PactModelError::malformed(format!("{label}: {e}")))?,
            None => MatchingRules::default(),
        };

        let mut provider_states = self.provider_states;
        if let Some(state) = self.provider_state {
            provider_states.insert(0, ProviderState { name: state, params: None });
        }

        let response = self.response.unwrap_or(RawResponse {
            status: None,
            headers: Headers::new(),
            body: None,
        });

        Ok(Interaction {
            description: self.description,
            provider_states,
            request: RequestSpec {
                method,
                path,
                query,
                headers: request.headers,
                body: request.body,
                matching_rules,
            },
            response: ResponseSpec {
                status: response.status.unwrap_or(200),
                headers: response.headers,
                body: response.body,
            },
        })
    }
}
