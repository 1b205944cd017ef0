//! Error types for pact document loading

use thiserror::Error;

/// Errors raised while loading or validating a pact document
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PactModelError {
    /// The document is not valid JSON or does not have the expected shape
    #[error("Malformed pact: {reason}")]
    MalformedPact {
        /// Human readable description of the problem
        reason: String,
    },
}

impl PactModelError {
    /// Build a `MalformedPact` error from anything printable
    pub fn malformed(reason: impl Into<String>) -> Self {
        PactModelError::MalformedPact {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for PactModelError {
    fn from(err: serde_json::Error) -> Self {
        PactModelError::malformed(err.to_string())
    }
}

/// Result alias used throughout the model crate
pub type PactModelResult<T> = Result<T, PactModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = PactModelError::malformed("interaction 0: request.method is required");
        assert_eq!(
            err.to_string(),
            "Malformed pact: interaction 0: request.method is required"
        );
    }

    #[test]
    fn test_from_serde_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PactModelError = serde_err.into();
        assert!(matches!(err, PactModelError::MalformedPact { .. }));
    }
}
