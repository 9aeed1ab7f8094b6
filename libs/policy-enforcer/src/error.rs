//! Error types for the policy enforcer.

use policy_model::ModelError;
use thiserror::Error;

/// Errors returned by enforcer queries.
///
/// Access denial is expressed as `false` or an empty result, never as an
/// error. The only failure is malformed input, detected before any tree walk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnforcerError {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl EnforcerError {
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl From<ModelError> for EnforcerError {
    fn from(e: ModelError) -> Self {
        Self::invalid_argument(e.to_string())
    }
}
