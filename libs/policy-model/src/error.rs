//! Errors raised while constructing policy model values.

use thiserror::Error;

/// Malformed input rejected by the validated constructors of this crate.
///
/// Every variant belongs to the same "invalid argument" family: callers get
/// it synchronously and retrying with the same input never helps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("permission token must not be empty")]
    InvalidPermission,

    #[error("invalid subject id '{value}': {reason}")]
    InvalidSubjectId { value: String, reason: String },

    #[error("resource type must not be empty")]
    InvalidResourceType,

    #[error("invalid resource path '{value}': {reason}")]
    InvalidResourcePath { value: String, reason: String },

    #[error("invalid resource key '{value}': {reason}")]
    InvalidResourceKey { value: String, reason: String },

    #[error("authorization context requires at least one subject")]
    EmptyAuthorizationContext,
}

impl ModelError {
    pub(crate) fn subject_id(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSubjectId {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn resource_path(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResourcePath {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn resource_key(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResourceKey {
            value: value.into(),
            reason: reason.into(),
        }
    }
}
