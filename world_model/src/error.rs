//! Errors raised by the world model.

use thiserror::Error;

/// Failures while parsing fragments or mutating the world state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// The fragment is not a well-formed parenthesised expression.
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    /// The fragment parsed but does not have the expected shape.
    #[error("invalid {kind} fragment `{fragment}`: {reason}")]
    InvalidFragment {
        kind: &'static str,
        fragment: String,
        reason: String,
    },

    /// A value change referenced a relation that is not in the world.
    #[error("no relation matching `{0}` in the world state")]
    RelationNotFound(String),
}

impl WorldError {
    pub(crate) fn invalid(kind: &'static str, fragment: impl Into<String>, reason: impl Into<String>) -> Self {
        WorldError::InvalidFragment {
            kind,
            fragment: fragment.into(),
            reason: reason.into(),
        }
    }
}
