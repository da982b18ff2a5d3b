use docmodel_yaml::EditError;
use thiserror::Error;

use crate::Token;

/// A malformed pointer string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("json pointer is empty")]
    Empty,
    #[error("json pointer must start with '/'")]
    NotAbsolute,
    #[error("empty reference token at position {position}")]
    EmptyToken { position: usize },
    #[error("invalid escape sequence in token `{token}`")]
    InvalidEscape { token: String },
    #[error("control character in token `{token}`")]
    InvalidCharacter { token: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JsonPointerError {
    #[error("invalid json pointer: {0}")]
    Validation(#[from] ValidationError),
    #[error("`{pointer}`: nothing at token `{token}`")]
    NotFound { pointer: String, token: String },
    #[error("`{pointer}`: invalid path at token `{token}`: {reason}")]
    InvalidPath {
        pointer: String,
        token: String,
        reason: String,
    },
    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Failure of a single navigation step, before the pointer context is known.
///
/// Capability implementations return this; the navigator attaches the
/// pointer and token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    NotFound,
    InvalidPath(String),
}

impl StepError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        StepError::InvalidPath(reason.into())
    }

    pub(crate) fn at(self, pointer: &str, token: &Token) -> JsonPointerError {
        match self {
            StepError::NotFound => JsonPointerError::NotFound {
                pointer: pointer.to_string(),
                token: token.to_string(),
            },
            StepError::InvalidPath(reason) => JsonPointerError::InvalidPath {
                pointer: pointer.to_string(),
                token: token.to_string(),
                reason,
            },
        }
    }
}
