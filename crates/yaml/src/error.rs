//! Parse and edit errors.

use thiserror::Error;

use crate::node::NodeId;

/// Syntax error raised while building a document tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Misuse of the edit API. These are caller errors, not document errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("node {0} does not belong to this document")]
    InvalidNode(NodeId),
    #[error("node {0} is not a mapping")]
    NotAMapping(NodeId),
    #[error("node {0} is not a sequence")]
    NotASequence(NodeId),
    #[error("index {index} out of bounds for sequence of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("key `{0}` not found")]
    KeyNotFound(String),
    #[error("node {0} is not a child of the given parent")]
    NotAChild(NodeId),
}
