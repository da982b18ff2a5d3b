//! Fatal errors of the decode/sync engine.
//!
//! Document-data problems never show up here; they are reported as
//! [`crate::Finding`]s and decode carries on.

use docmodel_json_pointer::JsonPointerError;
use docmodel_yaml::{EditError, NodeId, ParseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Pointer(#[from] JsonPointerError),
    #[error("type `{type_name}` is not registered")]
    UnregisteredType { type_name: &'static str },
    #[error("node {node} is not a mapping")]
    NotAMapping { node: NodeId },
    #[error("invalid synchronization target: {reason}")]
    InvalidTarget { reason: String },
    #[error("invalid field pattern `{pattern}`: {source}")]
    Pattern {
        pattern: &'static str,
        source: regex::Error,
    },
}
