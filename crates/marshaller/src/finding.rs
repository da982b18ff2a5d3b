//! Validation findings collected during structural decode.

use std::fmt;

use docmodel_yaml::{NodeId, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingKind {
    RequiredFieldMissing,
    TypeMismatch,
    PatternMismatch,
    /// A key with no declared field and no `x-` prefix. Kept in the tree.
    UnknownProperty,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::RequiredFieldMissing => "required-field-missing",
            FindingKind::TypeMismatch => "type-mismatch",
            FindingKind::PatternMismatch => "pattern-mismatch",
            FindingKind::UnknownProperty => "unknown-property",
        }
    }
}

/// One non-fatal decode problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: FindingKind,
    pub message: String,
    /// Node the problem was found at. `None` only for an empty document.
    pub node: Option<NodeId>,
    pub position: Option<Position>,
}

impl Finding {
    /// Whether the subtree at [`Finding::node`] failed to decode fully.
    /// Tolerated unknown properties do not count.
    pub fn is_decode_failure(&self) -> bool {
        self.kind != FindingKind::UnknownProperty
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)?;
        if let Some(pos) = self.position {
            write!(f, " (line {}, column {})", pos.line, pos.column)?;
        }
        Ok(())
    }
}
