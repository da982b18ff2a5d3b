//! Arena node types.
//!
//! Nodes never own each other: collections hold [`NodeId`] handles into the
//! owning [`crate::Document`]. Source-backed nodes remember the byte span they
//! were parsed from so the emitter can copy untouched text verbatim.

use std::fmt;

/// Handle to one node inside a [`crate::Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural kind of a node, before alias resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Scalar,
    Mapping,
    Sequence,
    Alias,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Scalar => "scalar",
            NodeKind::Mapping => "mapping",
            NodeKind::Sequence => "sequence",
            NodeKind::Alias => "alias",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved type of a scalar under the YAML 1.2 core schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Null,
    Bool,
    Int,
    Float,
    Str,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::Null => "null",
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::Str => "string",
        }
    }
}

/// Presentation style of a scalar in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

/// Presentation style of a mapping or sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionStyle {
    Block,
    Flow,
}

/// A scalar value: the cooked text plus its resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    pub value: String,
    pub kind: ScalarType,
    pub style: ScalarStyle,
}

impl Scalar {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: ScalarType::Str,
            style: ScalarStyle::Plain,
        }
    }

    pub fn null() -> Self {
        Self {
            value: "null".to_string(),
            kind: ScalarType::Null,
            style: ScalarStyle::Plain,
        }
    }

    pub fn bool(value: bool) -> Self {
        Self {
            value: value.to_string(),
            kind: ScalarType::Bool,
            style: ScalarStyle::Plain,
        }
    }

    pub fn int(value: i64) -> Self {
        Self {
            value: value.to_string(),
            kind: ScalarType::Int,
            style: ScalarStyle::Plain,
        }
    }

    pub fn float(value: f64) -> Self {
        let text = if value.is_nan() {
            ".nan".to_string()
        } else if value.is_infinite() {
            let text = if value > 0.0 { ".inf" } else { "-.inf" };
            text.to_string()
        } else if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{value:.1}")
        } else {
            value.to_string()
        };
        Self {
            value: text,
            kind: ScalarType::Float,
            style: ScalarStyle::Plain,
        }
    }

    pub fn is_null(&self) -> bool {
        self.kind == ScalarType::Null
    }
}

/// 1-based line/column location of a node in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

// ── Arena internals ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) value: NodeValue,
    pub(crate) anchor: Option<String>,
    pub(crate) tag: Option<String>,
    /// `None` for nodes created through the edit API.
    pub(crate) span: Option<Span>,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeValue {
    Scalar(Scalar),
    Mapping(Collection<Pair>),
    Sequence(Collection<Item>),
    Alias { name: String, target: NodeId },
}

#[derive(Debug, Clone)]
pub(crate) struct Collection<E> {
    pub(crate) style: CollectionStyle,
    pub(crate) entries: Vec<E>,
    /// Entry layout as parsed. Never changes after parsing.
    pub(crate) slots: Vec<Slot>,
}

impl<E> Collection<E> {
    pub(crate) fn new(style: CollectionStyle) -> Self {
        Self {
            style,
            entries: Vec::new(),
            slots: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Pair {
    pub(crate) key: NodeId,
    pub(crate) value: NodeId,
    pub(crate) slot: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Item {
    pub(crate) value: NodeId,
    pub(crate) slot: Option<usize>,
}

pub(crate) trait Entry {
    fn slot(&self) -> Option<usize>;
    fn value(&self) -> NodeId;
    fn key(&self) -> Option<NodeId>;
}

impl Entry for Pair {
    fn slot(&self) -> Option<usize> {
        self.slot
    }
    fn value(&self) -> NodeId {
        self.value
    }
    fn key(&self) -> Option<NodeId> {
        Some(self.key)
    }
}

impl Entry for Item {
    fn slot(&self) -> Option<usize> {
        self.slot
    }
    fn value(&self) -> NodeId {
        self.value
    }
    fn key(&self) -> Option<NodeId> {
        None
    }
}

/// Source layout of one collection entry.
///
/// `start` is the key start (mappings), the `-` indicator (block sequences)
/// or the item start (flow sequences). `sep` is the offset of the `:` or `-`
/// separator, if any. `end` is the end of the value's span and `line_end`
/// extends it to the end of the line, trailing comment included (block only).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub(crate) start: usize,
    pub(crate) key: Option<NodeId>,
    pub(crate) key_end: usize,
    pub(crate) sep: Option<usize>,
    pub(crate) value: NodeId,
    pub(crate) end: usize,
    pub(crate) line_end: usize,
}
