//! Capability traits consumed by the [`crate::Navigator`].

use docmodel_yaml::NodeId;

use crate::StepError;

/// Where a navigation step landed: a typed value or a raw document node.
#[derive(Clone, Copy)]
pub enum Target<'a> {
    Value(&'a dyn Navigable),
    Node(NodeId),
}

impl<'a> Target<'a> {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Target::Node(id) => Some(*id),
            Target::Value(_) => None,
        }
    }

    pub fn value(&self) -> Option<&'a dyn Navigable> {
        match self {
            Target::Value(v) => Some(*v),
            Target::Node(_) => None,
        }
    }
}

impl std::fmt::Debug for Target<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Value(_) => f.write_str("Target::Value(..)"),
            Target::Node(id) => write!(f, "Target::Node({id})"),
        }
    }
}

/// Anything a pointer can walk through.
///
/// Only [`Navigable::structure`] is required. The `as_*` hooks expose the
/// optional capabilities; the navigator tries them before structure.
pub trait Navigable {
    fn structure(&self) -> Structure<'_>;

    fn as_key_navigable(&self) -> Option<&dyn KeyNavigable> {
        None
    }

    fn as_index_navigable(&self) -> Option<&dyn IndexNavigable> {
        None
    }

    fn as_navigable_noder(&self) -> Option<&dyn NavigableNoder> {
        None
    }

    /// Document node this value was decoded from, if any.
    fn source_node(&self) -> Option<NodeId> {
        None
    }

    /// The decoded layer behind a caller-facing value. Node lookups walk
    /// this layer instead, since only decoded values know their nodes.
    fn decoded(&self) -> Option<&dyn Navigable> {
        None
    }
}

/// Resolves key tokens itself.
pub trait KeyNavigable {
    fn navigate_key(&self, key: &str) -> Result<Target<'_>, StepError>;
}

/// Resolves index tokens itself.
pub trait IndexNavigable {
    fn navigate_index(&self, index: usize) -> Result<Target<'_>, StepError>;
}

/// Stands in for another value (or node) during navigation.
pub trait NavigableNoder {
    fn navigable_node(&self) -> Result<Target<'_>, StepError>;
}

/// Shape of a value for structural dispatch.
pub enum Structure<'a> {
    /// Absent value; any further token is `NotFound`.
    Null,
    /// Scalar; any further token is `InvalidPath`.
    Leaf,
    Map(&'a dyn MapLike),
    Sequence(&'a dyn SequenceLike),
    Struct(StructView<'a>),
    Node(NodeId),
}

pub trait MapLike {
    fn get_entry(&self, key: &str) -> Option<&dyn Navigable>;
}

pub trait SequenceLike {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_item(&self, index: usize) -> Option<&dyn Navigable>;
}

/// Declared fields of a model, in declaration order.
pub struct StructView<'a> {
    pub fields: Vec<FieldRef<'a>>,
    /// Entries consulted for tokens matching no field, such as extensions.
    pub extra: Option<&'a dyn MapLike>,
    /// Raw node the model was decoded from; tokens matching nothing else
    /// continue there.
    pub root_node: Option<NodeId>,
}

pub struct FieldRef<'a> {
    pub name: &'static str,
    /// Value of the default `key` tag.
    pub key: &'static str,
    /// Any further `(tag, value)` pairs.
    pub tags: &'static [(&'static str, &'static str)],
    pub value: &'a dyn Navigable,
}

impl FieldRef<'_> {
    pub fn tag(&self, name: &str) -> Option<&'static str> {
        if name == "key" {
            return Some(self.key);
        }
        self.tags.iter().find(|(t, _)| *t == name).map(|(_, v)| *v)
    }
}
