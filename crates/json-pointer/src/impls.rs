//! [`Navigable`] for std, serde_json and indexmap types.

use std::collections::{BTreeMap, HashMap};

use docmodel_yaml::{Document, NodeId};
use indexmap::IndexMap;
use serde_json::Value;

use crate::{MapLike, Navigable, NavigableNoder, SequenceLike, StepError, Structure, Target};

macro_rules! leaf {
    ($($t:ty),* $(,)?) => {
        $(impl Navigable for $t {
            fn structure(&self) -> Structure<'_> {
                Structure::Leaf
            }
        })*
    };
}

leaf!(String, &str, bool, i32, i64, u32, u64, usize, f32, f64);

impl Navigable for NodeId {
    fn structure(&self) -> Structure<'_> {
        Structure::Node(*self)
    }
}

impl Navigable for Value {
    fn structure(&self) -> Structure<'_> {
        match self {
            Value::Null => Structure::Null,
            Value::Object(map) => Structure::Map(map),
            Value::Array(items) => Structure::Sequence(items),
            _ => Structure::Leaf,
        }
    }
}

impl MapLike for serde_json::Map<String, Value> {
    fn get_entry(&self, key: &str) -> Option<&dyn Navigable> {
        self.get(key).map(|v| v as &dyn Navigable)
    }
}

impl<T: Navigable> Navigable for Option<T> {
    fn structure(&self) -> Structure<'_> {
        match self {
            Some(v) => v.structure(),
            None => Structure::Null,
        }
    }

    fn as_key_navigable(&self) -> Option<&dyn crate::KeyNavigable> {
        self.as_ref().and_then(|v| v.as_key_navigable())
    }

    fn as_index_navigable(&self) -> Option<&dyn crate::IndexNavigable> {
        self.as_ref().and_then(|v| v.as_index_navigable())
    }

    fn as_navigable_noder(&self) -> Option<&dyn NavigableNoder> {
        self.as_ref().and_then(|v| v.as_navigable_noder())
    }

    fn source_node(&self) -> Option<NodeId> {
        self.as_ref().and_then(|v| v.source_node())
    }

    fn decoded(&self) -> Option<&dyn Navigable> {
        self.as_ref().and_then(|v| v.decoded())
    }
}

impl<T: Navigable + ?Sized> Navigable for Box<T> {
    fn structure(&self) -> Structure<'_> {
        (**self).structure()
    }

    fn as_key_navigable(&self) -> Option<&dyn crate::KeyNavigable> {
        (**self).as_key_navigable()
    }

    fn as_index_navigable(&self) -> Option<&dyn crate::IndexNavigable> {
        (**self).as_index_navigable()
    }

    fn as_navigable_noder(&self) -> Option<&dyn NavigableNoder> {
        (**self).as_navigable_noder()
    }

    fn source_node(&self) -> Option<NodeId> {
        (**self).source_node()
    }

    fn decoded(&self) -> Option<&dyn Navigable> {
        (**self).decoded()
    }
}

impl<T: Navigable> Navigable for Vec<T> {
    fn structure(&self) -> Structure<'_> {
        Structure::Sequence(self)
    }
}

impl<T: Navigable> SequenceLike for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get_item(&self, index: usize) -> Option<&dyn Navigable> {
        self.get(index).map(|v| v as &dyn Navigable)
    }
}

macro_rules! string_map {
    ($($map:ident),*) => {
        $(
            impl<V: Navigable> Navigable for $map<String, V> {
                fn structure(&self) -> Structure<'_> {
                    Structure::Map(self)
                }
            }

            impl<V: Navigable> MapLike for $map<String, V> {
                fn get_entry(&self, key: &str) -> Option<&dyn Navigable> {
                    self.get(key).map(|v| v as &dyn Navigable)
                }
            }
        )*
    };
}

string_map!(HashMap, BTreeMap, IndexMap);

/// A document stands for its single top-level node.
impl Navigable for Document {
    fn structure(&self) -> Structure<'_> {
        match self.root() {
            Some(root) => Structure::Node(root),
            None => Structure::Null,
        }
    }

    fn as_navigable_noder(&self) -> Option<&dyn NavigableNoder> {
        Some(self)
    }
}

impl NavigableNoder for Document {
    fn navigable_node(&self) -> Result<Target<'_>, StepError> {
        self.root().map(Target::Node).ok_or(StepError::NotFound)
    }
}
