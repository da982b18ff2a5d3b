//! Core models, their field descriptor tables and the high-level side.
//!
//! A core model is a plain struct with one [`Node`] per declared key plus a
//! [`CoreState`]. Its fields are described once, in declaration order, by the
//! associated const [`CoreModel::FIELDS`]; the engine walks that table for
//! decode and the navigator walks it for struct dispatch.
//!
//! ```ignore
//! #[derive(Debug, Clone, Default)]
//! pub struct ParameterCore {
//!     pub name: Node<String>,
//!     pub state: CoreState,
//! }
//!
//! impl CoreModel for ParameterCore {
//!     const FIELDS: &'static [Field<Self>] = &[
//!         Field::new("name", "name", |c: &Self| &c.name, |c: &mut Self| &mut c.name).required(),
//!     ];
//!     fn state(&self) -> &CoreState { &self.state }
//!     fn state_mut(&mut self) -> &mut CoreState { &mut self.state }
//! }
//!
//! core_model!(ParameterCore);
//! ```

use docmodel_json_pointer::{FieldRef, MapLike, Navigable, StructView};
use docmodel_ordered_map::OrderedMap;
use docmodel_yaml::NodeId;
use serde_json::Value;

use crate::decode::{DecodeContext, Unmarshal};
use crate::sync::Synchronize;
use crate::{Error, Node};

/// Bookkeeping every core model carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoreState {
    pub root_node: Option<NodeId>,
    /// No findings against the model's own fields or its direct unions.
    pub valid: bool,
    /// The node was a mapping, so fields could be decoded at all.
    pub valid_yaml: bool,
    /// `x-` keys, in document order.
    pub extensions: OrderedMap<String, Node<Value>>,
}

impl CoreState {
    /// Extension values without their nodes.
    pub fn extension_values(&self) -> OrderedMap<String, Value> {
        self.extensions
            .all()
            .map(|(k, n)| (k.clone(), n.value.clone()))
            .collect()
    }
}

/// Object-safe view of one `Node<T>` field.
pub trait FieldSlot {
    fn decode(
        &mut self,
        ctx: &mut DecodeContext<'_>,
        key: &str,
        key_node: NodeId,
        value_node: NodeId,
    ) -> Result<(), Error>;

    fn is_present(&self) -> bool;

    fn is_valid(&self) -> bool;

    fn invalidate(&mut self);

    fn value_node(&self) -> Option<NodeId>;

    /// String content, for pattern checks.
    fn text(&self) -> Option<&str>;

    fn navigable(&self) -> &dyn Navigable;
}

impl<T: Unmarshal + Navigable> FieldSlot for Node<T> {
    fn decode(
        &mut self,
        ctx: &mut DecodeContext<'_>,
        key: &str,
        key_node: NodeId,
        value_node: NodeId,
    ) -> Result<(), Error> {
        *self = Node::decode(ctx, Some((key, key_node)), value_node)?;
        Ok(())
    }

    fn is_present(&self) -> bool {
        self.present
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn invalidate(&mut self) {
        self.valid = false;
    }

    fn value_node(&self) -> Option<NodeId> {
        self.value_node
    }

    fn text(&self) -> Option<&str> {
        self.get().and_then(Unmarshal::as_text)
    }

    fn navigable(&self) -> &dyn Navigable {
        self
    }
}

/// Descriptor of one declared field.
pub struct Field<C> {
    /// Document key, also the value of the default `key` tag.
    pub key: &'static str,
    /// Rust field name.
    pub name: &'static str,
    /// Extra `(tag, value)` pairs for navigation under other tag names.
    pub tags: &'static [(&'static str, &'static str)],
    pub required: bool,
    /// Regex a string value must match.
    pub pattern: Option<&'static str>,
    pub get: fn(&C) -> &dyn FieldSlot,
    pub get_mut: fn(&mut C) -> &mut dyn FieldSlot,
}

impl<C> Field<C> {
    pub const fn new(
        key: &'static str,
        name: &'static str,
        get: fn(&C) -> &dyn FieldSlot,
        get_mut: fn(&mut C) -> &mut dyn FieldSlot,
    ) -> Self {
        Self {
            key,
            name,
            tags: &[],
            required: false,
            pattern: None,
            get,
            get_mut,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn pattern(mut self, pattern: &'static str) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub const fn tags(mut self, tags: &'static [(&'static str, &'static str)]) -> Self {
        self.tags = tags;
        self
    }
}

/// The low-level half of a model pair. Only the engine creates these.
pub trait CoreModel: Default + Clone + 'static {
    const FIELDS: &'static [Field<Self>];

    fn state(&self) -> &CoreState;

    fn state_mut(&mut self) -> &mut CoreState;

    /// Declared fields that are present in the source.
    fn present_fields(&self) -> Vec<&'static str> {
        Self::FIELDS
            .iter()
            .filter(|f| (f.get)(self).is_present())
            .map(|f| f.key)
            .collect()
    }
}

/// The caller-facing half of a model pair. Owns its core by value.
pub trait Model: Synchronize {
    fn core(&self) -> &Self::Core;
}

/// Struct view of a core model for the pointer navigator.
pub fn struct_view<C: CoreModel>(core: &C) -> StructView<'_> {
    StructView {
        fields: C::FIELDS
            .iter()
            .map(|f| FieldRef {
                name: f.name,
                key: f.key,
                tags: f.tags,
                value: (f.get)(core).navigable(),
            })
            .collect(),
        extra: Some(&core.state().extensions),
        root_node: core.state().root_node,
    }
}

/// Struct view of a high-level model. Keys and tags come from the core's
/// descriptor table, matched by field name.
pub fn model_view<'a, M>(
    model: &'a M,
    fields: Vec<(&'static str, &'a dyn Navigable)>,
    extra: Option<&'a dyn MapLike>,
) -> StructView<'a>
where
    M: Model,
    M::Core: CoreModel,
{
    StructView {
        fields: fields
            .into_iter()
            .map(|(name, value)| {
                let field = <M::Core as CoreModel>::FIELDS.iter().find(|f| f.name == name);
                FieldRef {
                    name,
                    key: field.map_or(name, |f| f.key),
                    tags: field.map(|f| f.tags).unwrap_or_default(),
                    value,
                }
            })
            .collect(),
        extra,
        root_node: model.core().state().root_node,
    }
}

/// Implements decode and navigation for core models.
#[macro_export]
macro_rules! core_model {
    ($($core:ty),+ $(,)?) => {$(
        impl $crate::Unmarshal for $core {
            fn unmarshal(
                ctx: &mut $crate::DecodeContext<'_>,
                node: $crate::yaml::NodeId,
            ) -> ::std::result::Result<Self, $crate::Error> {
                ctx.decode_model(node)
            }

            fn accepts(doc: &$crate::yaml::Document, node: $crate::yaml::NodeId) -> bool {
                doc.is_mapping(node)
            }

            fn expected() -> ::std::string::String {
                "mapping".to_string()
            }
        }

        impl $crate::pointer::Navigable for $core {
            fn structure(&self) -> $crate::pointer::Structure<'_> {
                $crate::pointer::Structure::Struct($crate::struct_view(self))
            }

            fn source_node(&self) -> ::std::option::Option<$crate::yaml::NodeId> {
                $crate::CoreModel::state(self).root_node
            }
        }
    )+};
}

/// Implements navigation for high-level models.
///
/// Pointers see the listed fields as they are now, plus the entries of the
/// map named after `..`. Node lookups go through the core instead.
///
/// ```ignore
/// model!(Tag { name, description, ..extensions });
/// ```
#[macro_export]
macro_rules! model {
    ($model:ty { $($field:ident),* $(,)? $(.. $rest:ident)? }) => {
        impl $crate::pointer::Navigable for $model {
            fn structure(&self) -> $crate::pointer::Structure<'_> {
                let extra: ::std::option::Option<&dyn $crate::pointer::MapLike> = ::std::option::Option::None
                    $(.or(::std::option::Option::Some(&self.$rest as &dyn $crate::pointer::MapLike)))?;
                $crate::pointer::Structure::Struct($crate::model_view(
                    self,
                    ::std::vec![$((stringify!($field), &self.$field as &dyn $crate::pointer::Navigable)),*],
                    extra,
                ))
            }

            fn source_node(&self) -> ::std::option::Option<$crate::yaml::NodeId> {
                $crate::CoreModel::state($crate::Model::core(self)).root_node
            }

            fn decoded(&self) -> ::std::option::Option<&dyn $crate::pointer::Navigable> {
                ::std::option::Option::Some($crate::Model::core(self))
            }
        }
    };
}
