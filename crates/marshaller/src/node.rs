//! The per-field node wrapper.

use docmodel_json_pointer::{Navigable, NavigableNoder, StepError, Structure, Target};
use docmodel_yaml::NodeId;

use crate::decode::{DecodeContext, Unmarshal};
use crate::sync::Synchronize;
use crate::Error;

/// A decoded value bound to where it came from.
///
/// `present == false` means the key was absent from the source. A key given
/// as `null` is present.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    pub key: Option<String>,
    pub key_node: Option<NodeId>,
    pub value: T,
    pub value_node: Option<NodeId>,
    pub present: bool,
    /// The value decoded without findings of its own. Findings inside nested
    /// models do not clear this.
    pub valid: bool,
}

impl<T: Default> Default for Node<T> {
    fn default() -> Self {
        Self {
            key: None,
            key_node: None,
            value: T::default(),
            value_node: None,
            present: false,
            valid: true,
        }
    }
}

impl<T> Node<T> {
    /// The value with its node, when the field is present.
    pub fn current(&self) -> Option<(NodeId, &T)> {
        match (self.present, self.value_node) {
            (true, Some(node)) => Some((node, &self.value)),
            _ => None,
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.present.then_some(&self.value)
    }

    /// Builds the high-level value for a present field.
    pub fn populate<H: Synchronize<Core = T>>(&self) -> Option<H> {
        self.get().map(H::populate)
    }

    /// Builds the high-level value, falling back to the zero value when absent.
    pub fn populate_or_default<H: Synchronize<Core = T> + Default>(&self) -> H {
        self.populate().unwrap_or_default()
    }
}

impl<T: Unmarshal> Node<T> {
    /// Decodes `value_node`, scoping validity to this value alone.
    pub fn decode(
        ctx: &mut DecodeContext<'_>,
        key: Option<(&str, NodeId)>,
        value_node: NodeId,
    ) -> Result<Self, Error> {
        let (value, valid) = ctx.scope(|ctx| T::unmarshal(ctx, value_node))?;
        Ok(Self {
            key: key.map(|(k, _)| k.to_string()),
            key_node: key.map(|(_, n)| n),
            value,
            value_node: Some(value_node),
            present: true,
            valid,
        })
    }
}

/// Absent fields navigate to `NotFound`; present ones to their value.
impl<T: Navigable> Navigable for Node<T> {
    fn structure(&self) -> Structure<'_> {
        if self.present {
            self.value.structure()
        } else {
            Structure::Null
        }
    }

    fn as_navigable_noder(&self) -> Option<&dyn NavigableNoder> {
        Some(self)
    }

    fn source_node(&self) -> Option<NodeId> {
        self.current().map(|(node, _)| node)
    }
}

impl<T: Navigable> NavigableNoder for Node<T> {
    fn navigable_node(&self) -> Result<Target<'_>, StepError> {
        if self.present {
            Ok(Target::Value(&self.value))
        } else {
            Err(StepError::NotFound)
        }
    }
}
