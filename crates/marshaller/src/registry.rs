//! Type registry: type identity to zero-value constructor.
//!
//! Built once during startup and passed to every decode. The engine creates
//! each model it decodes through [`Registry::instantiate`], so an unregistered
//! model type is a hard [`Error::UnregisteredType`].

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::union::ReferenceCore;
use crate::Error;

type Constructor = fn() -> Box<dyn Any>;

struct Entry {
    name: &'static str,
    construct: Constructor,
}

fn construct<T: Default + Any>() -> Box<dyn Any> {
    Box::new(T::default())
}

pub struct Registry {
    entries: HashMap<TypeId, Entry>,
}

impl Registry {
    /// A builder with the engine's own [`ReferenceCore`] already registered.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::empty().register::<ReferenceCore>()
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A fresh zero value of `T`.
    pub fn instantiate<T: Any>(&self) -> Result<T, Error> {
        let missing = || Error::UnregisteredType {
            type_name: type_name::<T>(),
        };
        let entry = self.entries.get(&TypeId::of::<T>()).ok_or_else(missing)?;
        (entry.construct)()
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| missing())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.values().map(|e| e.name).collect();
        names.sort_unstable();
        f.debug_struct("Registry").field("types", &names).finish()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    entries: HashMap<TypeId, Entry>,
}

impl RegistryBuilder {
    /// A builder with nothing registered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registers `T`. Registering a type twice is harmless.
    pub fn register<T: Default + Any>(mut self) -> Self {
        self.entries.insert(
            TypeId::of::<T>(),
            Entry {
                name: type_name::<T>(),
                construct: construct::<T>,
            },
        );
        self
    }

    pub fn build(self) -> Registry {
        tracing::debug!(types = self.entries.len(), "built type registry");
        Registry {
            entries: self.entries,
        }
    }
}
