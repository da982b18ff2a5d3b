//! A small tag model used across the engine tests.

#![allow(dead_code)]

use docmodel_marshaller::ordered_map::OrderedMap;
use docmodel_marshaller::yaml::NodeId;
use docmodel_marshaller::{
    core_model, model, CoreModel, CoreState, Error, Field, Model, Node, Registry, SyncContext, Synchronize,
};
use serde_json::Value;

pub const NAME_PATTERN: &str = "^[a-z][a-z0-9-]*$";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagCore {
    pub name: Node<String>,
    pub description: Node<String>,
    pub labels: Node<Vec<Node<String>>>,
    pub state: CoreState,
}

impl CoreModel for TagCore {
    const FIELDS: &'static [Field<Self>] = &[
        Field::new("name", "name", |c: &Self| &c.name, |c: &mut Self| &mut c.name)
            .required()
            .pattern(NAME_PATTERN),
        Field::new(
            "description",
            "description",
            |c: &Self| &c.description,
            |c: &mut Self| &mut c.description,
        ),
        Field::new("labels", "labels", |c: &Self| &c.labels, |c: &mut Self| &mut c.labels)
            .tags(&[("json", "tags")]),
    ];

    fn state(&self) -> &CoreState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CoreState {
        &mut self.state
    }
}

core_model!(TagCore);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tag {
    pub name: String,
    pub description: Option<String>,
    pub labels: Vec<String>,
    pub extensions: OrderedMap<String, Value>,
    core: TagCore,
}

impl Tag {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Synchronize for Tag {
    type Core = TagCore;

    fn populate(core: &TagCore) -> Self {
        Self {
            name: core.name.populate_or_default(),
            description: core.description.populate(),
            labels: core.labels.populate_or_default(),
            extensions: core.state.extension_values(),
            core: core.clone(),
        }
    }

    fn synchronize(&self, ctx: &mut SyncContext<'_>, current: Option<(NodeId, &TagCore)>) -> Result<NodeId, Error> {
        let absent = TagCore::default();
        let (map, core) = ctx.mapping(current, &absent)?;
        ctx.field(map, "name", &core.name, Some(&self.name))?;
        ctx.field(map, "description", &core.description, self.description.as_ref())?;
        ctx.field(map, "labels", &core.labels, Some(&self.labels))?;
        ctx.extensions(map, &core.state.extensions, &self.extensions)?;
        Ok(map)
    }
}

impl Model for Tag {
    fn core(&self) -> &TagCore {
        &self.core
    }
}

model!(Tag { name, description, labels, ..extensions });

pub fn registry() -> Registry {
    Registry::builder().register::<TagCore>().build()
}
