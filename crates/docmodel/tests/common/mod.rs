//! Workflow-style fixture models: operations with reusable parameters and
//! success criteria whose `type` is either a name or an expression mapping.

#![allow(dead_code)]

use docmodel::{
    core_model, model, CoreModel, CoreState, Either, Error, Field, Model, Node, NodeId, OrderedMap, ReferenceCore,
    Registry, Reusable, SyncContext, Synchronize, Unmarshalled,
};
use serde_json::Value;

// ── Criterion expression type ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriterionExpressionTypeCore {
    pub type_: Node<String>,
    pub version: Node<String>,
    pub state: CoreState,
}

impl CoreModel for CriterionExpressionTypeCore {
    const FIELDS: &'static [Field<Self>] = &[
        Field::new("type", "type_", |c: &Self| &c.type_, |c: &mut Self| &mut c.type_).required(),
        Field::new("version", "version", |c: &Self| &c.version, |c: &mut Self| &mut c.version)
            .required()
            .pattern(r"^draft-\d{2}$"),
    ];

    fn state(&self) -> &CoreState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CoreState {
        &mut self.state
    }
}

core_model!(CriterionExpressionTypeCore);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriterionExpressionType {
    pub type_: String,
    pub version: String,
    core: CriterionExpressionTypeCore,
}

impl CriterionExpressionType {
    pub fn new(type_: &str, version: &str) -> Self {
        Self {
            type_: type_.to_string(),
            version: version.to_string(),
            ..Self::default()
        }
    }
}

impl Synchronize for CriterionExpressionType {
    type Core = CriterionExpressionTypeCore;

    fn populate(core: &Self::Core) -> Self {
        Self {
            type_: core.type_.populate_or_default(),
            version: core.version.populate_or_default(),
            core: core.clone(),
        }
    }

    fn synchronize(&self, ctx: &mut SyncContext<'_>, current: Option<(NodeId, &Self::Core)>) -> Result<NodeId, Error> {
        let absent = CriterionExpressionTypeCore::default();
        let (map, core) = ctx.mapping(current, &absent)?;
        ctx.field(map, "type", &core.type_, Some(&self.type_))?;
        ctx.field(map, "version", &core.version, Some(&self.version))?;
        Ok(map)
    }
}

impl Model for CriterionExpressionType {
    fn core(&self) -> &Self::Core {
        &self.core
    }
}

model!(CriterionExpressionType { type_, version });

// ── Criterion ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriterionCore {
    pub condition: Node<String>,
    pub context: Node<String>,
    pub type_: Node<Either<String, CriterionExpressionTypeCore>>,
    pub state: CoreState,
}

impl CoreModel for CriterionCore {
    const FIELDS: &'static [Field<Self>] = &[
        Field::new(
            "condition",
            "condition",
            |c: &Self| &c.condition,
            |c: &mut Self| &mut c.condition,
        )
        .required(),
        Field::new("context", "context", |c: &Self| &c.context, |c: &mut Self| &mut c.context),
        Field::new("type", "type_", |c: &Self| &c.type_, |c: &mut Self| &mut c.type_),
    ];

    fn state(&self) -> &CoreState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CoreState {
        &mut self.state
    }
}

core_model!(CriterionCore);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criterion {
    pub condition: String,
    pub context: Option<String>,
    pub type_: Option<Either<String, CriterionExpressionType>>,
    pub extensions: OrderedMap<String, Value>,
    core: CriterionCore,
}

impl Synchronize for Criterion {
    type Core = CriterionCore;

    fn populate(core: &Self::Core) -> Self {
        Self {
            condition: core.condition.populate_or_default(),
            context: core.context.populate(),
            type_: core.type_.populate(),
            extensions: core.state.extension_values(),
            core: core.clone(),
        }
    }

    fn synchronize(&self, ctx: &mut SyncContext<'_>, current: Option<(NodeId, &Self::Core)>) -> Result<NodeId, Error> {
        let absent = CriterionCore::default();
        let (map, core) = ctx.mapping(current, &absent)?;
        ctx.field(map, "condition", &core.condition, Some(&self.condition))?;
        ctx.field(map, "context", &core.context, self.context.as_ref())?;
        ctx.field(map, "type", &core.type_, self.type_.as_ref())?;
        ctx.extensions(map, &core.state.extensions, &self.extensions)?;
        Ok(map)
    }
}

impl Model for Criterion {
    fn core(&self) -> &Self::Core {
        &self.core
    }
}

model!(Criterion { condition, context, type_, ..extensions });

// ── Parameter ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterCore {
    pub name: Node<String>,
    pub in_: Node<String>,
    pub value: Node<String>,
    pub state: CoreState,
}

impl CoreModel for ParameterCore {
    const FIELDS: &'static [Field<Self>] = &[
        Field::new("name", "name", |c: &Self| &c.name, |c: &mut Self| &mut c.name).required(),
        Field::new("in", "in_", |c: &Self| &c.in_, |c: &mut Self| &mut c.in_)
            .required()
            .pattern("^(path|query|header|cookie)$"),
        Field::new("value", "value", |c: &Self| &c.value, |c: &mut Self| &mut c.value),
    ];

    fn state(&self) -> &CoreState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CoreState {
        &mut self.state
    }
}

core_model!(ParameterCore);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub in_: String,
    pub value: Option<String>,
    core: ParameterCore,
}

impl Parameter {
    pub fn new(name: &str, in_: &str) -> Self {
        Self {
            name: name.to_string(),
            in_: in_.to_string(),
            ..Self::default()
        }
    }
}

impl Synchronize for Parameter {
    type Core = ParameterCore;

    fn populate(core: &Self::Core) -> Self {
        Self {
            name: core.name.populate_or_default(),
            in_: core.in_.populate_or_default(),
            value: core.value.populate(),
            core: core.clone(),
        }
    }

    fn synchronize(&self, ctx: &mut SyncContext<'_>, current: Option<(NodeId, &Self::Core)>) -> Result<NodeId, Error> {
        let absent = ParameterCore::default();
        let (map, core) = ctx.mapping(current, &absent)?;
        ctx.field(map, "name", &core.name, Some(&self.name))?;
        ctx.field(map, "in", &core.in_, Some(&self.in_))?;
        ctx.field(map, "value", &core.value, self.value.as_ref())?;
        Ok(map)
    }
}

impl Model for Parameter {
    fn core(&self) -> &Self::Core {
        &self.core
    }
}

model!(Parameter { name, in_, value });

// ── Operation ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationCore {
    pub operation_id: Node<String>,
    pub parameters: Node<Vec<Node<Reusable<ParameterCore, ReferenceCore>>>>,
    pub success_criteria: Node<Vec<Node<CriterionCore>>>,
    pub outputs: Node<OrderedMap<String, Node<String>>>,
    pub state: CoreState,
}

impl CoreModel for OperationCore {
    const FIELDS: &'static [Field<Self>] = &[
        Field::new(
            "operationId",
            "operation_id",
            |c: &Self| &c.operation_id,
            |c: &mut Self| &mut c.operation_id,
        )
        .required(),
        Field::new("parameters", "parameters", |c: &Self| &c.parameters, |c: &mut Self| &mut c.parameters),
        Field::new(
            "successCriteria",
            "success_criteria",
            |c: &Self| &c.success_criteria,
            |c: &mut Self| &mut c.success_criteria,
        ),
        Field::new("outputs", "outputs", |c: &Self| &c.outputs, |c: &mut Self| &mut c.outputs),
    ];

    fn state(&self) -> &CoreState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CoreState {
        &mut self.state
    }
}

core_model!(OperationCore);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operation {
    pub operation_id: String,
    pub parameters: Vec<Reusable<Parameter>>,
    pub success_criteria: Vec<Criterion>,
    pub outputs: OrderedMap<String, String>,
    pub extensions: OrderedMap<String, Value>,
    core: OperationCore,
}

impl Synchronize for Operation {
    type Core = OperationCore;

    fn populate(core: &Self::Core) -> Self {
        Self {
            operation_id: core.operation_id.populate_or_default(),
            parameters: core.parameters.populate_or_default(),
            success_criteria: core.success_criteria.populate_or_default(),
            outputs: core.outputs.populate_or_default(),
            extensions: core.state.extension_values(),
            core: core.clone(),
        }
    }

    fn synchronize(&self, ctx: &mut SyncContext<'_>, current: Option<(NodeId, &Self::Core)>) -> Result<NodeId, Error> {
        let absent = OperationCore::default();
        let (map, core) = ctx.mapping(current, &absent)?;
        ctx.field(map, "operationId", &core.operation_id, Some(&self.operation_id))?;
        ctx.field(map, "parameters", &core.parameters, Some(&self.parameters))?;
        ctx.field(map, "successCriteria", &core.success_criteria, Some(&self.success_criteria))?;
        ctx.field(map, "outputs", &core.outputs, Some(&self.outputs))?;
        ctx.extensions(map, &core.state.extensions, &self.extensions)?;
        Ok(map)
    }
}

impl Model for Operation {
    fn core(&self) -> &Self::Core {
        &self.core
    }
}

model!(Operation {
    operation_id,
    parameters,
    success_criteria,
    outputs,
    ..extensions
});

// ── Helpers ─────────────────────────────────────────────────────────────────

pub fn registry() -> Registry {
    Registry::builder()
        .register::<OperationCore>()
        .register::<ParameterCore>()
        .register::<CriterionCore>()
        .register::<CriterionExpressionTypeCore>()
        .build()
}

pub fn load<M>(src: &str) -> Unmarshalled<M>
where
    M: Model,
    M::Core: CoreModel,
{
    docmodel::unmarshal::<M>(src.as_bytes(), &registry()).unwrap_or_else(|e| panic!("{src:?}: {e}"))
}
