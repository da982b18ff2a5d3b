//! Structural decode: document tree to core models.

use std::collections::HashMap;

use docmodel_ordered_map::OrderedMap;
use docmodel_yaml::{Document, NodeId, NodeKind, ScalarType};
use regex::Regex;
use serde_json::Value;

use crate::finding::{Finding, FindingKind};
use crate::model::CoreModel;
use crate::registry::Registry;
use crate::{Error, Node};

/// Prefix of extension keys.
pub const EXTENSION_PREFIX: &str = "x-";

/// Something the engine can build from a document node.
///
/// Data problems are reported to the context as findings and a best-effort
/// value is returned. `Err` is reserved for fatal errors.
pub trait Unmarshal: Sized {
    fn unmarshal(ctx: &mut DecodeContext<'_>, node: NodeId) -> Result<Self, Error>;

    /// Whether `node` has the shape this type decodes from.
    fn accepts(doc: &Document, node: NodeId) -> bool;

    /// Shape name used in mismatch messages.
    fn expected() -> String;

    fn as_text(&self) -> Option<&str> {
        None
    }
}

/// State shared by one decode pass.
pub struct DecodeContext<'d> {
    doc: &'d Document,
    registry: &'d Registry,
    findings: Vec<Finding>,
    failed: bool,
    patterns: HashMap<&'static str, Regex>,
}

impl<'d> DecodeContext<'d> {
    pub fn new(doc: &'d Document, registry: &'d Registry) -> Self {
        Self {
            doc,
            registry,
            findings: Vec::new(),
            failed: false,
            patterns: HashMap::new(),
        }
    }

    pub fn document(&self) -> &'d Document {
        self.doc
    }

    pub fn registry(&self) -> &'d Registry {
        self.registry
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    /// Records a finding. Anything but an unknown property fails the
    /// current scope.
    pub fn report(&mut self, kind: FindingKind, node: Option<NodeId>, message: impl Into<String>) {
        let finding = Finding {
            kind,
            message: message.into(),
            node,
            position: node.and_then(|n| self.doc.position(n)),
        };
        tracing::debug!(
            kind = finding.kind.as_str(),
            node = ?finding.node,
            line = finding.position.map(|p| p.line),
            column = finding.position.map(|p| p.column),
            "{}",
            finding.message
        );
        if finding.is_decode_failure() {
            self.failed = true;
        }
        self.findings.push(finding);
    }

    /// Reports that `node` does not have the `expected` shape.
    pub fn mismatch(&mut self, node: NodeId, expected: &str) {
        let found = describe(self.doc, node);
        self.report(
            FindingKind::TypeMismatch,
            Some(node),
            format!("expected {expected}, found {found}"),
        );
    }

    /// Marks the current scope as failed without a finding.
    pub fn fail(&mut self) {
        self.failed = true;
    }

    /// Runs `f` in a fresh validity scope. Returns its value and whether no
    /// failure was reported inside the scope. The outer scope is untouched.
    pub fn scope<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R, Error>) -> Result<(R, bool), Error> {
        let outer = std::mem::replace(&mut self.failed, false);
        let result = f(self);
        let valid = !self.failed;
        self.failed = outer;
        result.map(|r| (r, valid))
    }

    /// Decodes a core model from `node`.
    ///
    /// The model comes from the registry. A non-mapping node is a type
    /// mismatch in the caller's scope and yields an empty model with
    /// `valid_yaml == false`.
    pub fn decode_model<C: CoreModel>(&mut self, node: NodeId) -> Result<C, Error> {
        let doc = self.doc;
        let mut core: C = self.registry.instantiate()?;
        core.state_mut().root_node = Some(node);
        let map = doc.resolve(node);
        if !doc.is_mapping(map) {
            self.mismatch(node, "mapping");
            return Ok(core);
        }

        let (fields_valid, scope_valid) = self.scope(|ctx| {
            for field in C::FIELDS {
                match doc.get_entry(map, field.key) {
                    Some((key_node, value_node)) => {
                        let slot = (field.get_mut)(&mut core);
                        slot.decode(ctx, field.key, key_node, value_node)?;
                        if let Some(pattern) = field.pattern {
                            ctx.check_pattern(pattern, field.key, slot, value_node)?;
                        }
                    }
                    None if field.required => ctx.report(
                        FindingKind::RequiredFieldMissing,
                        Some(node),
                        format!("missing required field `{}`", field.key),
                    ),
                    None => {}
                }
            }
            ctx.decode_extras(&mut core, map)?;
            Ok(C::FIELDS.iter().all(|f| (f.get)(&core).is_valid()))
        })?;

        let state = core.state_mut();
        state.valid_yaml = true;
        state.valid = fields_valid && scope_valid;
        Ok(core)
    }

    /// Extensions go to the core; other undeclared keys are tolerated.
    fn decode_extras<C: CoreModel>(&mut self, core: &mut C, map: NodeId) -> Result<(), Error> {
        let doc = self.doc;
        for (key_node, value_node) in doc.merged_pairs(map) {
            let Some(key) = doc.key_str(key_node) else {
                continue;
            };
            if key.starts_with(EXTENSION_PREFIX) {
                let ext = Node::<Value>::decode(self, Some((key, key_node)), value_node)?;
                core.state_mut().extensions.set(key.to_string(), ext);
            } else if !C::FIELDS.iter().any(|f| f.key == key) {
                self.report(
                    FindingKind::UnknownProperty,
                    Some(key_node),
                    format!("unknown property `{key}`"),
                );
            }
        }
        Ok(())
    }

    fn check_pattern(
        &mut self,
        pattern: &'static str,
        key: &str,
        slot: &mut dyn crate::model::FieldSlot,
        node: NodeId,
    ) -> Result<(), Error> {
        let Some(text) = slot.text() else {
            return Ok(());
        };
        if !self.patterns.contains_key(pattern) {
            let compiled = Regex::new(pattern).map_err(|source| Error::Pattern { pattern, source })?;
            self.patterns.insert(pattern, compiled);
        }
        let matched = self.patterns.get(pattern).is_some_and(|re| re.is_match(text));
        if !matched {
            let message = format!("`{key}` value `{text}` does not match `{pattern}`");
            slot.invalidate();
            self.report(FindingKind::PatternMismatch, Some(node), message);
        }
        Ok(())
    }
}

/// Shape of `node` for messages.
pub(crate) fn describe(doc: &Document, node: NodeId) -> &'static str {
    match doc.resolved_kind(node) {
        Some(NodeKind::Mapping) => "mapping",
        Some(NodeKind::Sequence) => "sequence",
        Some(NodeKind::Scalar) => doc.scalar(node).map_or("scalar", |s| s.kind.as_str()),
        Some(NodeKind::Alias) | None => "nothing",
    }
}

fn is_null(doc: &Document, node: NodeId) -> bool {
    doc.scalar(node).is_some_and(|s| s.is_null())
}

// ── Primitives ──────────────────────────────────────────────────────────────

impl Unmarshal for String {
    /// Any scalar decodes as its text; `null` as the empty string.
    fn unmarshal(ctx: &mut DecodeContext<'_>, node: NodeId) -> Result<Self, Error> {
        match ctx.document().scalar(node) {
            Some(s) if s.is_null() => Ok(String::new()),
            Some(s) => Ok(s.value.clone()),
            None => {
                ctx.mismatch(node, "string");
                Ok(String::new())
            }
        }
    }

    fn accepts(doc: &Document, node: NodeId) -> bool {
        doc.is_scalar(node)
    }

    fn expected() -> String {
        "string".to_string()
    }

    fn as_text(&self) -> Option<&str> {
        Some(self)
    }
}

macro_rules! typed_scalar {
    ($t:ty, $name:literal, [$($kind:ident),+], $parse:expr) => {
        impl Unmarshal for $t {
            fn unmarshal(ctx: &mut DecodeContext<'_>, node: NodeId) -> Result<Self, Error> {
                let doc = ctx.document();
                if is_null(doc, node) {
                    return Ok(<$t>::default());
                }
                let parsed = doc
                    .scalar(node)
                    .filter(|s| matches!(s.kind, $(ScalarType::$kind)|+))
                    .and_then(|s| $parse(s.value.as_str()));
                match parsed {
                    Some(value) => Ok(value),
                    None => {
                        ctx.mismatch(node, $name);
                        Ok(<$t>::default())
                    }
                }
            }

            fn accepts(doc: &Document, node: NodeId) -> bool {
                doc.scalar(node)
                    .is_some_and(|s| matches!(s.kind, ScalarType::Null $(| ScalarType::$kind)+))
            }

            fn expected() -> String {
                $name.to_string()
            }
        }
    };
}

typed_scalar!(bool, "bool", [Bool], docmodel_yaml::scalar::parse_bool);
typed_scalar!(i64, "int", [Int], docmodel_yaml::scalar::parse_int);
typed_scalar!(f64, "number", [Int, Float], docmodel_yaml::scalar::parse_float);

impl Unmarshal for Value {
    /// Aliases and merge keys are resolved into plain JSON.
    fn unmarshal(ctx: &mut DecodeContext<'_>, node: NodeId) -> Result<Self, Error> {
        Ok(ctx.document().to_json(node))
    }

    fn accepts(_doc: &Document, _node: NodeId) -> bool {
        true
    }

    fn expected() -> String {
        "any value".to_string()
    }
}

// ── Collections ─────────────────────────────────────────────────────────────

impl<T: Unmarshal> Unmarshal for Vec<Node<T>> {
    fn unmarshal(ctx: &mut DecodeContext<'_>, node: NodeId) -> Result<Self, Error> {
        let doc = ctx.document();
        if is_null(doc, node) {
            return Ok(Vec::new());
        }
        if !doc.is_sequence(node) {
            ctx.mismatch(node, "sequence");
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(doc.child_count(node));
        for item in doc.items(node) {
            let element = Node::<T>::decode(ctx, None, item)?;
            if !element.valid {
                ctx.fail();
            }
            out.push(element);
        }
        Ok(out)
    }

    fn accepts(doc: &Document, node: NodeId) -> bool {
        doc.is_sequence(node)
    }

    fn expected() -> String {
        format!("sequence of {}", T::expected())
    }
}

impl<T: Unmarshal> Unmarshal for OrderedMap<String, Node<T>> {
    /// Keys in document order, merge keys expanded.
    fn unmarshal(ctx: &mut DecodeContext<'_>, node: NodeId) -> Result<Self, Error> {
        let doc = ctx.document();
        if is_null(doc, node) {
            return Ok(OrderedMap::new());
        }
        if !doc.is_mapping(node) {
            ctx.mismatch(node, "mapping");
            return Ok(OrderedMap::new());
        }
        let mut out = OrderedMap::new();
        for (key_node, value_node) in doc.merged_pairs(node) {
            let Some(key) = doc.key_str(key_node) else {
                ctx.mismatch(key_node, "scalar key");
                continue;
            };
            let element = Node::<T>::decode(ctx, Some((key, key_node)), value_node)?;
            if !element.valid {
                ctx.fail();
            }
            out.set(key.to_string(), element);
        }
        Ok(out)
    }

    fn accepts(doc: &Document, node: NodeId) -> bool {
        doc.is_mapping(node)
    }

    fn expected() -> String {
        format!("mapping of {}", T::expected())
    }
}
