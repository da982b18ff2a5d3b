//! Change synchronization: high-level values back into the document tree.
//!
//! Every [`Synchronize::synchronize`] call receives the node and core the
//! value was last decoded from (if any) and returns the node that now holds
//! the value. Returning the same node means it was kept or edited in place;
//! a different node is spliced into the parent by the caller.

use docmodel_json_pointer::Navigable;
use docmodel_ordered_map::OrderedMap;
use docmodel_yaml::{Document, NodeId, NodeKind, Scalar};
use serde_json::Value;

use crate::{Error, Node};

/// A high-level value that can be built from, and written back to, its core.
pub trait Synchronize {
    type Core;

    fn populate(core: &Self::Core) -> Self;

    fn synchronize(&self, ctx: &mut SyncContext<'_>, current: Option<(NodeId, &Self::Core)>) -> Result<NodeId, Error>;

    /// Zero values are not written for keys that were absent.
    fn is_zero(&self) -> bool {
        false
    }
}

pub struct SyncContext<'d> {
    doc: &'d mut Document,
}

impl<'d> SyncContext<'d> {
    pub fn new(doc: &'d mut Document) -> Self {
        Self { doc }
    }

    pub fn document(&mut self) -> &mut Document {
        self.doc
    }

    /// The mapping to write an entity into: the current one when it still is
    /// a mapping, a new one otherwise. The returned core is `absent` for new
    /// mappings so every field counts as previously absent.
    pub fn mapping<'c, C>(
        &mut self,
        current: Option<(NodeId, &'c C)>,
        absent: &'c C,
    ) -> Result<(NodeId, &'c C), Error> {
        if let Some((node, core)) = current {
            if self.doc.is_mapping(node) {
                return Ok((node, core));
            }
        }
        Ok((self.doc.new_mapping(), absent))
    }

    /// Like [`SyncContext::mapping`], for sequences.
    pub fn sequence(&mut self, current: Option<NodeId>) -> NodeId {
        match current {
            Some(node) if self.doc.is_sequence(node) => node,
            _ => self.doc.new_sequence(),
        }
    }

    /// Writes one mapping field.
    ///
    /// `None` clears the field, removing its pair. A changed value is spliced
    /// in at the pair's position; a value for an absent key is appended unless
    /// it is the zero value.
    pub fn field<H: Synchronize>(
        &mut self,
        map: NodeId,
        key: &str,
        current: &Node<H::Core>,
        value: Option<&H>,
    ) -> Result<(), Error> {
        let map = self.mapping_node(map)?;
        match (value, current.current()) {
            (None, None) => {}
            (None, Some(_)) => {
                if self.doc.remove_key(map, key)?.is_some() {
                    tracing::trace!(key, "removed field");
                }
            }
            (Some(value), None) => {
                if !value.is_zero() {
                    let node = value.synchronize(self, None)?;
                    self.doc.set_value(map, key, node)?;
                    tracing::trace!(key, "appended field");
                }
            }
            (Some(value), Some((old, core))) => {
                let node = value.synchronize(self, Some((old, core)))?;
                if node != old {
                    self.doc.set_value(map, key, node)?;
                    tracing::trace!(key, "replaced field");
                }
            }
        }
        Ok(())
    }

    /// Writes keyed entries into `map`: stale keys are removed, kept keys are
    /// synchronized in place and new keys are appended. Existing pairs keep
    /// their document order.
    pub fn entries<H: Synchronize>(
        &mut self,
        map: NodeId,
        current: &OrderedMap<String, Node<H::Core>>,
        values: &OrderedMap<String, H>,
    ) -> Result<(), Error> {
        let map = self.mapping_node(map)?;
        for (key, _) in current.all() {
            if !values.has(key) && self.doc.remove_key(map, key)?.is_some() {
                tracing::trace!(key = key.as_str(), "removed entry");
            }
        }
        for (key, value) in values.all() {
            match current.get(key).and_then(Node::current) {
                Some((old, core)) => {
                    let node = value.synchronize(self, Some((old, core)))?;
                    if node != old {
                        self.doc.set_value(map, key, node)?;
                        tracing::trace!(key = key.as_str(), "replaced entry");
                    }
                }
                None => {
                    let node = value.synchronize(self, None)?;
                    self.doc.set_value(map, key, node)?;
                    tracing::trace!(key = key.as_str(), "appended entry");
                }
            }
        }
        Ok(())
    }

    /// Writes `x-` extensions of an entity.
    pub fn extensions(
        &mut self,
        map: NodeId,
        current: &OrderedMap<String, Node<Value>>,
        values: &OrderedMap<String, Value>,
    ) -> Result<(), Error> {
        self.entries(map, current, values)
    }

    fn mapping_node(&self, map: NodeId) -> Result<NodeId, Error> {
        let resolved = self.doc.resolve(map);
        match self.doc.kind(resolved) {
            Some(NodeKind::Mapping) => Ok(resolved),
            _ => Err(Error::NotAMapping { node: map }),
        }
    }

    fn scalar(&mut self, current: Option<NodeId>, unchanged: bool, scalar: impl FnOnce() -> Scalar) -> NodeId {
        match current {
            Some(node) if unchanged => node,
            _ => self.doc.new_scalar(scalar()),
        }
    }
}

// ── Primitives ──────────────────────────────────────────────────────────────

macro_rules! scalar_sync {
    ($t:ty, $build:expr, $zero:expr) => {
        impl Synchronize for $t {
            type Core = $t;

            fn populate(core: &$t) -> Self {
                core.clone()
            }

            fn synchronize(&self, ctx: &mut SyncContext<'_>, current: Option<(NodeId, &$t)>) -> Result<NodeId, Error> {
                let unchanged = current.is_some_and(|(_, core)| core == self);
                Ok(ctx.scalar(current.map(|(n, _)| n), unchanged, || $build(self)))
            }

            fn is_zero(&self) -> bool {
                $zero(self)
            }
        }
    };
}

scalar_sync!(String, |s: &String| Scalar::string(s.as_str()), |s: &String| s.is_empty());
scalar_sync!(bool, |b: &bool| Scalar::bool(*b), |b: &bool| !*b);
scalar_sync!(i64, |i: &i64| Scalar::int(*i), |i: &i64| *i == 0);
scalar_sync!(f64, |f: &f64| Scalar::float(*f), |f: &f64| *f == 0.0);

impl Synchronize for Value {
    type Core = Value;

    fn populate(core: &Value) -> Self {
        core.clone()
    }

    fn synchronize(&self, ctx: &mut SyncContext<'_>, current: Option<(NodeId, &Value)>) -> Result<NodeId, Error> {
        match current {
            Some((node, core)) if core == self => Ok(node),
            _ => Ok(ctx.doc.from_json(self)),
        }
    }

    fn is_zero(&self) -> bool {
        self.is_null()
    }
}

// ── Collections ─────────────────────────────────────────────────────────────

/// Element-wise by position: changed items are spliced, extra items appended
/// and surplus items removed from the end.
/// Items pair with the old item they were decoded from; values that know no
/// source node pair by position with an old item nobody else claimed.
impl<H: Synchronize + Navigable> Synchronize for Vec<H> {
    type Core = Vec<Node<H::Core>>;

    fn populate(core: &Self::Core) -> Self {
        core.iter().map(|n| H::populate(&n.value)).collect()
    }

    fn synchronize(&self, ctx: &mut SyncContext<'_>, current: Option<(NodeId, &Self::Core)>) -> Result<NodeId, Error> {
        let seq = ctx.sequence(current.map(|(n, _)| n));
        let old: &[Node<H::Core>] = match current {
            Some((node, core)) if node == seq => core,
            _ => &[],
        };

        let mut claimed = vec![false; old.len()];
        let mut pairs: Vec<Option<usize>> = vec![None; self.len()];
        for (value, pair) in self.iter().zip(pairs.iter_mut()) {
            let Some(source) = value.source_node() else {
                continue;
            };
            if let Some(index) = old.iter().position(|n| n.value_node == Some(source)) {
                if !claimed[index] {
                    claimed[index] = true;
                    *pair = Some(index);
                }
            }
        }
        for (index, value) in self.iter().enumerate() {
            if value.source_node().is_none() && claimed.get(index) == Some(&false) {
                claimed[index] = true;
                pairs[index] = Some(index);
            }
        }

        let mut items = Vec::with_capacity(self.len());
        for (index, (value, pair)) in self.iter().zip(&pairs).enumerate() {
            let prev = pair.and_then(|i| old[i].current());
            let node = value.synchronize(ctx, prev)?;
            match prev {
                Some((prev, _)) if prev == node => {}
                Some(_) => tracing::trace!(index, "replaced item"),
                None => tracing::trace!(index, "new item"),
            }
            items.push((node, prev.map(|(n, _)| n)));
        }
        let removed = claimed.iter().filter(|c| !**c).count();
        if removed > 0 {
            tracing::trace!(removed, "removed items");
        }
        ctx.doc.set_items(seq, &items)?;
        Ok(seq)
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<H: Synchronize> Synchronize for OrderedMap<String, H> {
    type Core = OrderedMap<String, Node<H::Core>>;

    fn populate(core: &Self::Core) -> Self {
        core.all().map(|(k, n)| (k.clone(), H::populate(&n.value))).collect()
    }

    fn synchronize(&self, ctx: &mut SyncContext<'_>, current: Option<(NodeId, &Self::Core)>) -> Result<NodeId, Error> {
        let absent = OrderedMap::new();
        let (map, core) = ctx.mapping(current, &absent)?;
        ctx.entries(map, core, self)?;
        Ok(map)
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}
