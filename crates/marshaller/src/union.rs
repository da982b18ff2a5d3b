//! Shape-driven unions.
//!
//! Both unions are sum types, so a value is always exactly one alternative.
//! The same enums serve both layers: a core model holds
//! `Either<String, FooCore>` where its high-level model holds
//! `Either<String, Foo>`.

use docmodel_json_pointer::{Navigable, NavigableNoder, StepError, Structure, Target};
use docmodel_yaml::{Document, NodeId};

use crate::decode::{DecodeContext, Unmarshal};
use crate::model::{CoreModel, CoreState, Field, Model};
use crate::sync::{SyncContext, Synchronize};
use crate::{Error, Node};

/// Reserved key that turns a mapping into a reference.
pub const REFERENCE_KEY: &str = "reference";

// ── Either ──────────────────────────────────────────────────────────────────

/// One of two independently typed alternatives.
///
/// Decode tries the left shape first, then the right one. Encode follows
/// whichever alternative is populated.
#[derive(Debug, Clone, PartialEq)]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}

impl<L: Default, R> Default for Either<L, R> {
    fn default() -> Self {
        Either::Left(L::default())
    }
}

impl<L, R> Either<L, R> {
    pub fn is_left(&self) -> bool {
        matches!(self, Either::Left(_))
    }

    pub fn is_right(&self) -> bool {
        matches!(self, Either::Right(_))
    }

    pub fn left(&self) -> Option<&L> {
        match self {
            Either::Left(l) => Some(l),
            Either::Right(_) => None,
        }
    }

    pub fn right(&self) -> Option<&R> {
        match self {
            Either::Right(r) => Some(r),
            Either::Left(_) => None,
        }
    }
}

impl<L: Unmarshal + Default, R: Unmarshal> Unmarshal for Either<L, R> {
    fn unmarshal(ctx: &mut DecodeContext<'_>, node: NodeId) -> Result<Self, Error> {
        let doc = ctx.document();
        if L::accepts(doc, node) {
            return L::unmarshal(ctx, node).map(Either::Left);
        }
        if R::accepts(doc, node) {
            return R::unmarshal(ctx, node).map(Either::Right);
        }
        ctx.mismatch(node, &Self::expected());
        Ok(Either::default())
    }

    fn accepts(doc: &Document, node: NodeId) -> bool {
        L::accepts(doc, node) || R::accepts(doc, node)
    }

    fn expected() -> String {
        format!("{} or {}", L::expected(), R::expected())
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Either::Left(l) => l.as_text(),
            Either::Right(r) => r.as_text(),
        }
    }
}

impl<L: Synchronize, R: Synchronize> Synchronize for Either<L, R> {
    type Core = Either<L::Core, R::Core>;

    fn populate(core: &Self::Core) -> Self {
        match core {
            Either::Left(l) => Either::Left(L::populate(l)),
            Either::Right(r) => Either::Right(R::populate(r)),
        }
    }

    /// Switching alternatives writes a fresh node of the new shape.
    fn synchronize(&self, ctx: &mut SyncContext<'_>, current: Option<(NodeId, &Self::Core)>) -> Result<NodeId, Error> {
        match (self, current) {
            (Either::Left(l), Some((node, Either::Left(core)))) => l.synchronize(ctx, Some((node, core))),
            (Either::Right(r), Some((node, Either::Right(core)))) => r.synchronize(ctx, Some((node, core))),
            (Either::Left(l), _) => l.synchronize(ctx, None),
            (Either::Right(r), _) => r.synchronize(ctx, None),
        }
    }
}

impl<L: Navigable, R: Navigable> Navigable for Either<L, R> {
    fn structure(&self) -> Structure<'_> {
        match self {
            Either::Left(l) => l.structure(),
            Either::Right(r) => r.structure(),
        }
    }

    fn source_node(&self) -> Option<NodeId> {
        match self {
            Either::Left(l) => l.source_node(),
            Either::Right(r) => r.source_node(),
        }
    }

    fn as_navigable_noder(&self) -> Option<&dyn NavigableNoder> {
        Some(self)
    }
}

impl<L: Navigable, R: Navigable> NavigableNoder for Either<L, R> {
    fn navigable_node(&self) -> Result<Target<'_>, StepError> {
        Ok(match self {
            Either::Left(l) => Target::Value(l),
            Either::Right(r) => Target::Value(r),
        })
    }
}

// ── Reference ───────────────────────────────────────────────────────────────

/// Core of a `{reference, value}` mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceCore {
    pub reference: Node<String>,
    pub value: Node<String>,
    pub state: CoreState,
}

impl CoreModel for ReferenceCore {
    const FIELDS: &'static [Field<Self>] = &[
        Field::new(
            REFERENCE_KEY,
            "reference",
            |c: &Self| &c.reference,
            |c: &mut Self| &mut c.reference,
        )
        .required(),
        Field::new("value", "value", |c: &Self| &c.value, |c: &mut Self| &mut c.value),
    ];

    fn state(&self) -> &CoreState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CoreState {
        &mut self.state
    }
}

crate::core_model!(ReferenceCore);

/// A reference to a reusable object defined elsewhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reference {
    pub reference: String,
    /// Optional sibling value carried next to the reference.
    pub value: Option<String>,
    core: ReferenceCore,
}

impl Reference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Self::default()
        }
    }
}

impl Synchronize for Reference {
    type Core = ReferenceCore;

    fn populate(core: &ReferenceCore) -> Self {
        Self {
            reference: core.reference.populate_or_default(),
            value: core.value.populate(),
            core: core.clone(),
        }
    }

    fn synchronize(&self, ctx: &mut SyncContext<'_>, current: Option<(NodeId, &ReferenceCore)>) -> Result<NodeId, Error> {
        let absent = ReferenceCore::default();
        let (map, core) = ctx.mapping(current, &absent)?;
        ctx.field(map, REFERENCE_KEY, &core.reference, Some(&self.reference))?;
        ctx.field(map, "value", &core.value, self.value.as_ref())?;
        Ok(map)
    }
}

impl Model for Reference {
    fn core(&self) -> &ReferenceCore {
        &self.core
    }
}

crate::model!(Reference { reference, value });

// ── Reusable ────────────────────────────────────────────────────────────────

/// A reference or an inline object.
///
/// A mapping with a `reference` key decodes as [`Reusable::Reference`];
/// any other mapping decodes inline as `T`. `Ref` is [`ReferenceCore`] on
/// the core side and [`Reference`] on the high-level side.
#[derive(Debug, Clone, PartialEq)]
pub enum Reusable<T, Ref = Reference> {
    Reference(Ref),
    Inline(T),
}

impl<T: Default, Ref> Default for Reusable<T, Ref> {
    fn default() -> Self {
        Reusable::Inline(T::default())
    }
}

impl<T, Ref> Reusable<T, Ref> {
    pub fn is_reference(&self) -> bool {
        matches!(self, Reusable::Reference(_))
    }

    pub fn reference(&self) -> Option<&Ref> {
        match self {
            Reusable::Reference(r) => Some(r),
            Reusable::Inline(_) => None,
        }
    }

    pub fn inline(&self) -> Option<&T> {
        match self {
            Reusable::Inline(t) => Some(t),
            Reusable::Reference(_) => None,
        }
    }
}

impl<T: Unmarshal + Default> Unmarshal for Reusable<T, ReferenceCore> {
    fn unmarshal(ctx: &mut DecodeContext<'_>, node: NodeId) -> Result<Self, Error> {
        let doc = ctx.document();
        if !doc.is_mapping(node) {
            ctx.mismatch(node, &Self::expected());
            return Ok(Reusable::default());
        }
        if doc.get(node, REFERENCE_KEY).is_some() {
            ctx.decode_model::<ReferenceCore>(node).map(Reusable::Reference)
        } else {
            T::unmarshal(ctx, node).map(Reusable::Inline)
        }
    }

    fn accepts(doc: &Document, node: NodeId) -> bool {
        doc.is_mapping(node)
    }

    fn expected() -> String {
        format!("reference or {}", T::expected())
    }
}

impl<T: Synchronize> Synchronize for Reusable<T, Reference> {
    type Core = Reusable<T::Core, ReferenceCore>;

    fn populate(core: &Self::Core) -> Self {
        match core {
            Reusable::Reference(r) => Reusable::Reference(Reference::populate(r)),
            Reusable::Inline(t) => Reusable::Inline(T::populate(t)),
        }
    }

    fn synchronize(&self, ctx: &mut SyncContext<'_>, current: Option<(NodeId, &Self::Core)>) -> Result<NodeId, Error> {
        match (self, current) {
            (Reusable::Reference(r), Some((node, Reusable::Reference(core)))) => {
                r.synchronize(ctx, Some((node, core)))
            }
            (Reusable::Inline(t), Some((node, Reusable::Inline(core)))) => t.synchronize(ctx, Some((node, core))),
            (Reusable::Reference(r), _) => r.synchronize(ctx, None),
            (Reusable::Inline(t), _) => t.synchronize(ctx, None),
        }
    }
}

impl<T: Navigable, Ref: Navigable> Navigable for Reusable<T, Ref> {
    fn structure(&self) -> Structure<'_> {
        match self {
            Reusable::Reference(r) => r.structure(),
            Reusable::Inline(t) => t.structure(),
        }
    }

    fn source_node(&self) -> Option<NodeId> {
        match self {
            Reusable::Reference(r) => r.source_node(),
            Reusable::Inline(t) => t.source_node(),
        }
    }

    fn as_navigable_noder(&self) -> Option<&dyn NavigableNoder> {
        Some(self)
    }
}

impl<T: Navigable, Ref: Navigable> NavigableNoder for Reusable<T, Ref> {
    fn navigable_node(&self) -> Result<Target<'_>, StepError> {
        Ok(match self {
            Reusable::Reference(r) => Target::Value(r),
            Reusable::Inline(t) => Target::Value(t),
        })
    }
}
