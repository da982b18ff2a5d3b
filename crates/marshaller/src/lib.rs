//! Typed models over lossless document trees.
//!
//! Every entity is a pair of types:
//!
//! - a **core** model mirrors the tree one to one. It has a [`Node`] per
//!   declared key, extensions and validity flags, and it is only ever built by
//!   [`DecodeContext::decode_model`];
//! - a **high-level** model exposes plain fields and owns its core.
//!
//! [`unmarshal`] parses bytes, decodes the core and populates the high-level
//! model. [`marshal`] writes high-level changes back into the tree. Untouched
//! subtrees keep their bytes. It then re-decodes so the model's core is
//! fresh.
//!
//! Decode problems are [`Finding`]s returned next to the result. Only caller
//! mistakes and unregistered types are [`Error`]s.

mod decode;
mod error;
mod finding;
mod model;
mod node;
mod registry;
mod sync;
mod union;

pub use docmodel_json_pointer as pointer;
pub use docmodel_ordered_map as ordered_map;
pub use docmodel_yaml as yaml;

pub use docmodel_json_pointer::{remove_node, set_node};

pub use decode::{DecodeContext, Unmarshal, EXTENSION_PREFIX};
pub use error::Error;
pub use finding::{Finding, FindingKind};
pub use model::{model_view, struct_view, CoreModel, CoreState, Field, FieldSlot, Model};
pub use node::Node;
pub use registry::{Registry, RegistryBuilder};
pub use sync::{SyncContext, Synchronize};
pub use union::{Either, Reference, ReferenceCore, Reusable, REFERENCE_KEY};

use docmodel_json_pointer::{Navigable, Navigator};
use docmodel_yaml::{Document, EncodeOptions, NodeId};

/// Result of [`unmarshal`].
#[derive(Debug)]
pub struct Unmarshalled<M> {
    pub model: M,
    pub document: Document,
    pub findings: Vec<Finding>,
}

/// Result of [`marshal`].
#[derive(Debug)]
pub struct Marshalled {
    pub bytes: Vec<u8>,
    /// Findings of the re-decode that follows synchronization.
    pub findings: Vec<Finding>,
}

/// Decodes the core model at the root of `doc`.
///
/// An empty document decodes to an empty core with `valid_yaml == false`.
pub fn decode<C: CoreModel>(doc: &Document, registry: &Registry) -> Result<(C, Vec<Finding>), Error> {
    let mut ctx = DecodeContext::new(doc, registry);
    let core = match doc.root() {
        Some(root) => ctx.decode_model::<C>(root)?,
        None => {
            ctx.report(FindingKind::TypeMismatch, None, "expected mapping, found empty document");
            registry.instantiate::<C>()?
        }
    };
    Ok((core, ctx.into_findings()))
}

/// Parses `bytes` (YAML or JSON) into a high-level model.
pub fn unmarshal<M>(bytes: &[u8], registry: &Registry) -> Result<Unmarshalled<M>, Error>
where
    M: Model,
    M::Core: CoreModel,
{
    let document = Document::from_slice(bytes)?;
    let (core, findings) = decode::<M::Core>(&document, registry)?;
    tracing::debug!(findings = findings.len(), valid = core.state().valid, "unmarshalled document");
    Ok(Unmarshalled {
        model: M::populate(&core),
        document,
        findings,
    })
}

/// Writes `model` into `doc` and encodes the result.
///
/// The model must come from `doc` (or be new, with no root node). After the
/// write the model is rebuilt from the tree, so its core reflects the output.
pub fn marshal<M>(
    model: &mut M,
    doc: &mut Document,
    registry: &Registry,
    options: &EncodeOptions,
) -> Result<Marshalled, Error>
where
    M: Model,
    M::Core: CoreModel,
{
    let core = model.core();
    let current = match core.state().root_node {
        Some(root) if !doc.contains(root) => {
            return Err(Error::InvalidTarget {
                reason: format!("root node {root} is not part of the document"),
            });
        }
        Some(root) => Some((root, core)),
        None => None,
    };
    let node = model.synchronize(&mut SyncContext::new(doc), current)?;
    if doc.root() != Some(node) {
        doc.set_root(node)?;
    }

    let (core, findings) = decode::<M::Core>(doc, registry)?;
    *model = M::populate(&core);
    tracing::debug!(findings = findings.len(), "marshalled document");
    Ok(Marshalled {
        bytes: doc.to_bytes(options),
        findings,
    })
}

/// Locates the document node behind `pointer` in a model or raw value.
pub fn locate(doc: &Document, value: &dyn Navigable, pointer: &str) -> Result<NodeId, Error> {
    Ok(Navigator::new(doc).get_node(value, pointer)?)
}
