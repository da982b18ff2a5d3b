//! Typed, lossless document models.
//!
//! `docmodel` turns a YAML or JSON document into a pair of models per entity.
//! The core model mirrors the tree and the high-level model is what callers
//! edit. Writing back changes only what was edited:
//!
//! ```ignore
//! let registry = Registry::builder().register::<TagCore>().build();
//! let Unmarshalled { mut model, mut document, findings } =
//!     unmarshal::<Tag>(bytes, &registry)?;
//! model.description = Some("updated".into());
//! let out = marshal(&mut model, &mut document, &registry, &EncodeOptions::default())?;
//! ```
//!
//! The pieces live in their own crates and are re-exported here:
//!
//! - [`yaml`]: the document tree, parser and emitter;
//! - [`pointer`]: RFC 6901 pointers and the navigator;
//! - [`ordered_map`]: the ordered map behind keyed collections;
//! - the engine itself (`Node`, model traits, unions, registry).

pub use docmodel_json_pointer as pointer;
pub use docmodel_ordered_map as ordered_map;
pub use docmodel_yaml as yaml;

pub use docmodel_marshaller::{
    core_model, decode, locate, marshal, model, model_view, remove_node, set_node, struct_view, unmarshal, CoreModel,
    CoreState, DecodeContext, Either, Error, Field, FieldSlot, Finding, FindingKind, Marshalled, Model, Node,
    Reference, ReferenceCore, Registry, RegistryBuilder, Reusable, SyncContext, Synchronize, Unmarshal, Unmarshalled,
    EXTENSION_PREFIX, REFERENCE_KEY,
};
pub use docmodel_json_pointer::{JsonPointerError, NavigateOptions, Navigator};
pub use docmodel_ordered_map::{Order, OrderedMap};
pub use docmodel_yaml::{Document, EncodeOptions, Format, NodeId, QuoteStyle};
