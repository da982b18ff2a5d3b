//! Pointer evaluation over [`Navigable`] values and raw document trees.

use docmodel_yaml::{Document, NodeId, NodeKind};

use crate::{
    parse_tokens, JsonPointerError, Navigable, StepError, StructView, Structure, Target, Token,
};

/// Upper bound on alternate-node indirections resolved for one step.
const MAX_INDIRECTION: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Field tag matched against key tokens on structs.
    pub struct_tag: String,
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self {
            struct_tag: "key".to_string(),
        }
    }
}

/// Which layer of a two-layer value a walk follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    /// Caller-facing values, as they are now.
    Current,
    /// Decoded values, which know their document nodes.
    Decoded,
}

/// Evaluates pointers. Raw node targets are resolved through `doc`.
#[derive(Debug, Clone, Default)]
pub struct Navigator<'d> {
    doc: Option<&'d Document>,
    options: NavigateOptions,
}

impl<'d> Navigator<'d> {
    pub fn new(doc: &'d Document) -> Self {
        Self {
            doc: Some(doc),
            options: NavigateOptions::default(),
        }
    }

    /// A navigator for values that never lead into a raw tree.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: NavigateOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolves `pointer` against `value`, as the value is now.
    pub fn get<'a>(&self, value: &'a dyn Navigable, pointer: &str) -> Result<Target<'a>, JsonPointerError> {
        let (target, last) = self.walk(value, pointer, Layer::Current)?;
        match target {
            Target::Value(v) => self.settle(v, Layer::Current).map_err(|e| e.at(pointer, &last)),
            node => Ok(node),
        }
    }

    /// Resolves `pointer` to a raw node. Typed targets answer with the node
    /// they were decoded from, so values added since the last decode are
    /// not found.
    pub fn get_node(&self, value: &dyn Navigable, pointer: &str) -> Result<NodeId, JsonPointerError> {
        let (mut current, last) = self.walk(value, pointer, Layer::Decoded)?;
        for _ in 0..MAX_INDIRECTION {
            let v = match current {
                Target::Node(id) => return Ok(id),
                Target::Value(v) => v.decoded().unwrap_or(v),
            };
            if let Some(id) = v.source_node() {
                return Ok(id);
            }
            match v.structure() {
                Structure::Node(id) => return Ok(id),
                Structure::Struct(StructView {
                    root_node: Some(id), ..
                }) => return Ok(id),
                _ => {}
            }
            match v.as_navigable_noder() {
                Some(noder) => current = noder.navigable_node().map_err(|e| e.at(pointer, &last))?,
                None => break,
            }
        }
        Err(JsonPointerError::InvalidPath {
            pointer: pointer.to_string(),
            token: last.to_string(),
            reason: "target is not backed by a document node".to_string(),
        })
    }

    /// Applies every token; the final value is not settled.
    fn walk<'a>(
        &self,
        value: &'a dyn Navigable,
        pointer: &str,
        layer: Layer,
    ) -> Result<(Target<'a>, Token), JsonPointerError> {
        let tokens = parse_tokens(pointer)?;
        let mut current = Target::Value(value);
        for token in &tokens {
            current = self
                .step(current, token, layer)
                .map_err(|e| e.at(pointer, token))?;
        }
        let last = tokens.last().cloned().unwrap_or(Token::Key(String::new()));
        Ok((current, last))
    }

    /// Follows alternate-node capabilities until a plain value or node remains.
    fn settle<'a>(&self, mut value: &'a dyn Navigable, layer: Layer) -> Result<Target<'a>, StepError> {
        for _ in 0..MAX_INDIRECTION {
            if layer == Layer::Decoded {
                value = value.decoded().unwrap_or(value);
            }
            let Some(noder) = value.as_navigable_noder() else {
                return Ok(Target::Value(value));
            };
            match noder.navigable_node()? {
                Target::Value(next) => value = next,
                node => return Ok(node),
            }
        }
        Err(StepError::invalid("alternate-node chain too deep"))
    }

    fn step<'a>(&self, current: Target<'a>, token: &Token, layer: Layer) -> Result<Target<'a>, StepError> {
        let value = match current {
            Target::Node(id) => return self.step_node(id, token),
            Target::Value(v) => match self.settle(v, layer)? {
                Target::Node(id) => return self.step_node(id, token),
                Target::Value(v) => v,
            },
        };

        match token {
            Token::Key(key) => {
                if let Some(nav) = value.as_key_navigable() {
                    return nav.navigate_key(key);
                }
            }
            Token::Index(index) => {
                if let Some(nav) = value.as_index_navigable() {
                    return nav.navigate_index(*index);
                }
            }
        }

        match value.structure() {
            Structure::Null => Err(StepError::NotFound),
            Structure::Leaf => Err(StepError::invalid("cannot navigate into a scalar")),
            Structure::Map(map) => match token {
                Token::Key(key) => map.get_entry(key).map(Target::Value).ok_or(StepError::NotFound),
                Token::Index(_) => Err(StepError::invalid("index token against a map")),
            },
            Structure::Sequence(seq) => match token {
                Token::Index(index) => seq
                    .get_item(*index)
                    .map(Target::Value)
                    .ok_or(StepError::NotFound),
                Token::Key(_) if token.is_overflowed_index() => Err(StepError::NotFound),
                Token::Key(_) => Err(StepError::invalid("key token against a sequence")),
            },
            Structure::Struct(view) => {
                let text = token.as_key();
                let tag = self.options.struct_tag.as_str();
                let field = view
                    .fields
                    .iter()
                    .find(|f| f.tag(tag) == Some(text.as_ref()))
                    .or_else(|| view.fields.iter().find(|f| f.name == text.as_ref()));
                if let Some(field) = field {
                    return Ok(Target::Value(field.value));
                }
                // Decoded extras are node-backed, so the raw walk below finds them.
                let extra = view.extra.filter(|_| layer == Layer::Current);
                if let Some(entry) = extra.and_then(|extra| extra.get_entry(&text)) {
                    return Ok(Target::Value(entry));
                }
                match view.root_node {
                    Some(root) => self.step_node(root, token),
                    None => Err(StepError::NotFound),
                }
            }
            Structure::Node(id) => self.step_node(id, token),
        }
    }

    fn step_node<'a>(&self, id: NodeId, token: &Token) -> Result<Target<'a>, StepError> {
        let doc = self
            .doc
            .ok_or_else(|| StepError::invalid("raw document node reached without a document"))?;
        let id = doc.resolve(id);
        match doc.kind(id) {
            Some(NodeKind::Mapping) => doc
                .get(id, &token.as_key())
                .map(Target::Node)
                .ok_or(StepError::NotFound),
            Some(NodeKind::Sequence) => match token {
                Token::Index(index) => doc.item(id, *index).map(Target::Node).ok_or(StepError::NotFound),
                Token::Key(_) if token.is_overflowed_index() => Err(StepError::NotFound),
                Token::Key(_) => Err(StepError::invalid("key token against a sequence")),
            },
            Some(NodeKind::Scalar) if doc.scalar(id).is_some_and(|s| s.is_null()) => {
                Err(StepError::NotFound)
            }
            Some(NodeKind::Scalar) => Err(StepError::invalid("cannot navigate into a scalar")),
            Some(NodeKind::Alias) | None => Err(StepError::invalid("dangling node handle")),
        }
    }
}

/// Splits a pointer into the parent pointer's tokens and the last token.
fn split_last(pointer: &str) -> Result<(Vec<Token>, Option<Token>), JsonPointerError> {
    let mut tokens = parse_tokens(pointer)?;
    let last = tokens.pop();
    Ok((tokens, last))
}

fn resolve_parent(doc: &Document, pointer: &str, parents: &[Token]) -> Result<NodeId, JsonPointerError> {
    let nav = Navigator::new(doc);
    let mut current = Target::Node(doc.root().ok_or_else(|| JsonPointerError::NotFound {
        pointer: pointer.to_string(),
        token: String::new(),
    })?);
    for token in parents {
        current = nav.step(current, token, Layer::Decoded).map_err(|e| e.at(pointer, token))?;
    }
    current.node().ok_or_else(|| JsonPointerError::InvalidPath {
        pointer: pointer.to_string(),
        token: String::new(),
        reason: "parent is not a document node".to_string(),
    })
}

/// Points the raw node at `pointer` to `value`.
///
/// A missing last key on a mapping is appended; on a sequence the index may
/// equal the length (or be `-`) to append. `/` replaces the root.
pub fn set_node(doc: &mut Document, pointer: &str, value: NodeId) -> Result<(), JsonPointerError> {
    let (parents, last) = split_last(pointer)?;
    let Some(last) = last else {
        doc.set_root(value)?;
        return Ok(());
    };
    let parent = doc.resolve(resolve_parent(doc, pointer, &parents)?);
    match (doc.kind(parent), &last) {
        (Some(NodeKind::Mapping), token) => doc.set_value(parent, &token.as_key(), value)?,
        (Some(NodeKind::Sequence), Token::Index(index)) => {
            let len = doc.child_count(parent);
            if *index == len {
                doc.push_item(parent, value)?;
            } else if *index < len {
                doc.replace_item(parent, *index, value)?;
            } else {
                return Err(StepError::NotFound.at(pointer, &last));
            }
        }
        (Some(NodeKind::Sequence), Token::Key(key)) if key == "-" => doc.push_item(parent, value)?,
        (Some(NodeKind::Sequence), token) if token.is_overflowed_index() => {
            return Err(StepError::NotFound.at(pointer, &last));
        }
        _ => {
            return Err(StepError::invalid("parent cannot hold the token").at(pointer, &last));
        }
    }
    tracing::trace!(pointer, "set node");
    Ok(())
}

/// Removes the raw node at `pointer` from its parent and returns it.
pub fn remove_node(doc: &mut Document, pointer: &str) -> Result<NodeId, JsonPointerError> {
    let (parents, last) = split_last(pointer)?;
    let Some(last) = last else {
        return Err(JsonPointerError::InvalidPath {
            pointer: pointer.to_string(),
            token: String::new(),
            reason: "the root cannot be removed".to_string(),
        });
    };
    let parent = doc.resolve(resolve_parent(doc, pointer, &parents)?);
    let removed = match (doc.kind(parent), &last) {
        (Some(NodeKind::Mapping), token) => doc
            .remove_key(parent, &token.as_key())?
            .ok_or_else(|| StepError::NotFound.at(pointer, &last))?,
        (Some(NodeKind::Sequence), Token::Index(index)) => {
            if *index >= doc.child_count(parent) {
                return Err(StepError::NotFound.at(pointer, &last));
            }
            doc.remove_item(parent, *index)?
        }
        (Some(NodeKind::Sequence), token) if token.is_overflowed_index() => {
            return Err(StepError::NotFound.at(pointer, &last));
        }
        _ => return Err(StepError::invalid("parent cannot hold the token").at(pointer, &last)),
    };
    tracing::trace!(pointer, "removed node");
    Ok(removed)
}
