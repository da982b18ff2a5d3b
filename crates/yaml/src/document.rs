//! The document: a node arena plus the source text it was parsed from.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Number, Value};

use crate::error::{EditError, ParseError};
use crate::node::{
    Collection, CollectionStyle, Item, NodeData, NodeId, NodeKind, NodeValue, Pair, Position,
    Scalar, ScalarStyle, ScalarType, Span,
};
use crate::options::{EncodeOptions, Format};
use crate::parser::{self, LineIndex};
use crate::scalar::{parse_bool, parse_float, parse_int};

const DEFAULT_INDENT: usize = 2;
const MAX_DETECTED_INDENT: usize = 8;

/// A YAML or JSON document.
///
/// Parsed documents keep their source so that [`Document::encode`] can
/// reproduce untouched regions byte for byte. Nodes are addressed by
/// [`NodeId`] and are never freed; edits only rewire parent entries.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) source: String,
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) root: Option<NodeId>,
    pub(crate) source_root: Option<NodeId>,
    pub(crate) lines: LineIndex,
    pub(crate) format: Format,
    pub(crate) indent: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty YAML document.
    pub fn new() -> Self {
        Self::with_format(Format::Yaml)
    }

    /// An empty document that encodes as `format` by default.
    pub fn with_format(format: Format) -> Self {
        Self {
            source: String::new(),
            nodes: Vec::new(),
            root: None,
            source_root: None,
            lines: LineIndex::new(""),
            format,
            indent: DEFAULT_INDENT,
        }
    }

    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let parsed = parser::parse(source)?;
        let format = detect_format(source, &parsed.nodes, parsed.root);
        let indent = detect_indent(source);
        tracing::trace!(
            nodes = parsed.nodes.len(),
            format = ?format,
            indent,
            "parsed document"
        );
        Ok(Self {
            source: source.to_string(),
            nodes: parsed.nodes,
            root: parsed.root,
            source_root: parsed.root,
            lines: parsed.lines,
            format,
            indent,
        })
    }

    /// Parses UTF-8 bytes. A leading byte-order mark is dropped.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            let valid = &bytes[..e.valid_up_to()];
            let line = valid.iter().filter(|&&b| b == b'\n').count() + 1;
            let column = valid.iter().rev().take_while(|&&b| b != b'\n').count() + 1;
            ParseError::new("invalid UTF-8", line, column)
        })?;
        Self::parse(text.strip_prefix('\u{feff}').unwrap_or(text))
    }

    // ── Inspection ──────────────────────────────────────────────────────

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Format detected at parse time (or given at construction).
    pub fn format(&self) -> Format {
        self.format
    }

    /// Indentation width detected at parse time.
    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub(crate) fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index())
    }

    /// Follows aliases to the node they stand for.
    pub fn resolve(&self, id: NodeId) -> NodeId {
        let mut current = id;
        for _ in 0..=self.nodes.len() {
            match self.data(current).map(|n| &n.value) {
                Some(NodeValue::Alias { target, .. }) => current = *target,
                _ => return current,
            }
        }
        current
    }

    /// Kind of the node itself; aliases report [`NodeKind::Alias`].
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.data(id).map(|n| match n.value {
            NodeValue::Scalar(_) => NodeKind::Scalar,
            NodeValue::Mapping(_) => NodeKind::Mapping,
            NodeValue::Sequence(_) => NodeKind::Sequence,
            NodeValue::Alias { .. } => NodeKind::Alias,
        })
    }

    /// Kind after alias resolution.
    pub fn resolved_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.kind(self.resolve(id))
    }

    pub fn is_mapping(&self, id: NodeId) -> bool {
        self.resolved_kind(id) == Some(NodeKind::Mapping)
    }

    pub fn is_sequence(&self, id: NodeId) -> bool {
        self.resolved_kind(id) == Some(NodeKind::Sequence)
    }

    pub fn is_scalar(&self, id: NodeId) -> bool {
        self.resolved_kind(id) == Some(NodeKind::Scalar)
    }

    pub fn scalar(&self, id: NodeId) -> Option<&Scalar> {
        match self.data(self.resolve(id)).map(|n| &n.value) {
            Some(NodeValue::Scalar(s)) => Some(s),
            _ => None,
        }
    }

    pub fn anchor(&self, id: NodeId) -> Option<&str> {
        self.data(id).and_then(|n| n.anchor.as_deref())
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.data(id).and_then(|n| n.tag.as_deref())
    }

    pub fn alias_name(&self, id: NodeId) -> Option<&str> {
        match self.data(id).map(|n| &n.value) {
            Some(NodeValue::Alias { name, .. }) => Some(name),
            _ => None,
        }
    }

    pub fn collection_style(&self, id: NodeId) -> Option<CollectionStyle> {
        match self.data(self.resolve(id)).map(|n| &n.value) {
            Some(NodeValue::Mapping(c)) => Some(c.style),
            Some(NodeValue::Sequence(c)) => Some(c.style),
            _ => None,
        }
    }

    fn mapping_entries(&self, id: NodeId) -> &[Pair] {
        match self.data(self.resolve(id)).map(|n| &n.value) {
            Some(NodeValue::Mapping(c)) => &c.entries,
            _ => &[],
        }
    }

    fn sequence_entries(&self, id: NodeId) -> &[Item] {
        match self.data(self.resolve(id)).map(|n| &n.value) {
            Some(NodeValue::Sequence(c)) => &c.entries,
            _ => &[],
        }
    }

    /// Direct `(key, value)` entries of a mapping, in document order.
    pub fn pairs(&self, map: NodeId) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.mapping_entries(map).iter().map(|p| (p.key, p.value))
    }

    /// Items of a sequence, in document order.
    pub fn items(&self, seq: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.sequence_entries(seq).iter().map(|i| i.value)
    }

    pub fn item(&self, seq: NodeId, index: usize) -> Option<NodeId> {
        self.sequence_entries(seq).get(index).map(|i| i.value)
    }

    /// Number of entries of a mapping or sequence; zero for scalars.
    pub fn child_count(&self, id: NodeId) -> usize {
        self.mapping_entries(id).len() + self.sequence_entries(id).len()
    }

    /// Text of a scalar key (aliases followed).
    pub fn key_str(&self, key: NodeId) -> Option<&str> {
        self.scalar(key).map(|s| s.value.as_str())
    }

    /// A plain `<<` key (or one tagged `!!merge`).
    pub fn is_merge_key(&self, key: NodeId) -> bool {
        let Some(data) = self.data(key) else {
            return false;
        };
        if data.tag.as_deref() == Some("!!merge") {
            return true;
        }
        matches!(&data.value, NodeValue::Scalar(s) if s.style == ScalarStyle::Plain && s.value == "<<")
    }

    /// The direct pair for `key`; merge sources are not consulted.
    pub fn find_pair(&self, map: NodeId, key: &str) -> Option<(NodeId, NodeId)> {
        self.mapping_entries(map)
            .iter()
            .find(|p| self.key_str(p.key) == Some(key))
            .map(|p| (p.key, p.value))
    }

    /// Looks up `key`, falling back to `<<` merge sources in order.
    pub fn get_entry(&self, map: NodeId, key: &str) -> Option<(NodeId, NodeId)> {
        self.get_entry_depth(map, key, 0)
    }

    fn get_entry_depth(&self, map: NodeId, key: &str, depth: usize) -> Option<(NodeId, NodeId)> {
        if depth > self.nodes.len() {
            return None;
        }
        if let Some(found) = self
            .mapping_entries(map)
            .iter()
            .find(|p| !self.is_merge_key(p.key) && self.key_str(p.key) == Some(key))
        {
            return Some((found.key, found.value));
        }
        for source in self.merge_sources(map) {
            if let Some(found) = self.get_entry_depth(source, key, depth + 1) {
                return Some(found);
            }
        }
        None
    }

    pub fn get(&self, map: NodeId, key: &str) -> Option<NodeId> {
        self.get_entry(map, key).map(|(_, v)| v)
    }

    /// Mappings named by the `<<` keys of `map`, in precedence order.
    pub fn merge_sources(&self, map: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for pair in self.mapping_entries(map) {
            if !self.is_merge_key(pair.key) {
                continue;
            }
            if self.is_mapping(pair.value) {
                out.push(self.resolve(pair.value));
            } else {
                out.extend(self.items(pair.value).filter(|&i| self.is_mapping(i)).map(|i| self.resolve(i)));
            }
        }
        out
    }

    /// Entries of `map` with merge keys expanded: direct entries first, then
    /// merged entries whose keys are not already present.
    pub fn merged_pairs(&self, map: NodeId) -> Vec<(NodeId, NodeId)> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        for pair in self.mapping_entries(map) {
            if self.is_merge_key(pair.key) {
                continue;
            }
            if let Some(k) = self.key_str(pair.key) {
                seen.insert(k);
            }
            out.push((pair.key, pair.value));
        }
        for source in self.merge_sources(map) {
            for (k, v) in self.merged_pairs(source) {
                match self.key_str(k) {
                    Some(text) if seen.insert(text) => out.push((k, v)),
                    Some(_) => {}
                    None => out.push((k, v)),
                }
            }
        }
        out
    }

    pub fn span(&self, id: NodeId) -> Option<Span> {
        self.data(id).and_then(|n| n.span)
    }

    /// Source position of a parsed node; `None` for nodes built by edits.
    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.span(id)
            .map(|span| self.lines.position(&self.source, span.start))
    }

    pub(crate) fn column(&self, offset: usize) -> usize {
        self.lines.column(offset)
    }

    /// Leading spaces of the line holding `offset`.
    pub(crate) fn line_indent(&self, offset: usize) -> usize {
        let start = self.lines.line_start(offset);
        self.source[start..]
            .bytes()
            .take_while(|&b| b == b' ')
            .count()
    }

    /// A parsed node whose entries (recursively) still match the source layout.
    pub(crate) fn is_pristine(&self, id: NodeId) -> bool {
        let Some(data) = self.data(id) else {
            return false;
        };
        if data.span.is_none() {
            return false;
        }
        match &data.value {
            NodeValue::Mapping(c) => {
                c.entries.len() == c.slots.len()
                    && c.entries.iter().enumerate().all(|(i, p)| {
                        p.slot == Some(i)
                            && c.slots[i].key == Some(p.key)
                            && c.slots[i].value == p.value
                            && self.is_pristine(p.key)
                            && self.is_pristine(p.value)
                    })
            }
            NodeValue::Sequence(c) => {
                c.entries.len() == c.slots.len()
                    && c.entries.iter().enumerate().all(|(i, item)| {
                        item.slot == Some(i)
                            && c.slots[i].value == item.value
                            && self.is_pristine(item.value)
                    })
            }
            _ => true,
        }
    }

    // ── Construction ────────────────────────────────────────────────────

    fn alloc(&mut self, value: NodeValue) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            value,
            anchor: None,
            tag: None,
            span: None,
        });
        id
    }

    pub fn new_scalar(&mut self, scalar: Scalar) -> NodeId {
        self.alloc(NodeValue::Scalar(scalar))
    }

    pub fn new_string(&mut self, value: impl Into<String>) -> NodeId {
        self.new_scalar(Scalar::string(value))
    }

    pub fn new_mapping(&mut self) -> NodeId {
        self.alloc(NodeValue::Mapping(Collection::new(CollectionStyle::Block)))
    }

    pub fn new_sequence(&mut self) -> NodeId {
        self.alloc(NodeValue::Sequence(Collection::new(CollectionStyle::Block)))
    }

    /// Builds a detached subtree from a JSON value.
    pub fn from_json(&mut self, value: &Value) -> NodeId {
        match value {
            Value::Null => self.new_scalar(Scalar::null()),
            Value::Bool(b) => self.new_scalar(Scalar::bool(*b)),
            Value::Number(n) => {
                let scalar = if let Some(i) = n.as_i64() {
                    Scalar::int(i)
                } else if n.is_u64() {
                    Scalar {
                        value: n.to_string(),
                        kind: ScalarType::Int,
                        style: ScalarStyle::Plain,
                    }
                } else {
                    Scalar::float(n.as_f64().unwrap_or(f64::NAN))
                };
                self.new_scalar(scalar)
            }
            Value::String(s) => self.new_string(s.as_str()),
            Value::Array(items) => {
                let values: Vec<NodeId> = items.iter().map(|v| self.from_json(v)).collect();
                let mut coll = Collection::new(CollectionStyle::Block);
                coll.entries = values
                    .into_iter()
                    .map(|value| Item { value, slot: None })
                    .collect();
                self.alloc(NodeValue::Sequence(coll))
            }
            Value::Object(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (k, v) in map {
                    let key = self.new_string(k.as_str());
                    let value = self.from_json(v);
                    entries.push(Pair {
                        key,
                        value,
                        slot: None,
                    });
                }
                let mut coll = Collection::new(CollectionStyle::Block);
                coll.entries = entries;
                self.alloc(NodeValue::Mapping(coll))
            }
        }
    }

    /// Converts a subtree to JSON, resolving aliases and merge keys.
    pub fn to_json(&self, id: NodeId) -> Value {
        self.to_json_depth(id, 0)
    }

    fn to_json_depth(&self, id: NodeId, depth: usize) -> Value {
        if depth > self.nodes.len() {
            return Value::Null;
        }
        let id = self.resolve(id);
        match self.data(id).map(|n| &n.value) {
            Some(NodeValue::Scalar(s)) => scalar_to_json(s),
            Some(NodeValue::Sequence(c)) => Value::Array(
                c.entries
                    .iter()
                    .map(|i| self.to_json_depth(i.value, depth + 1))
                    .collect(),
            ),
            Some(NodeValue::Mapping(_)) => {
                let mut out = Map::new();
                for (k, v) in self.merged_pairs(id) {
                    let key = match self.scalar(k) {
                        Some(s) => s.value.clone(),
                        None => self.to_json_depth(k, depth + 1).to_string(),
                    };
                    out.insert(key, self.to_json_depth(v, depth + 1));
                }
                Value::Object(out)
            }
            Some(NodeValue::Alias { .. }) | None => Value::Null,
        }
    }

    // ── Edits ───────────────────────────────────────────────────────────

    fn check(&self, id: NodeId) -> Result<(), EditError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(EditError::InvalidNode(id))
        }
    }

    fn mapping_mut(&mut self, id: NodeId) -> Result<&mut Collection<Pair>, EditError> {
        let id = self.resolve(id);
        match self.nodes.get_mut(id.index()).map(|n| &mut n.value) {
            Some(NodeValue::Mapping(c)) => Ok(c),
            Some(_) => Err(EditError::NotAMapping(id)),
            None => Err(EditError::InvalidNode(id)),
        }
    }

    fn sequence_mut(&mut self, id: NodeId) -> Result<&mut Collection<Item>, EditError> {
        let id = self.resolve(id);
        match self.nodes.get_mut(id.index()).map(|n| &mut n.value) {
            Some(NodeValue::Sequence(c)) => Ok(c),
            Some(_) => Err(EditError::NotASequence(id)),
            None => Err(EditError::InvalidNode(id)),
        }
    }

    pub fn set_root(&mut self, id: NodeId) -> Result<(), EditError> {
        self.check(id)?;
        self.root = Some(id);
        Ok(())
    }

    /// Points `key` at `value`. An existing direct pair keeps its key node
    /// and position; otherwise a new pair is appended.
    pub fn set_value(&mut self, map: NodeId, key: &str, value: NodeId) -> Result<(), EditError> {
        self.check(value)?;
        let index = self
            .mapping_entries(map)
            .iter()
            .position(|p| !self.is_merge_key(p.key) && self.key_str(p.key) == Some(key));
        match index {
            Some(i) => self.mapping_mut(map)?.entries[i].value = value,
            None => {
                self.mapping_mut(map)?;
                let key_node = self.new_string(key);
                self.mapping_mut(map)?.entries.push(Pair {
                    key: key_node,
                    value,
                    slot: None,
                });
            }
        }
        Ok(())
    }

    /// Removes the direct pair for `key`, returning its value node.
    pub fn remove_key(&mut self, map: NodeId, key: &str) -> Result<Option<NodeId>, EditError> {
        let index = self
            .mapping_entries(map)
            .iter()
            .position(|p| !self.is_merge_key(p.key) && self.key_str(p.key) == Some(key));
        let entries = &mut self.mapping_mut(map)?.entries;
        Ok(index.map(|i| entries.remove(i).value))
    }

    /// Replaces the value of the pair currently holding `old`.
    pub fn replace_value(&mut self, map: NodeId, old: NodeId, new: NodeId) -> Result<(), EditError> {
        self.check(new)?;
        let pair = self
            .mapping_mut(map)?
            .entries
            .iter_mut()
            .find(|p| p.value == old)
            .ok_or(EditError::NotAChild(old))?;
        pair.value = new;
        Ok(())
    }

    pub fn push_item(&mut self, seq: NodeId, value: NodeId) -> Result<(), EditError> {
        self.check(value)?;
        self.sequence_mut(seq)?
            .entries
            .push(Item { value, slot: None });
        Ok(())
    }

    /// Replaces item `index`, returning the previous item node.
    pub fn replace_item(&mut self, seq: NodeId, index: usize, value: NodeId) -> Result<NodeId, EditError> {
        self.check(value)?;
        let entries = &mut self.sequence_mut(seq)?.entries;
        let len = entries.len();
        let item = entries
            .get_mut(index)
            .ok_or(EditError::IndexOutOfBounds { index, len })?;
        Ok(std::mem::replace(&mut item.value, value))
    }

    pub fn remove_item(&mut self, seq: NodeId, index: usize) -> Result<NodeId, EditError> {
        let entries = &mut self.sequence_mut(seq)?.entries;
        if index >= entries.len() {
            return Err(EditError::IndexOutOfBounds {
                index,
                len: entries.len(),
            });
        }
        Ok(entries.remove(index).value)
    }

    /// Replaces every item of `seq`. Each new item may name the item it takes
    /// the place of, and then inherits that item's place in the source text.
    pub fn set_items(&mut self, seq: NodeId, items: &[(NodeId, Option<NodeId>)]) -> Result<(), EditError> {
        for &(value, _) in items {
            self.check(value)?;
        }
        let entries = &mut self.sequence_mut(seq)?.entries;
        let mut taken = Vec::new();
        let rebuilt: Vec<Item> = items
            .iter()
            .map(|&(value, replaces)| {
                let slot = replaces
                    .and_then(|old| entries.iter().find(|i| i.value == old))
                    .and_then(|i| i.slot)
                    .filter(|slot| !taken.contains(slot));
                taken.extend(slot);
                Item { value, slot }
            })
            .collect();
        *entries = rebuilt;
        Ok(())
    }

    /// Swaps the child `old` of `parent` (mapping value or sequence item) for `new`.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> Result<(), EditError> {
        if self.is_mapping(parent) {
            return self.replace_value(parent, old, new);
        }
        let index = self
            .sequence_mut(parent)?
            .entries
            .iter()
            .position(|i| i.value == old)
            .ok_or(EditError::NotAChild(old))?;
        self.replace_item(parent, index, new).map(|_| ())
    }
}

impl FromStr for Document {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode(&EncodeOptions::default()))
    }
}

fn scalar_to_json(s: &Scalar) -> Value {
    let text = || Value::String(s.value.clone());
    match s.kind {
        ScalarType::Null => Value::Null,
        ScalarType::Bool => parse_bool(&s.value).map_or_else(text, Value::Bool),
        ScalarType::Int => match parse_int(&s.value) {
            Some(i) => Value::from(i),
            None => s.value.parse::<u64>().map_or_else(|_| text(), Value::from),
        },
        ScalarType::Float => parse_float(&s.value)
            .and_then(Number::from_f64)
            .map_or_else(text, Value::Number),
        ScalarType::Str => text(),
    }
}

fn detect_format(source: &str, nodes: &[NodeData], root: Option<NodeId>) -> Format {
    let starts_flow = source.trim_start().starts_with(['{', '[']);
    let root_is_flow = root
        .and_then(|r| nodes.get(r.index()))
        .is_some_and(|n| match &n.value {
            NodeValue::Mapping(c) => c.style == CollectionStyle::Flow,
            NodeValue::Sequence(c) => c.style == CollectionStyle::Flow,
            _ => false,
        });
    if starts_flow && root_is_flow {
        Format::Json
    } else {
        Format::Yaml
    }
}

fn detect_indent(source: &str) -> usize {
    source
        .lines()
        .find_map(|line| {
            let trimmed = line.trim_start_matches(' ');
            let width = line.len() - trimmed.len();
            (width > 0 && !trimmed.is_empty() && !trimmed.starts_with('#')).then_some(width)
        })
        .map_or(DEFAULT_INDENT, |w| w.min(MAX_DETECTED_INDENT))
}
