//! Rendering of nodes that have no source text to reuse.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::document::Document;
use crate::node::{CollectionStyle, NodeId, NodeValue, Scalar, ScalarStyle, ScalarType};
use crate::options::{Format, QuoteStyle};
use crate::scalar::{double_quoted, is_plain_safe, single_quoted};

pub(crate) fn spaces(n: usize) -> String {
    " ".repeat(n)
}

fn prefixed(text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        format!(" {text}")
    }
}

fn join_props(props: &str, body: &str) -> String {
    match (props.is_empty(), body.is_empty()) {
        (true, _) => body.to_string(),
        (false, true) => props.to_string(),
        (false, false) => format!("{props} {body}"),
    }
}

pub(crate) struct Renderer<'d> {
    doc: &'d Document,
    pub(crate) json: bool,
    indent: usize,
    quote: QuoteStyle,
    /// Quoted source scalars are re-quoted instead of copied.
    forced_quote: bool,
    /// Full re-render: every non-empty collection goes to block style.
    restyle: bool,
}

impl<'d> Renderer<'d> {
    pub(crate) fn new(
        doc: &'d Document,
        format: Format,
        indent: usize,
        quote: Option<QuoteStyle>,
        restyle: bool,
    ) -> Self {
        Self {
            doc,
            json: format == Format::Json,
            indent,
            quote: quote.unwrap_or_default(),
            forced_quote: quote.is_some(),
            restyle,
        }
    }

    /// The whole document, newline-terminated.
    pub(crate) fn document(&self) -> String {
        match self.doc.root() {
            Some(root) => {
                let mut out = self.root(root);
                out.push('\n');
                out
            }
            None => String::new(),
        }
    }

    pub(crate) fn root(&self, id: NodeId) -> String {
        if self.json {
            return self.json(id, 0);
        }
        let props = self.props(id);
        if self.is_block(id) {
            let body = self.block(id, 0);
            return if props.is_empty() {
                body
            } else {
                format!("{props}\n{body}")
            };
        }
        let body = self
            .literal(id, self.indent)
            .unwrap_or_else(|| self.inline(id, false));
        join_props(&props, &body)
    }

    fn is_block(&self, id: NodeId) -> bool {
        if self.json {
            return false;
        }
        match self.doc.data(id).map(|n| &n.value) {
            Some(NodeValue::Mapping(c)) => {
                (self.restyle || c.style == CollectionStyle::Block) && !c.entries.is_empty()
            }
            Some(NodeValue::Sequence(c)) => {
                (self.restyle || c.style == CollectionStyle::Block) && !c.entries.is_empty()
            }
            _ => false,
        }
    }

    fn props(&self, id: NodeId) -> String {
        if self.json {
            return String::new();
        }
        let mut parts = Vec::new();
        if let Some(anchor) = self.doc.anchor(id) {
            parts.push(format!("&{anchor}"));
        }
        if let Some(tag) = self.doc.tag(id) {
            parts.push(tag.to_string());
        }
        parts.join(" ")
    }

    /// Text following `key:` in a block mapping whose entries sit at `col`.
    pub(crate) fn after_colon(&self, id: NodeId, col: usize) -> String {
        if self.json {
            return format!(" {}", self.json(id, col));
        }
        let props = self.props(id);
        if self.is_block(id) {
            let child = col + self.indent;
            return format!("{}\n{}{}", prefixed(&props), spaces(child), self.block(id, child));
        }
        let body = self
            .literal(id, col + self.indent)
            .unwrap_or_else(|| self.inline(id, false));
        prefixed(&join_props(&props, &body))
    }

    /// Text following `-` in a block sequence at `col`.
    pub(crate) fn after_dash(&self, id: NodeId, col: usize) -> String {
        if self.json {
            return format!(" {}", self.json(id, col));
        }
        let props = self.props(id);
        let child = col + 2;
        if self.is_block(id) {
            return if props.is_empty() {
                format!(" {}", self.block(id, child))
            } else {
                format!(" {props}\n{}{}", spaces(child), self.block(id, child))
            };
        }
        let body = self
            .literal(id, child)
            .unwrap_or_else(|| self.inline(id, false));
        prefixed(&join_props(&props, &body))
    }

    /// Block form of a collection. Lines after the first are indented to `col`.
    pub(crate) fn block(&self, id: NodeId, col: usize) -> String {
        let sep = format!("\n{}", spaces(col));
        match self.doc.data(id).map(|n| &n.value) {
            Some(NodeValue::Mapping(c)) => c
                .entries
                .iter()
                .map(|p| self.block_pair(p.key, p.value, col))
                .collect::<Vec<_>>()
                .join(&sep),
            Some(NodeValue::Sequence(c)) => c
                .entries
                .iter()
                .map(|i| self.block_item(i.value, col))
                .collect::<Vec<_>>()
                .join(&sep),
            _ => self.inline(id, false),
        }
    }

    pub(crate) fn block_pair(&self, key: NodeId, value: NodeId, col: usize) -> String {
        format!("{}:{}", self.key(key), self.after_colon(value, col))
    }

    pub(crate) fn block_item(&self, value: NodeId, col: usize) -> String {
        format!("-{}", self.after_dash(value, col))
    }

    /// Value inside a flow collection whose entries sit at `col`.
    pub(crate) fn flow_child(&self, id: NodeId, col: usize) -> String {
        if self.json {
            self.json(id, col)
        } else {
            join_props(&self.props(id), &self.inline(id, true))
        }
    }

    /// Single-line form: scalars, aliases and flow collections.
    pub(crate) fn inline(&self, id: NodeId, in_flow: bool) -> String {
        match self.doc.data(id).map(|n| &n.value) {
            Some(NodeValue::Scalar(s)) => self.scalar(id, s, in_flow),
            Some(NodeValue::Alias { name, .. }) => format!("*{name}"),
            Some(NodeValue::Mapping(c)) => {
                let entries: Vec<String> = c
                    .entries
                    .iter()
                    .map(|p| format!("{}: {}", self.key(p.key), self.flow_child(p.value, 0)))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
            Some(NodeValue::Sequence(c)) => {
                let items: Vec<String> = c.entries.iter().map(|i| self.flow_child(i.value, 0)).collect();
                format!("[{}]", items.join(", "))
            }
            None => String::new(),
        }
    }

    pub(crate) fn key(&self, id: NodeId) -> String {
        if self.json {
            let text = match self.doc.scalar(id) {
                Some(s) => s.value.clone(),
                None => self.doc.to_json(id).to_string(),
            };
            return double_quoted(&text);
        }
        let body = match self.doc.data(id).map(|n| &n.value) {
            Some(NodeValue::Scalar(s)) => self.scalar(id, s, false),
            Some(NodeValue::Alias { name, .. }) => format!("*{name} "),
            _ => self.inline(id, true),
        };
        join_props(&self.props(id), &body)
    }

    fn scalar(&self, id: NodeId, s: &Scalar, in_flow: bool) -> String {
        if let Some(text) = self.source_scalar(id, s, in_flow) {
            return text;
        }
        match s.kind {
            ScalarType::Str => self.string(&s.value, in_flow),
            ScalarType::Null if s.value.is_empty() => {
                if in_flow {
                    "null".to_string()
                } else {
                    String::new()
                }
            }
            _ => s.value.clone(),
        }
    }

    /// Original text of a single-line source scalar, when it can be reused.
    fn source_scalar(&self, id: NodeId, s: &Scalar, in_flow: bool) -> Option<String> {
        let span = self.doc.span(id)?;
        match s.style {
            ScalarStyle::Literal | ScalarStyle::Folded => return None,
            ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted if self.forced_quote => return None,
            ScalarStyle::Plain if self.forced_quote && s.kind == ScalarType::Str => return None,
            ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted if self.restyle => return None,
            _ => {}
        }
        let text = self.doc.source().get(span.start..span.end)?;
        if text.is_empty() || text.contains('\n') {
            return None;
        }
        if in_flow && s.style == ScalarStyle::Plain && text.contains([',', '[', ']', '{', '}']) {
            return None;
        }
        Some(text.to_string())
    }

    fn string(&self, value: &str, in_flow: bool) -> String {
        match self.quote {
            QuoteStyle::Auto if is_plain_safe(value, in_flow) => value.to_string(),
            QuoteStyle::Auto | QuoteStyle::Single => {
                single_quoted(value).unwrap_or_else(|| double_quoted(value))
            }
            QuoteStyle::Double => double_quoted(value),
        }
    }

    /// Literal block form (`|`, `|-`, `|+`) of a multi-line string.
    fn literal(&self, id: NodeId, content_col: usize) -> Option<String> {
        if self.json || self.quote != QuoteStyle::Auto {
            return None;
        }
        let Some(NodeValue::Scalar(s)) = self.doc.data(id).map(|n| &n.value) else {
            return None;
        };
        if s.kind != ScalarType::Str || !s.value.contains('\n') {
            return None;
        }
        if s.value.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
            return None;
        }
        let body = s.value.trim_end_matches('\n');
        if body.is_empty() || body.starts_with([' ', '\t']) {
            return None;
        }
        // Trailing blanks on a line are not kept by a block scalar.
        if body.split('\n').any(|line| line.ends_with([' ', '\t'])) {
            return None;
        }
        let trailing = s.value.len() - body.len();
        let mut out = match trailing {
            0 => "|-",
            1 => "|",
            _ => "|+",
        }
        .to_string();
        let pad = spaces(content_col);
        for line in body.split('\n') {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&pad);
                out.push_str(line);
            }
        }
        for _ in 1..trailing {
            out.push('\n');
        }
        Some(out)
    }

    /// Pretty JSON; lines after the first are shifted right by `col`.
    pub(crate) fn json(&self, id: NodeId, col: usize) -> String {
        let value = self.doc.to_json(id);
        let indent = spaces(self.indent);
        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
        if value.serialize(&mut ser).is_err() {
            return value.to_string();
        }
        let text = String::from_utf8(buf).unwrap_or_else(|_| value.to_string());
        if col == 0 {
            text
        } else {
            text.replace('\n', &format!("\n{}", spaces(col)))
        }
    }
}
