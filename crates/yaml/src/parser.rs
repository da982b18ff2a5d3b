//! Recursive-descent parser producing a source-backed node arena.
//!
//! Supported: block mappings and sequences, flow (JSON) collections, plain,
//! quoted and block scalars, comments, anchors, aliases, tags, `---`/`...`.
//! Not supported: complex (`?`) keys, flow collections as keys, multiple
//! documents per stream.

use std::collections::HashMap;

use crate::error::ParseError;
use crate::node::{
    Collection, CollectionStyle, Item, NodeData, NodeId, NodeValue, Pair, Position, Scalar,
    ScalarStyle, ScalarType, Slot, Span,
};
use crate::scalar::{resolve_plain, resolve_tag};

type Result<T> = std::result::Result<T, ParseError>;

/// Byte offsets of every line start, for offset → line/column lookups.
#[derive(Debug, Clone, Default)]
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(src: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in src.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { starts }
    }

    pub(crate) fn line_start(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => self.starts[i],
            Err(i) => self.starts[i.saturating_sub(1)],
        }
    }

    /// 0-based byte column.
    pub(crate) fn column(&self, offset: usize) -> usize {
        offset - self.line_start(offset)
    }

    pub(crate) fn position(&self, src: &str, offset: usize) -> Position {
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let start = self.starts[line];
        let column = src
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start);
        Position {
            line: line + 1,
            column: column + 1,
        }
    }
}

/// Output of a successful parse.
#[derive(Debug)]
pub(crate) struct Parsed {
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) root: Option<NodeId>,
    pub(crate) lines: LineIndex,
}

pub(crate) fn parse(src: &str) -> Result<Parsed> {
    let mut parser = Parser::new(src);
    let root = parser.parse_stream()?;
    Ok(Parsed {
        nodes: parser.nodes,
        root,
        lines: parser.lines,
    })
}

#[derive(Debug, Default)]
struct Props {
    anchor: Option<String>,
    tag: Option<String>,
    end: usize,
}

impl Props {
    fn is_empty(&self) -> bool {
        self.anchor.is_none() && self.tag.is_none()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Chomp {
    Clip,
    Strip,
    Keep,
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    nodes: Vec<NodeData>,
    anchors: HashMap<String, NodeId>,
    lines: LineIndex,
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn is_break(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

fn is_flow_indicator(b: u8) -> bool {
    matches!(b, b',' | b'[' | b']' | b'{' | b'}')
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            nodes: Vec::new(),
            anchors: HashMap::new(),
            lines: LineIndex::new(src),
        }
    }

    // ── cursor helpers ───────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn byte_at(&self, pos: usize) -> Option<u8> {
        self.bytes.get(pos).copied()
    }

    fn eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn column(&self, pos: usize) -> usize {
        self.lines.column(pos)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let p = self.lines.position(self.src, self.pos.min(self.bytes.len()));
        ParseError::new(message, p.line, p.column)
    }

    /// Whether the byte at `pos` is a blank, a line break, or the end of input.
    fn separated_at(&self, pos: usize) -> bool {
        self.byte_at(pos).map_or(true, |b| is_blank(b) || is_break(b))
    }

    fn skip_blanks(&mut self) {
        while self.peek().is_some_and(is_blank) {
            self.pos += 1;
        }
    }

    fn skip_comment(&mut self) {
        if self.peek() == Some(b'#') {
            while self.peek().is_some_and(|b| !is_break(b)) {
                self.pos += 1;
            }
        }
    }

    fn skip_break(&mut self) -> bool {
        match self.peek() {
            Some(b'\r') => {
                self.pos += 1;
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
                true
            }
            Some(b'\n') => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    /// Skips blanks, comments and line breaks.
    fn skip_space(&mut self) {
        loop {
            self.skip_blanks();
            self.skip_comment();
            if !self.skip_break() {
                break;
            }
        }
    }

    /// Only blanks and an optional comment remain on the current line.
    fn at_line_end(&self) -> bool {
        let mut p = self.pos;
        while let Some(b) = self.byte_at(p) {
            match b {
                b' ' | b'\t' => p += 1,
                b'#' | b'\n' | b'\r' => return true,
                _ => return false,
            }
        }
        true
    }

    fn expect_line_end(&mut self) -> Result<()> {
        let save = self.pos;
        self.skip_blanks();
        if !self.at_line_end() {
            return Err(self.error("unexpected content after value"));
        }
        self.pos = save;
        Ok(())
    }

    fn line_end_from(&self, pos: usize) -> usize {
        let mut p = pos;
        while self.byte_at(p).is_some_and(|b| !is_break(b)) {
            p += 1;
        }
        p
    }

    /// End of the line holding `pos`, trailing comment included, trailing
    /// blanks excluded.
    fn line_content_end(&self, pos: usize) -> usize {
        let mut end = self.line_end_from(pos);
        while end > pos && self.byte_at(end - 1).is_some_and(is_blank) {
            end -= 1;
        }
        end
    }

    fn starts_marker(&self, marker: &[u8; 3]) -> bool {
        self.column(self.pos) == 0
            && self.bytes[self.pos..].starts_with(marker)
            && self.separated_at(self.pos + 3)
    }

    fn at_document_marker(&self) -> bool {
        self.starts_marker(b"---") || self.starts_marker(b"...")
    }

    fn at_seq_indicator(&self) -> bool {
        self.peek() == Some(b'-') && self.separated_at(self.pos + 1)
    }

    /// A `:` follows on this line. Quoted keys may omit the separating blank.
    fn at_mapping_colon(&self, quoted: bool) -> bool {
        let mut p = self.pos;
        while self.byte_at(p).is_some_and(is_blank) {
            p += 1;
        }
        self.byte_at(p) == Some(b':') && (quoted || self.separated_at(p + 1))
    }

    fn continues_block(&self, parent_indent: isize, same_indent_seq: bool) -> bool {
        if self.eof() || self.at_document_marker() {
            return false;
        }
        let col = self.column(self.pos) as isize;
        col > parent_indent || (same_indent_seq && col == parent_indent && self.at_seq_indicator())
    }

    // ── node allocation ──────────────────────────────────────────────────

    fn push(&mut self, value: NodeValue, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            value,
            anchor: None,
            tag: None,
            span: Some(span),
        });
        id
    }

    fn empty_scalar(&mut self, at: usize) -> NodeId {
        self.push(
            NodeValue::Scalar(Scalar {
                value: String::new(),
                kind: ScalarType::Null,
                style: ScalarStyle::Plain,
            }),
            Span::new(at, at),
        )
    }

    fn span_end(&self, id: NodeId) -> usize {
        self.nodes[id.index()].span.map_or(self.pos, |s| s.end)
    }

    fn is_quoted(&self, id: NodeId) -> bool {
        matches!(
            &self.nodes[id.index()].value,
            NodeValue::Scalar(Scalar {
                style: ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted,
                ..
            })
        )
    }

    fn is_key_candidate(&self, id: NodeId) -> bool {
        match &self.nodes[id.index()].value {
            NodeValue::Scalar(s) => !matches!(s.style, ScalarStyle::Literal | ScalarStyle::Folded),
            NodeValue::Alias { .. } => true,
            _ => false,
        }
    }

    fn attach_props(&mut self, id: NodeId, props: Props) -> Result<()> {
        if props.is_empty() {
            return Ok(());
        }
        let data = &self.nodes[id.index()];
        if matches!(data.value, NodeValue::Alias { .. }) {
            return Err(self.error("an alias cannot carry properties"));
        }
        if data.anchor.is_some() || data.tag.is_some() {
            return Err(self.error("node properties given twice"));
        }
        let node = &mut self.nodes[id.index()];
        if let (Some(tag), NodeValue::Scalar(scalar)) = (props.tag.as_deref(), &mut node.value) {
            if let Some(kind) = resolve_tag(tag) {
                scalar.kind = kind;
            }
        }
        node.tag = props.tag;
        if let Some(anchor) = props.anchor {
            node.anchor = Some(anchor.clone());
            self.anchors.insert(anchor, id);
        }
        Ok(())
    }

    // ── document ─────────────────────────────────────────────────────────

    fn parse_stream(&mut self) -> Result<Option<NodeId>> {
        self.skip_space();
        while self.peek() == Some(b'%') && self.column(self.pos) == 0 {
            self.pos = self.line_end_from(self.pos);
            self.skip_space();
        }
        if self.starts_marker(b"---") {
            self.pos += 3;
            self.skip_space();
        }
        let root = if self.eof() || self.at_document_marker() {
            None
        } else {
            let node = self.parse_block_node(-1, true)?;
            self.expect_line_end()?;
            Some(node)
        };
        self.skip_space();
        if self.starts_marker(b"...") {
            self.pos += 3;
            self.skip_space();
        }
        if self.starts_marker(b"---") {
            return Err(self.error("multiple documents in one stream are not supported"));
        }
        if !self.eof() {
            return Err(self.error("unexpected content after document"));
        }
        Ok(root)
    }

    // ── block context ────────────────────────────────────────────────────

    fn parse_properties(&mut self, flow: bool) -> Result<Props> {
        let start = self.pos;
        let mut props = Props {
            end: start,
            ..Props::default()
        };
        loop {
            match self.peek() {
                Some(b'&') if props.anchor.is_none() => {
                    self.pos += 1;
                    let name = self.scan_name();
                    if name.is_empty() {
                        return Err(self.error("empty anchor name"));
                    }
                    props.anchor = Some(name);
                }
                Some(b'!') if props.tag.is_none() => {
                    let s = self.pos;
                    while self.peek().is_some_and(|b| {
                        !is_blank(b) && !is_break(b) && !(flow && is_flow_indicator(b))
                    }) {
                        self.pos += 1;
                    }
                    props.tag = Some(self.src[s..self.pos].to_string());
                }
                _ => break,
            }
            props.end = self.pos;
            self.skip_blanks();
        }
        if props.is_empty() {
            self.pos = start;
        }
        Ok(props)
    }

    fn scan_name(&mut self) -> String {
        let s = self.pos;
        while self
            .peek()
            .is_some_and(|b| !is_blank(b) && !is_break(b) && !is_flow_indicator(b))
        {
            self.pos += 1;
        }
        self.src[s..self.pos].to_string()
    }

    fn parse_block_node(&mut self, parent_indent: isize, allow_mapping: bool) -> Result<NodeId> {
        let start = self.pos;
        let props = self.parse_properties(false)?;
        if !props.is_empty() && self.at_line_end() {
            // Properties alone on a line; the content follows on the next lines.
            let props_end = props.end;
            self.skip_space();
            if self.continues_block(parent_indent, true) {
                let id = self.parse_block_node(parent_indent, true)?;
                self.attach_props(id, props)?;
                return Ok(id);
            }
            self.pos = props_end;
            let id = self.empty_scalar(props_end);
            self.attach_props(id, props)?;
            return Ok(id);
        }

        let content_start = self.pos;
        let col = self.column(content_start);
        let node = match self.peek() {
            Some(b'-') if self.separated_at(self.pos + 1) => {
                if !allow_mapping {
                    return Err(self.error("block sequence entries are not allowed here"));
                }
                let id = self.parse_block_sequence(col)?;
                self.attach_props(id, props)?;
                return Ok(id);
            }
            Some(b'?') if self.separated_at(self.pos + 1) => {
                return Err(self.error("complex mapping keys are not supported"));
            }
            Some(b'[') => self.parse_flow_sequence()?,
            Some(b'{') => self.parse_flow_mapping()?,
            Some(b'|' | b'>') => self.parse_block_scalar(parent_indent)?,
            Some(b'*') => self.parse_alias()?,
            Some(b'"') => self.parse_double_quoted()?,
            Some(b'\'') => self.parse_single_quoted()?,
            Some(b'#') | None => return Err(self.error("expected a node")),
            _ => self.parse_plain(parent_indent, false)?,
        };

        if self.is_key_candidate(node) && self.at_mapping_colon(self.is_quoted(node)) {
            if !allow_mapping {
                return Err(self.error("mapping values are not allowed in this context"));
            }
            // Properties written before an implicit key belong to the key.
            self.attach_props(node, props)?;
            return self.parse_block_mapping(self.column(start), start, node);
        }
        self.attach_props(node, props)?;
        Ok(node)
    }

    fn parse_key(&mut self) -> Result<NodeId> {
        let props = self.parse_properties(false)?;
        let node = match self.peek() {
            Some(b'"') => self.parse_double_quoted()?,
            Some(b'\'') => self.parse_single_quoted()?,
            Some(b'*') => self.parse_alias()?,
            Some(b'?') if self.separated_at(self.pos + 1) => {
                return Err(self.error("complex mapping keys are not supported"));
            }
            Some(b'[' | b'{') => {
                return Err(self.error("flow collections as mapping keys are not supported"));
            }
            _ => self.parse_plain_line(false)?,
        };
        self.attach_props(node, props)?;
        Ok(node)
    }

    fn parse_block_mapping(&mut self, col: usize, start: usize, first_key: NodeId) -> Result<NodeId> {
        let mut coll: Collection<Pair> = Collection::new(CollectionStyle::Block);
        let mut key = first_key;
        let mut key_start = start;
        loop {
            let key_end = self.span_end(key);
            self.skip_blanks();
            let colon = self.pos;
            self.pos += 1;
            let value = self.parse_mapping_value(col, colon)?;
            let end = self.span_end(value);
            self.expect_line_end()?;
            let line_end = self.line_content_end(end.max(self.pos));
            let index = coll.slots.len();
            coll.slots.push(Slot {
                start: key_start,
                key: Some(key),
                key_end,
                sep: Some(colon),
                value,
                end,
                line_end,
            });
            coll.entries.push(Pair {
                key,
                value,
                slot: Some(index),
            });
            self.pos = line_end;

            let save = self.pos;
            self.skip_space();
            if self.eof()
                || self.at_document_marker()
                || self.column(self.pos) != col
                || self.at_seq_indicator()
            {
                self.pos = save;
                break;
            }
            key_start = self.pos;
            key = self.parse_key()?;
            if !self.at_mapping_colon(self.is_quoted(key)) {
                return Err(self.error("expected ':' after mapping key"));
            }
        }
        let end = coll.slots.last().map_or(start, |s| s.line_end);
        Ok(self.push(NodeValue::Mapping(coll), Span::new(start, end)))
    }

    fn parse_mapping_value(&mut self, col: usize, colon: usize) -> Result<NodeId> {
        self.skip_blanks();
        if self.at_line_end() {
            self.skip_space();
            if self.continues_block(col as isize, true) {
                return self.parse_block_node(col as isize, true);
            }
            self.pos = colon + 1;
            return Ok(self.empty_scalar(colon + 1));
        }
        self.parse_block_node(col as isize, false)
    }

    fn parse_block_sequence(&mut self, col: usize) -> Result<NodeId> {
        let start = self.pos;
        let mut coll: Collection<Item> = Collection::new(CollectionStyle::Block);
        loop {
            let dash = self.pos;
            self.pos += 1;
            let after_dash = self.pos;
            self.skip_blanks();
            let value = if self.at_line_end() {
                self.skip_space();
                if self.continues_block(col as isize, false) {
                    self.parse_block_node(col as isize, true)?
                } else {
                    self.pos = after_dash;
                    self.empty_scalar(after_dash)
                }
            } else {
                self.parse_block_node(col as isize, true)?
            };
            let end = self.span_end(value);
            self.expect_line_end()?;
            let line_end = self.line_content_end(end.max(self.pos));
            let index = coll.slots.len();
            coll.slots.push(Slot {
                start: dash,
                key: None,
                key_end: dash,
                sep: Some(dash),
                value,
                end,
                line_end,
            });
            coll.entries.push(Item {
                value,
                slot: Some(index),
            });
            self.pos = line_end;

            let save = self.pos;
            self.skip_space();
            if self.eof()
                || self.at_document_marker()
                || self.column(self.pos) != col
                || !self.at_seq_indicator()
            {
                self.pos = save;
                break;
            }
        }
        let end = coll.slots.last().map_or(start, |s| s.line_end);
        Ok(self.push(NodeValue::Sequence(coll), Span::new(start, end)))
    }

    // ── scalars ──────────────────────────────────────────────────────────

    /// Scans one line of a plain scalar; returns the trimmed end offset.
    fn scan_plain_line(&mut self, flow: bool) -> usize {
        let mut end = self.pos;
        while let Some(b) = self.peek() {
            if is_break(b) {
                break;
            }
            if b == b':' {
                let next = self.byte_at(self.pos + 1);
                if next.map_or(true, |n| is_blank(n) || is_break(n) || (flow && is_flow_indicator(n))) {
                    break;
                }
            }
            if b == b'#' && self.pos > 0 && self.byte_at(self.pos - 1).is_some_and(is_blank) {
                break;
            }
            if flow && is_flow_indicator(b) {
                break;
            }
            self.pos += 1;
            if !is_blank(b) {
                end = self.pos;
            }
        }
        self.pos = end;
        end
    }

    fn plain_node(&mut self, value: String, start: usize, end: usize) -> NodeId {
        let kind = resolve_plain(&value);
        self.push(
            NodeValue::Scalar(Scalar {
                value,
                kind,
                style: ScalarStyle::Plain,
            }),
            Span::new(start, end),
        )
    }

    fn parse_plain_line(&mut self, flow: bool) -> Result<NodeId> {
        let start = self.pos;
        let end = self.scan_plain_line(flow);
        if end == start {
            return Err(self.error("expected a scalar"));
        }
        let value = self.src[start..end].to_string();
        Ok(self.plain_node(value, start, end))
    }

    fn parse_plain(&mut self, parent_indent: isize, flow: bool) -> Result<NodeId> {
        let start = self.pos;
        let mut end = self.scan_plain_line(flow);
        if end == start {
            return Err(self.error("expected a scalar"));
        }
        let mut value = self.src[start..end].to_string();
        if !flow && !self.at_mapping_colon(false) {
            loop {
                let save = self.pos;
                self.skip_blanks();
                if !self.peek().is_some_and(is_break) {
                    self.pos = save;
                    break;
                }
                let mut breaks = 0;
                while self.skip_break() {
                    breaks += 1;
                    self.skip_blanks();
                }
                if self.eof()
                    || self.at_document_marker()
                    || (self.column(self.pos) as isize) <= parent_indent
                    || self.peek() == Some(b'#')
                {
                    self.pos = save;
                    break;
                }
                let line_start = self.pos;
                let line_end = self.scan_plain_line(false);
                if line_end == line_start || self.at_mapping_colon(false) {
                    self.pos = save;
                    break;
                }
                if breaks == 1 {
                    value.push(' ');
                } else {
                    for _ in 1..breaks {
                        value.push('\n');
                    }
                }
                value.push_str(&self.src[line_start..line_end]);
                end = line_end;
            }
        }
        self.pos = end;
        Ok(self.plain_node(value, start, end))
    }

    /// Folds a line break inside a quoted scalar.
    fn fold_quoted_break(&mut self, value: &mut String) {
        while value.ends_with([' ', '\t']) {
            value.pop();
        }
        self.skip_break();
        let mut extra = 0;
        loop {
            self.skip_blanks();
            if self.skip_break() {
                extra += 1;
            } else {
                break;
            }
        }
        if extra == 0 {
            value.push(' ');
        } else {
            for _ in 0..extra {
                value.push('\n');
            }
        }
    }

    fn push_char(&mut self, value: &mut String) {
        if let Some(ch) = self.src[self.pos..].chars().next() {
            value.push(ch);
            self.pos += ch.len_utf8();
        }
    }

    fn quoted_node(&mut self, value: String, style: ScalarStyle, start: usize) -> NodeId {
        self.push(
            NodeValue::Scalar(Scalar {
                value,
                kind: ScalarType::Str,
                style,
            }),
            Span::new(start, self.pos),
        )
    }

    fn parse_single_quoted(&mut self) -> Result<NodeId> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated single-quoted scalar")),
                Some(b'\'') if self.byte_at(self.pos + 1) == Some(b'\'') => {
                    value.push('\'');
                    self.pos += 2;
                }
                Some(b'\'') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\n' | b'\r') => self.fold_quoted_break(&mut value),
                Some(_) => self.push_char(&mut value),
            }
        }
        Ok(self.quoted_node(value, ScalarStyle::SingleQuoted, start))
    }

    fn parse_double_quoted(&mut self) -> Result<NodeId> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated double-quoted scalar")),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.parse_escape(&mut value)?;
                }
                Some(b'\n' | b'\r') => self.fold_quoted_break(&mut value),
                Some(_) => self.push_char(&mut value),
            }
        }
        Ok(self.quoted_node(value, ScalarStyle::DoubleQuoted, start))
    }

    fn parse_escape(&mut self, value: &mut String) -> Result<()> {
        let Some(b) = self.peek() else {
            return Err(self.error("unterminated escape sequence"));
        };
        if is_break(b) {
            // Escaped line break: joins lines without a space.
            self.skip_break();
            self.skip_blanks();
            return Ok(());
        }
        self.pos += 1;
        let ch = match b {
            b'0' => '\0',
            b'a' => '\u{07}',
            b'b' => '\u{08}',
            b't' | b'\t' => '\t',
            b'n' => '\n',
            b'v' => '\u{0B}',
            b'f' => '\u{0C}',
            b'r' => '\r',
            b'e' => '\u{1B}',
            b' ' => ' ',
            b'"' => '"',
            b'/' => '/',
            b'\\' => '\\',
            b'N' => '\u{85}',
            b'_' => '\u{A0}',
            b'L' => '\u{2028}',
            b'P' => '\u{2029}',
            b'x' => self.hex_escape(2)?,
            b'u' => self.unicode_escape()?,
            b'U' => self.hex_escape(8)?,
            _ => return Err(self.error("invalid escape sequence")),
        };
        value.push(ch);
        Ok(())
    }

    fn hex_digits(&mut self, len: usize) -> Result<u32> {
        let digits = self
            .src
            .get(self.pos..self.pos + len)
            .ok_or_else(|| self.error("truncated escape sequence"))?;
        let code =
            u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos += len;
        Ok(code)
    }

    fn hex_escape(&mut self, len: usize) -> Result<char> {
        let code = self.hex_digits(len)?;
        char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape"))
    }

    fn unicode_escape(&mut self) -> Result<char> {
        let high = self.hex_digits(4)?;
        if (0xD800..0xDC00).contains(&high)
            && self.peek() == Some(b'\\')
            && self.byte_at(self.pos + 1) == Some(b'u')
        {
            let save = self.pos;
            self.pos += 2;
            let low = self.hex_digits(4)?;
            if (0xDC00..0xE000).contains(&low) {
                let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                return char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape"));
            }
            self.pos = save;
        }
        char::from_u32(high).ok_or_else(|| self.error("invalid unicode escape"))
    }

    fn parse_block_scalar(&mut self, parent_indent: isize) -> Result<NodeId> {
        let start = self.pos;
        let literal = self.peek() == Some(b'|');
        self.pos += 1;
        let mut chomp = Chomp::Clip;
        let mut explicit: Option<usize> = None;
        for _ in 0..2 {
            match self.peek() {
                Some(b'+') => chomp = Chomp::Keep,
                Some(b'-') => chomp = Chomp::Strip,
                Some(d @ b'1'..=b'9') => explicit = Some((d - b'0') as usize),
                _ => break,
            }
            self.pos += 1;
        }
        let header_end = self.pos;
        self.skip_blanks();
        self.skip_comment();
        if !(self.eof() || self.peek().is_some_and(is_break)) {
            return Err(self.error("invalid block scalar header"));
        }

        let base = parent_indent.max(0) as usize;
        let mut indent = explicit.map(|m| if parent_indent < 0 { m } else { base + m });
        let mut lines: Vec<&str> = Vec::new();
        let mut content_end = header_end;
        let mut p = self.pos;
        while p < self.bytes.len() {
            // Step over the line break ending the previous line.
            if self.bytes[p] == b'\r' {
                p += 1;
            }
            if self.byte_at(p) == Some(b'\n') {
                p += 1;
            }
            if p >= self.bytes.len() {
                break;
            }
            let line_start = p;
            let line_end = self.line_end_from(p);
            let line = &self.src[line_start..line_end];
            let spaces = line.bytes().take_while(|&b| b == b' ').count();
            if line.trim().is_empty() {
                lines.push("");
                p = line_end;
                continue;
            }
            if spaces == 0
                && (line.starts_with("---") || line.starts_with("..."))
                && line.as_bytes().get(3).map_or(true, |&b| is_blank(b))
            {
                break;
            }
            let ind = match indent {
                Some(i) => i,
                None => {
                    if (spaces as isize) <= parent_indent {
                        break;
                    }
                    indent = Some(spaces);
                    spaces
                }
            };
            if spaces < ind {
                break;
            }
            lines.push(&line[ind..]);
            content_end = line_end;
            p = line_end;
        }
        self.pos = content_end;

        let last = lines.iter().rposition(|l| !l.is_empty());
        let (body, trailing) = match last {
            Some(i) => (&lines[..=i], lines.len() - i - 1),
            None => (&lines[..0], lines.len()),
        };
        let mut value = if literal { body.join("\n") } else { fold_lines(body) };
        match chomp {
            Chomp::Strip => {}
            Chomp::Clip => {
                if !body.is_empty() {
                    value.push('\n');
                }
            }
            Chomp::Keep => {
                if !body.is_empty() {
                    value.push('\n');
                }
                for _ in 0..trailing {
                    value.push('\n');
                }
            }
        }
        let style = if literal {
            ScalarStyle::Literal
        } else {
            ScalarStyle::Folded
        };
        Ok(self.push(
            NodeValue::Scalar(Scalar {
                value,
                kind: ScalarType::Str,
                style,
            }),
            Span::new(start, content_end),
        ))
    }

    fn parse_alias(&mut self) -> Result<NodeId> {
        let start = self.pos;
        self.pos += 1;
        let name = self.scan_name();
        if name.is_empty() {
            return Err(self.error("empty alias name"));
        }
        let Some(&target) = self.anchors.get(&name) else {
            return Err(self.error(format!("unknown anchor `{name}`")));
        };
        Ok(self.push(NodeValue::Alias { name, target }, Span::new(start, self.pos)))
    }

    // ── flow context ─────────────────────────────────────────────────────

    fn parse_flow_node(&mut self) -> Result<NodeId> {
        let props = self.parse_properties(true)?;
        if !props.is_empty() {
            self.skip_space();
        }
        let node = match self.peek() {
            Some(b'{') => self.parse_flow_mapping()?,
            Some(b'[') => self.parse_flow_sequence()?,
            Some(b'"') => self.parse_double_quoted()?,
            Some(b'\'') => self.parse_single_quoted()?,
            Some(b'*') => self.parse_alias()?,
            Some(b',' | b']' | b'}') if !props.is_empty() => self.empty_scalar(props.end),
            None => return Err(self.error("unexpected end of input in flow collection")),
            _ => self.parse_plain_line(true)?,
        };
        self.attach_props(node, props)?;
        Ok(node)
    }

    fn parse_flow_mapping(&mut self) -> Result<NodeId> {
        let start = self.pos;
        self.pos += 1;
        let mut coll: Collection<Pair> = Collection::new(CollectionStyle::Flow);
        loop {
            self.skip_space();
            match self.peek() {
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(self.error("unterminated flow mapping")),
                _ => {}
            }
            let key_start = self.pos;
            let key = self.parse_flow_node()?;
            let key_end = self.span_end(key);
            self.skip_space();
            let (sep, value) = if self.peek() == Some(b':') {
                let colon = self.pos;
                self.pos += 1;
                self.skip_space();
                let value = if matches!(self.peek(), Some(b',' | b'}')) {
                    self.empty_scalar(colon + 1)
                } else {
                    self.parse_flow_node()?
                };
                (Some(colon), value)
            } else {
                (None, self.empty_scalar(key_end))
            };
            let end = self.span_end(value);
            let index = coll.slots.len();
            coll.slots.push(Slot {
                start: key_start,
                key: Some(key),
                key_end,
                sep,
                value,
                end,
                line_end: end,
            });
            coll.entries.push(Pair {
                key,
                value,
                slot: Some(index),
            });
            self.skip_space();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error("expected ',' or '}' in flow mapping")),
            }
        }
        Ok(self.push(NodeValue::Mapping(coll), Span::new(start, self.pos)))
    }

    fn parse_flow_sequence(&mut self) -> Result<NodeId> {
        let start = self.pos;
        self.pos += 1;
        let mut coll: Collection<Item> = Collection::new(CollectionStyle::Flow);
        loop {
            self.skip_space();
            match self.peek() {
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(self.error("unterminated flow sequence")),
                _ => {}
            }
            let item_start = self.pos;
            let value = self.parse_flow_node()?;
            let end = self.span_end(value);
            self.skip_space();
            if self.peek() == Some(b':') {
                return Err(self.error("single-pair mappings in flow sequences are not supported"));
            }
            let index = coll.slots.len();
            coll.slots.push(Slot {
                start: item_start,
                key: None,
                key_end: item_start,
                sep: None,
                value,
                end,
                line_end: end,
            });
            coll.entries.push(Item {
                value,
                slot: Some(index),
            });
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error("expected ',' or ']' in flow sequence")),
            }
        }
        Ok(self.push(NodeValue::Sequence(coll), Span::new(start, self.pos)))
    }
}

/// Line folding for `>` block scalars.
fn fold_lines(lines: &[&str]) -> String {
    let mut out = String::new();
    let mut first = true;
    let mut prev_more = false;
    let mut pending = 0usize;
    for line in lines {
        if line.is_empty() {
            pending += 1;
            continue;
        }
        let more = line.starts_with([' ', '\t']);
        if first {
            for _ in 0..pending {
                out.push('\n');
            }
        } else if pending == 0 {
            out.push(if more || prev_more { '\n' } else { ' ' });
        } else {
            if more || prev_more {
                out.push('\n');
            }
            for _ in 0..pending {
                out.push('\n');
            }
        }
        out.push_str(line);
        first = false;
        prev_more = more;
        pending = 0;
    }
    out
}
