//! Lossless encoding.
//!
//! Untouched regions are copied from the source byte for byte. An edited
//! collection keeps the text around each surviving entry, drops the region
//! of each removed entry and appends new entries in the collection's own
//! style, so comments and blank lines next to unchanged entries survive.
//! A collection whose surviving entries were reordered, or that gained an
//! entry ahead of a surviving one, is rendered again as a whole.

use crate::document::Document;
use crate::node::{Collection, CollectionStyle, Entry, NodeId, NodeValue, ScalarStyle, Slot, Span};
use crate::options::{EncodeOptions, Format};
use crate::render::{spaces, Renderer};

impl Document {
    /// Serializes the document.
    ///
    /// With default options the output keeps the source format, indentation
    /// and comments; an unedited document encodes to exactly its input.
    pub fn encode(&self, options: &EncodeOptions) -> String {
        let format = options.format.unwrap_or(self.format);
        let indent = options.indent.unwrap_or(self.indent).max(1);
        let restyle = format != self.format || indent != self.indent;
        let renderer = Renderer::new(self, format, indent, options.quote_style, restyle);
        if restyle {
            tracing::trace!(format = ?format, indent, "re-rendering document");
            return renderer.document();
        }
        let requote = options.quote_style.is_some() && format == Format::Yaml;
        let mut emitter = Emitter {
            doc: self,
            r: renderer,
            requote,
            out: String::with_capacity(self.source.len()),
        };
        emitter.document();
        emitter.out
    }

    pub fn to_bytes(&self, options: &EncodeOptions) -> Vec<u8> {
        self.encode(options).into_bytes()
    }
}

struct Emitter<'d> {
    doc: &'d Document,
    r: Renderer<'d>,
    /// Source string scalars are rendered again in the requested quote style.
    requote: bool,
    out: String,
}

impl<'d> Emitter<'d> {
    fn document(&mut self) {
        let doc = self.doc;
        let src = doc.source.as_str();
        match (doc.source_root, doc.root) {
            (Some(old), Some(new)) => {
                let Some(span) = doc.span(old) else {
                    self.out.push_str(&self.r.document());
                    return;
                };
                self.out.push_str(&src[..span.start]);
                if old == new {
                    self.node(new, false);
                } else {
                    let text = self.r.root(new);
                    self.out.push_str(&text);
                }
                self.out.push_str(&src[span.end..]);
            }
            (None, Some(new)) => {
                self.out.push_str(src);
                if !src.is_empty() && !src.ends_with('\n') {
                    self.out.push('\n');
                }
                let text = self.r.root(new);
                self.out.push_str(&text);
                self.out.push('\n');
            }
            (_, None) => self.out.push_str(src),
        }
    }

    fn node(&mut self, id: NodeId, in_flow: bool) {
        let doc = self.doc;
        let Some(data) = doc.data(id) else {
            return;
        };
        let Some(span) = data.span else {
            let text = self.r.inline(id, in_flow);
            self.out.push_str(&text);
            return;
        };
        if doc.is_pristine(id) && !self.requote {
            self.out.push_str(&doc.source[span.start..span.end]);
            return;
        }
        match &data.value {
            NodeValue::Mapping(c) => self.collection(id, span, c),
            NodeValue::Sequence(c) => self.collection(id, span, c),
            // Block scalars keep their block form.
            NodeValue::Scalar(s) if self.requote && !matches!(s.style, ScalarStyle::Literal | ScalarStyle::Folded) => {
                let text = self.r.inline(id, in_flow);
                self.out.push_str(&text);
            }
            _ => self.out.push_str(&doc.source[span.start..span.end]),
        }
    }

    fn collection<E: Entry>(&mut self, id: NodeId, span: Span, coll: &Collection<E>) {
        let doc = self.doc;
        let src = doc.source.as_str();
        let flow = coll.style == CollectionStyle::Flow;
        let kept: Vec<usize> = coll.entries.iter().filter_map(|e| e.slot()).collect();
        let in_order = kept.windows(2).all(|w| w[0] < w[1]);
        // New entries can only be written after the surviving ones.
        let appended_last = coll
            .entries
            .iter()
            .skip_while(|e| e.slot().is_some())
            .all(|e| e.slot().is_none());
        let ordered = in_order && appended_last;
        let (Some(first), Some(&last_kept), true) = (coll.slots.first(), kept.last(), ordered) else {
            let text = self.rewrite(id, span, flow);
            self.out.push_str(&text);
            return;
        };

        let entry_col = doc.column(first.start);
        self.out.push_str(&src[span.start..first.start]);
        let mut cursor = first.start;
        for (i, slot) in coll.slots.iter().enumerate() {
            let region_end = coll.slots.get(i + 1).map_or(slot.line_end, |next| next.start);
            if let Some(entry) = coll.entries.iter().find(|e| e.slot() == Some(i)) {
                self.entry(slot, entry, entry_col, flow);
                let tail_end = if i == last_kept { slot.line_end } else { region_end };
                self.out.push_str(&src[slot.end..tail_end]);
            }
            cursor = region_end;
        }

        let multiline = flow && src[span.start..first.start].contains('\n');
        for entry in coll.entries.iter().filter(|e| e.slot().is_none()) {
            let text = if flow {
                let sep = if multiline {
                    format!(",\n{}", spaces(entry_col))
                } else {
                    ", ".to_string()
                };
                let body = match entry.key() {
                    Some(key) => format!("{}: {}", self.r.key(key), self.r.flow_child(entry.value(), entry_col)),
                    None => self.r.flow_child(entry.value(), entry_col),
                };
                format!("{sep}{body}")
            } else {
                let body = match entry.key() {
                    Some(key) => self.r.block_pair(key, entry.value(), entry_col),
                    None => self.r.block_item(entry.value(), entry_col),
                };
                format!("\n{}{body}", spaces(entry_col))
            };
            self.out.push_str(&text);
        }
        self.out.push_str(&src[cursor..span.end]);
    }

    /// Re-renders a whole collection in place.
    fn rewrite(&self, id: NodeId, span: Span, flow: bool) -> String {
        let doc = self.doc;
        if self.r.json {
            return self.r.json(id, doc.line_indent(span.start));
        }
        if flow || doc.child_count(id) == 0 {
            return self.r.inline(id, flow);
        }
        self.r.block(id, doc.column(span.start))
    }

    fn entry<E: Entry>(&mut self, slot: &Slot, entry: &E, col: usize, flow: bool) {
        let doc = self.doc;
        let src = doc.source.as_str();
        let mut from = slot.start;
        if let Some(key) = entry.key() {
            if slot.key == Some(key) && doc.is_pristine(key) && !self.requote {
                self.out.push_str(&src[slot.start..slot.key_end]);
            } else {
                let text = self.r.key(key);
                self.out.push_str(&text);
            }
            from = slot.key_end;
        }

        let value = entry.value();
        if value == slot.value {
            let value_start = doc.span(value).map_or(slot.end, |s| s.start);
            self.out.push_str(&src[from..value_start]);
            self.node(value, flow);
            return;
        }

        let text = match slot.sep {
            Some(sep) => {
                let head = &src[from..=sep];
                let tail = if flow {
                    format!(" {}", self.r.flow_child(value, col))
                } else if entry.key().is_some() {
                    self.r.after_colon(value, col)
                } else {
                    self.r.after_dash(value, col)
                };
                format!("{head}{tail}")
            }
            None if entry.key().is_some() => format!(": {}", self.r.flow_child(value, col)),
            None => self.r.flow_child(value, col),
        };
        self.out.push_str(&text);
    }
}

#[cfg(test)]
mod tests {
    use crate::{Document, EncodeOptions};
    use serde_json::json;

    fn encode(doc: &Document) -> String {
        doc.encode(&EncodeOptions::default())
    }

    #[test]
    fn untouched_document_is_identical() {
        let src = "# top\na: 1 # one\n\nb:\n  - x   # keep\n  - {y: 2}\n";
        let doc = Document::parse(src).unwrap();
        assert_eq!(encode(&doc), src);
    }

    #[test]
    fn replaced_scalar_keeps_comment() {
        let mut doc = Document::parse("a: 1 # one\nb: 2\n").unwrap();
        let root = doc.root().unwrap();
        let v = doc.from_json(&json!(5));
        doc.set_value(root, "a", v).unwrap();
        assert_eq!(encode(&doc), "a: 5 # one\nb: 2\n");
    }

    #[test]
    fn appended_pair_uses_entry_indent() {
        let mut doc = Document::parse("outer:\n    a: 1\nz: 0\n").unwrap();
        let root = doc.root().unwrap();
        let outer = doc.get(root, "outer").unwrap();
        let v = doc.from_json(&json!({"k": [1, 2]}));
        doc.set_value(outer, "b", v).unwrap();
        assert_eq!(
            encode(&doc),
            "outer:\n    a: 1\n    b:\n        k:\n            - 1\n            - 2\nz: 0\n"
        );
    }

    #[test]
    fn removed_pairs_take_their_comments() {
        let mut doc = Document::parse("a: 1\n# about b\nb: 2 # two\nc: 3\n").unwrap();
        let root = doc.root().unwrap();
        doc.remove_key(root, "c").unwrap();
        assert_eq!(encode(&doc), "a: 1\n# about b\nb: 2 # two\n");
        doc.remove_key(root, "b").unwrap();
        assert_eq!(encode(&doc), "a: 1\n");
    }

    #[test]
    fn json_edits_stay_json() {
        let src = "{\n  \"a\": 1,\n  \"b\": [true]\n}\n";
        let mut doc = Document::parse(src).unwrap();
        let root = doc.root().unwrap();
        let v = doc.from_json(&json!({"x": "y"}));
        doc.set_value(root, "c", v).unwrap();
        assert_eq!(
            encode(&doc),
            "{\n  \"a\": 1,\n  \"b\": [true],\n  \"c\": {\n    \"x\": \"y\"\n  }\n}\n"
        );
    }

    #[test]
    fn flow_sequence_edits() {
        let mut doc = Document::parse("tags: [a, b, c]\n").unwrap();
        let root = doc.root().unwrap();
        let tags = doc.get(root, "tags").unwrap();
        doc.remove_item(tags, 2).unwrap();
        let d = doc.new_string("d e");
        doc.push_item(tags, d).unwrap();
        assert_eq!(encode(&doc), "tags: [a, b, d e]\n");
    }

    #[test]
    fn format_switch_re_renders() {
        let doc = Document::parse("a: 1\nb: [x, 'y']\n").unwrap();
        let json = doc.encode(&EncodeOptions::json());
        assert_eq!(json, "{\n  \"a\": 1,\n  \"b\": [\n    \"x\",\n    \"y\"\n  ]\n}\n");
    }

    #[test]
    fn new_root_on_empty_document() {
        let mut doc = Document::new();
        let root = doc.from_json(&json!({"a": {"b": "c"}}));
        doc.set_root(root).unwrap();
        assert_eq!(encode(&doc), "a:\n  b: c\n");
    }
}
