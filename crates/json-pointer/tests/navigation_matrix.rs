use docmodel_json_pointer::{
    format_json_pointer, parse_json_pointer, validate, FieldRef, JsonPointerError, KeyNavigable,
    NavigableNoder, NavigateOptions, Navigable, Navigator, StepError, StructView, Structure, Target,
    ValidationError,
};
use docmodel_yaml::{Document, NodeId};
use proptest::prelude::*;
use serde_json::json;

// ── Fixtures ───────────────────────────────────────────────────────────────

struct Operation {
    summary: String,
    operation_id: String,
    root: Option<NodeId>,
}

impl Navigable for Operation {
    fn structure(&self) -> Structure<'_> {
        Structure::Struct(StructView {
            fields: vec![
                FieldRef {
                    name: "summary",
                    key: "summary",
                    tags: &[],
                    value: &self.summary,
                },
                FieldRef {
                    name: "operation_id",
                    key: "operationId",
                    tags: &[("json", "opId")],
                    value: &self.operation_id,
                },
            ],
            extra: None,
            root_node: self.root,
        })
    }
}

/// Resolves every key to the same operation, like a catch-all router.
struct Router {
    op: Operation,
}

impl Navigable for Router {
    fn structure(&self) -> Structure<'_> {
        Structure::Leaf
    }

    fn as_key_navigable(&self) -> Option<&dyn KeyNavigable> {
        Some(self)
    }
}

impl KeyNavigable for Router {
    fn navigate_key(&self, key: &str) -> Result<Target<'_>, StepError> {
        if key.starts_with('/') {
            Ok(Target::Value(&self.op))
        } else {
            Err(StepError::NotFound)
        }
    }
}

/// Delegates to its inner value.
struct Wrapper {
    inner: serde_json::Value,
}

impl Navigable for Wrapper {
    fn structure(&self) -> Structure<'_> {
        Structure::Leaf
    }

    fn as_navigable_noder(&self) -> Option<&dyn NavigableNoder> {
        Some(self)
    }
}

impl NavigableNoder for Wrapper {
    fn navigable_node(&self) -> Result<Target<'_>, StepError> {
        Ok(Target::Value(&self.inner))
    }
}

/// An edited operation: its fields as they are now, backed by the operation
/// it was decoded as.
struct Draft {
    summary: String,
    extensions: serde_json::Map<String, serde_json::Value>,
    decoded: Operation,
}

impl Navigable for Draft {
    fn structure(&self) -> Structure<'_> {
        Structure::Struct(StructView {
            fields: vec![FieldRef {
                name: "summary",
                key: "summary",
                tags: &[],
                value: &self.summary,
            }],
            extra: Some(&self.extensions),
            root_node: self.decoded.root,
        })
    }

    fn decoded(&self) -> Option<&dyn Navigable> {
        Some(&self.decoded)
    }
}

fn leaf_str(target: Target<'_>) -> bool {
    matches!(target.value().map(|v| v.structure()), Some(Structure::Leaf))
}

// ── Scenario C ─────────────────────────────────────────────────────────────

#[test]
fn empty_tokens_and_bad_escapes_are_rejected() {
    assert_eq!(
        validate("/a//b"),
        Err(ValidationError::EmptyToken { position: 1 })
    );
    assert_eq!(
        validate("/a/~/b"),
        Err(ValidationError::InvalidEscape {
            token: "~".to_string()
        })
    );
}

// ── Dispatch ───────────────────────────────────────────────────────────────

#[test]
fn struct_fields_match_tag_then_name() {
    let op = Operation {
        summary: "List pets".to_string(),
        operation_id: "listPets".to_string(),
        root: None,
    };
    let nav = Navigator::detached();
    assert!(leaf_str(nav.get(&op, "/operationId").unwrap()));
    assert!(leaf_str(nav.get(&op, "/operation_id").unwrap()));
    assert!(matches!(
        nav.get(&op, "/opId"),
        Err(JsonPointerError::NotFound { .. })
    ));

    let json_tags = Navigator::detached().with_options(NavigateOptions {
        struct_tag: "json".to_string(),
    });
    assert!(leaf_str(json_tags.get(&op, "/opId").unwrap()));
}

#[test]
fn unmatched_struct_tokens_fall_back_to_the_raw_tree() {
    let doc = Document::parse("summary: List pets\nx-internal:\n  owner: team-a\n").unwrap();
    let op = Operation {
        summary: "List pets".to_string(),
        operation_id: String::new(),
        root: doc.root(),
    };
    let nav = Navigator::new(&doc);
    let owner = nav.get(&op, "/x-internal/owner").unwrap().node().unwrap();
    assert_eq!(doc.scalar(owner).unwrap().value, "team-a");
}

#[test]
fn values_read_current_fields_and_nodes_read_the_decoded_layer() {
    let doc = Document::parse("summary: old\nx-a: 1\n").unwrap();
    let root = doc.root().unwrap();
    let mut extensions = serde_json::Map::new();
    extensions.insert("x-b".to_string(), json!(2));
    let draft = Draft {
        summary: "new".to_string(),
        extensions,
        decoded: Operation {
            summary: "old".to_string(),
            operation_id: String::new(),
            root: Some(root),
        },
    };
    let nav = Navigator::new(&doc);

    let summary = nav.get(&draft, "/summary").unwrap().value().unwrap();
    assert!(std::ptr::addr_eq(summary, &draft.summary));
    assert!(leaf_str(nav.get(&draft, "/x-b").unwrap()));
    assert_eq!(nav.get(&draft, "/x-a").unwrap().node(), doc.get(root, "x-a"));

    assert_eq!(nav.get_node(&draft, "/").unwrap(), root);
    assert_eq!(nav.get_node(&draft, "/x-a").ok(), doc.get(root, "x-a"));
    assert!(matches!(
        nav.get_node(&draft, "/x-b"),
        Err(JsonPointerError::NotFound { .. })
    ));
}

#[test]
fn key_capability_wins_over_structure() {
    let router = Router {
        op: Operation {
            summary: "s".to_string(),
            operation_id: "o".to_string(),
            root: None,
        },
    };
    let nav = Navigator::detached();
    assert!(leaf_str(nav.get(&router, "/~1pets/summary").unwrap()));
    assert!(matches!(
        nav.get(&router, "/pets"),
        Err(JsonPointerError::NotFound { .. })
    ));
    // No index capability and a leaf structure: index tokens are a shape error.
    assert!(matches!(
        nav.get(&router, "/0"),
        Err(JsonPointerError::InvalidPath { .. })
    ));
}

#[test]
fn alternate_node_is_followed_before_each_step_and_at_the_end() {
    let wrapper = Wrapper {
        inner: json!({"a": {"b": [true]}}),
    };
    let nav = Navigator::detached();
    assert!(leaf_str(nav.get(&wrapper, "/a/b/0").unwrap()));
    let whole = nav.get(&wrapper, "/").unwrap();
    assert!(matches!(
        whole.value().map(|v| v.structure()),
        Some(Structure::Map(_))
    ));
}

#[test]
fn shape_mismatches_matrix() {
    let value = json!({"map": {"k": 1}, "list": [1, 2], "scalar": "x", "nil": null});
    let nav = Navigator::detached();
    let cases = [
        ("/map/0", "invalid"),
        ("/list/k", "invalid"),
        ("/scalar/k", "invalid"),
        ("/nil/k", "missing"),
        ("/map/missing", "missing"),
        ("/list/2", "missing"),
        ("/list/01", "invalid"),
        ("/list/99999999999999999999999", "missing"),
    ];
    for (pointer, expected) in cases {
        let err = nav.get(&value, pointer).unwrap_err();
        let kind = match err {
            JsonPointerError::NotFound { .. } => "missing",
            JsonPointerError::InvalidPath { .. } => "invalid",
            other => panic!("{pointer}: unexpected {other}"),
        };
        assert_eq!(kind, expected, "{pointer}");
    }
}

#[test]
fn raw_tree_uses_token_text_for_mapping_keys() {
    let doc = Document::parse("responses:\n  200:\n    description: ok\n  '404':\n    description: gone\n").unwrap();
    let nav = Navigator::new(&doc);
    for pointer in ["/responses/200/description", "/responses/404/description"] {
        assert!(nav.get(&doc, pointer).unwrap().node().is_some(), "{pointer}");
    }
}

#[test]
fn oversized_indices_are_missing_in_raw_sequences() {
    let mut doc = Document::parse("list: [a, b]\n").unwrap();
    let nav = Navigator::new(&doc);
    let pointer = "/list/99999999999999999999999";
    assert!(matches!(nav.get(&doc, pointer), Err(JsonPointerError::NotFound { .. })));
    assert!(matches!(nav.get(&doc, "/list/x"), Err(JsonPointerError::InvalidPath { .. })));
    assert!(matches!(
        docmodel_json_pointer::remove_node(&mut doc, pointer),
        Err(JsonPointerError::NotFound { .. })
    ));
}

// ── Round trip ─────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn pointer_round_trip(parts in proptest::collection::vec("[a-z~/0-9]{1,6}", 0..6)) {
        let pointer = format_json_pointer(&parts);
        prop_assert!(validate(&pointer).is_ok());
        prop_assert_eq!(parse_json_pointer(&pointer).unwrap(), parts);
    }
}
