mod common;

use common::{registry, Tag, TagCore};
use docmodel_marshaller::pointer::{NavigateOptions, Navigator};
use docmodel_marshaller::yaml::{Document, EncodeOptions};
use docmodel_marshaller::{
    decode, locate, marshal, unmarshal, CoreModel, Error, FindingKind, Model, Registry, Unmarshalled,
};
use proptest::prelude::*;
use serde_json::json;

fn load(src: &str) -> Unmarshalled<Tag> {
    unmarshal::<Tag>(src.as_bytes(), &registry()).unwrap_or_else(|e| panic!("{src:?}: {e}"))
}

fn kinds(out: &Unmarshalled<Tag>) -> Vec<FindingKind> {
    out.findings.iter().map(|f| f.kind).collect()
}

// ── Decode ──────────────────────────────────────────────────────────────────

#[test]
fn unmarshal_populates_both_layers() {
    let out = load("name: pets\ndescription: All pets\nlabels: [a, b]\nx-owner: team\n");
    assert!(out.findings.is_empty(), "{:?}", out.findings);
    assert_eq!(out.model.name, "pets");
    assert_eq!(out.model.description.as_deref(), Some("All pets"));
    assert_eq!(out.model.labels, ["a", "b"]);
    assert_eq!(out.model.extensions.get("x-owner"), Some(&json!("team")));

    let core = out.model.core();
    assert!(core.state.valid && core.state.valid_yaml);
    assert_eq!(core.state.root_node, out.document.root());
    assert_eq!(core.present_fields(), ["name", "description", "labels"]);
    assert_eq!(core.name.key.as_deref(), Some("name"));
    let labels = core.labels.get().unwrap();
    assert_eq!(labels[1].value, "b");
    assert_eq!(out.document.scalar(labels[1].value_node.unwrap()).unwrap().value, "b");
}

#[test]
fn absent_and_null_are_distinct() {
    let out = load("name: pets\ndescription:\n");
    let core = out.model.core();
    assert!(core.description.present);
    assert_eq!(core.description.value, "");
    assert!(!core.labels.present);
    assert_eq!(core.labels.value_node, None);
    assert_eq!(out.model.description.as_deref(), Some(""));
    assert!(out.model.labels.is_empty());
}

#[test]
fn findings_matrix() {
    // (source, findings, valid, valid_yaml)
    let cases: [(&str, &[FindingKind], bool, bool); 7] = [
        ("name: pets\n", &[], true, true),
        ("description: x\n", &[FindingKind::RequiredFieldMissing], false, true),
        ("name: Pets\n", &[FindingKind::PatternMismatch], false, true),
        ("name: pets\ncolor: red\n", &[FindingKind::UnknownProperty], true, true),
        ("name: pets\nlabels: nope\n", &[FindingKind::TypeMismatch], false, true),
        ("name: pets\nlabels: [a, [b]]\n", &[FindingKind::TypeMismatch], false, true),
        ("- name: pets\n", &[FindingKind::TypeMismatch], false, false),
    ];
    for (src, expected, valid, valid_yaml) in cases {
        let out = load(src);
        assert_eq!(kinds(&out), expected, "findings of {src:?}");
        let state = &out.model.core().state;
        assert_eq!(state.valid, valid, "valid of {src:?}");
        assert_eq!(state.valid_yaml, valid_yaml, "valid_yaml of {src:?}");
    }
}

#[test]
fn findings_carry_positions() {
    let out = load("name: pets\nlabels:\n  - a\n  - [b]\n");
    let finding = &out.findings[0];
    assert_eq!(finding.message, "expected string, found sequence");
    let pos = finding.position.unwrap();
    assert_eq!((pos.line, pos.column), (4, 5));
    assert!(finding.to_string().starts_with("type-mismatch: expected string"));
    assert!(!out.model.core().labels.valid);
}

#[test]
fn pattern_failures_invalidate_only_their_field() {
    let out = load("name: Pets\ndescription: fine\n");
    let core = out.model.core();
    assert!(!core.name.valid);
    assert!(core.description.valid);
    assert_eq!(core.name.value, "Pets");
}

#[test]
fn empty_documents_decode_to_an_empty_core() {
    let doc = Document::parse("").unwrap();
    let (core, findings) = decode::<TagCore>(&doc, &registry()).unwrap();
    assert!(!core.state.valid);
    assert!(!core.state.valid_yaml);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].node, None);
}

#[test]
fn json_sources_decode_like_yaml() {
    let out = load("{\"name\": \"pets\", \"labels\": [\"a\"], \"x-n\": {\"k\": 1}}");
    assert!(out.findings.is_empty());
    assert_eq!(out.model.labels, ["a"]);
    assert_eq!(out.model.extensions.get("x-n"), Some(&json!({"k": 1})));
}

#[test]
fn merge_keys_feed_declared_fields() {
    let out = load("<<: {name: pets, description: inherited}\ndescription: own\n");
    assert!(out.findings.is_empty(), "{:?}", out.findings);
    assert_eq!(out.model.name, "pets");
    assert_eq!(out.model.description.as_deref(), Some("own"));
}

#[test]
fn unregistered_models_are_fatal() {
    let bare = Registry::builder().build();
    match unmarshal::<Tag>(b"name: pets\n", &bare) {
        Err(Error::UnregisteredType { type_name }) => assert!(type_name.ends_with("TagCore")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn parse_errors_are_fatal() {
    assert!(matches!(unmarshal::<Tag>(b"name: [pets\n", &registry()), Err(Error::Parse(_))));
}

// ── Sync ────────────────────────────────────────────────────────────────────

#[test]
fn untouched_models_marshal_byte_for_byte() {
    let sources = [
        "# tag\nname: pets # id\nlabels:\n  - a\n  - b\nx-owner: team\n",
        "name: 'pets'\ndescription: \"quoted\"\nunknown: kept\n",
        "{\"name\": \"pets\", \"labels\": []}",
        "<<: {name: pets}\ndescription: own\n",
    ];
    for src in sources {
        let Unmarshalled {
            mut model,
            mut document,
            ..
        } = load(src);
        let out = marshal(&mut model, &mut document, &registry(), &EncodeOptions::default()).unwrap();
        assert_eq!(String::from_utf8(out.bytes).unwrap(), src);
    }
}

#[test]
fn edits_touch_only_their_fields() {
    let Unmarshalled {
        mut model,
        mut document,
        ..
    } = load("name: pets # id\ndescription: old\nx-owner: team\n");
    model.description = Some("new".to_string());
    model.extensions.delete("x-owner");
    let out = marshal(&mut model, &mut document, &registry(), &EncodeOptions::default()).unwrap();
    assert_eq!(String::from_utf8(out.bytes).unwrap(), "name: pets # id\ndescription: new\n");
    assert!(out.findings.is_empty());
    assert_eq!(model.core().description.value, "new");
    assert!(model.core().state.extensions.is_empty());
}

#[test]
fn cleared_fields_are_removed_and_zero_values_not_added() {
    let Unmarshalled {
        mut model,
        mut document,
        ..
    } = load("name: pets\ndescription: old\n");
    model.description = None;
    let out = marshal(&mut model, &mut document, &registry(), &EncodeOptions::default()).unwrap();
    assert_eq!(String::from_utf8(out.bytes).unwrap(), "name: pets\n");
}

#[test]
fn new_values_are_appended_and_decode_back() {
    let Unmarshalled {
        mut model,
        mut document,
        ..
    } = load("name: pets\n");
    model.labels = vec!["a".to_string(), "b".to_string()];
    model.extensions.set("x-rank".to_string(), json!(3));
    let out = marshal(&mut model, &mut document, &registry(), &EncodeOptions::default()).unwrap();
    let again = load(std::str::from_utf8(&out.bytes).unwrap());
    assert_eq!(again.model.labels, ["a", "b"]);
    assert_eq!(again.model.extensions.get("x-rank"), Some(&json!(3)));
    assert_eq!(model.labels, again.model.labels);
    assert!(model.core().labels.present);
}

#[test]
fn merged_only_fields_get_a_local_override() {
    let Unmarshalled {
        mut model,
        mut document,
        ..
    } = load("<<: {name: pets}\ndescription: own\n");
    model.name = "cats".to_string();
    let out = marshal(&mut model, &mut document, &registry(), &EncodeOptions::default()).unwrap();
    assert_eq!(
        String::from_utf8(out.bytes).unwrap(),
        "<<: {name: pets}\ndescription: own\nname: cats\n"
    );
    assert_eq!(model.name, "cats");
}

#[test]
fn new_models_marshal_into_empty_documents() {
    let mut model = Tag::new("fresh");
    model.description = Some("made here".to_string());
    let mut document = Document::new();
    let out = marshal(&mut model, &mut document, &registry(), &EncodeOptions::default()).unwrap();
    let again = load(std::str::from_utf8(&out.bytes).unwrap());
    assert_eq!(again.model.name, "fresh");
    assert_eq!(again.model.description.as_deref(), Some("made here"));
    assert!(!again.model.core().labels.present);
    assert_eq!(model.core().state.root_node, document.root());
}

#[test]
fn foreign_documents_are_rejected() {
    let mut model = load("name: pets\n").model;
    let mut other = Document::new();
    let err = marshal(&mut model, &mut other, &registry(), &EncodeOptions::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidTarget { .. }));
}

#[test]
fn output_format_can_be_overridden() {
    let Unmarshalled {
        mut model,
        mut document,
        ..
    } = load("name: pets\nlabels: [a]\n");
    let out = marshal(&mut model, &mut document, &registry(), &EncodeOptions::json()).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&out.bytes).unwrap();
    assert_eq!(value, json!({"name": "pets", "labels": ["a"]}));
}

// ── Navigation ──────────────────────────────────────────────────────────────

#[test]
fn locate_matrix() {
    let out = load("name: pets\nlabels: [a, b]\nx-owner: team\n");
    let core = out.model.core();
    let doc = &out.document;
    let labels = core.labels.get().unwrap();
    let cases = [
        ("/", doc.root().unwrap()),
        ("/name", core.name.value_node.unwrap()),
        ("/labels", core.labels.value_node.unwrap()),
        ("/labels/1", labels[1].value_node.unwrap()),
        ("/x-owner", doc.get(doc.root().unwrap(), "x-owner").unwrap()),
    ];
    for (pointer, expected) in cases {
        assert_eq!(locate(doc, &out.model, pointer).unwrap(), expected, "pointer {pointer:?}");
    }
    assert!(matches!(locate(doc, &out.model, ""), Err(Error::Pointer(_))));
    assert!(locate(doc, &out.model, "/description").is_err());
    assert!(locate(doc, &out.model, "/labels/5").is_err());
    assert!(locate(doc, &out.model, "/name/deeper").is_err());
}

#[test]
fn navigation_honours_the_configured_tag() {
    let out = load("name: pets\nlabels: [a]\n");
    let nav = Navigator::new(&out.document).with_options(NavigateOptions {
        struct_tag: "json".to_string(),
    });
    let node = nav.get_node(&out.model, "/tags/0").unwrap();
    assert_eq!(out.document.scalar(node).unwrap().value, "a");
}

proptest! {
    #[test]
    fn description_edits_survive_a_round_trip(text in "[a-z][a-z0-9 ]{0,12}[a-z0-9]") {
        let Unmarshalled { mut model, mut document, .. } = load("name: pets # keep\ndescription: seed\n");
        model.description = Some(text.clone());
        let out = marshal(&mut model, &mut document, &registry(), &EncodeOptions::default()).unwrap();
        let written = String::from_utf8(out.bytes).unwrap();
        prop_assert!(written.starts_with("name: pets # keep\n"));
        let again = load(&written);
        prop_assert_eq!(again.model.description, Some(text));
    }
}
