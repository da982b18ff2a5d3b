mod common;

use common::{load, registry, Criterion, CriterionCore, CriterionExpressionType, Operation, Parameter};
use docmodel::pointer::validate;
use docmodel::{
    decode, locate, marshal, set_node, Document, EncodeOptions, Either, Error, FindingKind, Model, Navigator, Order,
    Reference, Reusable, Unmarshalled,
};
use proptest::prelude::*;
use serde_json::json;

const OPERATION: &str = "\
# Fetch a user
operationId: getUser   # primary
x-audit: &audit {level: 2}
parameters:
  - reference: '#/components/parameters/userId'
  - name: id
    in: path
    value: 123
successCriteria:
  - condition: $statusCode == 200
    type: simple
  - condition: $.items.length > 0
    context: $response.body
    type:
      type: jsonpath
      version: draft-00
outputs:
  user: $response.body#/user   # whole body
  id: $response.body#/id
";

fn write(model: &mut Operation, document: &mut Document) -> String {
    let out = marshal(model, document, &registry(), &EncodeOptions::default()).unwrap();
    String::from_utf8(out.bytes).unwrap()
}

// ── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn scalar_field_present_and_union_absent() {
    let doc = Document::parse("condition: $statusCode == 200\n").unwrap();
    let (core, findings) = decode::<CriterionCore>(&doc, &registry()).unwrap();
    assert!(findings.is_empty());
    assert!(core.condition.present);
    assert_eq!(core.condition.value, "$statusCode == 200");
    assert!(!core.type_.present);
    assert!(core.state.valid);
}

#[test]
fn reusable_parameters_decode_by_reference_key() {
    let out = load::<Operation>(OPERATION);
    assert!(out.findings.is_empty(), "{:?}", out.findings);
    let items = out.model.core().parameters.get().unwrap();

    let Reusable::Reference(reference) = &items[0].value else {
        panic!("expected a reference, got {:?}", items[0].value);
    };
    assert!(reference.reference.present);
    assert_eq!(reference.reference.value, "#/components/parameters/userId");
    assert!(!reference.value.present);

    let Reusable::Inline(parameter) = &items[1].value else {
        panic!("expected an inline parameter, got {:?}", items[1].value);
    };
    assert_eq!(parameter.name.value, "id");
    assert_eq!(parameter.in_.value, "path");
    assert_eq!(parameter.value.value, "123");
    assert!(parameter.state.valid);

    assert_eq!(
        out.model.parameters[0].reference().map(|r| r.reference.as_str()),
        Some("#/components/parameters/userId")
    );
    assert_eq!(out.model.parameters[1].inline().map(|p| p.value.as_deref()), Some(Some("123")));
}

#[test]
fn either_decodes_by_shape_matrix() {
    // (type value, expected high-level type, findings)
    let cases: [(&str, Option<Either<String, (&str, &str)>>, &[FindingKind]); 4] = [
        ("type: simple\n", Some(Either::Left("simple".to_string())), &[]),
        (
            "type: {type: jsonpath, version: draft-00}\n",
            Some(Either::Right(("jsonpath", "draft-00"))),
            &[],
        ),
        ("type: [a]\n", Some(Either::Left(String::new())), &[FindingKind::TypeMismatch]),
        ("context: x\n", None, &[]),
    ];
    for (tail, expected, findings) in cases {
        let src = format!("condition: $statusCode == 200\n{tail}");
        let out = load::<Criterion>(&src);
        let kinds: Vec<FindingKind> = out.findings.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, findings, "findings of {src:?}");
        let actual = out.model.type_.as_ref().map(|t| match t {
            Either::Left(s) => Either::Left(s.clone()),
            Either::Right(e) => Either::Right((e.type_.as_str(), e.version.as_str())),
        });
        assert_eq!(actual, expected, "type of {src:?}");
        assert_eq!(out.model.core().state.valid, findings.is_empty(), "valid of {src:?}");
    }
}

#[test]
fn union_mismatch_names_both_alternatives() {
    let out = load::<Criterion>("condition: x\ntype: [a]\n");
    assert_eq!(out.findings[0].message, "expected string or mapping, found sequence");
    assert!(!out.model.core().type_.valid);
}

#[test]
fn nested_findings_stay_with_the_nested_model() {
    let out = load::<Operation>("operationId: op\nparameters:\n  - name: id\n    in: body\n");
    let kinds: Vec<FindingKind> = out.findings.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, [FindingKind::PatternMismatch]);
    let core = out.model.core();
    assert!(core.state.valid);
    let param = core.parameters.get().unwrap()[0].value.inline().unwrap();
    assert!(!param.state.valid);
    assert!(!param.in_.valid);
}

#[test]
fn nested_shape_errors_invalidate_the_parent() {
    let out = load::<Operation>("operationId: op\nparameters:\n  - just-a-string\n");
    assert_eq!(out.findings.len(), 1);
    assert_eq!(out.findings[0].kind, FindingKind::TypeMismatch);
    assert!(!out.model.core().state.valid);
}

// ── Preservation ────────────────────────────────────────────────────────────

#[test]
fn unmodified_models_write_back_identically() {
    let Unmarshalled {
        mut model,
        mut document,
        ..
    } = load::<Operation>(OPERATION);
    assert_eq!(write(&mut model, &mut document), OPERATION);
    assert_eq!(write(&mut model, &mut document), OPERATION);
}

#[test]
fn json_documents_write_back_identically() {
    let src = "{\n  \"operationId\": \"op\",\n  \"outputs\": {\n    \"a\": \"$x\"\n  }\n}\n";
    let Unmarshalled {
        mut model,
        mut document,
        ..
    } = load::<Operation>(src);
    assert_eq!(write(&mut model, &mut document), src);
}

#[test]
fn one_edit_rewrites_one_line() {
    let Unmarshalled {
        mut model,
        mut document,
        ..
    } = load::<Operation>(OPERATION);
    model.success_criteria[0].condition = "$statusCode == 201".to_string();
    let expected = OPERATION.replace("$statusCode == 200", "$statusCode == 201");
    assert_eq!(write(&mut model, &mut document), expected);
}

#[test]
fn union_branches_switch_shape() {
    let Unmarshalled {
        mut model,
        mut document,
        ..
    } = load::<Criterion>("condition: ok\ntype: simple\n");
    model.type_ = Some(Either::Right(CriterionExpressionType::new("jsonpath", "draft-00")));
    let out = marshal(&mut model, &mut document, &registry(), &EncodeOptions::default()).unwrap();
    assert_eq!(
        String::from_utf8(out.bytes).unwrap(),
        "condition: ok\ntype:\n  type: jsonpath\n  version: draft-00\n"
    );
    assert!(model.type_.as_ref().is_some_and(Either::is_right));

    model.type_ = Some(Either::Left("regex".to_string()));
    let out = marshal(&mut model, &mut document, &registry(), &EncodeOptions::default()).unwrap();
    assert_eq!(String::from_utf8(out.bytes).unwrap(), "condition: ok\ntype: regex\n");
}

#[test]
fn reusable_branches_switch_shape() {
    let Unmarshalled {
        mut model,
        mut document,
        ..
    } = load::<Operation>(OPERATION);
    model.parameters[0] = Reusable::Inline(Parameter::new("userId", "query"));
    model.parameters[1] = Reusable::Reference(Reference::new("#/components/parameters/id"));
    let written = write(&mut model, &mut document);
    let again = load::<Operation>(&written);
    assert!(again.findings.is_empty(), "{:?}", again.findings);
    assert_eq!(again.model.parameters[0].inline().map(|p| p.in_.as_str()), Some("query"));
    assert_eq!(
        again.model.parameters[1].reference().map(|r| r.reference.as_str()),
        Some("#/components/parameters/id")
    );
    assert!(written.contains("operationId: getUser   # primary\n"));
}

#[test]
fn removing_an_item_keeps_the_others_verbatim() {
    let src = OPERATION.replace("  - name: id\n", "  - name: id # the id\n");
    let Unmarshalled {
        mut model,
        mut document,
        ..
    } = load::<Operation>(&src);
    model.parameters.remove(0);
    let expected = src.replace("  - reference: '#/components/parameters/userId'\n", "");
    assert_eq!(write(&mut model, &mut document), expected);

    model.success_criteria.swap(0, 1);
    let written = write(&mut model, &mut document);
    let again = load::<Operation>(&written);
    assert_eq!(again.model.success_criteria[0].context.as_deref(), Some("$response.body"));
    assert_eq!(again.model.success_criteria[1].condition, "$statusCode == 200");
}

#[test]
fn keyed_collections_keep_their_order() {
    let Unmarshalled {
        mut model,
        mut document,
        ..
    } = load::<Operation>(OPERATION);
    assert_eq!(model.outputs.keys().collect::<Vec<_>>(), ["user", "id"]);
    model.outputs.set("user".to_string(), "$response.body#/data".to_string());
    model.outputs.set("etag".to_string(), "$response.header.ETag".to_string());
    let written = write(&mut model, &mut document);
    assert!(written.contains("outputs:\n  user: $response.body#/data   # whole body\n"));
    assert!(written.ends_with("  id: $response.body#/id\n  etag: $response.header.ETag\n"));
    let sorted: Vec<&String> = model.outputs.all_ordered(Order::KeyAsc).map(|(k, _)| k).collect();
    assert_eq!(sorted, ["etag", "id", "user"]);
}

#[test]
fn aliased_values_decode_through_the_anchor() {
    let src = "operationId: op\nx-shared: &loc {name: id, in: path}\nparameters:\n  - *loc\n";
    let Unmarshalled {
        mut model,
        mut document,
        findings,
    } = load::<Operation>(src);
    assert!(findings.is_empty(), "{findings:?}");
    assert_eq!(model.parameters[0].inline().map(|p| p.name.as_str()), Some("id"));
    assert_eq!(model.extensions.get("x-shared"), Some(&json!({"name": "id", "in": "path"})));
    assert_eq!(write(&mut model, &mut document), src);
}

// ── Navigation ──────────────────────────────────────────────────────────────

#[test]
fn pointers_reach_through_both_layers() {
    let out = load::<Operation>(OPERATION);
    let doc = &out.document;
    let core = out.model.core();
    let criteria = core.success_criteria.get().unwrap();
    let type_node = criteria[1].value.type_.value_node.unwrap();
    let first_param = doc.item(core.parameters.value_node.unwrap(), 0).unwrap();
    let audit = doc.get(doc.root().unwrap(), "x-audit").unwrap();
    let cases = [
        ("/operationId", core.operation_id.value_node.unwrap()),
        ("/successCriteria/1/type", type_node),
        ("/successCriteria/1/type/version", doc.get(type_node, "version").unwrap()),
        ("/parameters/0/reference", doc.get(first_param, "reference").unwrap()),
        ("/outputs/id", doc.get(core.outputs.value_node.unwrap(), "id").unwrap()),
        ("/x-audit/level", doc.get(audit, "level").unwrap()),
    ];
    for (pointer, expected) in cases {
        assert_eq!(locate(doc, &out.model, pointer).unwrap(), expected, "pointer {pointer:?}");
        assert_eq!(locate(doc, core, pointer).unwrap(), expected, "core pointer {pointer:?}");
    }
    assert!(locate(doc, &out.model, "/successCriteria/0/context").is_err());
    assert!(locate(doc, &out.model, "/parameters/0/name").is_err());
}

#[test]
fn pointers_see_unsaved_edits() {
    let Unmarshalled { mut model, document, .. } = load::<Operation>(OPERATION);
    model.operation_id = "renamed".to_string();
    model.outputs.set("added".to_string(), "$inputs.x".to_string());
    model.extensions.set("x-new".to_string(), json!({"on": true}));
    let nav = Navigator::new(&document);

    let target = nav.get(&model, "/operationId").unwrap();
    assert!(std::ptr::addr_eq(target.value().unwrap(), &model.operation_id));
    assert!(nav.get(&model, "/outputs/added").is_ok());
    assert!(nav.get(&model, "/x-new/on").is_ok());
    assert!(nav.get(&model, "/parameters/1/in").is_ok());

    // Node lookups still answer from the last decode.
    let core = model.core();
    assert_eq!(
        locate(&document, &model, "/operationId").unwrap(),
        core.operation_id.value_node.unwrap()
    );
    assert!(matches!(locate(&document, &model, "/outputs/added"), Err(Error::Pointer(_))));
    assert!(locate(&document, &model, "/x-audit/level").is_ok());
}

#[test]
fn raw_edits_are_visible_after_a_redecode() {
    let Unmarshalled { mut document, .. } = load::<Operation>(OPERATION);
    let node = document.new_string("listUsers");
    set_node(&mut document, "/operationId", node).unwrap();
    let bytes = document.to_bytes(&EncodeOptions::default());
    let again = load::<Operation>(std::str::from_utf8(&bytes).unwrap());
    assert_eq!(again.model.operation_id, "listUsers");
}

#[test]
fn malformed_pointers_are_rejected() {
    assert!(validate("/a//b").is_err());
    assert!(validate("/a/~/b").is_err());
    assert!(validate("/a/~1b/~0c").is_ok());
}

proptest! {
    #[test]
    fn appended_outputs_round_trip(keys in proptest::collection::vec("[a-z]{1,6}", 0..5)) {
        let Unmarshalled { mut model, mut document, .. } = load::<Operation>(OPERATION);
        for key in &keys {
            model.outputs.add(format!("k{key}"), format!("$inputs.{key}"));
        }
        let written = write(&mut model, &mut document);
        prop_assert!(written.starts_with("# Fetch a user\noperationId: getUser   # primary\n"));
        let again = load::<Operation>(&written);
        prop_assert!(again.model.outputs.is_equal(&model.outputs));
    }
}
