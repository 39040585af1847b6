//! End-to-end matching scenarios.

use schematch::{Guard, Handler, MatchFault, Matcher, Predicate, Schema, Validator};
use serde_json::{json, Value};
use std::sync::Arc;

fn shared(schema: Schema) -> Arc<dyn Validator> {
    Arc::new(schema)
}

fn result_matcher() -> Matcher<&'static str> {
    Matcher::new()
        .case(
            Schema::object()
                .field("type", Schema::literal("ok"))
                .field("value", Schema::number()),
            Handler::constant("ok"),
        )
        .case(
            Schema::object()
                .field("type", Schema::literal("err"))
                .field("message", Schema::string()),
            Handler::constant("err"),
        )
        .case(
            Schema::object()
                .field("type", Schema::literal("err"))
                .field("code", Schema::integer()),
            Handler::constant("err-code"),
        )
}

// ====== Literal and Fallthrough Tests ======

#[test]
fn test_literals_before_general_case() {
    let m = Matcher::new()
        .case_any(
            vec![shared(Schema::literal(2)), shared(Schema::literal(3))],
            None,
            Handler::constant("small"),
        )
        .unwrap()
        .case(Schema::number(), Handler::constant("other"));

    assert_eq!(m.run(&json!(3)).unwrap(), "small");
    assert_eq!(m.run(&json!(2)).unwrap(), "small");
    assert_eq!(m.run(&json!(9)).unwrap(), "other");
}

#[test]
fn test_guard_selects_between_same_schema() {
    let m = Matcher::new()
        .case_guarded(
            Schema::number(),
            Guard::new(|n, _| n.as_f64().is_some_and(|n| n > 10.0)),
            Handler::constant("big"),
        )
        .case(Schema::number(), Handler::constant("small"));

    assert_eq!(m.run(&json!(12)).unwrap(), "big");
    assert_eq!(m.run(&json!(4)).unwrap(), "small");
}

// ====== Discriminator Diagnostics Tests ======

#[test]
fn test_unknown_discriminator_value() {
    let m = result_matcher();
    let err = m.try_run(&json!({"type": "unknown"})).unwrap().unwrap_err();

    let info = err.discriminator.clone().unwrap();
    assert_eq!(info.key, "type");
    assert_eq!(info.value, Some(json!("unknown")));
    assert_eq!(info.expected, vec![json!("ok"), json!("err")]);
    assert!(!info.matched);
    assert!(err.issues.is_empty());
}

#[test]
fn test_known_discriminator_reports_only_its_case() {
    let m = result_matcher();
    let err = m
        .try_run(&json!({"type": "ok", "value": "not-a-number"}))
        .unwrap()
        .unwrap_err();

    let info = err.discriminator.clone().unwrap();
    assert!(info.matched);
    assert_eq!(info.value, Some(json!("ok")));
    assert_eq!(err.cases(), vec![0]);
    assert_eq!(err.schemas.len(), 1);

    let issues = err.issues_for_case(0);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].issue.path.to_string(), "value");
    assert_eq!(issues[0].issue.code, "invalid_type");
}

#[test]
fn test_shared_value_reports_every_registered_case() {
    let m = result_matcher();
    let err = m.try_run(&json!({"type": "err"})).unwrap().unwrap_err();
    assert_eq!(err.cases(), vec![1, 2]);
    assert!(err.message.contains("case 1 schema 0"));
    assert!(err.message.contains("case 2 schema 0"));
}

#[test]
fn test_discriminated_matches_route_correctly() {
    let m = result_matcher();
    assert_eq!(m.run(&json!({"type": "ok", "value": 1})).unwrap(), "ok");
    assert_eq!(m.run(&json!({"type": "err", "message": "x"})).unwrap(), "err");
    assert_eq!(m.run(&json!({"type": "err", "code": 7})).unwrap(), "err-code");
}

// ====== Degenerate Inputs Tests ======

#[test]
fn test_no_schemas_gives_generic_message() {
    let mut deep = json!({});
    for _ in 0..500 {
        deep = json!({ "next": deep });
    }

    let empty: Matcher<()> = Matcher::new();
    let err = empty.try_run(&deep).unwrap().unwrap_err();
    assert!(err.issues.is_empty());
    assert!(err.message.starts_with("no schema matches"));
    assert!(err.message.contains("<unprintable input>"));

    let only_when: Matcher<()> =
        Matcher::new().when(Predicate::new(|_| false), Handler::constant(()));
    let err = only_when.try_run(&json!(1)).unwrap().unwrap_err();
    assert!(err.message.starts_with("no schema matches"));
}

#[test]
fn test_run_raises_unmatched() {
    let m = result_matcher();
    match m.run(&json!(42)) {
        Err(MatchFault::Unmatched(err)) => {
            assert_eq!(err.input, json!(42));
            // Non-object input: every schema is re-validated.
            assert_eq!(err.cases(), vec![0, 1, 2]);
            assert!(err.discriminator.is_none());
        }
        other => panic!("expected Unmatched, got {:?}", other),
    }
}

#[test]
fn test_run_or_else_receives_input() {
    let m = result_matcher();
    let out = m
        .run_or_else(&json!({"type": "zzz"}), |input: &Value, diagnostics| {
            assert_eq!(input["type"], "zzz");
            if diagnostics.get().discriminator.is_some() {
                "fallback"
            } else {
                "unexpected"
            }
        })
        .unwrap();
    assert_eq!(out, "fallback");
}
