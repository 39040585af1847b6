//! Tests for sharing matchers and compiled plans across threads.

use schematch::{compile_matcher, Handler, Matcher, Schema, Validator};
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn shapes() -> Matcher<String> {
    Matcher::new()
        .case(
            Schema::object()
                .field("type", Schema::literal("circle"))
                .field("r", Schema::number().positive()),
            Handler::new(|v, _| format!("circle {}", v["r"])),
        )
        .case(
            Schema::object()
                .field("type", Schema::literal("square"))
                .field("side", Schema::number().positive()),
            Handler::new(|v, _| format!("square {}", v["side"])),
        )
}

#[test]
fn test_concurrent_matching() {
    let m = Arc::new(shapes());

    let handles: Vec<_> = (1..=10)
        .map(|i| {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                let input = if i % 2 == 0 {
                    json!({"type": "circle", "r": i})
                } else {
                    json!({"type": "square", "side": i})
                };
                let out = m.run(&input).unwrap();
                assert!(out.ends_with(&i.to_string()));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_table_construction() {
    let m = shapes();

    let tables: Vec<_> = (0..8)
        .map(|_| {
            let m = m.clone();
            thread::spawn(move || m.dispatch_table().unwrap())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    assert!(tables.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[test]
fn test_concurrent_diagnostics() {
    let m = Arc::new(shapes());

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                let err = m.try_run(&json!({"type": "circle", "r": -1})).unwrap().unwrap_err();
                assert_eq!(err.cases(), vec![0]);
                assert!(err.discriminator.unwrap().matched);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_shared_schema_compiles_once() {
    let schema: Arc<dyn Validator> = Arc::new(Schema::string().min_len(3));

    let matchers: Vec<_> = (0..8)
        .map(|_| {
            let schema = Arc::clone(&schema);
            thread::spawn(move || compile_matcher(&schema))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    assert!(matchers.windows(2).all(|w| w[0].same_plan(&w[1])));
}
