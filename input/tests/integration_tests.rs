use std::collections::BTreeMap;

use databind_core::*;
use databind_input::{DEFAULT_BODY_LIMIT, decode, decode_request};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq)]
struct Line {
    sku: String,
    qty: u32,
}

#[derive(Debug, Default)]
struct Order {
    customer: String,
    express: bool,
    lines: BTreeMap<String, Line>,
}

fn order_schema() -> Schema<Order> {
    Schema::new()
        .field(
            Scalar::new("customer", |o: &mut Order| &mut o.customer)
                .transformer(trim())
                .validator(required()),
        )
        .field(Scalar::new("express", |o: &mut Order| &mut o.express))
        .field(
            IndexedMap::new("lines", |o: &mut Order| &mut o.lines, |line| {
                line.field(Scalar::new("sku", |l: &mut Line| &mut l.sku).validator(required()))
                    .field(Scalar::new("qty", |l: &mut Line| &mut l.qty).validator(min(1)))
            })
            .validator(required()),
        )
}

// ---------------------------------------------------------------------------
// Form and JSON bodies bind the same way
// ---------------------------------------------------------------------------

#[test]
fn test_form_body_binds_indexed_lines() {
    let body = b"customer=+Ada+&express=on&lines[a][sku]=X-1&lines[a][qty]=2\
                 &lines[b][sku]=Y-9&lines[b][qty]=1&customer=ignored";
    let data = decode(
        Some("application/x-www-form-urlencoded"),
        body,
        DEFAULT_BODY_LIMIT,
    )
    .unwrap();

    let mut order = Order::default();
    order_schema().apply(&data, &mut order).unwrap();

    assert_eq!(order.customer, "Ada");
    assert!(order.express);
    assert_eq!(order.lines.len(), 2);
    assert_eq!(
        order.lines["a"],
        Line {
            sku: "X-1".into(),
            qty: 2
        }
    );
}

#[test]
fn test_json_body_binds_nested_lines() {
    let body = br#"{"customer": "Ada", "express": false, "lines": {"a": {"sku": "X-1", "qty": 0}}}"#;
    let data = decode(Some("application/json"), body, DEFAULT_BODY_LIMIT).unwrap();

    let mut order = Order::default();
    let errors = order_schema().apply(&data, &mut order).unwrap_err();
    let phases: Vec<Phase> = errors.iter().map(|e| e.phase).collect();
    assert_eq!(phases, [Phase::Assign]);
    assert_eq!(
        errors.to_string(),
        "lines: entry \"a\": qty: value must be at least 1"
    );
}

#[test]
fn test_query_payload_for_get() {
    let data = decode_request(
        "GET",
        "?customer=Bob&lines[1][sku]=Z&lines[1][qty]=3",
        None,
        b"",
        DEFAULT_BODY_LIMIT,
    )
    .unwrap();

    let mut order = Order::default();
    let binding = order_schema().run(&data, &mut order);
    assert!(binding.is_ok(), "{}", binding.errors());
    assert!(binding.run().was_present("lines"));
    assert_eq!(order.lines["1"].qty, 3);
}

#[test]
fn test_missing_lines_is_required_error() {
    let data = decode(None, b"customer=Cy", DEFAULT_BODY_LIMIT).unwrap();
    let mut order = Order::default();
    let errors = order_schema().apply(&data, &mut order).unwrap_err();
    assert_eq!(errors.to_string(), "lines: field is required");
}

#[test]
fn test_non_object_kinds_match_core_names() {
    for body in ["null", "true", "1.5", "\"text\"", "[1]"] {
        let value: serde_json::Value = serde_json::from_str(body).unwrap();
        let err = decode(Some("application/json"), body.as_bytes(), DEFAULT_BODY_LIMIT)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("expected a JSON object, got {}", kind_of(&value)),
        );
    }
}
