use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use serde_json::{Value, json};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SIGNUP_SCHEMA: &str = r#"
fields:
  - name: email
    type: string
    description: contact address
    transforms: [trim, lowercase]
    rules:
      - rule: required
      - rule: email
  - name: age
    type: integer
    default: 25
    rules:
      - rule: min
        value: 18
        message: too young
  - name: newsletter
    type: boolean
  - name: address
    type: object
    fields:
      - name: city
        type: string
        rules:
          - rule: required
"#;

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("failed to write fixture");
    path
}

fn databind(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_databind"))
        .args(args)
        .output()
        .expect("failed to run databind")
}

fn check(schema: &PathBuf, payload: &PathBuf, extra: &[&str]) -> Output {
    let mut args = vec![
        "check",
        "--schema",
        schema.to_str().unwrap(),
        "--payload",
        payload.to_str().unwrap(),
    ];
    args.extend_from_slice(extra);
    databind(&args)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn test_check_valid_json_payload() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "signup.yaml", SIGNUP_SCHEMA);
    let payload = write_file(
        &dir,
        "payload.json",
        r#"{"email": "  Ada@Example.COM ", "newsletter": "yes", "address": {"city": "Oslo"}}"#,
    );

    let out = check(&schema, &payload, &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let record: Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(
        record,
        json!({
            "email": "ada@example.com",
            "age": 25,
            "newsletter": true,
            "address": {"city": "Oslo"},
        })
    );
}

#[test]
fn test_check_form_payload() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "signup.yaml", SIGNUP_SCHEMA);
    let payload = write_file(&dir, "payload.txt", "email=b%40example.com&age=40");

    let out = check(
        &schema,
        &payload,
        &["--content-type", "application/x-www-form-urlencoded"],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let record: Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(record["email"], "b@example.com");
    assert_eq!(record["age"], 40);
}

#[test]
fn test_check_reports_errors_as_text() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "signup.yaml", SIGNUP_SCHEMA);
    let payload = write_file(&dir, "payload.json", r#"{"email": "nope", "age": 12}"#);

    let out = check(&schema, &payload, &[]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(
        stdout(&out),
        "email: value must be a valid email address\nage: too young\n"
    );
    assert!(stderr(&out).contains("error: 2 field error(s)"));
}

#[test]
fn test_check_reports_errors_as_json() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "signup.yaml", SIGNUP_SCHEMA);
    let payload = write_file(&dir, "payload.json", r#"{"age": "old", "address": {}}"#);

    let out = check(&schema, &payload, &["--format", "json"]);
    assert_eq!(out.status.code(), Some(1));

    let errors: Value = serde_json::from_str(&stdout(&out)).unwrap();
    let fields: Vec<(&str, &str)> = errors
        .as_array()
        .unwrap()
        .iter()
        .map(|e| (e["field"].as_str().unwrap(), e["phase"].as_str().unwrap()))
        .collect();
    assert_eq!(
        fields,
        [
            ("age", "assign"),
            ("address", "assign"),
            ("email", "validate"),
        ]
    );
    assert_eq!(errors[2]["description"], "contact address");
}

#[test]
fn test_check_skip_validation() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "signup.yaml", SIGNUP_SCHEMA);
    let payload = write_file(&dir, "payload.json", r#"{"age": 3}"#);

    let out = check(&schema, &payload, &["--skip-validation"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let record: Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(record, json!({"age": 3}));
}

#[test]
fn test_check_reads_stdin() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "signup.yaml", SIGNUP_SCHEMA);

    let mut child = Command::new(env!("CARGO_BIN_EXE_databind"))
        .args(["check", "--schema", schema.to_str().unwrap(), "--payload", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn databind");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(br#"{"email": "c@example.com"}"#)
        .unwrap();
    let out = child.wait_with_output().unwrap();

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let record: Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(record["email"], "c@example.com");
}

#[test]
fn test_check_rejects_non_object_payload() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "signup.yaml", SIGNUP_SCHEMA);
    let payload = write_file(&dir, "payload.json", "[1, 2]");

    let out = check(&schema, &payload, &["--content-type", "application/json"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(
        stderr(&out).contains("error: payload error: expected a JSON object, got array"),
        "stderr: {}",
        stderr(&out)
    );
}

#[test]
fn test_check_enforces_body_limit() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "signup.yaml", SIGNUP_SCHEMA);
    let payload = write_file(&dir, "payload.json", r#"{"email": "d@example.com"}"#);

    let out = check(&schema, &payload, &["--limit", "8"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("error: payload error:"));
}

#[test]
fn test_check_date_default_uses_field_format() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(
        &dir,
        "event.yaml",
        "fields:\n  - name: starts_on\n    type: date\n    format: \"%d.%m.%Y\"\n    default: \"01.02.2025\"\n    rules:\n      - rule: required\n",
    );
    let payload = write_file(&dir, "payload.json", "{}");

    let out = check(&schema, &payload, &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let record: Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(record, json!({"starts_on": "2025-02-01"}));
}

#[test]
fn test_check_rejects_bad_definition() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(
        &dir,
        "bad.yaml",
        "fields:\n  - name: code\n    type: string\n    rules:\n      - rule: pattern\n        value: \"(\"\n",
    );
    let payload = write_file(&dir, "payload.json", "{}");

    let out = check(&schema, &payload, &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("invalid pattern for field 'code'"));
}

#[test]
fn test_check_missing_schema_file() {
    let dir = TempDir::new().unwrap();
    let payload = write_file(&dir, "payload.json", "{}");

    let out = check(&dir.path().join("missing.yaml"), &payload, &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("error: I/O error:"));
}

// ---------------------------------------------------------------------------
// describe
// ---------------------------------------------------------------------------

#[test]
fn test_describe_lists_fields() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(&dir, "signup.yaml", SIGNUP_SCHEMA);

    let out = databind(&["describe", "--schema", schema.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "email (scalar): contact address\n\
         age (scalar)\n\
         newsletter (scalar)\n\
         address (object)\n  \
         city (scalar)\n"
    );
}
