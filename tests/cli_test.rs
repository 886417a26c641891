//! Tests for the `domstate` command-line tool.

#![cfg(feature = "cli")]

use std::fs;
use std::process::Command;

use serde_json::{Value, json};
use tempfile::TempDir;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> String {
    format!("{}/{}", FIXTURES_DIR, name)
}

fn domstate() -> Command {
    Command::new(env!("CARGO_BIN_EXE_domstate"))
}

#[test]
fn test_prints_state() {
    let output = domstate()
        .arg(fixture_path("todos.html"))
        .arg(fixture_path("todos.manifest.json"))
        .output()
        .expect("failed to run domstate");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let state: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(state["ids"], json!(["1", "2", "3"]));
    assert_eq!(state["title"], json!("hi"));
    assert_eq!(state["missing"], Value::Null);
}

#[test]
fn test_apply_values() {
    let dir = TempDir::new().unwrap();
    let values = dir.path().join("values.json");
    fs::write(&values, r#"{ "title": "Buy milk", "urgent": true }"#).unwrap();

    let output = domstate()
        .arg(fixture_path("todos.html"))
        .arg(fixture_path("todos.manifest.json"))
        .arg("--apply")
        .arg(&values)
        .output()
        .expect("failed to run domstate");
    assert!(output.status.success());

    let state: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(state["title"], json!("Buy milk"));
    assert_eq!(state["urgent"], json!(true));
}

#[test]
fn test_html_output() {
    let dir = TempDir::new().unwrap();
    let values = dir.path().join("values.json");
    fs::write(&values, r#"{ "count": "none left" }"#).unwrap();

    let output = domstate()
        .arg(fixture_path("todos.html"))
        .arg(fixture_path("todos.manifest.json"))
        .arg("--apply")
        .arg(&values)
        .arg("--html")
        .output()
        .expect("failed to run domstate");
    assert!(output.status.success());

    let html = String::from_utf8_lossy(&output.stdout);
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains(r#"<p id="count">none left</p>"#));
}

#[test]
fn test_html_output_keeps_form_writes() {
    let dir = TempDir::new().unwrap();
    let values = dir.path().join("values.json");
    fs::write(&values, r#"{ "title": "Buy milk", "urgent": true }"#).unwrap();

    let output = domstate()
        .arg(fixture_path("todos.html"))
        .arg(fixture_path("todos.manifest.json"))
        .arg("--apply")
        .arg(&values)
        .arg("--html")
        .output()
        .expect("failed to run domstate");
    assert!(output.status.success());

    let html = String::from_utf8_lossy(&output.stdout);
    assert!(html.contains(r#"<input id="t" name="title" value="Buy milk">"#));
    assert!(html.contains(r#"<input id="urgent" type="checkbox" checked="">"#));
}

#[test]
fn test_logic_error_fails() {
    let dir = TempDir::new().unwrap();
    let manifest = dir.path().join("manifest.json");
    fs::write(&manifest, r##"{ "c": { "selector": "#count", "read": "outerHTML" } }"##).unwrap();

    let output = domstate()
        .arg(fixture_path("todos.html"))
        .arg(&manifest)
        .output()
        .expect("failed to run domstate");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown shortcut"));
}

#[test]
fn test_missing_file_fails() {
    let output = domstate()
        .arg(fixture_path("nope.html"))
        .arg(fixture_path("todos.manifest.json"))
        .output()
        .expect("failed to run domstate");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error: I/O error"));
}
