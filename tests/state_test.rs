//! End-to-end tests for collecting, observing and writing back state.
//!
//! These run against the todo-list fixture through the public API only.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{Value, json};

use domstate::{
    Binding, Document, Error, Extracted, LiveState, Manifest, Reader, Subscription, Values, apply,
    collect, observe,
};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("{}/{}", FIXTURES_DIR, name)).expect("fixture should exist")
}

fn todos() -> (Document, Manifest) {
    let doc = Document::parse(&fixture("todos.html"));
    let manifest = Manifest::from_json(&fixture("todos.manifest.json")).expect("valid manifest");
    (doc, manifest)
}

fn values(pairs: &[(&str, Value)]) -> Values {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn test_fixture_state() {
    let (doc, manifest) = todos();
    let state = collect(&doc, &manifest);

    assert_eq!(
        state.to_json(),
        json!({
            "ids": ["1", "2", "3"],
            "owners": ["ada", "grace", "ada"],
            "done": "Add tests",
            "title": "hi",
            "urgent": false,
            "count": "3 items",
            "missing": null
        })
    );
    assert!(state.errors().is_empty());
}

#[test]
fn test_three_items_read_as_array() {
    let doc = Document::parse(r#"<li data-id="1"></li><li data-id="2"></li><li data-id="3"></li>"#);
    let manifest = Manifest::new().bind("items", Binding::new("li", "data:id"));
    assert_eq!(
        collect(&doc, &manifest).get("items"),
        Some(&Extracted::Many(vec![json!("1"), json!("2"), json!("3")]))
    );
}

#[test]
fn test_missing_selector_reads_null() {
    let doc = Document::parse("<p>x</p>");
    let manifest = Manifest::new().bind("x", Binding::new(".missing", "text"));
    assert_eq!(collect(&doc, &manifest).to_json(), json!({ "x": null }));
}

#[test]
fn test_input_value() {
    let doc = Document::parse(r#"<input id="t" value="hi">"#);
    let manifest = Manifest::new().bind("t", Binding::new("input#t", "value"));
    assert_eq!(collect(&doc, &manifest).get("t"), Some(&Extracted::One(json!("hi"))));
}

#[test]
fn test_custom_reader_sees_subtree() {
    let (doc, _) = todos();
    let manifest = Manifest::new().bind(
        "todos",
        Binding::new(
            "li",
            Reader::map(|node| {
                json!({
                    "id": node.dataset("id"),
                    "done": node.has_class("done"),
                    "title": node.text_content()
                })
            }),
        ),
    );
    let state = collect(&doc, &manifest);
    assert_eq!(
        state.to_json()["todos"][1],
        json!({ "id": "2", "done": true, "title": "Add tests" })
    );
}

#[test]
fn test_one_bad_key_does_not_spoil_the_rest() {
    let (doc, manifest) = todos();
    let manifest = manifest
        .bind("broken", Binding::new("li:nth-child(", "text"))
        .bind("unknown", Binding::new("#count", "innerHTML"));
    let state = collect(&doc, &manifest);

    assert_eq!(state.get("broken"), Some(&Extracted::Null));
    assert_eq!(state.get("unknown"), Some(&Extracted::Null));
    assert_eq!(state.get("title"), Some(&Extracted::One(json!("hi"))));
    assert_eq!(state.errors().len(), 1);
    assert!(matches!(
        state.into_result(),
        Err(Error::UnknownShortcut(ref s)) if s == "innerHTML"
    ));
}

// ============================================================================
// Observation
// ============================================================================

#[test]
fn test_inserted_item_is_seen_after_flush() {
    let doc = Document::parse("<div id=\"root\"></div>");
    let manifest = Rc::new(Manifest::new().bind("items", Binding::new(".item", "text")));
    let seen = Rc::new(RefCell::new(Vec::new()));

    let weak = doc.downgrade();
    let reads = Rc::clone(&seen);
    let inner = Rc::clone(&manifest);
    let _sub = observe(&doc, &manifest, move || {
        if let Some(doc) = weak.upgrade() {
            reads.borrow_mut().push(collect(&doc, &inner).to_json());
        }
    });

    let root = doc.select("#root").unwrap()[0];
    doc.mutate(root, |n| n.append_html(r#"<span class="item">New</span>"#));
    assert!(seen.borrow().is_empty());

    doc.flush();
    assert_eq!(*seen.borrow(), vec![json!({ "items": "New" })]);
}

#[test]
fn test_many_mutations_one_notification() {
    let (doc, manifest) = todos();
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let _sub = observe(&doc, &manifest, move || seen.set(seen.get() + 1));

    let list = doc.select("#todos").unwrap()[0];
    for i in 4..20 {
        let id = i.to_string();
        doc.mutate(list, |n| {
            n.append_element("li", &[("class", "todo"), ("data-id", id.as_str())]);
        });
    }
    let count = doc.select("#count").unwrap()[0];
    doc.mutate(count, |n| n.set_text("19 items"));

    assert_eq!(doc.flush(), 1);
    assert_eq!(calls.get(), 1);
    assert_eq!(doc.flush(), 0);
}

#[test]
fn test_unsubscribe_is_idempotent_and_final() {
    let (doc, manifest) = todos();
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let sub: Subscription = observe(&doc, &manifest, move || seen.set(seen.get() + 1));

    let count = doc.select("#count").unwrap()[0];
    doc.mutate(count, |n| n.set_text("changed"));
    sub.unsubscribe();
    sub.unsubscribe();
    doc.flush();
    drop(sub);

    assert_eq!(calls.get(), 0);
    assert_eq!(doc.observer_count(), 0);
}

#[test]
fn test_independent_documents() {
    let (a, manifest) = todos();
    let (b, _) = todos();
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let _sub = observe(&a, &manifest, move || seen.set(seen.get() + 1));

    let count = b.select("#count").unwrap()[0];
    b.mutate(count, |n| n.set_text("elsewhere"));
    b.flush();
    a.flush();
    assert_eq!(calls.get(), 0);
    assert_eq!(collect(&a, &manifest).to_json()["count"], json!("3 items"));
}

// ============================================================================
// Write-back
// ============================================================================

#[test]
fn test_apply_then_collect() {
    let (doc, manifest) = todos();
    let written = apply(
        &doc,
        &manifest,
        &values(&[
            ("title", json!("Buy milk")),
            ("urgent", json!(true)),
            ("count", json!(4)),
        ]),
    )
    .unwrap();
    assert_eq!(written, 3);

    let state = collect(&doc, &manifest).to_json();
    assert_eq!(state["title"], json!("Buy milk"));
    assert_eq!(state["urgent"], json!(true));
    assert_eq!(state["count"], json!("4"));
}

#[test]
fn test_apply_without_single_target_changes_nothing() {
    let (doc, _) = todos();
    let manifest = Manifest::new()
        .bind("ids", Binding::new("#todos li", "data:id").with_write("data:id"))
        .bind("gone", Binding::new("#gone", "text").with_write("text"));
    let before = doc.to_html();

    let written = apply(&doc, &manifest, &values(&[("ids", json!("9")), ("gone", json!("x"))])).unwrap();
    assert_eq!(written, 0);
    assert_eq!(doc.to_html(), before);
}

#[test]
fn test_write_is_visible_after_notification() {
    let (doc, manifest) = todos();
    let live = LiveState::new(&doc, Rc::new(manifest));
    let renders = Rc::new(Cell::new(0));
    let seen = Rc::clone(&renders);
    live.on_change(move || seen.set(seen.get() + 1));

    live.write(&values(&[("title", json!("typed"))])).unwrap();
    doc.flush();

    assert_eq!(renders.get(), 1);
    assert_eq!(live.snapshot().get("title"), Some(&Extracted::One(json!("typed"))));
}

#[test]
fn test_live_state_resubscribes_on_new_manifest() {
    let (doc, manifest) = todos();
    let manifest = Rc::new(manifest);
    let mut live = LiveState::new(&doc, Rc::clone(&manifest));

    assert!(!live.set_manifest(Rc::clone(&manifest)));
    let narrowed = Rc::new(Manifest::new().bind("count", Binding::new("#count", "text")));
    assert!(live.set_manifest(narrowed));
    assert_eq!(doc.observer_count(), 1);
    assert_eq!(live.snapshot().to_json(), json!({ "count": "3 items" }));
}
