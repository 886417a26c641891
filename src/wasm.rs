//! WASM bindings for extracting state in the browser or a worker.
//!
//! These functions take HTML and manifest JSON as strings and return JSON
//! strings, so no DOM bindings are needed on the JavaScript side.

use wasm_bindgen::prelude::*;

use crate::{Document, Manifest, Values, apply, collect};

/// Initialize panic hook for better error messages in the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js(e: crate::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Collect the state of `html` described by `manifest_json`.
///
/// Returns the state as a JSON object string.
#[wasm_bindgen]
pub fn collect_html(html: &str, manifest_json: &str) -> Result<String, JsValue> {
    let doc = Document::parse(html);
    let manifest = Manifest::from_json(manifest_json).map_err(to_js)?;
    let state = collect(&doc, &manifest);
    serde_json::to_string(&state.to_json()).map_err(|e| to_js(e.into()))
}

/// Write `values_json` into `html` and return the resulting HTML.
#[wasm_bindgen]
pub fn apply_html(html: &str, manifest_json: &str, values_json: &str) -> Result<String, JsValue> {
    let doc = Document::parse(html);
    let manifest = Manifest::from_json(manifest_json).map_err(to_js)?;
    let values: Values = serde_json::from_str(values_json).map_err(|e| to_js(e.into()))?;
    apply(&doc, &manifest, &values).map_err(to_js)?;
    Ok(doc.to_html())
}
