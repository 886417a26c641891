//! # domstate
//!
//! Read and write application state straight out of a live HTML document.
//!
//! A [`Manifest`] maps keys to CSS selectors and read rules. [`collect`]
//! resolves every key against the current tree, [`observe`] reports when a
//! batch of mutations may have changed the result, and [`apply`] writes
//! values back through each key's write rule. [`LiveState`] ties the three
//! together for a rendering layer.
//!
//! ## Features
//!
//! - Arena DOM parsed by html5ever, queried with the `selectors` crate
//! - Shortcut readers (`text`, `value`, `checked`, `attr:<name>`,
//!   `data:<name>`) and custom reader closures
//! - Null / single value / array results, chosen by match count
//! - Coalesced, selector-scoped change notification
//!
//! ## Quick Start
//!
//! ```
//! use std::rc::Rc;
//! use domstate::{Binding, Document, LiveState, Manifest, collect};
//! use serde_json::json;
//!
//! let doc = Document::parse(r#"
//!     <ul id="todos"><li data-id="1">Write</li><li data-id="2">Test</li></ul>
//!     <input id="name" value="Ada">
//! "#);
//!
//! let manifest = Manifest::new()
//!     .bind("ids", Binding::new("#todos li", "data:id"))
//!     .bind("name", Binding::new("#name", "value").with_write("value"))
//!     .bind("done", Binding::new(".done", "text"));
//!
//! let state = collect(&doc, &manifest);
//! assert_eq!(state.to_json(), json!({ "ids": ["1", "2"], "name": "Ada", "done": null }));
//!
//! // Keep a snapshot up to date
//! let live = LiveState::new(&doc, Rc::new(manifest));
//! let list = doc.select("#todos").unwrap()[0];
//! doc.mutate(list, |ul| {
//!     ul.append_element("li", &[("data-id", "3")]);
//! });
//! doc.flush();
//! assert_eq!(live.snapshot().to_json()["ids"], json!(["1", "2", "3"]));
//! ```

pub mod apply;
pub mod collect;
pub mod dom;
pub mod error;
pub mod live;
pub mod manifest;
pub mod observe;
pub mod shortcut;
pub(crate) mod util;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use apply::apply;
pub use collect::{Extracted, State, collect};
pub use dom::{Document, Node, NodeId, NodeMut, Subscription, WeakDocument};
pub use error::{CallbackError, Error, Result};
pub use live::LiveState;
pub use manifest::{Binding, Manifest, Reader, Values, Writer};
pub use observe::{ObserveOptions, WatchScope, observe, observe_with};
pub use shortcut::Shortcut;
