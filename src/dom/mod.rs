//! Live, mutable, observable HTML document.
//!
//! A [`Document`] owns an arena DOM parsed by html5ever, answers CSS
//! selector queries through the `selectors` crate, and keeps a registry of
//! mutation observers.
//!
//! # Coalescing
//!
//! Mutations never call observers directly. Each change is journaled,
//! routed to interested observers and queued. [`Document::flush`] is the
//! delivery point: every observer with queued records is called once with
//! its whole batch, no matter how many low-level changes happened.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use domstate::Document;
//!
//! let doc = Document::parse(r#"<ul id="list"></ul>"#);
//! let calls = Rc::new(Cell::new(0));
//! let seen = Rc::clone(&calls);
//! let _sub = doc.observe_node(doc.root(), Default::default(), move |_| {
//!     seen.set(seen.get() + 1)
//! });
//!
//! let list = doc.select("#list").unwrap()[0];
//! doc.mutate(list, |ul| {
//!     ul.append_html("<li>a</li><li>b</li>");
//! });
//! assert_eq!(calls.get(), 0);
//!
//! doc.flush();
//! assert_eq!(calls.get(), 1);
//! ```

mod arena;
mod element_ref;
mod mutation;
mod node;
mod select;
mod serialize;
mod tree_sink;

pub use arena::{ArenaDom, Attribute, FormState, NodeData, NodeId};
pub use element_ref::DomSelectors;
pub use mutation::{MutationKind, MutationRecord, ObserverInit, Subscription};
pub use node::{Node, NodeMut};

pub(crate) use select::{AttrInterest, attr_interest, matches, parse_selector_list};

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use tracing::trace;

use crate::error::Result;
use mutation::Registry;
use tree_sink::ArenaSink;

/// Parse HTML into a detached arena. Recording is off.
pub(crate) fn parse_html(html: &str) -> ArenaDom {
    let sink = ArenaSink::new();
    let result = parse_document(sink, ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes());
    result.into_dom()
}

struct DocumentInner {
    dom: RefCell<ArenaDom>,
    registry: Rc<RefCell<Registry>>,
}

/// Shared handle to a live document.
///
/// Cloning is cheap and yields another handle to the same tree. Documents
/// are single-threaded (`!Send`).
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

/// Non-owning handle, used by observer callbacks that need the tree.
#[derive(Clone)]
pub struct WeakDocument {
    inner: Weak<DocumentInner>,
}

impl WeakDocument {
    pub fn upgrade(&self) -> Option<Document> {
        self.inner.upgrade().map(|inner| Document { inner })
    }
}

impl Document {
    /// Parse an HTML document or fragment.
    ///
    /// Fragments are placed in the body of an implied document, like a
    /// browser would.
    pub fn parse(html: &str) -> Self {
        Self::from_dom(parse_html(html))
    }

    /// Parse HTML bytes, detecting the encoding.
    ///
    /// UTF-8 is tried first, then any encoding named in an XML declaration,
    /// then Windows-1252.
    pub fn parse_bytes(html: &[u8]) -> Self {
        let hint_encoding = crate::util::extract_xml_encoding(html);
        let html_str = crate::util::decode_text(html, hint_encoding);
        Self::parse(&html_str)
    }

    /// Wrap an existing arena. Mutations are journaled from here on.
    pub fn from_dom(mut dom: ArenaDom) -> Self {
        dom.drain_journal();
        dom.set_recording(true);
        Self {
            inner: Rc::new(DocumentInner {
                dom: RefCell::new(dom),
                registry: Rc::new(RefCell::new(Registry::default())),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same document.
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Borrow the underlying tree.
    ///
    /// # Panics
    ///
    /// Panics if called from inside [`mutate`](Self::mutate).
    pub fn dom(&self) -> Ref<'_, ArenaDom> {
        self.inner.dom.borrow()
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        self.dom().document()
    }

    /// The `<body>` element, if any.
    pub fn body(&self) -> Option<NodeId> {
        let dom = self.dom();
        dom.children(dom.document())
            .find(|&id| dom.element_name(id).is_some_and(|n| n.as_ref() == "html"))
            .and_then(|html| {
                dom.children(html)
                    .find(|&id| dom.element_name(id).is_some_and(|n| n.as_ref() == "body"))
            })
    }

    /// All elements matching `selector`, in document order.
    pub fn select(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom().select(selector)
    }

    /// Run `f` with a read-only view of an attached element.
    pub fn node<R>(&self, id: NodeId, f: impl FnOnce(Node<'_>) -> R) -> Option<R> {
        let dom = self.dom();
        if !dom.is_element(id) || !dom.is_attached(id) {
            return None;
        }
        Some(f(Node::new(&dom, id)))
    }

    /// Run `f` with a mutable view of an element, then route the resulting
    /// mutation records to observers.
    ///
    /// Returns `None` if `id` is not an element.
    ///
    /// # Panics
    ///
    /// Panics if the tree is already borrowed, e.g. when called from inside
    /// a reader.
    pub fn mutate<R>(&self, id: NodeId, f: impl FnOnce(&mut NodeMut<'_>) -> R) -> Option<R> {
        let result = {
            let mut dom = self.inner.dom.borrow_mut();
            if !dom.is_element(id) {
                return None;
            }
            let mut node = NodeMut::new(&mut dom, id);
            f(&mut node)
        };
        self.route_journal();
        Some(result)
    }

    /// Mutate the `<body>` element.
    pub fn mutate_body<R>(&self, f: impl FnOnce(&mut NodeMut<'_>) -> R) -> Option<R> {
        self.mutate(self.body()?, f)
    }

    fn route_journal(&self) {
        let records = self.inner.dom.borrow_mut().drain_journal();
        if records.is_empty() {
            return;
        }
        trace!(records = records.len(), "routing mutation records");
        let dom = self.inner.dom.borrow();
        self.inner.registry.borrow().route(&dom, &records);
    }

    /// Register a raw mutation observer on `root`.
    ///
    /// The callback runs during [`flush`](Self::flush) with every record
    /// queued since the previous delivery.
    pub fn observe_node(
        &self,
        root: NodeId,
        init: ObserverInit,
        callback: impl FnMut(&[MutationRecord]) + 'static,
    ) -> Subscription {
        let slot = self
            .inner
            .registry
            .borrow_mut()
            .register(root, init, Box::new(callback));
        Subscription::new(&slot, &self.inner.registry)
    }

    /// Deliver queued records, one callback per observer.
    ///
    /// Returns the number of callbacks that ran. Mutations made by the
    /// callbacks are queued for the next flush.
    pub fn flush(&self) -> usize {
        let observers = self.inner.registry.borrow().snapshot();
        observers.iter().filter(|slot| slot.deliver()).count()
    }

    /// Whether any observer has records waiting for [`flush`](Self::flush).
    pub fn has_pending(&self) -> bool {
        self.inner.registry.borrow().has_pending()
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    /// Serialize the whole document to HTML.
    pub fn to_html(&self) -> String {
        let dom = self.dom();
        serialize::to_html(&dom, dom.document())
    }

    /// Serialize one node and its subtree to HTML.
    pub fn outer_html(&self, id: NodeId) -> String {
        serialize::to_html(&self.dom(), id)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::parse("")
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.dom().len())
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;

    fn counter() -> (Rc<Cell<usize>>, impl FnMut(&[MutationRecord]) + 'static) {
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        (count, move |_: &[MutationRecord]| seen.set(seen.get() + 1))
    }

    #[test]
    fn test_burst_is_coalesced() {
        let doc = Document::parse("<ul></ul>");
        let (count, callback) = counter();
        let _sub = doc.observe_node(doc.root(), ObserverInit::everything(), callback);

        let ul = doc.select("ul").unwrap()[0];
        for i in 0..10 {
            doc.mutate(ul, |n| {
                n.append_element("li", &[("data-id", i.to_string().as_str())]);
            });
        }
        assert!(doc.has_pending());
        assert_eq!(doc.flush(), 1);
        assert_eq!(count.get(), 1);
        assert_eq!(doc.flush(), 0);
    }

    #[test]
    fn test_batch_holds_every_record() {
        let doc = Document::parse(r#"<p id="a">x</p>"#);
        let batch = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&batch);
        let _sub = doc.observe_node(doc.root(), ObserverInit::everything(), move |records| {
            sink.borrow_mut().extend_from_slice(records)
        });

        let p = doc.select("#a").unwrap()[0];
        doc.mutate(p, |n| {
            n.set_attr("title", "t");
            n.set_text("y");
        });
        doc.flush();

        let batch = batch.borrow();
        assert_eq!(batch.len(), 2);
        assert!(matches!(batch[0].kind, MutationKind::Attributes { .. }));
        assert!(matches!(batch[1].kind, MutationKind::ChildList { .. }));
    }

    #[test]
    fn test_scope_without_subtree() {
        let doc = Document::parse(r#"<div id="outer"><p id="inner"></p></div>"#);
        let outer = doc.select("#outer").unwrap()[0];
        let inner = doc.select("#inner").unwrap()[0];
        let (count, callback) = counter();
        let init = ObserverInit {
            subtree: false,
            ..ObserverInit::everything()
        };
        let _sub = doc.observe_node(outer, init, callback);

        doc.mutate(inner, |n| n.set_attr("title", "x"));
        assert_eq!(doc.flush(), 0);

        doc.mutate(outer, |n| n.set_attr("title", "x"));
        assert_eq!(doc.flush(), 1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_unsubscribe_drops_pending_records() {
        let doc = Document::parse("<p></p>");
        let (count, callback) = counter();
        let sub = doc.observe_node(doc.root(), ObserverInit::everything(), callback);

        let p = doc.select("p").unwrap()[0];
        doc.mutate(p, |n| n.set_attr("class", "x"));
        sub.unsubscribe();
        sub.unsubscribe();

        assert_eq!(doc.flush(), 0);
        assert_eq!(count.get(), 0);
        assert_eq!(doc.observer_count(), 0);
        assert!(!sub.is_active());
    }

    #[test]
    fn test_unsubscribe_from_inside_callback() {
        let doc = Document::parse("<p></p>");
        let count = Rc::new(Cell::new(0));
        let holder: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let seen = Rc::clone(&count);
        let own = Rc::clone(&holder);
        let sub = doc.observe_node(doc.root(), ObserverInit::everything(), move |_| {
            seen.set(seen.get() + 1);
            if let Some(sub) = own.borrow().as_ref() {
                sub.unsubscribe();
            }
        });
        *holder.borrow_mut() = Some(sub);

        let p = doc.select("p").unwrap()[0];
        doc.mutate(p, |n| n.set_attr("class", "x"));
        doc.flush();
        doc.mutate(p, |n| n.set_attr("class", "y"));
        doc.flush();

        assert_eq!(count.get(), 1);
        assert_eq!(doc.observer_count(), 0);
    }

    #[test]
    fn test_unsubscribe_after_document_dropped() {
        let doc = Document::parse("<p></p>");
        let (_count, callback) = counter();
        let sub = doc.observe_node(doc.root(), ObserverInit::everything(), callback);
        drop(doc);
        sub.unsubscribe();
        assert!(!sub.is_active());
    }

    #[test]
    fn test_callback_mutations_wait_for_next_flush() {
        let doc = Document::parse(r#"<p id="a"></p>"#);
        let weak = doc.downgrade();
        let (count, mut callback) = counter();
        let _sub = doc.observe_node(doc.root(), ObserverInit::everything(), move |records| {
            callback(records);
            if let Some(doc) = weak.upgrade() {
                let p = doc.select("#a").unwrap()[0];
                doc.mutate(p, |n| n.set_attr("data-seen", "1"));
            }
        });

        let p = doc.select("#a").unwrap()[0];
        doc.mutate(p, |n| n.set_attr("title", "x"));
        assert_eq!(doc.flush(), 1);
        assert!(doc.has_pending());
        assert_eq!(doc.flush(), 1);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_body_and_mutate_body() {
        let doc = Document::parse("<p>x</p>");
        assert!(doc.body().is_some());
        doc.mutate_body(|body| body.append_html(r#"<span class="item">New</span>"#));
        assert_eq!(doc.select(".item").unwrap().len(), 1);
    }

    #[test]
    fn test_node_rejects_detached() {
        let doc = Document::parse("<p>x</p>");
        let p = doc.select("p").unwrap()[0];
        assert_eq!(doc.node(p, |n| n.text_content()), Some("x".to_string()));
        doc.mutate(p, |n| n.remove());
        assert_eq!(doc.node(p, |n| n.text_content()), None);
    }
}
