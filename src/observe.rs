//! Change notification for a manifest.
//!
//! [`observe`] watches the whole document and filters each coalesced batch
//! of mutation records down to the ones that can change the manifest's
//! extracted state. The callback runs at most once per
//! [`Document::flush`], and only when the batch was relevant.

use selectors::parser::SelectorList;
use tracing::{debug, trace};

use crate::dom::{
    ArenaDom, AttrInterest, Document, DomSelectors, MutationKind, MutationRecord, Node, NodeId,
    ObserverInit, Subscription, attr_interest, matches, parse_selector_list,
};
use crate::manifest::Manifest;

/// Which mutations notify an observer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchScope {
    /// Only batches that can affect the manifest's selectors or the
    /// subtrees they currently match.
    ///
    /// Readers are assumed to look at the matched node and its
    /// descendants. A custom reader that reads elsewhere needs
    /// [`WatchScope::Document`].
    #[default]
    Selectors,
    /// Every batch anywhere in the document.
    Document,
}

/// Options for [`observe_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub scope: WatchScope,
}

impl ObserveOptions {
    pub fn scope(mut self, scope: WatchScope) -> Self {
        self.scope = scope;
        self
    }
}

/// Call `on_change` after every flush whose mutations may have changed the
/// state `manifest` extracts.
///
/// Keep the returned [`Subscription`] alive for as long as notifications
/// are wanted. `on_change` may read or mutate `doc`; it must reach the
/// document through a [`WeakDocument`](crate::WeakDocument) or another
/// handle it does not own, to avoid a reference cycle.
pub fn observe(doc: &Document, manifest: &Manifest, on_change: impl FnMut() + 'static) -> Subscription {
    observe_with(doc, manifest, ObserveOptions::default(), on_change)
}

/// [`observe`] with explicit options.
pub fn observe_with(
    doc: &Document,
    manifest: &Manifest,
    options: ObserveOptions,
    mut on_change: impl FnMut() + 'static,
) -> Subscription {
    let mut filter = match options.scope {
        WatchScope::Selectors => Some(RelevanceFilter::new(manifest)),
        WatchScope::Document => None,
    };
    let weak = doc.downgrade();

    doc.observe_node(doc.root(), ObserverInit::everything(), move |records| {
        let relevant = match (filter.as_mut(), weak.upgrade()) {
            (None, _) => true,
            (Some(filter), Some(doc)) => {
                let dom = doc.dom();
                filter.is_relevant(&dom, records)
            }
            (Some(_), None) => false,
        };
        if relevant {
            debug!(records = records.len(), "relevant mutations, notifying");
            on_change();
        } else {
            debug!(records = records.len(), "mutations outside watched selectors");
        }
    })
}

/// Decides whether a batch of records can change extracted state.
struct RelevanceFilter {
    selectors: Vec<SelectorList<DomSelectors>>,
    interest: AttrInterest,
    /// Elements the selectors matched after the last relevant batch;
    /// `None` until recomputed.
    matched: Option<Vec<NodeId>>,
}

impl RelevanceFilter {
    fn new(manifest: &Manifest) -> Self {
        let mut selectors = Vec::new();
        let mut interest = AttrInterest::Names(Default::default());
        for selector in manifest.selectors() {
            // Invalid selectors never match, so they watch nothing.
            if let Ok(list) = parse_selector_list(selector) {
                selectors.push(list);
                interest.merge(attr_interest(selector));
            }
        }
        Self {
            selectors,
            interest,
            matched: None,
        }
    }

    fn is_relevant(&mut self, dom: &ArenaDom, records: &[MutationRecord]) -> bool {
        // Irrelevant records cannot change which elements match, so a set
        // computed after such a batch equals the one before it.
        let matched = self.matched.get_or_insert_with(|| {
            let nodes: Vec<_> = dom
                .descendants(dom.document())
                .filter(|&id| dom.is_element(id))
                .filter(|&id| {
                    let node = Node::new(dom, id);
                    self.selectors.iter().any(|list| matches(node, list))
                })
                .collect();
            trace!(matched = nodes.len(), "recomputed watched elements");
            nodes
        });
        let inside_matched =
            |target: NodeId| matched.iter().any(|&m| dom.is_inclusive_ancestor(m, target));

        let relevant = records.iter().any(|record| match &record.kind {
            MutationKind::ChildList { .. } => true,
            MutationKind::Attributes { name, .. } => {
                self.interest.contains(name) || inside_matched(record.target)
            }
            MutationKind::CharacterData { .. } => inside_matched(record.target),
            MutationKind::Property { .. } => {
                self.interest == AttrInterest::All || inside_matched(record.target)
            }
        });
        if relevant {
            self.matched = None;
        }
        relevant
    }
}
