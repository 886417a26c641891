//! Mutation records and the observer registry.
//!
//! Observers register a root node and the kinds of change they care about.
//! Records produced by a mutation are routed to every interested observer
//! and queued there; nothing is delivered until the document is flushed, at
//! which point each observer receives its whole queue in one callback.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use super::arena::{ArenaDom, NodeId};

/// A single low-level change to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Node whose children, attributes, data or properties changed.
    pub target: NodeId,
    pub kind: MutationKind,
}

/// What changed on the record's target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    Attributes {
        name: String,
        old_value: Option<String>,
    },
    CharacterData {
        old_value: String,
    },
    /// A form-control property (`value` or `checked`) was written.
    Property { name: &'static str },
}

/// Which records an observer wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub properties: bool,
    /// Also watch every descendant of the root, not just the root itself.
    pub subtree: bool,
}

impl ObserverInit {
    /// Watch every kind of change anywhere below the root.
    pub const fn everything() -> Self {
        Self {
            child_list: true,
            attributes: true,
            character_data: true,
            properties: true,
            subtree: true,
        }
    }

    fn wants(&self, kind: &MutationKind) -> bool {
        match kind {
            MutationKind::ChildList { .. } => self.child_list,
            MutationKind::Attributes { .. } => self.attributes,
            MutationKind::CharacterData { .. } => self.character_data,
            MutationKind::Property { .. } => self.properties,
        }
    }
}

impl Default for ObserverInit {
    fn default() -> Self {
        Self::everything()
    }
}

type Callback = Box<dyn FnMut(&[MutationRecord])>;

/// One registered observer.
pub(crate) struct ObserverSlot {
    id: u64,
    root: NodeId,
    init: ObserverInit,
    active: Cell<bool>,
    pending: RefCell<Vec<MutationRecord>>,
    callback: RefCell<Option<Callback>>,
}

impl ObserverSlot {
    fn accepts(&self, dom: &ArenaDom, record: &MutationRecord) -> bool {
        if !self.active.get() || !self.init.wants(&record.kind) {
            return false;
        }
        if record.target == self.root {
            return true;
        }
        self.init.subtree && dom.is_inclusive_ancestor(self.root, record.target)
    }

    /// Hand the queued records to the callback. Returns whether it ran.
    pub(crate) fn deliver(&self) -> bool {
        if !self.active.get() {
            return false;
        }
        let records = std::mem::take(&mut *self.pending.borrow_mut());
        if records.is_empty() {
            return false;
        }

        // A callback that flushes its own document cannot re-enter itself.
        let Ok(mut callback) = self.callback.try_borrow_mut() else {
            let mut pending = self.pending.borrow_mut();
            let later = std::mem::replace(&mut *pending, records);
            pending.extend(later);
            return false;
        };
        let Some(f) = callback.as_mut() else {
            return false;
        };
        trace!(observer = self.id, records = records.len(), "delivering batch");
        f(&records);
        drop(callback);

        // Unsubscribed from inside its own callback.
        if !self.active.get() {
            self.release();
        }
        true
    }

    fn release(&self) {
        if let Ok(mut pending) = self.pending.try_borrow_mut() {
            pending.clear();
        }
        if let Ok(mut callback) = self.callback.try_borrow_mut() {
            callback.take();
        }
    }
}

/// All observers of one document.
#[derive(Default)]
pub(crate) struct Registry {
    observers: Vec<Rc<ObserverSlot>>,
    next_id: u64,
}

impl Registry {
    pub(crate) fn register(
        &mut self,
        root: NodeId,
        init: ObserverInit,
        callback: Callback,
    ) -> Rc<ObserverSlot> {
        self.next_id += 1;
        let slot = Rc::new(ObserverSlot {
            id: self.next_id,
            root,
            init,
            active: Cell::new(true),
            pending: RefCell::new(Vec::new()),
            callback: RefCell::new(Some(callback)),
        });
        self.observers.push(Rc::clone(&slot));
        slot
    }

    pub(crate) fn remove(&mut self, id: u64) -> Option<Rc<ObserverSlot>> {
        let pos = self.observers.iter().position(|s| s.id == id)?;
        Some(self.observers.remove(pos))
    }

    /// Queue each record on every observer that wants it.
    pub(crate) fn route(&self, dom: &ArenaDom, records: &[MutationRecord]) {
        for slot in &self.observers {
            let accepted: Vec<_> = records
                .iter()
                .filter(|r| slot.accepts(dom, r))
                .cloned()
                .collect();
            if !accepted.is_empty() {
                trace!(observer = slot.id, records = accepted.len(), "queued records");
                slot.pending.borrow_mut().extend(accepted);
            }
        }
    }

    /// Observers in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Rc<ObserverSlot>> {
        self.observers.clone()
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.observers
            .iter()
            .any(|s| s.active.get() && !s.pending.borrow().is_empty())
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }
}

/// Handle to a registered observer.
///
/// Dropping the handle or calling [`unsubscribe`](Self::unsubscribe) stops
/// all further callbacks and releases the callback and any queued records.
/// Unsubscribing is idempotent and may happen from inside the callback
/// itself, or after the document has been dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    slot: Weak<ObserverSlot>,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    pub(crate) fn new(slot: &Rc<ObserverSlot>, registry: &Rc<RefCell<Registry>>) -> Self {
        Self {
            id: slot.id,
            slot: Rc::downgrade(slot),
            registry: Rc::downgrade(registry),
        }
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(&self) {
        if let Some(slot) = self.slot.upgrade() {
            if !slot.active.replace(false) {
                return;
            }
            slot.release();
        }
        if let Some(registry) = self.registry.upgrade() {
            let removed = registry.borrow_mut().remove(self.id);
            drop(removed);
        }
    }

    /// Whether callbacks may still be delivered.
    pub fn is_active(&self) -> bool {
        self.slot.upgrade().is_some_and(|s| s.active.get())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
