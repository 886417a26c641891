//! A continuously updating view of a manifest's state.
//!
//! [`LiveState`] is what a rendering layer holds: the latest [`State`], a
//! stale flag raised by change notifications, and the subscription that
//! raises it.
//!
//! # Invariants
//!
//! 1. [`LiveState::snapshot`] never returns a state older than the last
//!    notified flush.
//! 2. Handing [`LiveState::set_manifest`] the same `Rc` keeps the current
//!    subscription; a different `Rc` replaces it and marks the state stale.
//! 3. Dropping the `LiveState` unsubscribes.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::apply::apply;
use crate::collect::{State, collect};
use crate::dom::{Document, Subscription};
use crate::error::Result;
use crate::manifest::{Manifest, Values};
use crate::observe::{ObserveOptions, observe_with};

type Hook = Box<dyn FnMut()>;

/// State shared with the observer callback.
#[derive(Default)]
struct Shared {
    stale: Cell<bool>,
    hooks: RefCell<Vec<Hook>>,
}

impl Shared {
    fn notify(&self) {
        self.stale.set(true);
        // Hooks may register more hooks while running.
        let mut running = std::mem::take(&mut *self.hooks.borrow_mut());
        for hook in &mut running {
            hook();
        }
        let mut hooks = self.hooks.borrow_mut();
        let added = std::mem::replace(&mut *hooks, running);
        hooks.extend(added);
    }
}

/// Live binding between a document and a manifest.
pub struct LiveState {
    doc: Document,
    manifest: Rc<Manifest>,
    options: ObserveOptions,
    shared: Rc<Shared>,
    state: RefCell<Rc<State>>,
    subscription: Subscription,
}

impl LiveState {
    /// Subscribe to `doc` and take the first snapshot.
    pub fn new(doc: &Document, manifest: Rc<Manifest>) -> Self {
        Self::with_options(doc, manifest, ObserveOptions::default())
    }

    pub fn with_options(doc: &Document, manifest: Rc<Manifest>, options: ObserveOptions) -> Self {
        let shared = Rc::new(Shared::default());
        let subscription = subscribe(doc, &manifest, options, &shared);
        let state = collect(doc, &manifest);
        Self {
            doc: doc.clone(),
            manifest,
            options,
            shared,
            state: RefCell::new(Rc::new(state)),
            subscription,
        }
    }

    /// The current state, re-collected first if it is stale.
    ///
    /// Earlier snapshots stay valid and unchanged after a re-collect.
    pub fn snapshot(&self) -> Rc<State> {
        if self.shared.stale.replace(false) {
            debug!("re-collecting stale state");
            let fresh = Rc::new(collect(&self.doc, &self.manifest));
            *self.state.borrow_mut() = fresh;
        }
        Rc::clone(&self.state.borrow())
    }

    /// Whether a notification arrived since the last collect.
    pub fn is_stale(&self) -> bool {
        self.shared.stale.get()
    }

    pub fn manifest(&self) -> &Rc<Manifest> {
        &self.manifest
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Swap the manifest. Returns whether it changed.
    ///
    /// The same `Rc` is a no-op. Anything else tears down the subscription,
    /// subscribes for the new manifest and marks the state stale.
    pub fn set_manifest(&mut self, manifest: Rc<Manifest>) -> bool {
        if Rc::ptr_eq(&self.manifest, &manifest) {
            return false;
        }
        debug!(keys = manifest.len(), "manifest changed, re-subscribing");
        self.subscription.unsubscribe();
        self.subscription = subscribe(&self.doc, &manifest, self.options, &self.shared);
        self.manifest = manifest;
        self.shared.stale.set(true);
        true
    }

    /// Run `hook` after each notification, once the state is marked stale.
    ///
    /// The hook runs inside [`Document::flush`]; it typically schedules a
    /// re-render that calls [`snapshot`](Self::snapshot).
    pub fn on_change(&self, hook: impl FnMut() + 'static) {
        self.shared.hooks.borrow_mut().push(Box::new(hook));
    }

    /// Write values back through the manifest's write rules.
    pub fn write(&self, values: &Values) -> Result<usize> {
        apply(&self.doc, &self.manifest, values)
    }

    /// Whether the subscription is still live.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_active()
    }
}

fn subscribe(
    doc: &Document,
    manifest: &Manifest,
    options: ObserveOptions,
    shared: &Rc<Shared>,
) -> Subscription {
    let shared = Rc::clone(shared);
    observe_with(doc, manifest, options, move || shared.notify())
}

impl fmt::Debug for LiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveState")
            .field("keys", &self.manifest.len())
            .field("stale", &self.is_stale())
            .field("subscription", &self.subscription)
            .finish()
    }
}
