//! Arena-based mutable DOM.
//!
//! All nodes live in a contiguous vector and link to each other by index.
//! Detached nodes stay in the arena (their ids remain valid) but are no
//! longer reachable from the document root.
//!
//! Every structural or attribute change made through the mutating methods
//! is appended to a journal while recording is enabled. The owning
//! [`Document`](super::Document) drains the journal after each mutation and
//! routes the records to its observers.

use html5ever::{LocalName, Namespace, QualName, ns};

use super::mutation::{MutationKind, MutationRecord};

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Sentinel value for no node.
    pub(crate) const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this is a valid node ID.
    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    /// Check if this is the sentinel value.
    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// Node type in the arena DOM.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element with name and attributes.
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
        /// Pre-extracted id for fast matching.
        id: Option<String>,
        /// Pre-extracted classes for fast matching.
        classes: Vec<String>,
        /// Form-control state that is not reflected in attributes.
        form: FormState,
    },
    /// Text content.
    Text(String),
    /// Comment (ignored but needed for TreeSink).
    Comment(String),
    /// Document type declaration.
    Doctype { name: String },
}

/// HTML attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

/// Dirty value and checkedness of a form control.
///
/// `None` means the control still reflects its content attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub value: Option<String>,
    pub checked: Option<bool>,
}

/// A node in the arena DOM.
#[derive(Debug, Clone)]
pub struct ArenaNode {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl ArenaNode {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Build an HTML-namespace qualified name.
pub(crate) fn html_name(local: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(local.to_ascii_lowercase()))
}

/// Build a no-namespace attribute name.
pub(crate) fn attr_name(local: &str) -> QualName {
    QualName::new(None, ns!(), LocalName::from(local.to_ascii_lowercase()))
}

/// Arena-based DOM tree.
#[derive(Debug, Clone)]
pub struct ArenaDom {
    nodes: Vec<ArenaNode>,
    document: NodeId,
    journal: Vec<MutationRecord>,
    recording: bool,
}

impl ArenaDom {
    /// Create a new empty DOM with a document root. Recording starts off.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
            journal: Vec::new(),
            recording: false,
        };
        dom.document = dom.alloc(ArenaNode::new(NodeData::Document));
        dom
    }

    fn alloc(&mut self, node: ArenaNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get the document root ID.
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// Get a node by ID.
    pub fn get(&self, id: NodeId) -> Option<&ArenaNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut ArenaNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    /// Get the number of nodes ever allocated, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the DOM only has its document root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // ------------------------------------------------------------------
    // Journal
    // ------------------------------------------------------------------

    /// Turn mutation recording on or off.
    pub(crate) fn set_recording(&mut self, on: bool) {
        self.recording = on;
    }

    /// Take every record appended since the last drain.
    pub(crate) fn drain_journal(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.journal)
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        if self.recording {
            self.journal.push(MutationRecord { target, kind });
        }
    }

    // ------------------------------------------------------------------
    // Node creation
    // ------------------------------------------------------------------

    /// Create a new detached element node.
    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        let id = find_attr(&attrs, "id").map(str::to_string);
        let classes = find_attr(&attrs, "class").map(split_classes).unwrap_or_default();

        self.alloc(ArenaNode::new(NodeData::Element {
            name,
            attrs,
            id,
            classes,
            form: FormState::default(),
        }))
    }

    /// Create a new detached text node.
    pub fn create_text(&mut self, text: String) -> NodeId {
        self.alloc(ArenaNode::new(NodeData::Text(text)))
    }

    /// Create a new detached comment node.
    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(ArenaNode::new(NodeData::Comment(text)))
    }

    /// Create a doctype node.
    pub fn create_doctype(&mut self, name: String) -> NodeId {
        self.alloc(ArenaNode::new(NodeData::Doctype { name }))
    }

    /// Copy a subtree of another arena into this one, returning the
    /// detached copy of `src_id`.
    pub fn import(&mut self, src: &ArenaDom, src_id: NodeId) -> Option<NodeId> {
        let node = src.get(src_id)?;
        if matches!(node.data, NodeData::Document | NodeData::Doctype { .. }) {
            return None;
        }
        let copy = self.alloc(ArenaNode::new(node.data.clone()));
        let children: Vec<_> = src.children(src_id).collect();
        for child in children {
            if let Some(child_copy) = self.import(src, child) {
                self.link_last(copy, child_copy);
            }
        }
        Some(copy)
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Link `child` as the last child of `parent` without recording.
    fn link_last(&mut self, parent: NodeId, child: NodeId) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
            child_node.next_sibling = NodeId::NONE;
        }

        if last_child.is_some()
            && let Some(last_node) = self.get_mut(last_child)
        {
            last_node.next_sibling = child;
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Unlink a node from its parent without recording.
    fn unlink(&mut self, target: NodeId) -> NodeId {
        let (parent, prev, next) = match self.get(target) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return NodeId::NONE,
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = next;
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = prev;
        }

        if let Some(node) = self.get_mut(target) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
        parent
    }

    /// Append a child to a parent node, detaching it from any old parent.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        if self.get(child).is_some_and(|n| n.parent.is_some()) {
            self.detach(child);
        }
        self.link_last(parent, child);
        self.record(
            parent,
            MutationKind::ChildList {
                added: vec![child],
                removed: Vec::new(),
            },
        );
    }

    /// Insert a node before a sibling.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        if self.get(new_node).is_some_and(|n| n.parent.is_some()) {
            self.detach(new_node);
        }
        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }

        self.record(
            parent,
            MutationKind::ChildList {
                added: vec![new_node],
                removed: Vec::new(),
            },
        );
    }

    /// Remove a node from its parent. The node stays in the arena.
    pub fn detach(&mut self, target: NodeId) {
        let parent = self.unlink(target);
        if parent.is_some() {
            self.record(
                parent,
                MutationKind::ChildList {
                    added: Vec::new(),
                    removed: vec![target],
                },
            );
        }
    }

    /// Append text to an existing trailing text node, or create a new one.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        let mut old_value = None;
        if let Some(last) = self.get_mut(last_child)
            && let NodeData::Text(ref mut existing) = last.data
        {
            old_value = Some(existing.clone());
            existing.push_str(text);
        }
        if let Some(old_value) = old_value {
            self.record(last_child, MutationKind::CharacterData { old_value });
            return;
        }

        let text_node = self.create_text(text.to_string());
        self.append(parent, text_node);
    }

    /// Replace the text content of a node.
    ///
    /// Elements lose all children and gain a single text node (none if
    /// `text` is empty). Text nodes have their data replaced.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if let Some(node) = self.get_mut(id)
            && let NodeData::Text(existing) = &mut node.data
        {
            let old_value = std::mem::replace(existing, text.to_string());
            self.record(id, MutationKind::CharacterData { old_value });
            return;
        }
        if !self.is_element(id) {
            return;
        }

        let removed: Vec<_> = self.children(id).collect();
        for child in &removed {
            self.unlink(*child);
        }
        let mut added = Vec::new();
        if !text.is_empty() {
            let text_node = self.create_text(text.to_string());
            self.link_last(id, text_node);
            added.push(text_node);
        }
        if !added.is_empty() || !removed.is_empty() {
            self.record(id, MutationKind::ChildList { added, removed });
        }
    }

    // ------------------------------------------------------------------
    // Attributes and form state
    // ------------------------------------------------------------------

    /// Set an attribute, replacing any previous value.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let qname = attr_name(name);
        let Some(NodeData::Element { attrs, .. }) = self.get_mut(id).map(|n| &mut n.data) else {
            return;
        };

        let old_value = match attrs.iter_mut().find(|a| a.name.local == qname.local) {
            Some(attr) => Some(std::mem::replace(&mut attr.value, value.to_string())),
            None => {
                attrs.push(Attribute {
                    name: qname.clone(),
                    value: value.to_string(),
                });
                None
            }
        };
        self.refresh_cached_attrs(id);
        self.record(
            id,
            MutationKind::Attributes {
                name: qname.local.to_string(),
                old_value,
            },
        );
    }

    /// Remove an attribute. Does nothing if it is absent.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        let qname = attr_name(name);
        let Some(NodeData::Element { attrs, .. }) = self.get_mut(id).map(|n| &mut n.data) else {
            return;
        };
        let Some(pos) = attrs.iter().position(|a| a.name.local == qname.local) else {
            return;
        };
        let old = attrs.remove(pos);
        self.refresh_cached_attrs(id);
        self.record(
            id,
            MutationKind::Attributes {
                name: qname.local.to_string(),
                old_value: Some(old.value),
            },
        );
    }

    /// Set the dirty value of a form control.
    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(form) = self.form_state_mut(id) {
            form.value = Some(value.to_string());
            self.record(id, MutationKind::Property { name: "value" });
        }
    }

    /// Set the dirty checkedness of a form control.
    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        if let Some(form) = self.form_state_mut(id) {
            form.checked = Some(checked);
            self.record(id, MutationKind::Property { name: "checked" });
        }
    }

    fn form_state_mut(&mut self, id: NodeId) -> Option<&mut FormState> {
        match &mut self.get_mut(id)?.data {
            NodeData::Element { form, .. } => Some(form),
            _ => None,
        }
    }

    fn refresh_cached_attrs(&mut self, id: NodeId) {
        if let Some(NodeData::Element {
            attrs,
            id: elem_id,
            classes,
            ..
        }) = self.get_mut(id).map(|n| &mut n.data)
        {
            *elem_id = find_attr(attrs, "id").map(str::to_string);
            *classes = find_attr(attrs, "class").map(split_classes).unwrap_or_default();
        }
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> ChildrenIter<'_> {
        let first = self.get(parent).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        ChildrenIter {
            dom: self,
            current: first,
        }
    }

    /// Iterate over `root` and its descendants in document order.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            dom: self,
            stack: if self.get(root).is_some() {
                vec![root]
            } else {
                Vec::new()
            },
        }
    }

    /// Parent of a node, if attached.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(NodeId::is_some)
    }

    /// Check whether `ancestor` is `node` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Check whether a node is reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.get(id).is_some() && self.is_inclusive_ancestor(self.document, id)
    }

    /// Find the first element with the given tag name (DFS).
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.document)
            .find(|&id| self.element_name(id).is_some_and(|n| n.as_ref() == tag))
    }

    // ------------------------------------------------------------------
    // Element accessors
    // ------------------------------------------------------------------

    /// Get element's local name (tag).
    pub fn element_name(&self, id: NodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    /// Get element's namespace.
    pub fn element_namespace(&self, id: NodeId) -> Option<&Namespace> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.ns),
            _ => None,
        })
    }

    /// Get element's attributes.
    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { attrs, .. } => Some(attrs.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Get an attribute value.
    pub fn get_attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        find_attr(self.attrs(id), attr_name)
    }

    /// Get element's id attribute.
    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { id, .. } => id.as_deref(),
            _ => None,
        })
    }

    /// Get element's classes.
    pub fn element_classes(&self, id: NodeId) -> &[String] {
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { classes, .. } => Some(classes.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Get element's form state.
    pub fn form_state(&self, id: NodeId) -> Option<&FormState> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { form, .. } => Some(form),
            _ => None,
        })
    }

    /// Check if node is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    /// Get the data of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|n| self.text(n))
            .collect()
    }
}

impl Default for ArenaDom {
    fn default() -> Self {
        Self::new()
    }
}

fn find_attr<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| a.name.local.as_ref().eq_ignore_ascii_case(name))
        .map(|a| a.value.as_str())
}

fn split_classes(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Iterator over children of a node.
pub struct ChildrenIter<'a> {
    dom: &'a ArenaDom,
    current: NodeId,
}

impl Iterator for ChildrenIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .dom
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(NodeId::NONE);
        Some(id)
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    dom: &'a ArenaDom,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let mut child = self.dom.get(id).map(|n| n.last_child).unwrap_or(NodeId::NONE);
        while child.is_some() {
            self.stack.push(child);
            child = self
                .dom
                .get(child)
                .map(|n| n.prev_sibling)
                .unwrap_or(NodeId::NONE);
        }
        Some(id)
    }
}
