//! Borrowed views of a single node.
//!
//! [`Node`] is what readers see: a shared borrow of the tree positioned on
//! one element. [`NodeMut`] is what writers see; every change made through
//! it lands in the document's mutation journal.

use std::fmt;

use super::arena::{ArenaDom, Attribute, NodeId, attr_name, html_name};

/// Read-only view of a node.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    pub(crate) dom: &'a ArenaDom,
    pub(crate) id: NodeId,
}

impl<'a> Node<'a> {
    pub(crate) fn new(dom: &'a ArenaDom, id: NodeId) -> Self {
        Self { dom, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Lowercase tag name, or `""` for non-elements.
    pub fn tag_name(&self) -> &'a str {
        self.dom.element_name(self.id).map(|n| n.as_ref()).unwrap_or("")
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.dom.get_attr(self.id, name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Attributes as `(name, value)` pairs in source order.
    pub fn attrs(self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.dom
            .attrs(self.id)
            .iter()
            .map(|a| (a.name.local.as_ref(), a.value.as_str()))
    }

    /// Custom-data attribute lookup, `dataset`-style.
    ///
    /// `userId` and `user-id` both read `data-user-id`.
    pub fn dataset(&self, name: &str) -> Option<&'a str> {
        self.attr(&data_attr_name(name))
    }

    pub fn element_id(&self) -> Option<&'a str> {
        self.dom.element_id(self.id)
    }

    pub fn classes(&self) -> &'a [String] {
        self.dom.element_classes(self.id)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| c == class)
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self) -> String {
        self.dom.text_content(self.id)
    }

    /// Current value of a form control.
    ///
    /// `input` uses its dirty value, else its `value` attribute, else `""`.
    /// `textarea` uses its dirty value, else its text. `select` reports its
    /// first selected option (or its first option). `option` uses its `value`
    /// attribute, else its text. Other elements have no value.
    pub fn value(&self) -> Option<String> {
        let dirty = self.dom.form_state(self.id).and_then(|f| f.value.clone());
        match self.tag_name() {
            "input" => Some(
                dirty.unwrap_or_else(|| self.attr("value").unwrap_or_default().to_string()),
            ),
            "textarea" => Some(dirty.unwrap_or_else(|| self.text_content())),
            "select" => {
                if dirty.is_some() {
                    return dirty;
                }
                let options: Vec<_> = self
                    .dom
                    .descendants(self.id)
                    .filter(|&id| self.dom.element_name(id).is_some_and(|n| n.as_ref() == "option"))
                    .map(|id| Node::new(self.dom, id))
                    .collect();
                options
                    .iter()
                    .find(|o| o.has_attr("selected"))
                    .or_else(|| options.first())
                    .and_then(Node::value)
            }
            "option" => Some(dirty.unwrap_or_else(|| match self.attr("value") {
                Some(v) => v.to_string(),
                None => self.text_content(),
            })),
            _ => None,
        }
    }

    /// Checkedness of an `input`: its dirty state, else the presence of the
    /// `checked` attribute. Other elements report `None`.
    pub fn checked(&self) -> Option<bool> {
        if self.tag_name() != "input" {
            return None;
        }
        let dirty = self.dom.form_state(self.id).and_then(|f| f.checked);
        Some(dirty.unwrap_or_else(|| self.has_attr("checked")))
    }

    pub fn is_element(&self) -> bool {
        self.dom.is_element(self.id)
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.dom
            .parent(self.id)
            .filter(|&p| self.dom.is_element(p))
            .map(|p| Node::new(self.dom, p))
    }

    /// Element children in order.
    pub fn children(self) -> impl Iterator<Item = Node<'a>> + 'a {
        let dom = self.dom;
        dom.children(self.id)
            .filter(move |&c| dom.is_element(c))
            .map(move |c| Node::new(dom, c))
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.dom.element_name(self.id))
            .finish()
    }
}

/// Mutable view of a node.
pub struct NodeMut<'a> {
    pub(crate) dom: &'a mut ArenaDom,
    pub(crate) id: NodeId,
}

impl<'a> NodeMut<'a> {
    pub(crate) fn new(dom: &'a mut ArenaDom, id: NodeId) -> Self {
        Self { dom, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Borrow as a read-only view.
    pub fn as_node(&self) -> Node<'_> {
        Node::new(self.dom, self.id)
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        self.dom.set_attr(self.id, name, value);
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.dom.remove_attr(self.id, name);
    }

    /// Set a custom-data attribute, `dataset`-style.
    pub fn set_data(&mut self, name: &str, value: &str) {
        self.dom.set_attr(self.id, &data_attr_name(name), value);
    }

    pub fn remove_data(&mut self, name: &str) {
        self.dom.remove_attr(self.id, &data_attr_name(name));
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: &str) {
        self.dom.set_text_content(self.id, text);
    }

    pub fn set_value(&mut self, value: &str) {
        self.dom.set_value(self.id, value);
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.dom.set_checked(self.id, checked);
    }

    /// Toggle a class on or off.
    pub fn toggle_class(&mut self, class: &str, on: bool) {
        let mut classes: Vec<String> = self.dom.element_classes(self.id).to_vec();
        let present = classes.iter().any(|c| c == class);
        if present == on {
            return;
        }
        if on {
            classes.push(class.to_string());
        } else {
            classes.retain(|c| c != class);
        }
        self.dom.set_attr(self.id, "class", &classes.join(" "));
    }

    /// Append a new child element and return its id.
    pub fn append_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(name, value)| Attribute {
                name: attr_name(name),
                value: (*value).to_string(),
            })
            .collect();
        let child = self.dom.create_element(html_name(tag), attrs);
        self.dom.append(self.id, child);
        child
    }

    /// Append a text node, merging into a trailing text node.
    pub fn append_text(&mut self, text: &str) {
        self.dom.append_text(self.id, text);
    }

    /// Parse an HTML fragment and append its top-level nodes.
    pub fn append_html(&mut self, html: &str) -> Vec<NodeId> {
        let fragment = super::parse_html(html);
        let Some(body) = fragment.find_by_tag("body") else {
            return Vec::new();
        };
        let sources: Vec<_> = fragment.children(body).collect();
        let mut added = Vec::new();
        for src in sources {
            if let Some(copy) = self.dom.import(&fragment, src) {
                self.dom.append(self.id, copy);
                added.push(copy);
            }
        }
        added
    }

    /// Detach this node from its parent.
    pub fn remove(&mut self) {
        self.dom.detach(self.id);
    }
}

impl fmt::Debug for NodeMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeMut")
            .field("id", &self.id)
            .field("name", &self.dom.element_name(self.id))
            .finish()
    }
}

/// Map a dataset key to its attribute name: `userId` → `data-user-id`.
pub(crate) fn data_attr_name(name: &str) -> String {
    let mut attr = String::with_capacity(name.len() + 6);
    attr.push_str("data-");
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            attr.push('-');
            attr.push(c.to_ascii_lowercase());
        } else {
            attr.push(c);
        }
    }
    attr
}
