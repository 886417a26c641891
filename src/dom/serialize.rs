//! HTML serialization via html5ever's serializer.

use std::io;

use html5ever::QualName;
use html5ever::serialize::{Serialize, SerializeOpts, Serializer, TraversalScope, serialize};

use super::arena::{ArenaDom, Attribute, FormState, NodeData, NodeId, attr_name};
use super::node::Node;

struct SerializableNode<'a> {
    dom: &'a ArenaDom,
    id: NodeId,
}

impl Serialize for SerializableNode<'_> {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let Some(node) = self.dom.get(self.id) else {
            return Ok(());
        };
        let include_self = matches!(traversal_scope, TraversalScope::IncludeNode);

        match &node.data {
            NodeData::Element {
                name, attrs, form, ..
            } => {
                if include_self {
                    let attrs = self.live_attrs(name.local.as_ref(), attrs, form);
                    serializer.start_elem(
                        name.clone(),
                        attrs.iter().map(|(name, value)| (name, value.as_str())),
                    )?;
                }
                match &form.value {
                    Some(value) if name.local.as_ref() == "textarea" => {
                        serializer.write_text(value)?
                    }
                    _ => self.children(serializer)?,
                }
                if include_self {
                    serializer.end_elem(name.clone())?;
                }
                Ok(())
            }
            NodeData::Document => self.children(serializer),
            NodeData::Text(text) if include_self => serializer.write_text(text),
            NodeData::Comment(text) if include_self => serializer.write_comment(text),
            NodeData::Doctype { name } if include_self => serializer.write_doctype(name),
            _ => Ok(()),
        }
    }
}

impl SerializableNode<'_> {
    /// Markup attributes with dirty form state folded in, so the output
    /// reparses to the values the document currently reports.
    fn live_attrs(&self, tag: &str, attrs: &[Attribute], form: &FormState) -> Vec<(QualName, String)> {
        let mut out: Vec<_> = attrs
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        match tag {
            "input" => {
                if let Some(value) = &form.value {
                    set_attr(&mut out, "value", Some(value.as_str()));
                }
                match form.checked {
                    Some(true) if !has_attr(&out, "checked") => set_attr(&mut out, "checked", Some("")),
                    Some(false) => set_attr(&mut out, "checked", None),
                    _ => {}
                }
            }
            "option" => {
                if let Some(selected) = self.dirty_select_value() {
                    let node = Node::new(self.dom, self.id);
                    if node.value().as_deref() == Some(selected) {
                        if !has_attr(&out, "selected") {
                            set_attr(&mut out, "selected", Some(""));
                        }
                    } else {
                        set_attr(&mut out, "selected", None);
                    }
                }
            }
            _ => {}
        }
        out
    }

    /// Dirty value of the nearest enclosing `select`.
    fn dirty_select_value(&self) -> Option<&str> {
        let mut current = self.dom.parent(self.id);
        while let Some(id) = current {
            if self.dom.element_name(id).is_some_and(|n| n.as_ref() == "select") {
                return self.dom.form_state(id)?.value.as_deref();
            }
            current = self.dom.parent(id);
        }
        None
    }

    fn children<S: Serializer>(&self, serializer: &mut S) -> io::Result<()> {
        for child in self.dom.children(self.id) {
            SerializableNode {
                dom: self.dom,
                id: child,
            }
            .serialize(serializer, TraversalScope::IncludeNode)?;
        }
        Ok(())
    }
}

fn has_attr(attrs: &[(QualName, String)], name: &str) -> bool {
    attrs.iter().any(|(n, _)| n.local.as_ref().eq_ignore_ascii_case(name))
}

/// Replace, add (`Some`) or drop (`None`) an attribute.
fn set_attr(attrs: &mut Vec<(QualName, String)>, name: &str, value: Option<&str>) {
    match value {
        Some(value) => match attrs
            .iter_mut()
            .find(|(n, _)| n.local.as_ref().eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => attrs.push((attr_name(name), value.to_string())),
        },
        None => attrs.retain(|(n, _)| !n.local.as_ref().eq_ignore_ascii_case(name)),
    }
}

/// Serialize a node (and its subtree) to an HTML string.
pub(crate) fn to_html(dom: &ArenaDom, id: NodeId) -> String {
    let mut out = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    // Writing into a Vec cannot fail
    let _ = serialize(&mut out, &SerializableNode { dom, id }, opts);
    String::from_utf8_lossy(&out).into_owned()
}
