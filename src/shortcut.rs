//! Built-in read and write rules named by short strings.
//!
//! | Shortcut      | Read                         | Write                          |
//! |---------------|------------------------------|--------------------------------|
//! | `value`       | form value, or `null`        | set the form value             |
//! | `checked`     | checkedness, or `null`       | set checkedness (truthiness)   |
//! | `text`        | text content                 | replace the children with text |
//! | `attr:<name>` | attribute value, or `null`   | set it; `null` removes it      |
//! | `data:<name>` | `dataset` value, or `null`   | set it; `null` removes it      |

use serde_json::Value;

use crate::dom::{Node, NodeMut};
use crate::error::{Error, Result};

/// A parsed shortcut name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut<'a> {
    Value,
    Checked,
    Text,
    Attr(&'a str),
    Data(&'a str),
}

impl<'a> Shortcut<'a> {
    /// Parse a shortcut name. Prefixed forms need a non-empty name.
    pub fn parse(name: &'a str) -> Result<Self> {
        let shortcut = match name {
            "value" => Self::Value,
            "checked" => Self::Checked,
            "text" => Self::Text,
            _ => match name.split_once(':') {
                Some(("attr", attr)) if !attr.is_empty() => Self::Attr(attr),
                Some(("data", key)) if !key.is_empty() => Self::Data(key),
                _ => return Err(Error::UnknownShortcut(name.to_string())),
            },
        };
        Ok(shortcut)
    }

    /// Read this shortcut from a node.
    pub fn read(&self, node: &Node<'_>) -> Value {
        match *self {
            Self::Value => node.value().map_or(Value::Null, Value::String),
            Self::Checked => node.checked().map_or(Value::Null, Value::Bool),
            Self::Text => Value::String(node.text_content()),
            Self::Attr(name) => optional(node.attr(name)),
            Self::Data(key) => optional(node.dataset(key)),
        }
    }

    /// Write a value to a node through this shortcut.
    pub fn write(&self, node: &mut NodeMut<'_>, value: &Value) {
        match *self {
            Self::Value => node.set_value(&stringify(value)),
            Self::Checked => node.set_checked(truthy(value)),
            Self::Text => node.set_text(&stringify(value)),
            Self::Attr(name) if value.is_null() => node.remove_attr(name),
            Self::Attr(name) => node.set_attr(name, &stringify(value)),
            Self::Data(key) if value.is_null() => node.remove_data(key),
            Self::Data(key) => node.set_data(key, &stringify(value)),
        }
    }
}

/// Read a node through the shortcut called `name`.
pub fn resolve_read(node: &Node<'_>, name: &str) -> Result<Value> {
    Ok(Shortcut::parse(name)?.read(node))
}

/// Write `value` to a node through the shortcut called `name`.
pub fn resolve_write(node: &mut NodeMut<'_>, name: &str, value: &Value) -> Result<()> {
    Shortcut::parse(name)?.write(node, value);
    Ok(())
}

fn optional(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::String(v.to_string()))
}

/// Text form of a value as it lands in the tree.
///
/// Strings are written as-is, `null` as the empty string, other scalars in
/// their JSON spelling and arrays or objects as JSON text.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JavaScript-style truthiness.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dom::Document;

    fn first(doc: &Document, selector: &str) -> crate::dom::NodeId {
        doc.select(selector).unwrap()[0]
    }

    #[test]
    fn test_parse() {
        assert_eq!(Shortcut::parse("text").unwrap(), Shortcut::Text);
        assert_eq!(Shortcut::parse("attr:href").unwrap(), Shortcut::Attr("href"));
        assert_eq!(Shortcut::parse("data:userId").unwrap(), Shortcut::Data("userId"));
        // Only the first colon splits
        assert_eq!(Shortcut::parse("attr:xlink:href").unwrap(), Shortcut::Attr("xlink:href"));
    }

    #[test]
    fn test_parse_unknown() {
        for name in ["", "html", "Text", "attr:", "data:", "style:color"] {
            let err = Shortcut::parse(name).unwrap_err();
            assert!(matches!(err, Error::UnknownShortcut(ref n) if n == name), "{name}");
        }
    }

    #[test]
    fn test_read_shortcuts() {
        let doc = Document::parse(
            r#"<input id="t" value="hi"><input id="c" type="checkbox" checked>
               <a id="l" href="/x" data-user-id="7">Link <b>text</b></a>"#,
        );
        let read = |selector: &str, name: &str| {
            doc.node(first(&doc, selector), |n| resolve_read(&n, name).unwrap())
                .unwrap()
        };

        assert_eq!(read("#t", "value"), json!("hi"));
        assert_eq!(read("#c", "checked"), json!(true));
        assert_eq!(read("#l", "text"), json!("Link text"));
        assert_eq!(read("#l", "attr:href"), json!("/x"));
        assert_eq!(read("#l", "attr:title"), Value::Null);
        assert_eq!(read("#l", "data:userId"), json!("7"));
        assert_eq!(read("#l", "data:user-id"), json!("7"));
        assert_eq!(read("#l", "value"), Value::Null);
        assert_eq!(read("#l", "checked"), Value::Null);
    }

    #[test]
    fn test_write_shortcuts() {
        let doc = Document::parse(r#"<input id="t"><p id="p" title="old">x</p>"#);
        let t = first(&doc, "#t");
        let p = first(&doc, "#p");

        doc.mutate(t, |n| {
            resolve_write(n, "value", &json!(42)).unwrap();
            resolve_write(n, "checked", &json!("yes")).unwrap();
        });
        doc.mutate(p, |n| {
            resolve_write(n, "text", &json!("new")).unwrap();
            resolve_write(n, "attr:title", &Value::Null).unwrap();
            resolve_write(n, "data:tags", &json!(["a", "b"])).unwrap();
        });

        assert_eq!(doc.node(t, |n| n.value()).flatten().as_deref(), Some("42"));
        assert_eq!(doc.node(t, |n| n.checked()).flatten(), Some(true));
        assert_eq!(doc.node(p, |n| n.text_content()).unwrap(), "new");
        assert_eq!(doc.node(p, |n| n.has_attr("title")), Some(false));
        assert_eq!(
            doc.node(p, |n| n.attr("data-tags").map(str::to_string)).flatten(),
            Some(r#"["a","b"]"#.to_string())
        );
    }

    #[test]
    fn test_write_unknown_shortcut() {
        let doc = Document::parse("<p>x</p>");
        let result = doc.mutate(first(&doc, "p"), |n| resolve_write(n, "html", &json!("y")));
        assert!(matches!(result, Some(Err(Error::UnknownShortcut(_)))));
    }

    #[test]
    fn test_truthy() {
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(truthy(&json!("false")));
        assert!(truthy(&json!([])));
        assert!(truthy(&json!(-1.5)));
    }
}
