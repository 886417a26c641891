//! Declarative bindings from keys to selectors and read/write rules.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;

use crate::dom::{Node, NodeMut};
use crate::error::{CallbackError, Error, Result};
use crate::shortcut;

/// Values to write back, by manifest key.
pub type Values = BTreeMap<String, Value>;

type ReadFn = dyn Fn(&Node<'_>) -> std::result::Result<Value, CallbackError>;
type WriteFn = dyn Fn(&mut NodeMut<'_>, &Value) -> std::result::Result<(), CallbackError>;

/// How a matched node is turned into a value.
#[derive(Clone)]
pub enum Reader {
    /// A shortcut name such as `text` or `data:id`, parsed when used.
    Shortcut(String),
    Custom(Rc<ReadFn>),
}

impl Reader {
    pub fn shortcut(name: impl Into<String>) -> Self {
        Self::Shortcut(name.into())
    }

    /// A fallible reader closure.
    pub fn custom(
        f: impl Fn(&Node<'_>) -> std::result::Result<Value, CallbackError> + 'static,
    ) -> Self {
        Self::Custom(Rc::new(f))
    }

    /// An infallible reader closure.
    pub fn map(f: impl Fn(&Node<'_>) -> Value + 'static) -> Self {
        Self::custom(move |node| Ok(f(node)))
    }

    /// Read one node. Errors carry `key`.
    pub(crate) fn read(&self, key: &str, node: &Node<'_>) -> Result<Value> {
        match self {
            Self::Shortcut(name) => shortcut::resolve_read(node, name),
            Self::Custom(f) => f(node).map_err(|source| Error::ReaderFailed {
                key: key.to_string(),
                source,
            }),
        }
    }
}

impl From<&str> for Reader {
    fn from(name: &str) -> Self {
        Self::shortcut(name)
    }
}

impl From<String> for Reader {
    fn from(name: String) -> Self {
        Self::Shortcut(name)
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shortcut(name) => f.debug_tuple("Shortcut").field(name).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// How a value is written into a matched node.
#[derive(Clone)]
pub enum Writer {
    Shortcut(String),
    Custom(Rc<WriteFn>),
}

impl Writer {
    pub fn shortcut(name: impl Into<String>) -> Self {
        Self::Shortcut(name.into())
    }

    pub fn custom(
        f: impl Fn(&mut NodeMut<'_>, &Value) -> std::result::Result<(), CallbackError> + 'static,
    ) -> Self {
        Self::Custom(Rc::new(f))
    }

    pub(crate) fn write(&self, key: &str, node: &mut NodeMut<'_>, value: &Value) -> Result<()> {
        match self {
            Self::Shortcut(name) => shortcut::resolve_write(node, name, value),
            Self::Custom(f) => f(node, value).map_err(|source| Error::WriterFailed {
                key: key.to_string(),
                source,
            }),
        }
    }
}

impl From<&str> for Writer {
    fn from(name: &str) -> Self {
        Self::shortcut(name)
    }
}

impl From<String> for Writer {
    fn from(name: String) -> Self {
        Self::Shortcut(name)
    }
}

impl fmt::Debug for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shortcut(name) => f.debug_tuple("Shortcut").field(name).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One manifest entry.
#[derive(Debug, Clone)]
pub struct Binding {
    pub selector: String,
    pub read: Reader,
    pub write: Option<Writer>,
}

impl Binding {
    pub fn new(selector: impl Into<String>, read: impl Into<Reader>) -> Self {
        Self {
            selector: selector.into(),
            read: read.into(),
            write: None,
        }
    }

    /// Add a write rule.
    pub fn with_write(mut self, write: impl Into<Writer>) -> Self {
        self.write = Some(write.into());
        self
    }
}

/// Keyed set of bindings.
///
/// Keys are kept sorted; the order carries no meaning.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    bindings: BTreeMap<String, Binding>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BindingSpec {
    selector: String,
    read: String,
    #[serde(default)]
    write: Option<String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn bind(mut self, key: impl Into<String>, binding: Binding) -> Self {
        self.insert(key, binding);
        self
    }

    /// Insert a binding, returning the one it replaced.
    pub fn insert(&mut self, key: impl Into<String>, binding: Binding) -> Option<Binding> {
        self.bindings.insert(key.into(), binding)
    }

    pub fn get(&self, key: &str) -> Option<&Binding> {
        self.bindings.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bindings.iter().map(|(k, b)| (k.as_str(), b))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Every binding's selector.
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.bindings.values().map(|b| b.selector.as_str())
    }

    /// Load a manifest whose readers and writers are shortcut names.
    ///
    /// ```
    /// let manifest = domstate::Manifest::from_json(
    ///     r##"{ "name": { "selector": "#name", "read": "value", "write": "value" } }"##,
    /// ).unwrap();
    /// assert_eq!(manifest.len(), 1);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let specs: BTreeMap<String, BindingSpec> = serde_json::from_str(json)?;
        let mut manifest = Self::new();
        for (key, spec) in specs {
            let mut binding = Binding::new(spec.selector, spec.read);
            binding.write = spec.write.map(Writer::Shortcut);
            manifest.insert(key, binding);
        }
        Ok(manifest)
    }
}

impl<K: Into<String>> FromIterator<(K, Binding)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (K, Binding)>>(iter: I) -> Self {
        Self {
            bindings: iter.into_iter().map(|(k, b)| (k.into(), b)).collect(),
        }
    }
}
