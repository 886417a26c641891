//! Snapshot extraction: resolve every manifest key against the tree.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::dom::{ArenaDom, Document, Node};
use crate::error::{Error, Result};
use crate::manifest::{Binding, Manifest};

/// The value of one key, shaped by how many nodes matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Extracted {
    /// No node matched, the selector was invalid, or the read failed.
    Null,
    One(Value),
    /// Two or more nodes, in document order.
    Many(Vec<Value>),
}

impl Extracted {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// JSON form: `null`, the value itself, or an array.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::One(v) => v.clone(),
            Self::Many(vs) => Value::Array(vs.clone()),
        }
    }
}

/// Keyed record produced by [`collect`].
///
/// Every manifest key is present. Keys whose read failed are `Null`, and
/// the failure is kept in [`errors`](Self::errors).
#[derive(Debug, Default)]
pub struct State {
    values: BTreeMap<String, Extracted>,
    errors: Vec<(String, Error)>,
}

impl State {
    pub fn get(&self, key: &str) -> Option<&Extracted> {
        self.values.get(key)
    }

    pub fn values(&self) -> &BTreeMap<String, Extracted> {
        &self.values
    }

    /// Logic errors by key, in key order.
    pub fn errors(&self) -> &[(String, Error)] {
        &self.errors
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fail with the first recorded error, if any.
    pub fn into_result(mut self) -> Result<Self> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(self.errors.swap_remove(0).1)
        }
    }

    /// The record as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }
}

impl Serialize for State {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

/// Extract a snapshot of every key in `manifest`.
///
/// Keys are independent: an invalid selector or a failing reader turns only
/// that key into [`Extracted::Null`]. The tree is never mutated.
///
/// # Panics
///
/// Panics if called while the document is being mutated.
pub fn collect(doc: &Document, manifest: &Manifest) -> State {
    collect_dom(&doc.dom(), manifest)
}

pub(crate) fn collect_dom(dom: &ArenaDom, manifest: &Manifest) -> State {
    let mut state = State::default();
    for (key, binding) in manifest.iter() {
        let extracted = match extract(dom, key, binding) {
            Ok(extracted) => extracted,
            Err(Error::InvalidSelector { selector, reason }) => {
                warn!(key, %selector, %reason, "invalid selector, key is null");
                Extracted::Null
            }
            Err(err) => {
                warn!(key, error = %err, "read failed, key is null");
                state.errors.push((key.to_string(), err));
                Extracted::Null
            }
        };
        state.values.insert(key.to_string(), extracted);
    }
    state
}

fn extract(dom: &ArenaDom, key: &str, binding: &Binding) -> Result<Extracted> {
    let matched = dom.select(&binding.selector)?;
    let read = |id| binding.read.read(key, &Node::new(dom, id));
    match matched.as_slice() {
        [] => Ok(Extracted::Null),
        [only] => Ok(Extracted::One(read(*only)?)),
        many => many
            .iter()
            .map(|&id| read(id))
            .collect::<Result<Vec<_>>>()
            .map(Extracted::Many),
    }
}
