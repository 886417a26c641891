//! Write-back: push values into the tree through each key's write rule.

use serde_json::Value;
use tracing::{debug, warn};

use crate::dom::Document;
use crate::error::{Error, Result};
use crate::manifest::Manifest;

/// Write `values` into `doc` and return how many writes happened.
///
/// A key is written only if the manifest binds it with a write rule and its
/// selector matches exactly one element. Anything else is skipped: missing
/// write rules, invalid selectors, and zero or several matches.
///
/// The first unknown shortcut or failing writer stops the call and is
/// returned. Writes made before it are kept. Observers see the writes on the
/// next [`Document::flush`].
pub fn apply<'v, V>(doc: &Document, manifest: &Manifest, values: V) -> Result<usize>
where
    V: IntoIterator<Item = (&'v String, &'v Value)>,
{
    let mut written = 0;
    for (key, value) in values {
        let Some(binding) = manifest.get(key) else {
            debug!(key = %key, "key not in manifest, skipping");
            continue;
        };
        let Some(writer) = &binding.write else {
            debug!(key = %key, "key has no write rule, skipping");
            continue;
        };

        let target = match doc.select(&binding.selector) {
            Ok(matched) => match matched.as_slice() {
                [only] => *only,
                other => {
                    debug!(key = %key, matches = other.len(), "write needs exactly one match, skipping");
                    continue;
                }
            },
            Err(Error::InvalidSelector { selector, reason }) => {
                warn!(key = %key, %selector, %reason, "invalid selector, skipping write");
                continue;
            }
            Err(err) => return Err(err),
        };

        if let Some(result) = doc.mutate(target, |node| writer.write(key, node, value)) {
            result?;
            written += 1;
        }
    }
    Ok(written)
}
