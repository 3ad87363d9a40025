//! Provenance extensions recording which resources a master absorbed.

use octofhir_core::Resource;
use serde_json::{Value, json};

/// Extension pointing at one original resource.
pub fn provenance_extension(url: &str, reference: &str) -> Value {
    json!({
        "url": url,
        "valueReference": { "reference": reference }
    })
}

/// True for an extension element written by [`attach`].
pub fn is_provenance_extension(value: &Value, url: &str) -> bool {
    value.get("url").and_then(Value::as_str) == Some(url)
}

/// Add one provenance extension per original member reference to the master.
///
/// Existing identical extensions are not repeated, so attaching twice is a no-op.
/// Returns the number of extensions added.
pub fn attach<'a>(
    master: &mut Resource,
    originals: impl IntoIterator<Item = &'a str>,
    url: &str,
) -> usize {
    let extensions = master
        .data
        .entry("extension")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !extensions.is_array() {
        *extensions = Value::Array(Vec::new());
    }
    let Some(extensions) = extensions.as_array_mut() else {
        return 0;
    };

    let mut added = 0;
    for reference in originals {
        let extension = provenance_extension(url, reference);
        if !extensions.contains(&extension) {
            extensions.push(extension);
            added += 1;
        }
    }
    added
}

/// References recorded by the master's provenance extensions.
pub fn recorded_references<'a>(resource: &'a Resource, url: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    resource
        .get("extension")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(move |ext| is_provenance_extension(ext, url))
        .filter_map(|ext| ext.get("valueReference")?.get("reference")?.as_str())
}
