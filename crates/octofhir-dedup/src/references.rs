//! Reference rewriting after a pass has merged resources.

use crate::merge::dedupe_array;
use crate::provenance::is_provenance_extension;
use octofhir_core::local_reference;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Maps each grouped resource's `Type/id` to the `Type/id` of its surviving master.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceMap {
    targets: HashMap<String, String>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.targets.insert(from.into(), to.into());
    }

    /// Surviving reference for `reference`, when it was grouped.
    pub fn resolve(&self, reference: &str) -> Option<&str> {
        self.targets.get(reference).map(String::as_str)
    }

    /// Number of entries that point somewhere else.
    pub fn redirects(&self) -> usize {
        self.targets.iter().filter(|(from, to)| from != to).count()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Counts from one rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub rewritten: usize,
    pub collapsed: usize,
}

/// Rewrites bundle-local references inside resource bodies.
///
/// Contained, URN and absolute references are left alone, as are provenance
/// extensions. Arrays of reference-bearing elements are de-duplicated afterwards, so
/// two entries that now point at the same master become one.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceRewriter<'a> {
    map: &'a ReferenceMap,
    provenance_url: &'a str,
}

impl<'a> ReferenceRewriter<'a> {
    pub fn new(map: &'a ReferenceMap, provenance_url: &'a str) -> Self {
        Self {
            map,
            provenance_url,
        }
    }

    pub fn rewrite_fields(&self, fields: &mut Map<String, Value>) -> RewriteStats {
        let mut stats = RewriteStats::default();
        self.rewrite_object(fields, &mut stats);
        stats
    }

    fn rewrite_object(&self, fields: &mut Map<String, Value>, stats: &mut RewriteStats) {
        for (key, value) in fields.iter_mut() {
            if key == "reference" {
                if let Value::String(reference) = value
                    && let Some(target) = self.target_for(reference)
                {
                    *reference = target;
                    stats.rewritten += 1;
                }
                continue;
            }
            self.rewrite_value(value, stats);
        }
    }

    fn rewrite_value(&self, value: &mut Value, stats: &mut RewriteStats) {
        match value {
            Value::Object(fields) => self.rewrite_object(fields, stats),
            Value::Array(items) => {
                for item in items.iter_mut() {
                    if is_provenance_extension(item, self.provenance_url) {
                        continue;
                    }
                    self.rewrite_value(item, stats);
                }
                if items.iter().any(holds_reference) {
                    stats.collapsed += dedupe_array(items);
                }
            }
            _ => {}
        }
    }

    fn target_for(&self, reference: &str) -> Option<String> {
        let local = local_reference(reference)?;
        self.map
            .resolve(&local)
            .filter(|target| *target != local)
            .map(str::to_string)
    }
}

/// A `Reference`, or an element holding one directly (e.g. `Encounter.diagnosis`).
pub(crate) fn holds_reference(value: &Value) -> bool {
    let Some(fields) = value.as_object() else {
        return false;
    };
    fields.contains_key("reference")
        || fields
            .values()
            .any(|v| v.as_object().is_some_and(|inner| inner.contains_key("reference")))
}
