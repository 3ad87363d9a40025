//! Dangling reference sweep.
//!
//! Two kinds of references are treated differently once resources have been removed:
//! a hard dependency (a statement's `medicationReference`) whose target is gone takes
//! the referencing resource with it, while any other reference to a removed resource is
//! pruned from the field or array holding it and the resource itself survives.

use crate::assembly::Partition;
use crate::key::describe;
use crate::provenance::is_provenance_extension;
use octofhir_core::{ResourceType, local_reference};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Top-level reference fields a resource cannot do without.
pub fn hard_dependencies(resource_type: &ResourceType) -> &'static [&'static str] {
    match resource_type {
        ResourceType::MedicationStatement
        | ResourceType::MedicationRequest
        | ResourceType::MedicationAdministration => &["medicationReference"],
        _ => &[],
    }
}

/// Drop every resource whose hard dependency points at a resource not in the partition.
///
/// Only bundle-local references are checked; contained, URN and absolute references
/// never count as dangling.
pub fn drop_dangling(partition: &mut Partition) -> Vec<String> {
    let present: HashSet<String> = partition
        .resources()
        .filter_map(|placed| placed.resource.reference())
        .collect();

    let mut dropped = Vec::new();
    partition.retain(|placed| {
        let resource = &placed.resource;
        let dangling = hard_dependencies(&resource.resource_type)
            .iter()
            .filter_map(|field| resource.local_reference_field(field))
            .find(|target| !present.contains(target));
        match dangling {
            Some(target) => {
                debug!(resource = %describe(resource), %target, "dropping resource with dangling reference");
                dropped.push(describe(resource));
                false
            }
            None => true,
        }
    });
    dropped
}

/// Prune references to removed resources from every resource in the partition.
///
/// Hard dependency fields are left alone so that [`drop_dangling`] still sees them.
pub fn prune_partition(
    partition: &mut Partition,
    removed: &HashSet<String>,
    provenance_url: &str,
) -> usize {
    if removed.is_empty() {
        return 0;
    }
    partition
        .resources_mut()
        .map(|placed| {
            let skip = hard_dependencies(&placed.resource.resource_type);
            prune_fields(&mut placed.resource.data, removed, skip, provenance_url)
        })
        .sum()
}

/// Remove references to `removed` from a resource body, returning how many went.
///
/// A field holding such a reference is removed; an array element holding one, directly
/// or through one of its own fields, is removed from the array. Arrays emptied this way
/// are removed as well. Top-level fields listed in `skip` and provenance extensions are
/// never touched.
pub fn prune_fields(
    fields: &mut Map<String, Value>,
    removed: &HashSet<String>,
    skip: &[&str],
    provenance_url: &str,
) -> usize {
    let mut pruned = 0;
    fields.retain(|key, value| {
        if skip.contains(&key.as_str()) {
            return true;
        }
        keep_field(key, value, removed, provenance_url, &mut pruned)
    });
    pruned
}

fn prune_object(
    fields: &mut Map<String, Value>,
    removed: &HashSet<String>,
    provenance_url: &str,
    pruned: &mut usize,
) {
    fields.retain(|key, value| keep_field(key, value, removed, provenance_url, pruned));
}

fn keep_field(
    key: &str,
    value: &mut Value,
    removed: &HashSet<String>,
    provenance_url: &str,
    pruned: &mut usize,
) -> bool {
    if key == "reference" {
        return true;
    }
    if points_to_removed(value, removed) {
        *pruned += 1;
        return false;
    }
    match value {
        Value::Object(fields) => {
            prune_object(fields, removed, provenance_url, pruned);
            true
        }
        Value::Array(items) => {
            let before = items.len();
            prune_array(items, removed, provenance_url, pruned);
            !(before > 0 && items.is_empty())
        }
        _ => true,
    }
}

fn prune_array(
    items: &mut Vec<Value>,
    removed: &HashSet<String>,
    provenance_url: &str,
    pruned: &mut usize,
) {
    items.retain_mut(|item| {
        if is_provenance_extension(item, provenance_url) {
            return true;
        }
        if holds_removed(item, removed) {
            *pruned += 1;
            return false;
        }
        match item {
            Value::Object(fields) => prune_object(fields, removed, provenance_url, pruned),
            Value::Array(inner) => prune_array(inner, removed, provenance_url, pruned),
            _ => {}
        }
        true
    });
}

/// A `Reference` whose bundle-local target was removed.
fn points_to_removed(value: &Value, removed: &HashSet<String>) -> bool {
    value
        .get("reference")
        .and_then(Value::as_str)
        .and_then(local_reference)
        .is_some_and(|target| removed.contains(&target))
}

/// An array element that is, or directly holds, a reference to a removed resource.
fn holds_removed(item: &Value, removed: &HashSet<String>) -> bool {
    if points_to_removed(item, removed) {
        return true;
    }
    item.as_object()
        .is_some_and(|fields| fields.values().any(|v| points_to_removed(v, removed)))
}
