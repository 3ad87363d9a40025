//! Merge engine: folds a duplicate group into one master resource.
//!
//! The first member seeds the master and keeps its id. Every further member is merged
//! in: top-level fields with a reconciliation reducer use it, arrays are unioned by
//! structural equality in first-seen order, objects merge recursively, and any other
//! value is last-wins. The result only depends on the member order, which the
//! collector fixes.

use crate::reconcile::ReconciliationTable;
use octofhir_core::Resource;
use serde_json::{Map, Value};

/// Top-level fields a duplicate never contributes.
///
/// `id` and `resourceType` live outside the field map and are covered already.
const NEVER_MERGED: &[&str] = &["id", "resourceType", "subject", "patient"];

/// Merge a group of equivalent resources, seeded by the first one.
pub fn merge_group<'a>(
    members: impl IntoIterator<Item = &'a Resource>,
    table: &ReconciliationTable,
) -> Option<Resource> {
    let mut members = members.into_iter();
    let mut master = members.next()?.clone();
    for member in members {
        merge_into(&mut master, member, table);
    }
    Some(master)
}

/// Merge one duplicate into the master.
pub fn merge_into(master: &mut Resource, duplicate: &Resource, table: &ReconciliationTable) {
    for (field, incoming) in &duplicate.data {
        if NEVER_MERGED.contains(&field.as_str()) {
            continue;
        }
        match master.data.get_mut(field) {
            Some(current) => {
                match table.reducer(&master.resource_type, field) {
                    Some(reducer) => *current = reducer.reduce(current, incoming),
                    None => merge_value(current, incoming),
                }
            }
            None => {
                master.data.insert(field.clone(), incoming.clone());
            }
        }
    }
}

/// Structural merge of `incoming` into `target`.
pub fn merge_value(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Array(items), Value::Array(more)) => union_into(items, more),
        (Value::Object(fields), Value::Object(more)) => merge_objects(fields, more),
        (target, incoming) => *target = incoming.clone(),
    }
}

fn merge_objects(fields: &mut Map<String, Value>, more: &Map<String, Value>) {
    for (key, incoming) in more {
        match fields.get_mut(key) {
            Some(current) => merge_value(current, incoming),
            None => {
                fields.insert(key.clone(), incoming.clone());
            }
        }
    }
}

/// Append the elements of `more` not already present, preserving first-seen order.
pub fn union_into(items: &mut Vec<Value>, more: &[Value]) {
    for item in more {
        if !items.contains(item) {
            items.push(item.clone());
        }
    }
}

/// Drop repeated elements of an array, keeping the first occurrence.
pub fn dedupe_array(items: &mut Vec<Value>) -> usize {
    let before = items.len();
    let mut unique: Vec<Value> = Vec::with_capacity(before);
    for item in items.drain(..) {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    *items = unique;
    before - items.len()
}
