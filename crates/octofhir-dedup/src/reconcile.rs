//! Field reconciliation table.
//!
//! `(resource type, field)` pairs whose values are not simply last-wins when
//! duplicates are merged. Anything not listed here falls back to the structural merge.

use crate::merge::merge_value;
use octofhir_core::{FhirDateTime, ResourceType};
use serde_json::Value;
use std::cmp::Ordering;

const MEDICATION_STATEMENT_STATUS: &[&str] = &[
    "unknown",
    "intended",
    "active",
    "not-taken",
    "on-hold",
    "completed",
    "stopped",
    "entered-in-error",
];

const MEDICATION_REQUEST_STATUS: &[&str] = &[
    "unknown",
    "draft",
    "active",
    "on-hold",
    "completed",
    "stopped",
    "cancelled",
    "entered-in-error",
];

const MEDICATION_ADMINISTRATION_STATUS: &[&str] = &[
    "unknown",
    "in-progress",
    "not-done",
    "on-hold",
    "completed",
    "stopped",
    "entered-in-error",
];

const PROCEDURE_STATUS: &[&str] = &[
    "unknown",
    "preparation",
    "in-progress",
    "not-done",
    "on-hold",
    "stopped",
    "completed",
    "entered-in-error",
];

const IMMUNIZATION_STATUS: &[&str] = &["not-done", "completed", "entered-in-error"];

const ENCOUNTER_STATUS: &[&str] = &[
    "unknown",
    "planned",
    "arrived",
    "triaged",
    "in-progress",
    "onleave",
    "finished",
    "cancelled",
    "entered-in-error",
];

const REPORT_STATUS: &[&str] = &[
    "unknown",
    "registered",
    "partial",
    "preliminary",
    "final",
    "amended",
    "corrected",
    "appended",
    "cancelled",
    "entered-in-error",
];

/// How two values of one field combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// Keep the value ranked highest in the list; unranked values are last-wins.
    StatusRank(&'static [&'static str]),
    /// Earliest `start`, latest `end`.
    WidenPeriod,
}

impl Reducer {
    /// Combine the value already on the master with one from a duplicate.
    pub fn reduce(&self, current: &Value, incoming: &Value) -> Value {
        match self {
            Reducer::StatusRank(ranking) => {
                let rank = |v: &Value| v.as_str().and_then(|s| ranking.iter().position(|r| *r == s));
                match (rank(current), rank(incoming)) {
                    (Some(a), Some(b)) if a > b => current.clone(),
                    _ => incoming.clone(),
                }
            }
            Reducer::WidenPeriod => {
                let mut merged = current.clone();
                merge_value(&mut merged, incoming);
                widen(&mut merged, current, incoming, "start", Ordering::Less);
                widen(&mut merged, current, incoming, "end", Ordering::Greater);
                merged
            }
        }
    }
}

/// Set `merged[bound]` to whichever side's bound compares as `wanted`.
fn widen(merged: &mut Value, current: &Value, incoming: &Value, bound: &str, wanted: Ordering) {
    let parse = |v: &Value| {
        let raw = v.get(bound)?.as_str()?;
        FhirDateTime::parse_lenient(raw).ok().map(|dt| (dt, raw.to_string()))
    };
    let (Some((a, raw_a)), Some((b, raw_b))) = (parse(current), parse(incoming)) else {
        return;
    };
    let chosen = if b.cmp(&a) == wanted { raw_b } else { raw_a };
    if let Some(object) = merged.as_object_mut() {
        object.insert(bound.to_string(), Value::String(chosen));
    }
}

#[derive(Debug, Clone, Copy)]
struct FieldRule {
    resource_type: &'static str,
    field: &'static str,
    reducer: Reducer,
}

const PERIOD_FIELDS: &[&str] = &["onsetPeriod", "effectivePeriod", "performedPeriod", "period"];

const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        resource_type: "MedicationStatement",
        field: "status",
        reducer: Reducer::StatusRank(MEDICATION_STATEMENT_STATUS),
    },
    FieldRule {
        resource_type: "MedicationRequest",
        field: "status",
        reducer: Reducer::StatusRank(MEDICATION_REQUEST_STATUS),
    },
    FieldRule {
        resource_type: "MedicationAdministration",
        field: "status",
        reducer: Reducer::StatusRank(MEDICATION_ADMINISTRATION_STATUS),
    },
    FieldRule {
        resource_type: "Procedure",
        field: "status",
        reducer: Reducer::StatusRank(PROCEDURE_STATUS),
    },
    FieldRule {
        resource_type: "Immunization",
        field: "status",
        reducer: Reducer::StatusRank(IMMUNIZATION_STATUS),
    },
    FieldRule {
        resource_type: "Encounter",
        field: "status",
        reducer: Reducer::StatusRank(ENCOUNTER_STATUS),
    },
    FieldRule {
        resource_type: "DiagnosticReport",
        field: "status",
        reducer: Reducer::StatusRank(REPORT_STATUS),
    },
    FieldRule {
        resource_type: "Observation",
        field: "status",
        reducer: Reducer::StatusRank(REPORT_STATUS),
    },
];

/// Lookup of field reducers by resource type and top-level field.
#[derive(Debug, Clone, Copy)]
pub struct ReconciliationTable {
    rules: &'static [FieldRule],
}

impl ReconciliationTable {
    pub fn standard() -> Self {
        Self { rules: FIELD_RULES }
    }

    /// Table without status rules; period fields are still widened.
    pub fn empty() -> Self {
        Self { rules: &[] }
    }

    pub fn reducer(&self, resource_type: &ResourceType, field: &str) -> Option<Reducer> {
        self.rules
            .iter()
            .find(|rule| rule.resource_type == resource_type.as_str() && rule.field == field)
            .map(|rule| rule.reducer)
            .or_else(|| PERIOD_FIELDS.contains(&field).then_some(Reducer::WidenPeriod))
    }
}
