use super::EquivalenceRule;
use crate::error::Result;
use crate::key::{DateSource, Exclusion, GroupKey, KeyOutcome, code_part, first_date, value_part};
use crate::registry::{ConceptFamily, is_no_known_sentinel};
use octofhir_core::{CodeableConcept, Resource, ResourceType};
use serde_json::Value;
use std::collections::BTreeSet;

const OBSERVATION_DATES: &[DateSource] = &[
    DateSource::DateTime("effectiveDateTime"),
    DateSource::Period("effectivePeriod"),
    DateSource::DateTime("effectiveInstant"),
];

/// Observations match on category, code, date and value.
///
/// Vitals, labs and social history all share this rule; the category keeps a lab
/// result from merging with a vital sign that reuses its code. The date is optional
/// (social history is often undated), the value is not.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservationRule;

impl ObservationRule {
    fn category_part(resource: &Resource) -> Option<String> {
        let codes: BTreeSet<String> = resource
            .concepts("category")
            .iter()
            .flat_map(|c| c.coding.iter().filter_map(|coding| coding.normalized_code()))
            .collect();
        (!codes.is_empty()).then(|| codes.into_iter().collect::<Vec<_>>().join(","))
    }

    fn observed_value(resource: &Resource) -> Option<String> {
        if let Some(concept) = resource.concept("valueCodeableConcept") {
            return concept_identity(&concept);
        }
        if let Some(quantity) = resource.get("valueQuantity") {
            let unit = quantity
                .get("unit")
                .or_else(|| quantity.get("code"))
                .map(value_part)
                .unwrap_or_default();
            return quantity
                .get("value")
                .map(|v| format!("{} {}", value_part(v), unit).trim().to_string());
        }
        if let Some((field, value)) = resource
            .data
            .iter()
            .find(|(field, value)| field.starts_with("value") && !value.is_null())
        {
            return Some(format!("{field}={}", value_part(value)));
        }
        if let Some(components) = non_empty_array(resource, "component") {
            return Some(format!("component={}", value_part(components)));
        }
        non_empty_array(resource, "hasMember").map(|members| format!("members={members}"))
    }
}

fn non_empty_array<'a>(resource: &'a Resource, field: &str) -> Option<&'a Value> {
    resource
        .get(field)
        .filter(|v| v.as_array().is_some_and(|items| !items.is_empty()))
}

/// First coded `system|code` of a value concept, else its text.
fn concept_identity(concept: &CodeableConcept) -> Option<String> {
    concept
        .coding
        .iter()
        .find_map(|c| {
            c.normalized_code()
                .map(|code| format!("{}|{}", c.system.as_deref().unwrap_or(""), code))
        })
        .or_else(|| concept.normalized_text())
}

impl EquivalenceRule for ObservationRule {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Observation
    }

    fn key(&self, resource: &Resource) -> Result<KeyOutcome> {
        let Some(concept) = resource.concept("code") else {
            return Ok(KeyOutcome::Excluded(Exclusion::UnrecognizedCode));
        };
        if is_no_known_sentinel(&concept) {
            return Ok(KeyOutcome::Excluded(Exclusion::NoKnownSentinel));
        }
        let Some(code) = code_part(&concept, ConceptFamily::Observation) else {
            return Ok(KeyOutcome::Excluded(Exclusion::UnrecognizedCode));
        };
        let Some(value) = Self::observed_value(resource) else {
            return Ok(KeyOutcome::Excluded(Exclusion::MissingContent));
        };
        let date = first_date(resource, OBSERVATION_DATES)?;

        Ok(KeyOutcome::Keyed(GroupKey::exact([
            Self::category_part(resource),
            Some(code),
            date,
            Some(value),
        ])))
    }
}
