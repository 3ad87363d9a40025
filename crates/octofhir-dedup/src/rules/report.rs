//! Resources that aggregate other facts: diagnostic reports and encounters.
//!
//! Both run after the clinical facts they point at, so their reference arrays are
//! already rewritten to surviving ids when they are merged.

use super::{EquivalenceRule, strip_unknown_codings};
use crate::error::Result;
use crate::key::{DateSource, GroupKey, KeyOutcome, code_part, first_date};
use crate::registry::ConceptFamily;
use octofhir_core::{Resource, ResourceType};
use serde_json::Value;

const REPORT_DATES: &[DateSource] = &[
    DateSource::DateTime("effectiveDateTime"),
    DateSource::Period("effectivePeriod"),
    DateSource::DateTime("issued"),
];

const ENCOUNTER_DATES: &[DateSource] = &[DateSource::Period("period")];

/// Diagnostic reports match on report code and date.
///
/// A report with neither `result` nor `presentedForm` says nothing on its own and is
/// kept ungrouped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticReportRule;

fn has_items(resource: &Resource, field: &str) -> bool {
    resource
        .get(field)
        .and_then(Value::as_array)
        .is_some_and(|items| !items.is_empty())
}

impl EquivalenceRule for DiagnosticReportRule {
    fn resource_type(&self) -> ResourceType {
        ResourceType::DiagnosticReport
    }

    fn key(&self, resource: &Resource) -> Result<KeyOutcome> {
        if !has_items(resource, "result") && !has_items(resource, "presentedForm") {
            return Ok(KeyOutcome::Unique);
        }
        let code = resource.concept("code").and_then(|concept| {
            code_part(&concept, ConceptFamily::Observation).or_else(|| concept.normalized_text())
        });
        let Some(code) = code else {
            return Ok(KeyOutcome::Unique);
        };
        let date = first_date(resource, REPORT_DATES)?;
        Ok(KeyOutcome::Keyed(GroupKey::exact([Some(code), date])))
    }
}

/// Encounters match on class, type and start of the period.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncounterRule;

impl EncounterRule {
    fn type_part(resource: &Resource) -> Option<String> {
        resource.concepts("type").iter().find_map(|concept| {
            concept
                .coding
                .iter()
                .find_map(|c| c.normalized_code())
                .or_else(|| concept.normalized_text())
        })
    }

    fn class_part(resource: &Resource) -> Option<String> {
        resource
            .get("class")
            .and_then(|class| class.get("code"))
            .and_then(Value::as_str)
            .map(|code| code.trim().to_lowercase())
    }
}

impl EquivalenceRule for EncounterRule {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Encounter
    }

    fn key(&self, resource: &Resource) -> Result<KeyOutcome> {
        let Some(date) = first_date(resource, ENCOUNTER_DATES)? else {
            return Ok(KeyOutcome::Unique);
        };
        Ok(KeyOutcome::Keyed(GroupKey::exact([
            Self::class_part(resource),
            Self::type_part(resource),
            Some(date),
        ])))
    }

    fn code_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn richness(&self, resource: &Resource) -> usize {
        resource.concepts("type").iter().map(|c| c.coding.len()).sum()
    }

    fn scrub(&self, resource: &mut Resource) {
        if let Some(Value::Array(types)) = resource.data.get_mut("type") {
            types.retain_mut(strip_unknown_codings);
        }
    }
}
