use super::EquivalenceRule;
use crate::error::Result;
use crate::key::{DateSource, Exclusion, GroupKey, KeyOutcome, required_date};
use crate::registry::{ConceptFamily, is_no_known_sentinel, recognized_codes};
use octofhir_core::{Resource, ResourceType};

const CONDITION_DATES: &[DateSource] = &[
    DateSource::DateTime("onsetDateTime"),
    DateSource::Period("onsetPeriod"),
    DateSource::DateTime("recordedDate"),
];

/// Conditions match on date plus any shared code.
///
/// Sources rarely agree on the full code set of a problem (one sends ICD-10, another
/// SNOMED plus ICD-10), so a single common code on the same day is enough.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionRule;

impl EquivalenceRule for ConditionRule {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Condition
    }

    fn key(&self, resource: &Resource) -> Result<KeyOutcome> {
        let Some(concept) = resource.concept("code") else {
            return Ok(KeyOutcome::Excluded(Exclusion::UnrecognizedCode));
        };
        if is_no_known_sentinel(&concept) {
            return Ok(KeyOutcome::Excluded(Exclusion::NoKnownSentinel));
        }
        let codes = recognized_codes(&concept, ConceptFamily::Condition);
        if codes.is_empty() {
            return Ok(KeyOutcome::Excluded(Exclusion::UnrecognizedCode));
        }
        let date = required_date(resource, CONDITION_DATES)?;
        Ok(KeyOutcome::Keyed(GroupKey::overlap(codes, date)))
    }
}
