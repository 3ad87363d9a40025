use super::EquivalenceRule;
use crate::error::Result;
use crate::key::{DateSource, GroupKey, KeyOutcome, code_part, first_date};
use crate::registry::ConceptFamily;
use octofhir_core::{Resource, ResourceType};

/// Statements, requests and administrations of a medication.
///
/// They match on the medication they point at plus their own date. The medication
/// reference is read after the catalog pass has rewritten it, so two statements that
/// pointed at duplicate catalog entries now carry the same reference.
#[derive(Debug, Clone)]
pub struct MedicationUsageRule {
    resource_type: ResourceType,
    dates: &'static [DateSource],
}

impl MedicationUsageRule {
    pub fn statement() -> Self {
        Self {
            resource_type: ResourceType::MedicationStatement,
            dates: &[
                DateSource::DateTime("effectiveDateTime"),
                DateSource::Period("effectivePeriod"),
                DateSource::DateTime("dateAsserted"),
            ],
        }
    }

    pub fn request() -> Self {
        Self {
            resource_type: ResourceType::MedicationRequest,
            dates: &[DateSource::DateTime("authoredOn")],
        }
    }

    pub fn administration() -> Self {
        Self {
            resource_type: ResourceType::MedicationAdministration,
            dates: &[
                DateSource::DateTime("effectiveDateTime"),
                DateSource::Period("effectivePeriod"),
            ],
        }
    }

    fn medication_part(resource: &Resource) -> Option<String> {
        if let Some(reference) = resource.reference_field("medicationReference") {
            return Some(reference.trim().to_string());
        }
        resource
            .concept("medicationCodeableConcept")
            .and_then(|concept| code_part(&concept, ConceptFamily::Medication))
    }
}

impl EquivalenceRule for MedicationUsageRule {
    fn resource_type(&self) -> ResourceType {
        self.resource_type.clone()
    }

    fn key(&self, resource: &Resource) -> Result<KeyOutcome> {
        let Some(medication) = Self::medication_part(resource) else {
            return Ok(KeyOutcome::Unique);
        };
        let date = first_date(resource, self.dates)?;
        Ok(KeyOutcome::Keyed(GroupKey::exact([Some(medication), date])))
    }

    fn code_fields(&self) -> &'static [&'static str] {
        &["medicationCodeableConcept"]
    }
}
