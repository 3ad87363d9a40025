use super::{EquivalenceRule, ResourceRole, identifying_code};
use crate::error::Result;
use crate::key::{GroupKey, KeyOutcome};
use crate::registry::ConceptFamily;
use octofhir_core::{Resource, ResourceType};

/// Medication catalog entries, keyed on their preferred code.
///
/// Only the highest-priority system present takes part in the key, so an RxNorm
/// entry and an NDC-only entry for the same drug stay apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct MedicationRule;

impl EquivalenceRule for MedicationRule {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Medication
    }

    fn role(&self) -> ResourceRole {
        ResourceRole::Catalog
    }

    fn key(&self, resource: &Resource) -> Result<KeyOutcome> {
        Ok(match identifying_code(resource, "code", ConceptFamily::Medication) {
            Ok(code) => KeyOutcome::Keyed(GroupKey::exact([Some(code)])),
            Err(exclusion) => KeyOutcome::Excluded(exclusion),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Exclusion;
    use serde_json::json;

    const RXNORM: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";
    const NDC: &str = "http://hl7.org/fhir/sid/ndc";

    fn medication(id: &str, code: serde_json::Value) -> Resource {
        Resource::new(ResourceType::Medication, id).with_field("code", code)
    }

    fn key(resource: &Resource) -> KeyOutcome {
        MedicationRule.key(resource).unwrap()
    }

    #[test]
    fn test_same_rxnorm_code_same_key() {
        let a = medication("a", json!({"coding": [{"system": RXNORM, "code": "198440"}]}));
        let b = medication(
            "b",
            json!({"coding": [
                {"system": NDC, "code": "0093-7180"},
                {"system": RXNORM, "code": "198440", "display": "Acetaminophen 500 MG"}
            ]}),
        );
        assert_eq!(key(&a), key(&b));
    }

    #[test]
    fn test_rxnorm_and_ndc_do_not_match() {
        let a = medication("a", json!({"coding": [{"system": RXNORM, "code": "198440"}]}));
        let b = medication("b", json!({"coding": [{"system": NDC, "code": "0093-7180"}]}));
        assert_ne!(key(&a), key(&b));
    }

    #[test]
    fn test_exclusions() {
        let sentinel = medication("a", json!({"text": "No known medications"}));
        assert_eq!(key(&sentinel), KeyOutcome::Excluded(Exclusion::NoKnownSentinel));

        let local = medication("b", json!({"coding": [{"system": "urn:local", "code": "42"}]}));
        assert_eq!(key(&local), KeyOutcome::Excluded(Exclusion::UnrecognizedCode));

        let uncoded = Resource::new(ResourceType::Medication, "c");
        assert_eq!(key(&uncoded), KeyOutcome::Excluded(Exclusion::UnrecognizedCode));
    }
}
