//! Coded clinical facts keyed on one concept, optionally plus a date.

use super::{EquivalenceRule, identifying_code, strip_unknown_codings};
use crate::error::Result;
use crate::key::{DateSource, Exclusion, GroupKey, KeyOutcome, code_part, first_date};
use crate::registry::{ConceptFamily, is_no_known_sentinel};
use octofhir_core::{CodeableConcept, Resource, ResourceType};
use serde_json::Value;

/// Allergies match on the allergen alone.
///
/// The allergen is `code`, or for sources that only fill reactions, the first reaction
/// substance with a recognized code.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllergyRule;

impl AllergyRule {
    fn substances(resource: &Resource) -> Vec<CodeableConcept> {
        resource
            .get("reaction")
            .and_then(Value::as_array)
            .map(|reactions| {
                reactions
                    .iter()
                    .filter_map(|r| r.get("substance"))
                    .filter_map(CodeableConcept::from_value)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl EquivalenceRule for AllergyRule {
    fn resource_type(&self) -> ResourceType {
        ResourceType::AllergyIntolerance
    }

    fn key(&self, resource: &Resource) -> Result<KeyOutcome> {
        let mut candidates: Vec<CodeableConcept> = resource.concept("code").into_iter().collect();
        candidates.extend(Self::substances(resource));

        if candidates.iter().any(is_no_known_sentinel) {
            return Ok(KeyOutcome::Excluded(Exclusion::NoKnownSentinel));
        }
        Ok(candidates
            .iter()
            .find_map(|concept| code_part(concept, ConceptFamily::Allergen))
            .map(|allergen| KeyOutcome::Keyed(GroupKey::exact([Some(allergen)])))
            .unwrap_or(KeyOutcome::Excluded(Exclusion::UnrecognizedCode)))
    }

    fn richness(&self, resource: &Resource) -> usize {
        let code = resource.concept("code").map(|c| c.coding.len()).unwrap_or(0);
        code + Self::substances(resource).iter().map(|c| c.coding.len()).sum::<usize>()
    }

    fn scrub(&self, resource: &mut Resource) {
        if let Some(code) = resource.data.get_mut("code") {
            strip_unknown_codings(code);
        }
        let Some(Value::Array(reactions)) = resource.data.get_mut("reaction") else {
            return;
        };
        for reaction in reactions.iter_mut() {
            let Some(reaction) = reaction.as_object_mut() else {
                continue;
            };
            if let Some(substance) = reaction.get_mut("substance")
                && !strip_unknown_codings(substance)
            {
                reaction.shift_remove("substance");
            }
            if let Some(Value::Array(manifestations)) = reaction.get_mut("manifestation") {
                manifestations.retain_mut(strip_unknown_codings);
            }
        }
    }
}

/// Immunizations match on vaccine code and administration date.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmunizationRule;

const IMMUNIZATION_DATES: &[DateSource] = &[DateSource::DateTime("occurrenceDateTime")];

impl EquivalenceRule for ImmunizationRule {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Immunization
    }

    fn key(&self, resource: &Resource) -> Result<KeyOutcome> {
        let code = match identifying_code(resource, "vaccineCode", ConceptFamily::Immunization) {
            Ok(code) => code,
            Err(exclusion) => return Ok(KeyOutcome::Excluded(exclusion)),
        };
        let date = first_date(resource, IMMUNIZATION_DATES)?;
        Ok(KeyOutcome::Keyed(GroupKey::exact([Some(code), date])))
    }

    fn code_fields(&self) -> &'static [&'static str] {
        &["vaccineCode"]
    }
}

/// Procedures match on procedure code and performed date.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcedureRule;

const PROCEDURE_DATES: &[DateSource] = &[
    DateSource::DateTime("performedDateTime"),
    DateSource::Period("performedPeriod"),
];

impl EquivalenceRule for ProcedureRule {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Procedure
    }

    fn key(&self, resource: &Resource) -> Result<KeyOutcome> {
        let code = match identifying_code(resource, "code", ConceptFamily::Procedure) {
            Ok(code) => code,
            Err(exclusion) => return Ok(KeyOutcome::Excluded(exclusion)),
        };
        let date = first_date(resource, PROCEDURE_DATES)?;
        Ok(KeyOutcome::Keyed(GroupKey::exact([Some(code), date])))
    }
}

/// One history per relative: family histories match on the relationship code.
#[derive(Debug, Clone, Copy, Default)]
pub struct FamilyHistoryRule;

impl EquivalenceRule for FamilyHistoryRule {
    fn resource_type(&self) -> ResourceType {
        ResourceType::FamilyMemberHistory
    }

    fn key(&self, resource: &Resource) -> Result<KeyOutcome> {
        let relationship = resource.concept("relationship").and_then(|concept| {
            concept
                .coding
                .iter()
                .find_map(|c| c.normalized_code())
                .or_else(|| concept.normalized_text())
        });
        Ok(match relationship {
            Some(relationship) => KeyOutcome::Keyed(GroupKey::exact([Some(relationship)])),
            None => KeyOutcome::Excluded(Exclusion::MissingContent),
        })
    }

    fn code_fields(&self) -> &'static [&'static str] {
        &["relationship"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RXNORM: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";
    const SNOMED: &str = "http://snomed.info/sct";
    const CVX: &str = "http://hl7.org/fhir/sid/cvx";
    const CPT: &str = "http://www.ama-assn.org/go/cpt";

    fn keyed(rule: &dyn EquivalenceRule, resource: &Resource) -> GroupKey {
        match rule.key(resource).unwrap() {
            KeyOutcome::Keyed(key) => key,
            other => panic!("expected a key, got {other:?}"),
        }
    }

    fn allergy(id: &str, reaction: Value) -> Resource {
        Resource::new(ResourceType::AllergyIntolerance, id).with_field("reaction", reaction)
    }

    #[test]
    fn test_allergy_from_reaction_substance() {
        let a = allergy(
            "a",
            json!([{"substance": {"coding": [{"system": RXNORM, "code": "7980"}]}}]),
        );
        let b = Resource::new(ResourceType::AllergyIntolerance, "b")
            .with_field("code", json!({"coding": [{"system": RXNORM, "code": "7980"}]}));
        assert_eq!(keyed(&AllergyRule, &a), keyed(&AllergyRule, &b));
    }

    #[test]
    fn test_allergy_different_substances_stay_apart() {
        let a = allergy(
            "a",
            json!([{"substance": {"coding": [{"system": RXNORM, "code": "7980"}]}}]),
        );
        let b = allergy(
            "b",
            json!([{"substance": {"coding": [{"system": RXNORM, "code": "2670"}]}}]),
        );
        assert_ne!(keyed(&AllergyRule, &a), keyed(&AllergyRule, &b));
    }

    #[test]
    fn test_allergy_exclusions() {
        let none = Resource::new(ResourceType::AllergyIntolerance, "a")
            .with_field("code", json!({"text": "No Known Drug Allergies"}));
        assert_eq!(
            AllergyRule.key(&none).unwrap(),
            KeyOutcome::Excluded(Exclusion::NoKnownSentinel)
        );

        let unknown = allergy(
            "b",
            json!([{
                "substance": {"coding": [{"code": "UNK", "display": "unknown"}]},
                "manifestation": [{"coding": [{"code": "UNK"}]}]
            }]),
        );
        assert_eq!(
            AllergyRule.key(&unknown).unwrap(),
            KeyOutcome::Excluded(Exclusion::UnrecognizedCode)
        );
    }

    #[test]
    fn test_allergy_scrub_strips_unknown_reaction_parts() {
        let mut resource = allergy(
            "a",
            json!([{
                "substance": {"coding": [{"code": "UNK", "display": "unknown"}]},
                "manifestation": [
                    {"coding": [{"system": SNOMED, "code": "UNK", "display": "unknown"}], "text": "unknown"},
                    {"coding": [{"system": SNOMED, "code": "247472004", "display": "Hives"}]}
                ]
            }]),
        );
        AllergyRule.scrub(&mut resource);

        let reaction = &resource.get("reaction").unwrap()[0];
        assert!(reaction.get("substance").is_none());
        assert_eq!(reaction["manifestation"].as_array().unwrap().len(), 1);
        assert_eq!(reaction["manifestation"][0]["coding"][0]["code"], "247472004");
    }

    #[test]
    fn test_immunization_key_includes_date() {
        let shot = |id: &str, date: &str| {
            Resource::new(ResourceType::Immunization, id)
                .with_field("vaccineCode", json!({"coding": [{"system": CVX, "code": "140"}]}))
                .with_field("occurrenceDateTime", json!(date))
        };
        assert_eq!(
            keyed(&ImmunizationRule, &shot("a", "2021-10-01")),
            keyed(&ImmunizationRule, &shot("b", "2021-10-01T15:00:00Z"))
        );
        assert_ne!(
            keyed(&ImmunizationRule, &shot("a", "2021-10-01")),
            keyed(&ImmunizationRule, &shot("b", "2022-10-01"))
        );
    }

    #[test]
    fn test_procedure_uses_performed_period() {
        let a = Resource::new(ResourceType::Procedure, "a")
            .with_field("code", json!({"coding": [{"system": CPT, "code": "99213"}]}))
            .with_field("performedPeriod", json!({"start": "2020-02-02T10:00:00Z"}));
        let b = Resource::new(ResourceType::Procedure, "b")
            .with_field("code", json!({"coding": [{"system": CPT, "code": "99213"}]}))
            .with_field("performedDateTime", json!("2020-02-02"));
        assert_eq!(keyed(&ProcedureRule, &a), keyed(&ProcedureRule, &b));
    }

    #[test]
    fn test_procedure_without_recognized_code_is_excluded() {
        let resource = Resource::new(ResourceType::Procedure, "a")
            .with_field("code", json!({"coding": [{"system": "urn:local", "code": "x"}]}));
        assert_eq!(
            ProcedureRule.key(&resource).unwrap(),
            KeyOutcome::Excluded(Exclusion::UnrecognizedCode)
        );
    }

    #[test]
    fn test_family_history_by_relationship() {
        let history = |id: &str, code: &str| {
            Resource::new(ResourceType::FamilyMemberHistory, id).with_field(
                "relationship",
                json!({"coding": [{"system": "http://terminology.hl7.org/CodeSystem/v3-RoleCode", "code": code}]}),
            )
        };
        assert_eq!(
            keyed(&FamilyHistoryRule, &history("a", "MTH")),
            keyed(&FamilyHistoryRule, &history("b", "mth"))
        );
        assert_ne!(
            keyed(&FamilyHistoryRule, &history("a", "MTH")),
            keyed(&FamilyHistoryRule, &history("b", "FTH"))
        );
        assert_eq!(
            FamilyHistoryRule
                .key(&Resource::new(ResourceType::FamilyMemberHistory, "c"))
                .unwrap(),
            KeyOutcome::Excluded(Exclusion::MissingContent)
        );
    }
}
