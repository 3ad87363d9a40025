use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource types the bundle tooling knows by name.
///
/// Anything else found in a bundle is carried as `Custom` and passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Patient,
    Practitioner,
    Organization,
    Location,
    Encounter,
    Condition,
    AllergyIntolerance,
    Immunization,
    Procedure,
    Observation,
    DiagnosticReport,
    FamilyMemberHistory,
    Medication,
    MedicationStatement,
    MedicationRequest,
    MedicationAdministration,
    Composition,
    DocumentReference,
    Bundle,
    #[serde(untagged)]
    Custom(String),
}

impl ResourceType {
    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Patient => "Patient",
            ResourceType::Practitioner => "Practitioner",
            ResourceType::Organization => "Organization",
            ResourceType::Location => "Location",
            ResourceType::Encounter => "Encounter",
            ResourceType::Condition => "Condition",
            ResourceType::AllergyIntolerance => "AllergyIntolerance",
            ResourceType::Immunization => "Immunization",
            ResourceType::Procedure => "Procedure",
            ResourceType::Observation => "Observation",
            ResourceType::DiagnosticReport => "DiagnosticReport",
            ResourceType::FamilyMemberHistory => "FamilyMemberHistory",
            ResourceType::Medication => "Medication",
            ResourceType::MedicationStatement => "MedicationStatement",
            ResourceType::MedicationRequest => "MedicationRequest",
            ResourceType::MedicationAdministration => "MedicationAdministration",
            ResourceType::Composition => "Composition",
            ResourceType::DocumentReference => "DocumentReference",
            ResourceType::Bundle => "Bundle",
            ResourceType::Custom(name) => name,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Patient" => Ok(ResourceType::Patient),
            "Practitioner" => Ok(ResourceType::Practitioner),
            "Organization" => Ok(ResourceType::Organization),
            "Location" => Ok(ResourceType::Location),
            "Encounter" => Ok(ResourceType::Encounter),
            "Condition" => Ok(ResourceType::Condition),
            "AllergyIntolerance" => Ok(ResourceType::AllergyIntolerance),
            "Immunization" => Ok(ResourceType::Immunization),
            "Procedure" => Ok(ResourceType::Procedure),
            "Observation" => Ok(ResourceType::Observation),
            "DiagnosticReport" => Ok(ResourceType::DiagnosticReport),
            "FamilyMemberHistory" => Ok(ResourceType::FamilyMemberHistory),
            "Medication" => Ok(ResourceType::Medication),
            "MedicationStatement" => Ok(ResourceType::MedicationStatement),
            "MedicationRequest" => Ok(ResourceType::MedicationRequest),
            "MedicationAdministration" => Ok(ResourceType::MedicationAdministration),
            "Composition" => Ok(ResourceType::Composition),
            "DocumentReference" => Ok(ResourceType::DocumentReference),
            "Bundle" => Ok(ResourceType::Bundle),
            name => {
                if is_valid_resource_type_name(name) {
                    Ok(ResourceType::Custom(name.to_string()))
                } else {
                    Err(CoreError::invalid_resource_type(name.to_string()))
                }
            }
        }
    }
}

/// Validate if a string is a valid FHIR resource type name
pub fn is_valid_resource_type_name(name: &str) -> bool {
    // FHIR resource type names must start with uppercase letter and contain only letters
    !name.is_empty()
        && name
            .chars()
            .next()
            .map(|c| c.is_ascii_uppercase())
            .unwrap_or(false)
        && name.chars().all(|c| c.is_ascii_alphabetic())
}
