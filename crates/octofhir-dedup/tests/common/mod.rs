//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use octofhir_core::Bundle;
use octofhir_dedup::{DEFAULT_PROVENANCE_URL, DedupConfig, DedupReport, Deduplicator};
use serde_json::{Value, json};

pub const RXNORM: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";
pub const NDC: &str = "http://hl7.org/fhir/sid/ndc";
pub const SNOMED: &str = "http://snomed.info/sct";
pub const ICD10: &str = "http://hl7.org/fhir/sid/icd-10-cm";
pub const IMO: &str = "urn:oid:2.16.840.1.113883.3.247.1.1";
pub const LOINC: &str = "http://loinc.org";
pub const CPT: &str = "http://www.ama-assn.org/go/cpt";

pub fn bundle(resources: Vec<Value>) -> Value {
    let entries: Vec<Value> = resources
        .into_iter()
        .map(|resource| {
            let full_url = format!(
                "urn:uuid:{}",
                resource["id"].as_str().unwrap_or("anonymous")
            );
            json!({ "fullUrl": full_url, "resource": resource })
        })
        .collect();
    json!({
        "resourceType": "Bundle",
        "type": "collection",
        "total": entries.len(),
        "entry": entries
    })
}

pub fn run_with(config: DedupConfig, input: Value) -> (Value, DedupReport) {
    let bundle = Bundle::from_value(input).expect("fixture is a bundle");
    let outcome = Deduplicator::new(config).deduplicate(bundle);
    let value = outcome.bundle.to_value().expect("bundle serializes");
    (value, outcome.report)
}

pub fn run(input: Value) -> (Value, DedupReport) {
    run_with(DedupConfig::default(), input)
}

/// `Type/id` of every resource in the bundle, in entry order.
pub fn references(bundle: &Value) -> Vec<String> {
    entries(bundle)
        .filter_map(|resource| {
            Some(format!(
                "{}/{}",
                resource["resourceType"].as_str()?,
                resource["id"].as_str()?
            ))
        })
        .collect()
}

pub fn entries(bundle: &Value) -> impl Iterator<Item = &Value> {
    bundle["entry"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|entry| &entry["resource"])
}

pub fn find<'a>(bundle: &'a Value, reference: &str) -> Option<&'a Value> {
    let (resource_type, id) = reference.split_once('/')?;
    entries(bundle).find(|r| r["resourceType"] == resource_type && r["id"] == id)
}

pub fn of_type<'a>(bundle: &'a Value, resource_type: &str) -> Vec<&'a Value> {
    entries(bundle)
        .filter(|r| r["resourceType"] == resource_type)
        .collect()
}

/// References recorded by a resource's provenance extensions.
pub fn provenance(resource: &Value) -> Vec<String> {
    resource["extension"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|ext| ext["url"] == DEFAULT_PROVENANCE_URL)
        .filter_map(|ext| ext["valueReference"]["reference"].as_str())
        .map(str::to_string)
        .collect()
}

pub fn coded(system: &str, code: &str) -> Value {
    json!({"coding": [{"system": system, "code": code}]})
}

pub fn patient() -> Value {
    json!({"resourceType": "Patient", "id": "p1", "name": [{"family": "Doe", "given": ["John"]}]})
}

pub fn subject() -> Value {
    json!({"reference": "Patient/p1"})
}

/// A patient record merged from two sources, with every kind of duplicate the engine
/// handles.
pub fn multi_source_bundle() -> Value {
    bundle(vec![
        patient(),
        json!({"resourceType": "Medication", "id": "m1",
            "code": {"coding": [{"system": RXNORM, "code": "198440", "display": "Acetaminophen 500 MG"}]}}),
        json!({"resourceType": "Medication", "id": "m2",
            "code": {"coding": [{"system": RXNORM, "code": "198440"}]}, "form": {"text": "tablet"}}),
        json!({"resourceType": "Medication", "id": "m3", "code": coded(NDC, "0777-3105-02")}),
        json!({"resourceType": "Medication", "id": "m4", "code": {"text": "No known medications"}}),
        json!({"resourceType": "MedicationAdministration", "id": "a1", "status": "completed",
            "subject": subject(), "effectiveDateTime": "2021-03-01T10:00:00Z",
            "medicationReference": {"reference": "Medication/m1"}}),
        json!({"resourceType": "MedicationAdministration", "id": "a2", "status": "in-progress",
            "subject": subject(), "effectiveDateTime": "2021-03-01T10:00:00Z",
            "medicationReference": {"reference": "Medication/m2"},
            "dosage": {"text": "1 tablet"}}),
        json!({"resourceType": "MedicationStatement", "id": "s1", "status": "unknown",
            "subject": subject(), "effectivePeriod": {"start": "2021-02-01"},
            "medicationReference": {"reference": "Medication/m1"}}),
        json!({"resourceType": "MedicationStatement", "id": "s2", "status": "intended",
            "subject": subject(), "effectivePeriod": {"start": "2021-02-01", "end": "2021-06-01"},
            "medicationReference": {"reference": "Medication/m2"}}),
        json!({"resourceType": "MedicationStatement", "id": "s3", "status": "active",
            "subject": subject(), "dateAsserted": "2021-01-01",
            "medicationReference": {"reference": "Medication/missing"}}),
        json!({"resourceType": "MedicationStatement", "id": "s4", "status": "active",
            "subject": subject(), "dateAsserted": "2021-01-01",
            "medicationReference": {"reference": "Medication/m4"}}),
        json!({"resourceType": "Condition", "id": "c1", "subject": subject(),
            "clinicalStatus": {"text": "active"},
            "code": {"coding": [
                {"system": ICD10, "code": "I10"},
                {"system": SNOMED, "code": "38341003"}
            ]},
            "onsetDateTime": "2020-05-01"}),
        json!({"resourceType": "Condition", "id": "c2", "subject": subject(),
            "code": {"coding": [
                {"system": SNOMED, "code": "38341003"},
                {"system": IMO, "code": "12345"}
            ], "text": "Hypertension"},
            "onsetDateTime": "2020-05-01T08:00:00Z",
            "note": [{"text": "reported by second source"}]}),
        json!({"resourceType": "Condition", "id": "c3", "subject": subject(),
            "code": coded(ICD10, "I10"), "onsetDateTime": "2021-05-01"}),
        json!({"resourceType": "Encounter", "id": "e1", "status": "finished",
            "subject": subject(), "class": {"code": "AMB"},
            "period": {"start": "2020-05-01T08:00:00Z"},
            "diagnosis": [
                {"condition": {"reference": "Condition/c1"}},
                {"condition": {"reference": "Condition/c2"}}
            ]}),
        json!({"resourceType": "Composition", "id": "doc1", "status": "final",
            "subject": subject(), "title": "Continuity of care",
            "section": [{
                "title": "Medications",
                "entry": [
                    {"reference": "MedicationStatement/s1"},
                    {"reference": "MedicationStatement/s2"},
                    {"reference": "MedicationStatement/s3"},
                    {"reference": "Medication/m4"}
                ]
            }, {
                "title": "Problems",
                "entry": [{"reference": "Condition/c2"}]
            }]}),
        json!({"resourceType": "Observation", "id": "o1", "status": "final", "subject": subject(),
            "category": [{"coding": [{"code": "vital-signs"}]}],
            "code": coded(LOINC, "8302-2"), "effectiveDateTime": "2021-03-01",
            "valueQuantity": {"value": 180, "unit": "cm"}}),
        json!({"resourceType": "Observation", "id": "o2", "status": "final", "subject": subject(),
            "category": [{"coding": [{"code": "vital-signs"}]}],
            "code": coded(LOINC, "8302-2"), "effectiveDateTime": "2021-03-01T09:30:00Z",
            "valueQuantity": {"value": 180, "unit": "cm"},
            "interpretation": [{"text": "normal"}]}),
        json!({"resourceType": "Observation", "id": "o3", "status": "final", "subject": subject(),
            "code": coded("urn:local:labs", "HT"), "valueString": "tall"}),
        json!({"resourceType": "DiagnosticReport", "id": "r1", "status": "final",
            "subject": subject(), "code": coded(LOINC, "85353-1"),
            "effectiveDateTime": "2021-03-01",
            "result": [
                {"reference": "Observation/o1"},
                {"reference": "Observation/o2"},
                {"reference": "Observation/o3"}
            ]}),
        json!({"resourceType": "Practitioner", "id": "dr1",
            "name": [{"family": "Smith", "given": ["Jane"]}],
            "address": [{"line": ["1 Main St"], "city": "Springfield"}]}),
        json!({"resourceType": "Practitioner", "id": "dr2",
            "name": [{"family": "SMITH", "given": ["Jane"]}],
            "address": [{"line": ["1 Main St"], "city": "Springfield"}]}),
        json!({"resourceType": "Procedure", "id": "pr1", "status": "completed",
            "subject": subject(), "code": coded(CPT, "99213"),
            "performedDateTime": "2021-04-01",
            "performer": [
                {"actor": {"reference": "Practitioner/dr1"}},
                {"actor": {"reference": "Practitioner/dr2"}}
            ]}),
        json!({"resourceType": "Procedure", "id": "pr2", "status": "completed",
            "subject": subject(), "code": coded(CPT, "99213"),
            "performedDateTime": "2021-04-01",
            "performer": [{"actor": {"reference": "Practitioner/dr2"}}]}),
    ])
}
