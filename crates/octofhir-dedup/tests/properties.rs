//! Whole-bundle properties checked on a realistic multi-source record.

mod common;

use assert_json_diff::{assert_json_eq, assert_json_include};
use common::*;
use serde_json::json;
use std::collections::HashSet;

#[test]
fn test_multi_source_bundle_survivors() {
    let (output, report) = run(multi_source_bundle());

    assert_eq!(
        references(&output),
        [
            "Patient/p1",
            "Medication/m1",
            "Medication/m3",
            "MedicationAdministration/a1",
            "MedicationStatement/s1",
            "Condition/c1",
            "Condition/c3",
            "Encounter/e1",
            "Composition/doc1",
            "Observation/o1",
            "DiagnosticReport/r1",
            "Practitioner/dr1",
            "Procedure/pr1",
        ]
    );
    assert_eq!(output["type"], "collection");
    assert_eq!(output["total"], 13);

    assert_eq!(report.input_resources, 24);
    assert_eq!(report.output_resources, 13);
    assert_eq!(report.merged(), 7);
    assert_eq!(report.excluded(), 2);
    assert_eq!(
        report.dangling_removed,
        ["MedicationStatement/s3", "MedicationStatement/s4"]
    );
}

#[test]
fn test_idempotent() {
    let (once, _) = run(multi_source_bundle());
    let (twice, report) = run(once.clone());

    assert_json_eq!(twice, once);
    assert!(report.is_unchanged(), "second run changed something: {report:?}");
}

#[test]
fn test_idempotent_on_already_clean_bundle() {
    let clean = bundle(vec![
        patient(),
        json!({"resourceType": "Condition", "id": "c1", "subject": subject(),
            "code": coded(ICD10, "E11.9"), "onsetDateTime": "2019-01-01"}),
        json!({"resourceType": "Immunization", "id": "i1", "status": "completed",
            "vaccineCode": coded("http://hl7.org/fhir/sid/cvx", "140"),
            "occurrenceDateTime": "2021-10-01"}),
    ]);
    let (output, report) = run(clean.clone());
    assert_json_eq!(output, clean);
    assert!(report.is_unchanged());
}

#[test]
fn test_id_preservation() {
    let input = multi_source_bundle();
    let (output, _) = run(input.clone());

    let mut surfaced: HashSet<String> = references(&output).into_iter().collect();
    for resource in entries(&output) {
        surfaced.extend(provenance(resource));
    }

    let fact_types = [
        "Condition",
        "Observation",
        "Procedure",
        "MedicationStatement",
        "MedicationAdministration",
    ];
    let missing: Vec<String> = references(&input)
        .into_iter()
        .filter(|reference| fact_types.iter().any(|t| reference.starts_with(&format!("{t}/"))))
        .filter(|reference| !surfaced.contains(reference))
        .collect();

    // Unrecognized code, dangling medication and a "no known" medication.
    assert_eq!(
        missing,
        [
            "MedicationStatement/s3",
            "MedicationStatement/s4",
            "Observation/o3"
        ]
    );
}

#[test]
fn test_reference_integrity() {
    let (output, _) = run(multi_source_bundle());
    let present: HashSet<String> = references(&output).into_iter().collect();

    for resource_type in ["MedicationStatement", "MedicationRequest", "MedicationAdministration"] {
        for resource in of_type(&output, resource_type) {
            let target = resource["medicationReference"]["reference"].as_str().unwrap();
            assert!(present.contains(target), "{target} does not resolve");
        }
    }
}

#[test]
fn test_no_information_loss() {
    let (output, _) = run(multi_source_bundle());

    let condition = find(&output, "Condition/c1").unwrap();
    assert_json_include!(
        actual: condition,
        expected: json!({
            "clinicalStatus": {"text": "active"},
            "code": {
                "coding": [
                    {"system": ICD10, "code": "I10"},
                    {"system": SNOMED, "code": "38341003"},
                    {"system": IMO, "code": "12345"}
                ],
                "text": "Hypertension"
            },
            "note": [{"text": "reported by second source"}]
        })
    );

    let administration = find(&output, "MedicationAdministration/a1").unwrap();
    assert_eq!(administration["dosage"], json!({"text": "1 tablet"}));

    let observation = find(&output, "Observation/o1").unwrap();
    assert_eq!(observation["interpretation"], json!([{"text": "normal"}]));

    let medication = find(&output, "Medication/m1").unwrap();
    assert_eq!(medication["form"], json!({"text": "tablet"}));
}

#[test]
fn test_patient_subject_is_never_merged() {
    let (output, _) = run(multi_source_bundle());
    for resource in entries(&output) {
        if let Some(subject) = resource.get("subject") {
            assert_eq!(subject, &json!({"reference": "Patient/p1"}));
        }
    }
}

#[test]
fn test_entry_envelopes_preserved() {
    let (output, _) = run(multi_source_bundle());
    let urls: Vec<&str> = output["entry"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|entry| entry["fullUrl"].as_str())
        .collect();
    assert_eq!(urls[..3], ["urn:uuid:p1", "urn:uuid:m1", "urn:uuid:m3"]);
}
