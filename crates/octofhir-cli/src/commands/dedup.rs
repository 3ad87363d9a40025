use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use octofhir_core::Bundle;
use octofhir_dedup::{DedupConfig, DedupOutcome, Deduplicator};
use serde_json::Value;
use tracing::debug;

use crate::cli::{DedupArgs, ReportFormat};
use crate::output::{print_report, print_success, to_json};

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

pub fn parse_bundle(content: &str) -> Result<Bundle> {
    let value: Value = serde_json::from_str(content).context("Invalid JSON")?;
    Bundle::from_value(value).context("Input is not a FHIR Bundle")
}

pub fn run_dedup(content: &str, config: DedupConfig) -> Result<DedupOutcome> {
    let bundle = parse_bundle(content)?;
    debug!(entries = bundle.entries.len(), "bundle parsed");
    Ok(Deduplicator::new(config).deduplicate(bundle))
}

pub fn dedup(args: &DedupArgs, config: DedupConfig) -> Result<()> {
    let content = read_input(args.file.as_deref())?;
    let DedupOutcome { bundle, report } = run_dedup(&content, config)?;
    let json = to_json(&bundle.to_value()?, args.compact)?;

    match &args.output {
        Some(path) => {
            fs::write(path, format!("{json}\n"))
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
            print_success(&format!(
                "Wrote {} ({} → {} resources)",
                path.display(),
                report.input_resources,
                report.output_resources
            ));
        }
        None => println!("{json}"),
    }

    match args.report {
        Some(ReportFormat::Table) => print_report(&report),
        Some(ReportFormat::Json) => eprintln!("{}", serde_json::to_string_pretty(&report)?),
        None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_dedup_merges_duplicates() {
        let input = json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                {"resource": {"resourceType": "Medication", "id": "m1",
                    "code": {"coding": [{"system": "http://www.nlm.nih.gov/research/umls/rxnorm", "code": "198440"}]}}},
                {"resource": {"resourceType": "Medication", "id": "m2",
                    "code": {"coding": [{"system": "http://www.nlm.nih.gov/research/umls/rxnorm", "code": "198440"}]}}}
            ]
        });
        let outcome = run_dedup(&input.to_string(), DedupConfig::default()).unwrap();
        assert_eq!(outcome.bundle.entries.len(), 1);
        assert_eq!(outcome.report.merged(), 1);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let err = run_dedup("{not json", DedupConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON");

        let err = run_dedup(r#"{"resourceType": "Patient"}"#, DedupConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "Input is not a FHIR Bundle");
    }

    #[test]
    fn test_dedup_writes_output_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in.json");
        let output = dir.path().join("out.json");
        fs::write(&input, r#"{"resourceType": "Bundle", "type": "collection", "entry": []}"#).unwrap();

        let args = DedupArgs {
            file: Some(input),
            output: Some(output.clone()),
            report: None,
            compact: true,
        };
        dedup(&args, DedupConfig::default()).unwrap();

        let written = fs::read_to_string(output).unwrap();
        assert_eq!(
            written.trim(),
            r#"{"resourceType":"Bundle","type":"collection","total":0,"entry":[]}"#
        );
    }
}
