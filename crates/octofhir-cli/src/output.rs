use anyhow::Result;
use colored::Colorize;
use octofhir_dedup::DedupReport;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn to_json(value: &Value, compact: bool) -> Result<String> {
    Ok(if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    })
}

pub fn print_success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn report_table(report: &DedupReport) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ResourceType", "Input", "Groups", "Merged", "Excluded", "Output"]);
    for (resource_type, stats) in &report.per_type {
        builder.push_record([
            resource_type.clone(),
            stats.input.to_string(),
            stats.groups.to_string(),
            stats.merged.to_string(),
            stats.excluded.to_string(),
            stats.output().to_string(),
        ]);
    }
    builder.build().with(Style::rounded()).to_string()
}

pub fn print_report(report: &DedupReport) {
    if report.per_type.is_empty() {
        eprintln!("No deduplicated resource types in bundle.");
    } else {
        eprintln!("{}", report_table(report));
    }
    eprintln!(
        "{}: {} → {}",
        "Resources".cyan(),
        report.input_resources,
        report.output_resources
    );
    if !report.dangling_removed.is_empty() {
        eprintln!(
            "{}: {}",
            "Dangling".yellow(),
            report.dangling_removed.join(", ")
        );
    }
    if report.pruned_references > 0 {
        eprintln!("{}: {}", "Pruned references".yellow(), report.pruned_references);
    }
}
