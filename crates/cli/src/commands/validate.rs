use std::path::Path;
use std::process;

use arsim_core::{ScenarioSnapshot, ValidationReport};

use crate::commands::read_json;
use crate::render;
use crate::{report_error, OutputFormat};

static SCENARIO_SCHEMA_STR: &str = include_str!("../../../../docs/scenario-schema.json");

pub(crate) fn cmd_validate(scenario_path: &Path, output: OutputFormat, quiet: bool) {
    let schema: serde_json::Value = match serde_json::from_str(SCENARIO_SCHEMA_STR) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("internal error: failed to parse embedded scenario schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("internal error: failed to compile schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let doc = read_json(scenario_path, output, quiet);

    let schema_errors: Vec<String> = validator
        .iter_errors(&doc)
        .map(|e| format!("{}", e))
        .collect();
    if !schema_errors.is_empty() {
        if !quiet {
            match output {
                OutputFormat::Text => {
                    eprintln!("invalid scenario");
                    for err in &schema_errors {
                        eprintln!("  - {}", err);
                    }
                }
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "is_valid": false,
                        "errors": schema_errors,
                    });
                    eprintln!("{}", render::pretty(&json));
                }
            }
        }
        process::exit(1);
    }

    // Shape is guaranteed by the schema; this only fails on exotic values.
    let snapshot = match ScenarioSnapshot::from_json(&doc) {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("invalid scenario: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let report = ValidationReport::inspect(&snapshot);
    tracing::debug!(
        nodes = snapshot.nodes.len(),
        connections = snapshot.connections.len(),
        is_valid = report.is_valid,
        "scenario inspected"
    );

    if report.is_valid {
        if !quiet {
            match output {
                OutputFormat::Text => print!("{}", render::report_text(&report)),
                OutputFormat::Json => println!("{}", render::pretty(&report)),
            }
        }
    } else {
        if !quiet {
            match output {
                OutputFormat::Text => eprint!("{}", render::report_text(&report)),
                OutputFormat::Json => eprintln!("{}", render::pretty(&report)),
            }
        }
        process::exit(1);
    }
}
