pub(crate) mod run;
pub(crate) mod validate;

use std::path::Path;
use std::process;

use arsim_core::ScenarioSnapshot;

use crate::{report_error, OutputFormat};

/// Read and parse a JSON file, exiting with status 1 on failure.
pub(crate) fn read_json(path: &Path, output: OutputFormat, quiet: bool) -> serde_json::Value {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Load a scenario snapshot file, exiting with status 1 on failure.
pub(crate) fn load_snapshot(path: &Path, output: OutputFormat, quiet: bool) -> ScenarioSnapshot {
    let doc = read_json(path, output, quiet);
    match ScenarioSnapshot::from_json(&doc) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error: '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}
