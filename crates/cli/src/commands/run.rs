use std::path::Path;
use std::process;

use arsim_core::{ExportFormat, SimulationConfig};
use arsim_registry::{RegistryConfig, SimulationRegistry};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::commands::{load_snapshot, read_json};
use crate::render;
use crate::{report_error, OutputFormat};

/// One entry of an actions script.
#[derive(Debug, Deserialize)]
struct ScriptedAction {
    action_type: String,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    additional_data: Map<String, Value>,
}

pub(crate) struct RunArgs<'a> {
    pub scenario: &'a Path,
    pub actions: &'a Path,
    pub start_node: Option<&'a str>,
    pub export: Option<ExportFormat>,
    pub registry_config: RegistryConfig,
}

pub(crate) async fn cmd_run(args: RunArgs<'_>, output: OutputFormat, quiet: bool) {
    let snapshot = load_snapshot(args.scenario, output, quiet);
    let script: Vec<ScriptedAction> =
        match serde_json::from_value(read_json(args.actions, output, quiet)) {
            Ok(s) => s,
            Err(e) => {
                let msg = format!(
                    "error: '{}' is not a list of actions: {}",
                    args.actions.display(),
                    e
                );
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        };

    let registry = SimulationRegistry::new(args.registry_config);
    let started = match registry
        .start(&snapshot, args.start_node, SimulationConfig::default())
        .await
    {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let id = started.simulation_id;

    let mut last = started.state;
    for (i, action) in script.into_iter().enumerate() {
        let action_type = action.action_type;
        match registry
            .execute_action(&id, &action_type, action.value, action.additional_data)
            .await
        {
            Ok(state) => last = state.state,
            Err(e) => {
                let msg = format!("error: action {} ({}) failed: {}", i + 1, action_type, e);
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        }
    }

    if let Some(format) = args.export {
        match registry.export(&id, format).await {
            Ok(export) => {
                if !quiet {
                    match output {
                        OutputFormat::Text => println!("{}", export.content.trim_end()),
                        OutputFormat::Json => println!("{}", render::pretty(&export)),
                    }
                }
            }
            Err(e) => {
                report_error(&format!("error: {}", e), output, quiet);
                process::exit(1);
            }
        }
    } else if !quiet {
        match output {
            OutputFormat::Text => print!("{}", render::state_text(&last)),
            OutputFormat::Json => match registry.state(&id).await {
                Ok(state) => println!("{}", render::pretty(&state)),
                Err(e) => {
                    report_error(&format!("error: {}", e), output, quiet);
                    process::exit(1);
                }
            },
        }
    }

    registry.stop(&id).await;
}
