mod commands;
mod logging;
mod play;
mod render;

use std::path::{Path, PathBuf};
use std::process;

use arsim_core::ExportFormat;
use arsim_registry::RegistryConfig;
use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// IVR scenario simulator.
#[derive(Parser)]
#[command(name = "arsim", version, about = "IVR scenario simulator")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Registry configuration file (TOML with a [registry] table)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a scenario file against the schema and report structural problems
    Validate {
        /// Path to the scenario JSON file
        scenario: PathBuf,
    },

    /// Run a scripted sequence of actions through a scenario
    Run {
        /// Path to the scenario JSON file
        scenario: PathBuf,
        /// Path to the actions JSON file (array of {action_type, value, additional_data})
        #[arg(long)]
        actions: PathBuf,
        /// Node to start from instead of the first start node
        #[arg(long)]
        start_node: Option<String>,
        /// Print an export of the finished simulation instead of its state (json or csv)
        #[arg(long)]
        export: Option<ExportFormat>,
    },

    /// Walk a scenario interactively from stdin
    Play {
        /// Path to the scenario JSON file
        scenario: PathBuf,
        /// Node to start from instead of the first start node
        #[arg(long)]
        start_node: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.quiet, cli.output);

    let registry_config = load_registry_config(cli.config.as_deref(), cli.output, cli.quiet);

    match cli.command {
        Commands::Validate { scenario } => {
            commands::validate::cmd_validate(&scenario, cli.output, cli.quiet);
        }
        Commands::Run {
            scenario,
            actions,
            start_node,
            export,
        } => {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let msg = format!("internal error: failed to create tokio runtime: {}", e);
                    report_error(&msg, cli.output, cli.quiet);
                    process::exit(1);
                }
            };
            rt.block_on(commands::run::cmd_run(
                commands::run::RunArgs {
                    scenario: &scenario,
                    actions: &actions,
                    start_node: start_node.as_deref(),
                    export,
                    registry_config,
                },
                cli.output,
                cli.quiet,
            ));
        }
        Commands::Play {
            scenario,
            start_node,
        } => {
            play::run_play(&scenario, start_node.as_deref(), cli.output);
        }
    }
}

fn load_registry_config(path: Option<&Path>, output: OutputFormat, quiet: bool) -> RegistryConfig {
    let Some(path) = path else {
        return RegistryConfig::default();
    };
    match RegistryConfig::load(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

/// Report an error to stderr in the selected format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
