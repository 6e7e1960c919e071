//! `arsim play`: interactive walk through a scenario.
//!
//! Reads one command per line from stdin and prints the resulting state
//! after every action. Failed actions are reported and the session
//! continues; a finished simulation can be restarted with `reset`.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;
use std::sync::Arc;

use arsim_core::{ScenarioGraph, SimulationConfig, SimulationEngine, StateSnapshot};
use serde_json::{Map, Value};

use crate::commands::load_snapshot;
use crate::render;
use crate::{report_error, OutputFormat};

const HELP: &str = "\
commands:
  continue          advance from a start or message node
  select <key>      choose a branch option
  input <text>      answer an input prompt
  transfer          transfer the caller
  end               finish the call
  state             show the current node
  history           show executed steps
  reset             restart from the start node
  quit              leave";

#[derive(Debug, PartialEq)]
enum Command {
    Action { action_type: &'static str, value: Value },
    State,
    History,
    Reset,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let action = |action_type, value| Ok(Command::Action { action_type, value });
    match word {
        "continue" | "c" => action("continue", Value::Null),
        "select" | "s" if !rest.is_empty() => action("select", Value::String(rest.to_string())),
        "select" | "s" => Err("usage: select <key>".to_string()),
        "input" | "i" => action("input", Value::String(rest.to_string())),
        "transfer" => action("transfer", Value::Null),
        "end" => action("end", Value::Null),
        "state" => Ok(Command::State),
        "history" => Ok(Command::History),
        "reset" => Ok(Command::Reset),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command '{}' (try 'help')", other)),
    }
}

fn show(state: &StateSnapshot, output: OutputFormat) {
    match output {
        OutputFormat::Text => print!("{}", render::state_text(state)),
        OutputFormat::Json => println!("{}", render::pretty(state)),
    }
}

/// Run the interactive session for the scenario at `path`.
pub(crate) fn run_play(path: &Path, start_node: Option<&str>, output: OutputFormat) {
    let snapshot = load_snapshot(path, output, false);
    let graph = match ScenarioGraph::build(&snapshot) {
        Ok(g) => Arc::new(g),
        Err(e) => {
            report_error(&format!("error: {}", e), output, false);
            process::exit(1);
        }
    };
    for warning in graph.warnings() {
        eprintln!("warning: {}", warning);
    }

    let simulation_id = match snapshot.scenario_id {
        Some(id) => format!("play-{}", id),
        None => "play".to_string(),
    };
    let mut engine =
        match SimulationEngine::start(simulation_id, graph, start_node, SimulationConfig::default())
        {
            Ok(e) => e,
            Err(e) => {
                report_error(&format!("error: {}", e), output, false);
                process::exit(1);
            }
        };

    let title = snapshot.name.as_deref().unwrap_or("scenario");
    println!(
        "arsim play: {} ({} nodes). Type 'help' for commands.",
        title,
        engine.graph().node_count()
    );
    show(&engine.state(), output);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("arsim> ");
        let _ = io::stdout().flush();
        let line = match lines.next() {
            Some(Ok(l)) => l,
            Some(Err(e)) => {
                report_error(&format!("error reading stdin: {}", e), output, false);
                break;
            }
            None => {
                println!();
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(Command::Action { action_type, value }) => {
                match engine.execute_action(action_type, value, Map::new()) {
                    Ok(state) => show(&state, output),
                    Err(e) => println!("error: {}", e),
                }
            }
            Ok(Command::State) => show(&engine.state(), output),
            Ok(Command::History) => {
                let history = engine.history();
                match output {
                    OutputFormat::Text => print!("{}", render::history_text(&history)),
                    OutputFormat::Json => println!("{}", render::pretty(&history)),
                }
            }
            Ok(Command::Reset) => match engine.reset(start_node) {
                Ok(state) => show(&state, output),
                Err(e) => println!("error: {}", e),
            },
            Ok(Command::Help) => println!("{}", HELP),
            Ok(Command::Quit) => break,
            Err(msg) => println!("{}", msg),
        }
    }
}
