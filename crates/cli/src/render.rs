//! Text and JSON rendering of engine views.

use std::fmt::Write;

use arsim_core::{display_value, HistoryView, StateSnapshot, ValidationReport};
use serde::Serialize;

pub(crate) fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

pub(crate) fn state_text(state: &StateSnapshot) -> String {
    let node = &state.current_node;
    let mut out = String::new();
    let _ = match node.node_type {
        Some(node_type) => write!(out, "node: {} ({})", node.node_id, node_type),
        None => write!(out, "node: {}", node.node_id),
    };
    if !node.name.is_empty() {
        let _ = write!(out, " {}", node.name);
    }
    out.push('\n');
    let _ = writeln!(out, "status: {}", state.status);

    if !state.available_actions.is_empty() {
        out.push_str("actions:\n");
        for action in &state.available_actions {
            match (&action.key, &action.input_type) {
                (Some(key), _) => {
                    let _ = writeln!(
                        out,
                        "  {} {}: {}",
                        action.action_type.as_str(),
                        key,
                        action.label
                    );
                }
                (None, Some(input_type)) => {
                    let _ = writeln!(
                        out,
                        "  {} <{}>: {}",
                        action.action_type.as_str(),
                        input_type,
                        action.label
                    );
                }
                (None, None) => {
                    let _ = writeln!(out, "  {}", action.action_type.as_str());
                }
            }
        }
    }

    if !state.session_data.is_empty() {
        out.push_str("session:\n");
        for (key, value) in &state.session_data {
            let _ = writeln!(out, "  {} = {}", key, value);
        }
    }
    out
}

pub(crate) fn report_text(report: &ValidationReport) -> String {
    let mut out = String::new();
    out.push_str(if report.is_valid { "valid\n" } else { "invalid scenario\n" });
    for (heading, items) in [
        ("errors", &report.errors),
        ("warnings", &report.warnings),
        ("recommendations", &report.recommendations),
    ] {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}:", heading);
        for item in items {
            let _ = writeln!(out, "  - {}", item);
        }
    }
    out
}

pub(crate) fn history_text(history: &HistoryView) -> String {
    let mut out = String::new();
    if history.steps.is_empty() {
        out.push_str("no steps yet\n");
    }
    for (i, step) in history.steps.iter().enumerate() {
        let _ = write!(out, "{:>3}. {} {}", i + 1, step.node_id, step.action_type);
        let value = display_value(&step.value);
        if !value.is_empty() {
            let _ = write!(out, " {}", value);
        }
        out.push('\n');
    }
    for err in &history.errors {
        let _ = writeln!(out, "error: {}", err);
    }
    out
}
