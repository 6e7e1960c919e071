use serde_json::json;

use super::*;
use crate::snapshot::ScenarioSnapshot;

fn build(v: Value) -> Arc<ScenarioGraph> {
    let snap = ScenarioSnapshot::from_json(&v).unwrap();
    Arc::new(ScenarioGraph::build(&snap).unwrap())
}

fn start(graph: &Arc<ScenarioGraph>) -> SimulationEngine {
    SimulationEngine::start("sim", Arc::clone(graph), None, SimulationConfig::default()).unwrap()
}

fn act(
    engine: &mut SimulationEngine,
    action: &str,
    value: Value,
) -> Result<StateSnapshot, SimError> {
    engine.execute_action(action, value, Map::new())
}

/// start -> branch(1: sales message, 2: support input) ; sales -> end ;
/// support input(phone) -> transfer
fn call_center() -> Arc<ScenarioGraph> {
    build(json!({
        "scenario_id": 42,
        "nodes": [
            {"node_id": "s", "node_type": "start", "name": "Start"},
            {"node_id": "menu", "node_type": "branch", "name": "Main menu", "config": {
                "branches": [
                    {"key": "1", "label": "Sales", "target": "n2"},
                    {"key": "2", "label": "Support", "target": "n3"}
                ]
            }},
            {"node_id": "n2", "node_type": "message", "name": "Sales hours"},
            {"node_id": "n3", "node_type": "input", "name": "Callback number", "config": {
                "input_type": "phone", "prompt": "Enter your phone number"
            }},
            {"node_id": "agent", "node_type": "transfer", "config": {"target": "support"}},
            {"node_id": "bye", "node_type": "end"}
        ],
        "connections": [
            {"source_node_id": "s", "target_node_id": "menu"},
            {"source_node_id": "n2", "target_node_id": "bye"},
            {"source_node_id": "n3", "target_node_id": "agent"}
        ]
    }))
}

// ──────────────────────────────────────
// Start / reset
// ──────────────────────────────────────

#[test]
fn start_rests_on_start_node() {
    let graph = call_center();
    let engine = start(&graph);
    let state = engine.state();
    assert_eq!(state.current_node.node_id, "s");
    assert_eq!(state.current_node.node_type, Some(NodeType::Start));
    assert_eq!(state.current_node.name, "Start");
    assert_eq!(state.status, SimulationStatus::Active);
    assert!(state.session_data.is_empty());
    assert_eq!(
        state.available_actions,
        [AvailableAction {
            action_type: ActionType::Continue,
            label: "continue".into(),
            key: None,
            input_type: None,
        }]
    );
}

#[test]
fn explicit_start_node_must_exist() {
    let graph = call_center();
    let err = SimulationEngine::start("sim", graph, Some("nope"), SimulationConfig::default())
        .err()
        .unwrap();
    assert_eq!(err, SimError::NodeNotFound { node_id: "nope".into() });
}

#[test]
fn explicit_start_node_may_be_any_node() {
    let graph = call_center();
    let engine =
        SimulationEngine::start("sim", graph, Some("n3"), SimulationConfig::default()).unwrap();
    assert_eq!(engine.current_node_id(), "n3");
}

#[test]
fn continue_on_start_moves_to_first_target() {
    let graph = call_center();
    let mut engine = start(&graph);
    let state = act(&mut engine, "continue", Value::Null).unwrap();
    assert_eq!(state.current_node.node_id, "menu");
    assert_eq!(state.status, SimulationStatus::Active);
}

#[test]
fn reset_clears_run_state_but_keeps_identity() {
    let graph = call_center();
    let mut engine = start(&graph);
    act(&mut engine, "continue", Value::Null).unwrap();
    act(&mut engine, "select", json!("9")).unwrap_err();
    engine.set_paused(true);

    let state = engine.reset(Some("n2")).unwrap();
    assert_eq!(engine.simulation_id(), "sim");
    assert_eq!(state.current_node.node_id, "n2");
    assert!(state.session_data.is_empty());
    assert!(engine.execution_history().is_empty());
    assert!(engine.errors().is_empty());
    assert_eq!(state.status, SimulationStatus::Active);
}

#[test]
fn failed_reset_leaves_state_alone() {
    let graph = call_center();
    let mut engine = start(&graph);
    act(&mut engine, "continue", Value::Null).unwrap();
    assert!(engine.reset(Some("ghost")).is_err());
    assert_eq!(engine.current_node_id(), "menu");
    assert_eq!(engine.execution_history().len(), 1);
}

#[test]
fn reset_reactivates_finished_simulation() {
    let graph = call_center();
    let mut engine =
        SimulationEngine::start("sim", graph, Some("bye"), SimulationConfig::default()).unwrap();
    act(&mut engine, "end", Value::Null).unwrap();
    assert_eq!(engine.status(), SimulationStatus::Completed);
    let state = engine.reset(None).unwrap();
    assert_eq!(state.status, SimulationStatus::Active);
    assert_eq!(state.current_node.node_id, "s");
}

// ──────────────────────────────────────
// Dispatch table
// ──────────────────────────────────────

#[test]
fn branch_selection_moves_to_target() {
    let graph = call_center();
    let mut engine = start(&graph);
    act(&mut engine, "continue", Value::Null).unwrap();

    let state = act(&mut engine, "select", json!("2")).unwrap();
    assert_eq!(state.current_node.node_id, "n3");
    assert_eq!(state.session_data["branch_n3_selection"], json!("2"));
}

#[test]
fn numeric_selection_matches_string_key() {
    let graph = call_center();
    let mut engine = start(&graph);
    act(&mut engine, "continue", Value::Null).unwrap();
    let state = act(&mut engine, "select", json!(1)).unwrap();
    assert_eq!(state.current_node.node_id, "n2");
    assert_eq!(state.session_data["branch_n2_selection"], json!(1));
}

#[test]
fn unknown_branch_key_fails_and_stays() {
    let graph = call_center();
    let mut engine = start(&graph);
    act(&mut engine, "continue", Value::Null).unwrap();

    let err = act(&mut engine, "select", json!("9")).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Simulation);
    assert_eq!(
        err,
        SimError::InvalidBranchSelection {
            node_id: "menu".into(),
            value: "9".into()
        }
    );
    assert_eq!(engine.current_node_id(), "menu");
    assert_eq!(engine.status(), SimulationStatus::Active);
}

#[test]
fn branch_actions_list_every_option() {
    let graph = call_center();
    let mut engine = start(&graph);
    let state = act(&mut engine, "continue", Value::Null).unwrap();
    let keys: Vec<_> = state
        .available_actions
        .iter()
        .map(|a| (a.action_type, a.key.as_deref().unwrap(), a.label.as_str()))
        .collect();
    assert_eq!(
        keys,
        [
            (ActionType::Select, "1", "Sales"),
            (ActionType::Select, "2", "Support")
        ]
    );
}

#[test]
fn phone_input_accepted_and_advances() {
    let graph = call_center();
    let mut engine =
        SimulationEngine::start("sim", graph, Some("n3"), SimulationConfig::default()).unwrap();

    let before = engine.state();
    assert_eq!(before.available_actions[0].label, "Enter your phone number");
    assert_eq!(before.available_actions[0].input_type.as_deref(), Some("phone"));

    let state = act(&mut engine, "input", json!("010-1234-5678")).unwrap();
    assert_eq!(state.current_node.node_id, "agent");
    assert_eq!(state.session_data["input_n3"], json!("010-1234-5678"));
}

#[test]
fn bad_phone_input_fails_and_stays() {
    let graph = call_center();
    let mut engine =
        SimulationEngine::start("sim", graph, Some("n3"), SimulationConfig::default()).unwrap();

    let err = act(&mut engine, "input", json!("not-a-phone")).unwrap_err();
    assert!(matches!(err, SimError::InvalidInput { ref input_type, .. } if input_type == "phone"));
    assert_eq!(engine.current_node_id(), "n3");
    assert!(!engine.session_data().contains_key("input_n3"));
}

#[test]
fn input_without_outgoing_completes() {
    let graph = build(json!({
        "nodes": [
            {"node_id": "s", "node_type": "start"},
            {"node_id": "q", "node_type": "input", "config": {"input_type": "number"}}
        ],
        "connections": [{"source_node_id": "s", "target_node_id": "q"}]
    }));
    let mut engine = start(&graph);
    act(&mut engine, "continue", Value::Null).unwrap();
    act(&mut engine, "input", json!("abc")).unwrap_err();
    let state = act(&mut engine, "input", json!("3.5")).unwrap();
    assert_eq!(state.status, SimulationStatus::Completed);
    assert_eq!(state.current_node.node_id, "q");
    assert_eq!(state.session_data["input_q"], json!("3.5"));
}

#[test]
fn transfer_records_target_and_time() {
    let graph = call_center();
    let mut engine =
        SimulationEngine::start("sim", graph, Some("agent"), SimulationConfig::default()).unwrap();
    assert_eq!(engine.state().available_actions[0].label, "transfer to agent");

    let state = act(&mut engine, "transfer", Value::Null).unwrap();
    assert_eq!(state.status, SimulationStatus::Transferred);
    assert_eq!(state.session_data["transfer_target"], json!("support"));
    assert!(state.session_data["transfer_time"].is_string());
}

#[test]
fn end_accepts_any_action() {
    let graph = call_center();
    let mut engine =
        SimulationEngine::start("sim", graph, Some("bye"), SimulationConfig::default()).unwrap();
    let state = act(&mut engine, "hangup", Value::Null).unwrap();
    assert_eq!(state.status, SimulationStatus::Completed);
    assert!(state.session_data.contains_key("completion_time"));
}

#[test]
fn message_without_outgoing_completes() {
    let graph = build(json!({
        "nodes": [
            {"node_id": "s", "node_type": "start"},
            {"node_id": "m", "node_type": "message"}
        ],
        "connections": [{"source_node_id": "s", "target_node_id": "m"}]
    }));
    let mut engine = start(&graph);
    act(&mut engine, "continue", Value::Null).unwrap();
    let state = act(&mut engine, "continue", Value::Null).unwrap();
    assert_eq!(state.status, SimulationStatus::Completed);
    assert_eq!(state.current_node.node_id, "m");
}

#[test]
fn mismatched_action_is_unsupported() {
    let graph = call_center();
    let mut engine = start(&graph);
    let err = act(&mut engine, "select", json!("1")).unwrap_err();
    assert_eq!(
        err,
        SimError::UnsupportedAction {
            node_id: "s".into(),
            node_type: NodeType::Start,
            action_type: "select".into(),
        }
    );
    assert_eq!(engine.current_node_id(), "s");
}

#[test]
fn inactive_simulation_rejects_actions_without_recording() {
    let graph = call_center();
    let mut engine =
        SimulationEngine::start("sim", graph, Some("agent"), SimulationConfig::default()).unwrap();
    act(&mut engine, "transfer", Value::Null).unwrap();

    let err = act(&mut engine, "transfer", Value::Null).unwrap_err();
    assert_eq!(
        err,
        SimError::NotActive {
            status: SimulationStatus::Transferred
        }
    );
    assert_eq!(engine.execution_history().len(), 1);
}

// ──────────────────────────────────────
// History and state queries
// ──────────────────────────────────────

#[test]
fn failed_action_appends_exactly_one_entry() {
    let graph = call_center();
    let mut engine = start(&graph);
    act(&mut engine, "continue", Value::Null).unwrap();

    let mut extra = Map::new();
    extra.insert("dtmf".into(), json!(true));
    engine
        .execute_action("select", json!("9"), extra.clone())
        .unwrap_err();

    let history = engine.execution_history();
    assert_eq!(history.len(), 2);
    let last = &history[1];
    assert_eq!(last.node_id, "menu");
    assert_eq!(last.action_type, "select");
    assert_eq!(last.value, json!("9"));
    assert_eq!(last.additional_data, extra);
    assert!(last.timestamp >= history[0].timestamp);
}

#[test]
fn repeated_state_queries_agree() {
    let graph = call_center();
    let mut engine = start(&graph);
    act(&mut engine, "continue", Value::Null).unwrap();
    act(&mut engine, "select", json!("1")).unwrap();

    let a = engine.state();
    let b = engine.state();
    assert_eq!(a.current_node, b.current_node);
    assert_eq!(a.session_data, b.session_data);
    assert_eq!(a.status, b.status);
    assert_eq!(a.available_actions, b.available_actions);
    assert!(b.execution_time >= a.execution_time);
}

#[test]
fn end_to_end_start_message_end() {
    let graph = build(json!({
        "nodes": [
            {"node_id": "s", "node_type": "start"},
            {"node_id": "m", "node_type": "message"},
            {"node_id": "e", "node_type": "end"}
        ],
        "connections": [
            {"source_node_id": "s", "target_node_id": "m"},
            {"source_node_id": "m", "target_node_id": "e"}
        ]
    }));
    let mut engine =
        SimulationEngine::start("sim", graph, Some("s"), SimulationConfig::default()).unwrap();
    assert_eq!(engine.current_node_id(), "s");

    assert_eq!(act(&mut engine, "continue", Value::Null).unwrap().current_node.node_id, "m");
    assert_eq!(act(&mut engine, "continue", Value::Null).unwrap().current_node.node_id, "e");
    let done = act(&mut engine, "end", Value::Null).unwrap();
    assert_eq!(done.status, SimulationStatus::Completed);
    assert_eq!(engine.execution_history().len(), 3);
    assert_eq!(engine.validate().coverage, 100.0);
}

// ──────────────────────────────────────
// Validation, playback, pause
// ──────────────────────────────────────

#[test]
fn coverage_counts_distinct_visited_nodes() {
    let graph = build(json!({
        "nodes": [
            {"node_id": "s", "node_type": "start"},
            {"node_id": "m", "node_type": "message"},
            {"node_id": "x", "node_type": "message"},
            {"node_id": "y", "node_type": "message"},
            {"node_id": "e", "node_type": "end"}
        ],
        "connections": [
            {"source_node_id": "s", "target_node_id": "m"},
            {"source_node_id": "m", "target_node_id": "e"},
            {"source_node_id": "x", "target_node_id": "y"}
        ]
    }));
    let mut engine = start(&graph);
    act(&mut engine, "select", json!("1")).unwrap_err();
    act(&mut engine, "continue", Value::Null).unwrap();
    act(&mut engine, "hop", Value::Null).unwrap_err();

    let report = engine.validate();
    assert_eq!(report.simulation_id.as_deref(), Some("sim"));
    assert!(report.is_valid);
    assert_eq!(report.coverage, 40.0);
}

#[test]
fn playback_records_flags_and_checks_speed() {
    let graph = call_center();
    let mut engine = start(&graph);
    let state = engine.start_playback(2.5, true).unwrap();
    assert_eq!(state.session_data["playback_mode"], json!(true));
    assert_eq!(state.session_data["playback_speed"], json!(2.5));
    assert_eq!(state.session_data["auto_advance"], json!(true));

    let err = engine.start_playback(11.0, false).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Validation);
}

#[test]
fn paused_flag_does_not_block_actions() {
    let graph = call_center();
    let mut engine = start(&graph);
    engine.set_paused(true);
    assert_eq!(engine.session_data()["paused"], json!(true));
    let state = act(&mut engine, "continue", Value::Null).unwrap();
    assert_eq!(state.current_node.node_id, "menu");
    engine.set_paused(false);
    assert_eq!(engine.session_data()["paused"], json!(false));
}

#[test]
fn state_serializes_to_wire_shape() {
    let graph = call_center();
    let mut engine = start(&graph);
    let state = act(&mut engine, "continue", Value::Null).unwrap();
    let v = serde_json::to_value(&state).unwrap();
    assert_eq!(v["current_node"]["node_type"], "branch");
    assert_eq!(v["available_actions"][0]["type"], "select");
    assert_eq!(v["available_actions"][0]["key"], "1");
    assert!(v["available_actions"][0].get("input_type").is_none());
    assert_eq!(v["status"], "active");
}

#[test]
fn unknown_cursor_node_has_no_type() {
    let graph = call_center();
    let mut engine = start(&graph);
    engine.current_node_id = "ghost".into();

    let state = engine.state();
    assert_eq!(state.current_node.node_id, "ghost");
    assert_eq!(state.current_node.node_type, None);
    assert!(state.available_actions.is_empty());

    let v = serde_json::to_value(&state).unwrap();
    assert!(v["current_node"]["node_type"].is_null());
}
