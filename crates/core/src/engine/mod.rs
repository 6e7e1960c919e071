//! Simulation engine: one stateful walk of a scenario graph.
//!
//! The engine holds a cursor into a shared [`ScenarioGraph`], the session
//! variables accumulated so far and an append-only execution history.
//! Every call to [`SimulationEngine::execute_action`] records a history
//! entry before dispatching on the current node type, so rejected actions
//! are still visible in the trace.
//!
//! `start` nodes behave like `message` nodes: the cursor rests on them
//! after start/reset and a `continue` action moves past them.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock;
use crate::config::SimulationConfig;
use crate::error::SimError;
use crate::graph::{scalar_key, BranchOption, InputSpec, NodeKind, ScenarioGraph, ScenarioNode};
use crate::report::ValidationReport;
use crate::snapshot::NodeType;

/// Session variables accumulated during execution.
pub type SessionData = BTreeMap<String, Value>;

pub const MIN_PLAYBACK_SPEED: f64 = 0.1;
pub const MAX_PLAYBACK_SPEED: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    Active,
    Completed,
    Transferred,
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SimulationStatus::Active => "active",
            SimulationStatus::Completed => "completed",
            SimulationStatus::Transferred => "transferred",
        };
        f.write_str(s)
    }
}

/// Actions understood by the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Continue,
    Select,
    Input,
    Transfer,
    End,
}

impl ActionType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "continue" => Some(ActionType::Continue),
            "select" => Some(ActionType::Select),
            "input" => Some(ActionType::Input),
            "transfer" => Some(ActionType::Transfer),
            "end" => Some(ActionType::End),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Continue => "continue",
            ActionType::Select => "select",
            ActionType::Input => "input",
            ActionType::Transfer => "transfer",
            ActionType::End => "end",
        }
    }
}

/// One executed (or attempted) action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStep {
    /// UNIX epoch seconds.
    pub timestamp: f64,
    pub node_id: String,
    pub action_type: String,
    pub value: Value,
    pub additional_data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub node_id: String,
    /// `None` when the cursor names no node of the graph.
    pub node_type: Option<NodeType>,
    pub name: String,
    pub config: Value,
}

impl From<&ScenarioNode> for NodeView {
    fn from(node: &ScenarioNode) -> Self {
        NodeView {
            node_id: node.node_id.clone(),
            node_type: Some(node.node_type()),
            name: node.name.clone(),
            config: node.config.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
}

impl AvailableAction {
    fn simple(action_type: ActionType, label: &str) -> Self {
        AvailableAction {
            action_type,
            label: label.to_string(),
            key: None,
            input_type: None,
        }
    }

    /// Actions offered at a node, derived from its type alone.
    pub fn for_node(kind: &NodeKind) -> Vec<Self> {
        match kind {
            NodeKind::Start | NodeKind::Message => {
                vec![Self::simple(ActionType::Continue, "continue")]
            }
            NodeKind::Branch { branches } => branches
                .iter()
                .map(|b| AvailableAction {
                    action_type: ActionType::Select,
                    label: b.label.clone(),
                    key: Some(b.key.clone()),
                    input_type: None,
                })
                .collect(),
            NodeKind::Input(spec) => vec![AvailableAction {
                action_type: ActionType::Input,
                label: spec.prompt.clone(),
                key: None,
                input_type: Some(spec.input_type.as_str().to_string()),
            }],
            NodeKind::Transfer { .. } => {
                vec![Self::simple(ActionType::Transfer, "transfer to agent")]
            }
            NodeKind::End => vec![Self::simple(ActionType::End, "end")],
        }
    }
}

/// Read-only view of a simulation at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub current_node: NodeView,
    pub available_actions: Vec<AvailableAction>,
    pub session_data: SessionData,
    pub status: SimulationStatus,
    /// Seconds since the last start or reset.
    pub execution_time: f64,
}

#[derive(Debug)]
pub struct SimulationEngine {
    simulation_id: String,
    graph: Arc<ScenarioGraph>,
    config: SimulationConfig,
    current_node_id: String,
    session_data: SessionData,
    execution_history: Vec<HistoryStep>,
    errors: Vec<String>,
    status: SimulationStatus,
    started: Instant,
    started_epoch: f64,
}

impl SimulationEngine {
    /// Create an engine and start it at `start_node_id`, or at the first
    /// start node when omitted.
    pub fn start(
        simulation_id: impl Into<String>,
        graph: Arc<ScenarioGraph>,
        start_node_id: Option<&str>,
        config: SimulationConfig,
    ) -> Result<Self, SimError> {
        let entry = resolve_start(&graph, start_node_id)?;
        let engine = SimulationEngine {
            simulation_id: simulation_id.into(),
            graph,
            config,
            current_node_id: entry,
            session_data: SessionData::new(),
            execution_history: Vec::new(),
            errors: Vec::new(),
            status: SimulationStatus::Active,
            started: Instant::now(),
            started_epoch: clock::epoch_secs(),
        };
        tracing::info!(
            simulation_id = %engine.simulation_id,
            scenario_id = ?engine.graph.scenario_id(),
            start_node_id = %engine.current_node_id,
            "simulation started"
        );
        Ok(engine)
    }

    /// Restart on the same graph and id. State is untouched if the start
    /// node cannot be resolved.
    pub fn reset(&mut self, start_node_id: Option<&str>) -> Result<StateSnapshot, SimError> {
        let entry = resolve_start(&self.graph, start_node_id)?;
        self.current_node_id = entry;
        self.session_data.clear();
        self.execution_history.clear();
        self.errors.clear();
        self.status = SimulationStatus::Active;
        self.started = Instant::now();
        self.started_epoch = clock::epoch_secs();
        tracing::info!(
            simulation_id = %self.simulation_id,
            start_node_id = %self.current_node_id,
            "simulation reset"
        );
        Ok(self.state())
    }

    /// Execute one user action against the current node.
    ///
    /// The attempt is appended to the history before dispatch, so a
    /// rejected action still leaves exactly one entry behind. Not
    /// idempotent: callers must submit each logical action at most once.
    pub fn execute_action(
        &mut self,
        action_type: &str,
        value: Value,
        additional_data: Map<String, Value>,
    ) -> Result<StateSnapshot, SimError> {
        if self.status != SimulationStatus::Active {
            return Err(SimError::NotActive {
                status: self.status,
            });
        }

        self.execution_history.push(HistoryStep {
            timestamp: clock::epoch_secs(),
            node_id: self.current_node_id.clone(),
            action_type: action_type.to_string(),
            value: value.clone(),
            additional_data,
        });

        match self.dispatch(action_type, value) {
            Ok(()) => {
                tracing::info!(
                    simulation_id = %self.simulation_id,
                    action_type,
                    node_id = %self.current_node_id,
                    status = %self.status,
                    "simulation action executed"
                );
                Ok(self.state())
            }
            Err(e) => {
                tracing::warn!(
                    simulation_id = %self.simulation_id,
                    action_type,
                    node_id = %self.current_node_id,
                    error = %e,
                    "simulation action failed"
                );
                self.errors.push(e.to_string());
                Err(e)
            }
        }
    }

    fn dispatch(&mut self, action_type: &str, value: Value) -> Result<(), SimError> {
        let graph = Arc::clone(&self.graph);
        let node = graph.require_node(&self.current_node_id)?;

        match (&node.kind, ActionType::parse(action_type)) {
            (NodeKind::Start | NodeKind::Message, Some(ActionType::Continue)) => {
                self.advance(&graph);
                Ok(())
            }
            (NodeKind::Branch { branches }, Some(ActionType::Select)) => {
                self.select_branch(branches, value)
            }
            (NodeKind::Input(spec), Some(ActionType::Input)) => {
                self.capture_input(&graph, spec, value)
            }
            (NodeKind::Transfer { target }, Some(ActionType::Transfer)) => {
                self.session_data
                    .insert("transfer_target".into(), Value::String(target.clone()));
                self.session_data
                    .insert("transfer_time".into(), Value::String(clock::now_rfc3339()));
                self.status = SimulationStatus::Transferred;
                Ok(())
            }
            (NodeKind::End, _) => {
                self.status = SimulationStatus::Completed;
                self.session_data
                    .insert("completion_time".into(), Value::String(clock::now_rfc3339()));
                Ok(())
            }
            _ => Err(SimError::UnsupportedAction {
                node_id: node.node_id.clone(),
                node_type: node.node_type(),
                action_type: action_type.to_string(),
            }),
        }
    }

    /// Follow the first outgoing connection, completing if there is none.
    fn advance(&mut self, graph: &ScenarioGraph) {
        match graph.first_outgoing(&self.current_node_id) {
            Some(conn) => self.current_node_id = conn.target_node_id.clone(),
            None => self.status = SimulationStatus::Completed,
        }
    }

    fn select_branch(&mut self, branches: &[BranchOption], value: Value) -> Result<(), SimError> {
        let selected = scalar_key(&value)
            .and_then(|key| branches.iter().find(|b| b.key == key))
            .ok_or_else(|| SimError::InvalidBranchSelection {
                node_id: self.current_node_id.clone(),
                value: display_value(&value),
            })?;

        self.current_node_id = selected.target.clone();
        // Keyed by the branch target, the node the selection led to.
        self.session_data
            .insert(format!("branch_{}_selection", self.current_node_id), value);
        Ok(())
    }

    fn capture_input(
        &mut self,
        graph: &ScenarioGraph,
        spec: &InputSpec,
        value: Value,
    ) -> Result<(), SimError> {
        if !spec.input_type.accepts(&value) {
            return Err(SimError::InvalidInput {
                node_id: self.current_node_id.clone(),
                input_type: spec.input_type.as_str().to_string(),
                value: display_value(&value),
            });
        }
        self.session_data
            .insert(format!("input_{}", self.current_node_id), value);
        self.advance(graph);
        Ok(())
    }

    /// Current state. No side effects.
    pub fn state(&self) -> StateSnapshot {
        let (current_node, available_actions) = match self.graph.node(&self.current_node_id) {
            Some(node) => (NodeView::from(node), AvailableAction::for_node(&node.kind)),
            // Unreachable while the cursor only ever takes graph ids.
            None => (
                NodeView {
                    node_id: self.current_node_id.clone(),
                    node_type: None,
                    name: String::new(),
                    config: Value::Object(Map::new()),
                },
                Vec::new(),
            ),
        };
        StateSnapshot {
            current_node,
            available_actions,
            session_data: self.session_data.clone(),
            status: self.status,
            execution_time: self.execution_time(),
        }
    }

    /// Structural report on the graph, with coverage of the nodes visited
    /// by this run's history.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::for_graph(&self.graph);
        let visited: HashSet<&str> = self
            .execution_history
            .iter()
            .map(|s| s.node_id.as_str())
            .collect();
        report.coverage = coverage_percent(visited.len(), self.graph.node_count());
        report.simulation_id = Some(self.simulation_id.clone());
        report
    }

    /// Record playback flags. No driver runs; the caller issues actions.
    pub fn start_playback(
        &mut self,
        speed: f64,
        auto_advance: bool,
    ) -> Result<StateSnapshot, SimError> {
        if !(MIN_PLAYBACK_SPEED..=MAX_PLAYBACK_SPEED).contains(&speed) {
            return Err(SimError::InvalidPlaybackSpeed {
                speed,
                min: MIN_PLAYBACK_SPEED,
                max: MAX_PLAYBACK_SPEED,
            });
        }
        self.session_data
            .insert("playback_mode".into(), Value::Bool(true));
        self.session_data
            .insert("playback_speed".into(), serde_json::json!(speed));
        self.session_data
            .insert("auto_advance".into(), Value::Bool(auto_advance));
        Ok(self.state())
    }

    /// Set the advisory `paused` flag. Actions are not blocked while paused.
    pub fn set_paused(&mut self, paused: bool) {
        self.session_data.insert("paused".into(), Value::Bool(paused));
    }

    pub fn simulation_id(&self) -> &str {
        &self.simulation_id
    }

    pub fn graph(&self) -> &Arc<ScenarioGraph> {
        &self.graph
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn current_node_id(&self) -> &str {
        &self.current_node_id
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn session_data(&self) -> &SessionData {
        &self.session_data
    }

    pub fn execution_history(&self) -> &[HistoryStep] {
        &self.execution_history
    }

    /// Messages of actions rejected since the last start or reset.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn execution_time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Epoch seconds of the last start or reset.
    pub fn start_time(&self) -> f64 {
        self.started_epoch
    }
}

fn resolve_start(graph: &ScenarioGraph, start_node_id: Option<&str>) -> Result<String, SimError> {
    let node = match start_node_id {
        Some(id) => graph.require_node(id)?,
        None => graph.default_start()?,
    };
    Ok(node.node_id.clone())
}

pub(crate) fn coverage_percent(visited: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        visited as f64 / total as f64 * 100.0
    }
}

/// Plain rendering of an action value: strings without quotes, anything
/// else as JSON text.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests;
