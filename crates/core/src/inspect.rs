//! Read-only views over a running simulation: history, debug info, summary.

use serde::Serialize;

use crate::config::SimulationConfig;
use crate::engine::{HistoryStep, SessionData, SimulationEngine, SimulationStatus, StateSnapshot};

/// Number of most recent history entries shown as the debug call stack.
pub const CALL_STACK_DEPTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryView {
    pub simulation_id: String,
    pub steps: Vec<HistoryStep>,
    pub total_steps: usize,
    pub current_step: usize,
    pub execution_time: f64,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub execution_time: f64,
    pub steps_count: usize,
    pub avg_step_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugInfo {
    pub simulation_id: String,
    pub current_state: StateSnapshot,
    pub variables: SessionData,
    pub call_stack: Vec<HistoryStep>,
    pub performance_metrics: PerformanceMetrics,
    /// Byte length of the serialized session variables.
    pub memory_usage: usize,
    pub execution_trace: Vec<HistoryStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub simulation_id: String,
    pub scenario_id: Option<i64>,
    pub status: SimulationStatus,
    pub config: SimulationConfig,
    /// Epoch seconds of the last start or reset.
    pub start_time: f64,
}

impl SimulationEngine {
    pub fn history(&self) -> HistoryView {
        let steps = self.execution_history().to_vec();
        HistoryView {
            simulation_id: self.simulation_id().to_string(),
            total_steps: steps.len(),
            current_step: steps.len(),
            steps,
            execution_time: self.execution_time(),
            errors: self.errors().to_vec(),
        }
    }

    pub fn debug_info(&self) -> DebugInfo {
        let history = self.execution_history();
        let execution_time = self.execution_time();
        let call_stack = history[history.len().saturating_sub(CALL_STACK_DEPTH)..].to_vec();
        let memory_usage = serde_json::to_string(self.session_data())
            .map(|s| s.len())
            .unwrap_or(0);

        DebugInfo {
            simulation_id: self.simulation_id().to_string(),
            current_state: self.state(),
            variables: self.session_data().clone(),
            call_stack,
            performance_metrics: PerformanceMetrics {
                execution_time,
                steps_count: history.len(),
                avg_step_time: execution_time / history.len().max(1) as f64,
            },
            memory_usage,
            execution_trace: history.to_vec(),
        }
    }

    pub fn summary(&self) -> SimulationSummary {
        SimulationSummary {
            simulation_id: self.simulation_id().to_string(),
            scenario_id: self.graph().scenario_id(),
            status: self.status(),
            config: self.config().clone(),
            start_time: self.start_time(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Map, Value};

    use crate::{ScenarioGraph, ScenarioSnapshot, SimulationConfig, SimulationEngine};

    fn looping_engine() -> SimulationEngine {
        let snap = ScenarioSnapshot::from_json(&json!({
            "scenario_id": 7,
            "nodes": [
                {"node_id": "s", "node_type": "start"},
                {"node_id": "b", "node_type": "branch", "config": {"branches": [
                    {"key": "1", "label": "Again", "target": "b"}
                ]}}
            ],
            "connections": [{"source_node_id": "s", "target_node_id": "b"}]
        }))
        .unwrap();
        let graph = Arc::new(ScenarioGraph::build(&snap).unwrap());
        SimulationEngine::start("sim-1", graph, None, SimulationConfig::default()).unwrap()
    }

    #[test]
    fn history_counts_failures_and_records_errors() {
        let mut engine = looping_engine();
        engine.execute_action("continue", Value::Null, Map::new()).unwrap();
        engine.execute_action("select", json!("5"), Map::new()).unwrap_err();

        let history = engine.history();
        assert_eq!(history.simulation_id, "sim-1");
        assert_eq!(history.total_steps, 2);
        assert_eq!(history.current_step, 2);
        assert_eq!(history.errors, ["invalid branch selection '5' at node 'b'"]);
    }

    #[test]
    fn call_stack_keeps_last_ten() {
        let mut engine = looping_engine();
        engine.execute_action("continue", Value::Null, Map::new()).unwrap();
        for i in 0..12 {
            let mut extra = Map::new();
            extra.insert("round".into(), json!(i));
            engine.execute_action("select", json!(1), extra).unwrap();
        }

        let debug = engine.debug_info();
        assert_eq!(debug.execution_trace.len(), 13);
        assert_eq!(debug.call_stack.len(), 10);
        assert_eq!(debug.call_stack[9].additional_data["round"], 11);
        assert_eq!(debug.performance_metrics.steps_count, 13);
        assert_eq!(
            debug.memory_usage,
            serde_json::to_string(&debug.variables).unwrap().len()
        );
    }

    #[test]
    fn summary_carries_scenario_and_config() {
        let engine = looping_engine();
        let summary = engine.summary();
        assert_eq!(summary.scenario_id, Some(7));
        assert_eq!(summary.config, SimulationConfig::default());
        assert_eq!(summary.status, crate::SimulationStatus::Active);
        assert!(summary.start_time > 0.0);
    }
}
