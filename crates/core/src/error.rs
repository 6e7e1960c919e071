use std::fmt;

use serde::Serialize;

use crate::engine::SimulationStatus;
use crate::snapshot::NodeType;

/// Coarse error category, for hosts that map errors onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed scenario or malformed request parameters.
    Validation,
    /// Unknown simulation or node.
    NotFound,
    /// Illegal transition or rejected action input.
    Simulation,
    /// The registry cannot accept more simulations.
    Capacity,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Simulation => "simulation",
            ErrorKind::Capacity => "capacity",
        };
        f.write_str(s)
    }
}

/// All errors raised by graph construction, simulation and the registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// The snapshot could not be decoded.
    #[error("invalid scenario: {message}")]
    InvalidScenario { message: String },

    /// Two nodes share the same `node_id`.
    #[error("duplicate node id: {node_id}")]
    DuplicateNode { node_id: String },

    /// A connection endpoint does not resolve to a node.
    #[error("connection {source_node_id} -> {target_node_id} references unknown node '{missing}'")]
    DanglingConnection {
        source_node_id: String,
        target_node_id: String,
        missing: String,
    },

    /// A branch option targets a node that does not exist.
    #[error("branch '{key}' of node '{node_id}' targets unknown node '{target}'")]
    DanglingBranchTarget {
        node_id: String,
        key: String,
        target: String,
    },

    /// The scenario has no node of type `start`.
    #[error("no start node")]
    NoStartNode,

    /// A node's `config` does not fit its node type.
    #[error("invalid config for node '{node_id}': {message}")]
    InvalidNodeConfig { node_id: String, message: String },

    /// Playback speed outside the accepted range.
    #[error("playback speed {speed} outside [{min}, {max}]")]
    InvalidPlaybackSpeed { speed: f64, min: f64, max: f64 },

    /// A simulation setting is out of range.
    #[error("invalid simulation config: {message}")]
    InvalidConfig { message: String },

    /// A simulation with this id is already registered.
    #[error("simulation already exists: {simulation_id}")]
    DuplicateSimulation { simulation_id: String },

    /// Unknown (or expired) simulation id.
    #[error("simulation not found: {simulation_id}")]
    SimulationNotFound { simulation_id: String },

    /// Unknown node id.
    #[error("node not found: {node_id}")]
    NodeNotFound { node_id: String },

    /// Action attempted on a completed or transferred simulation.
    #[error("simulation is not active (status: {status})")]
    NotActive { status: SimulationStatus },

    /// `select` value matched none of the branch keys.
    #[error("invalid branch selection '{value}' at node '{node_id}'")]
    InvalidBranchSelection { node_id: String, value: String },

    /// `input` value failed the node's input type check.
    #[error("invalid input '{value}' for {input_type} field at node '{node_id}'")]
    InvalidInput {
        node_id: String,
        input_type: String,
        value: String,
    },

    /// The action type is not accepted by the current node type.
    #[error("unsupported action '{action_type}' for {node_type} node '{node_id}'")]
    UnsupportedAction {
        node_id: String,
        node_type: NodeType,
        action_type: String,
    },

    /// Rendering an export failed.
    #[error("export failed: {message}")]
    Export { message: String },

    /// The registry is at capacity after evicting idle simulations.
    #[error("simulation registry is full ({capacity} active simulations)")]
    RegistryFull { capacity: usize },
}

impl SimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::InvalidScenario { .. }
            | SimError::DuplicateNode { .. }
            | SimError::DanglingConnection { .. }
            | SimError::DanglingBranchTarget { .. }
            | SimError::NoStartNode
            | SimError::InvalidNodeConfig { .. }
            | SimError::InvalidPlaybackSpeed { .. }
            | SimError::InvalidConfig { .. }
            | SimError::DuplicateSimulation { .. } => ErrorKind::Validation,
            SimError::SimulationNotFound { .. } | SimError::NodeNotFound { .. } => {
                ErrorKind::NotFound
            }
            SimError::NotActive { .. }
            | SimError::InvalidBranchSelection { .. }
            | SimError::InvalidInput { .. }
            | SimError::UnsupportedAction { .. }
            | SimError::Export { .. } => ErrorKind::Simulation,
            SimError::RegistryFull { .. } => ErrorKind::Capacity,
        }
    }

    /// Structured form for hosts that serialize errors.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(SimError::NoStartNode.kind(), ErrorKind::Validation);
        assert_eq!(
            SimError::SimulationNotFound {
                simulation_id: "x".into()
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            SimError::InvalidBranchSelection {
                node_id: "b".into(),
                value: "9".into()
            }
            .kind(),
            ErrorKind::Simulation
        );
        assert_eq!(
            SimError::RegistryFull { capacity: 1 }.kind(),
            ErrorKind::Capacity
        );
    }

    #[test]
    fn json_value_carries_kind_and_message() {
        let err = SimError::NotActive {
            status: SimulationStatus::Completed,
        };
        let v = err.to_json_value();
        assert_eq!(v["kind"], "simulation");
        assert_eq!(v["message"], "simulation is not active (status: completed)");
    }
}
