//! Scenario snapshot records as supplied by the persistence layer.
//!
//! These are plain decoded rows: nothing here is validated beyond JSON
//! shape. [`crate::ScenarioGraph::build`] turns a snapshot into a checked
//! graph.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Closed set of node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Start,
    Message,
    Branch,
    Input,
    Transfer,
    End,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Start => "start",
            NodeType::Message => "message",
            NodeType::Branch => "branch",
            NodeType::Input => "input",
            NodeType::Transfer => "transfer",
            NodeType::End => "end",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: String,
    pub node_type: NodeType,
    #[serde(default)]
    pub name: String,
    /// Type-specific settings; `null` is treated as an empty object.
    #[serde(default)]
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub source_node_id: String,
    pub target_node_id: String,
    #[serde(default)]
    pub condition: Option<serde_json::Value>,
    #[serde(default)]
    pub label: Option<String>,
}

/// One scenario version: its nodes and directed connections, in authoring order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSnapshot {
    #[serde(default)]
    pub scenario_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

impl ScenarioSnapshot {
    pub fn from_json(value: &serde_json::Value) -> Result<Self, SimError> {
        Self::deserialize(value).map_err(|e| SimError::InvalidScenario {
            message: e.to_string(),
        })
    }

    pub fn from_json_str(s: &str) -> Result<Self, SimError> {
        serde_json::from_str(s).map_err(|e| SimError::InvalidScenario {
            message: e.to_string(),
        })
    }
}
