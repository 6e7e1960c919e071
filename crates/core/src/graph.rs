//! Validated, immutable scenario graph.
//!
//! Built once per simulation from a [`ScenarioSnapshot`]. Node configuration
//! is decoded into a typed [`NodeKind`] at build time so the engine never
//! re-interprets raw JSON while executing actions.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::error::SimError;
use crate::snapshot::{ConnectionRecord, NodeRecord, NodeType, ScenarioSnapshot};

const DEFAULT_TRANSFER_TARGET: &str = "general";
const DEFAULT_INPUT_PROMPT: &str = "enter a value";
const PHONE_PATTERN: &str = r"^\d{2,3}-\d{3,4}-\d{4}$";

// ──────────────────────────────────────────────
// Typed node configuration
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchOption {
    pub key: String,
    pub label: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputType {
    Text,
    Number,
    Phone,
    /// Any other declared type; every value is accepted.
    Other(String),
}

impl InputType {
    pub fn parse(s: &str) -> Self {
        match s {
            "text" => InputType::Text,
            "number" => InputType::Number,
            "phone" => InputType::Phone,
            other => InputType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            InputType::Text => "text",
            InputType::Number => "number",
            InputType::Phone => "phone",
            InputType::Other(s) => s,
        }
    }

    /// Whether `value` is acceptable for a field of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            InputType::Text => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            InputType::Number => match value {
                Value::Number(_) | Value::Bool(_) => true,
                Value::String(s) => parses_as_number(s),
                _ => false,
            },
            InputType::Phone => {
                let candidate = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return false,
                };
                phone_regex().is_some_and(|re| re.is_match(&candidate))
            }
            InputType::Other(_) => true,
        }
    }
}

/// Decimal or float text, surrounding whitespace allowed. Underscores may
/// group digits (`1_000`) but must sit between two digits.
fn parses_as_number(s: &str) -> bool {
    let s = s.trim();
    let bytes = s.as_bytes();
    let grouped = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'_'
            || (i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
    });
    grouped && s.replace('_', "").parse::<f64>().is_ok()
}

fn phone_regex() -> Option<&'static Regex> {
    static PHONE: OnceLock<Option<Regex>> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(PHONE_PATTERN).ok()).as_ref()
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub input_type: InputType,
    pub prompt: String,
}

/// Node behavior, keyed by node type.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Start,
    Message,
    Branch { branches: Vec<BranchOption> },
    Input(InputSpec),
    Transfer { target: String },
    End,
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Start => NodeType::Start,
            NodeKind::Message => NodeType::Message,
            NodeKind::Branch { .. } => NodeType::Branch,
            NodeKind::Input(_) => NodeType::Input,
            NodeKind::Transfer { .. } => NodeType::Transfer,
            NodeKind::End => NodeType::End,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioNode {
    pub node_id: String,
    pub name: String,
    /// Raw configuration as authored, always a JSON object.
    pub config: Value,
    pub kind: NodeKind,
}

impl ScenarioNode {
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connection {
    pub source_node_id: String,
    pub target_node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl From<&ConnectionRecord> for Connection {
    fn from(r: &ConnectionRecord) -> Self {
        Connection {
            source_node_id: r.source_node_id.clone(),
            target_node_id: r.target_node_id.clone(),
            condition: r.condition.clone(),
            label: r.label.clone(),
        }
    }
}

// ──────────────────────────────────────────────
// Graph
// ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ScenarioGraph {
    scenario_id: Option<i64>,
    nodes: Vec<ScenarioNode>,
    index: HashMap<String, usize>,
    connections: Vec<Connection>,
    /// source node id -> indices into `connections`, in insertion order.
    outgoing: HashMap<String, Vec<usize>>,
    start_nodes: Vec<usize>,
    warnings: Vec<String>,
}

impl ScenarioGraph {
    /// Validate a snapshot and build the graph.
    ///
    /// Fails on duplicate node ids, connections or branch options that
    /// reference unknown nodes, malformed node config, or a missing start
    /// node. Nodes touched by no connection only produce a warning.
    pub fn build(snapshot: &ScenarioSnapshot) -> Result<Self, SimError> {
        let mut index = HashMap::with_capacity(snapshot.nodes.len());
        for (i, record) in snapshot.nodes.iter().enumerate() {
            if index.insert(record.node_id.clone(), i).is_some() {
                return Err(SimError::DuplicateNode {
                    node_id: record.node_id.clone(),
                });
            }
        }

        let nodes = snapshot
            .nodes
            .iter()
            .map(|record| decode_node(record, &index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut connections = Vec::with_capacity(snapshot.connections.len());
        let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
        for record in &snapshot.connections {
            for endpoint in [&record.source_node_id, &record.target_node_id] {
                if !index.contains_key(endpoint) {
                    return Err(SimError::DanglingConnection {
                        source_node_id: record.source_node_id.clone(),
                        target_node_id: record.target_node_id.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
            outgoing
                .entry(record.source_node_id.clone())
                .or_default()
                .push(connections.len());
            connections.push(Connection::from(record));
        }

        let start_nodes: Vec<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.node_type() == NodeType::Start)
            .map(|(i, _)| i)
            .collect();
        if start_nodes.is_empty() {
            return Err(SimError::NoStartNode);
        }

        let mut warnings = Vec::new();
        let isolated = isolated_nodes(
            nodes.iter().map(|n| n.node_id.as_str()),
            connections
                .iter()
                .map(|c| (c.source_node_id.as_str(), c.target_node_id.as_str())),
        );
        if !isolated.is_empty() {
            let list = isolated.into_iter().collect::<Vec<_>>().join(", ");
            tracing::warn!(
                scenario_id = ?snapshot.scenario_id,
                nodes = %list,
                "scenario has nodes not referenced by any connection"
            );
            warnings.push(format!("isolated nodes: {}", list));
        }

        Ok(ScenarioGraph {
            scenario_id: snapshot.scenario_id,
            nodes,
            index,
            connections,
            outgoing,
            start_nodes,
            warnings,
        })
    }

    pub fn scenario_id(&self) -> Option<i64> {
        self.scenario_id
    }

    pub fn node(&self, node_id: &str) -> Option<&ScenarioNode> {
        self.index.get(node_id).map(|&i| &self.nodes[i])
    }

    pub fn require_node(&self, node_id: &str) -> Result<&ScenarioNode, SimError> {
        self.node(node_id).ok_or_else(|| SimError::NodeNotFound {
            node_id: node_id.to_string(),
        })
    }

    /// First connection leaving `source_id`, in insertion order.
    pub fn first_outgoing(&self, source_id: &str) -> Option<&Connection> {
        self.outgoing
            .get(source_id)
            .and_then(|idx| idx.first())
            .map(|&i| &self.connections[i])
    }

    pub fn outgoing(&self, source_id: &str) -> impl Iterator<Item = &Connection> {
        self.outgoing
            .get(source_id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.connections[i])
    }

    /// All start nodes, in the order supplied.
    pub fn start_nodes(&self) -> impl Iterator<Item = &ScenarioNode> {
        self.start_nodes.iter().map(move |&i| &self.nodes[i])
    }

    pub fn default_start(&self) -> Result<&ScenarioNode, SimError> {
        self.start_nodes().next().ok_or(SimError::NoStartNode)
    }

    pub fn nodes(&self) -> &[ScenarioNode] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Non-fatal findings collected while building.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Node ids that appear in no connection, sorted.
pub(crate) fn isolated_nodes<'a>(
    node_ids: impl Iterator<Item = &'a str>,
    connections: impl Iterator<Item = (&'a str, &'a str)>,
) -> BTreeSet<&'a str> {
    let mut connected = HashSet::new();
    for (source, target) in connections {
        connected.insert(source);
        connected.insert(target);
    }
    node_ids.filter(|id| !connected.contains(id)).collect()
}

// ──────────────────────────────────────────────
// Config decoding
// ──────────────────────────────────────────────

fn decode_node(
    record: &NodeRecord,
    index: &HashMap<String, usize>,
) -> Result<ScenarioNode, SimError> {
    let config = match &record.config {
        Value::Null => Value::Object(serde_json::Map::new()),
        Value::Object(_) => record.config.clone(),
        other => {
            return Err(config_error(
                record,
                format!("config must be an object, got {}", json_kind(other)),
            ))
        }
    };

    let kind = match record.node_type {
        NodeType::Start => NodeKind::Start,
        NodeType::Message => NodeKind::Message,
        NodeType::End => NodeKind::End,
        NodeType::Branch => NodeKind::Branch {
            branches: decode_branches(record, &config, index)?,
        },
        NodeType::Input => {
            let input_type = optional_str(record, &config, "input_type")?.unwrap_or("text");
            let prompt = optional_str(record, &config, "prompt")?.unwrap_or(DEFAULT_INPUT_PROMPT);
            NodeKind::Input(InputSpec {
                input_type: InputType::parse(input_type),
                prompt: prompt.to_string(),
            })
        }
        NodeType::Transfer => NodeKind::Transfer {
            target: optional_str(record, &config, "target")?
                .unwrap_or(DEFAULT_TRANSFER_TARGET)
                .to_string(),
        },
    };

    Ok(ScenarioNode {
        node_id: record.node_id.clone(),
        name: record.name.clone(),
        config,
        kind,
    })
}

fn decode_branches(
    record: &NodeRecord,
    config: &Value,
    index: &HashMap<String, usize>,
) -> Result<Vec<BranchOption>, SimError> {
    let entries = match config.get("branches") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(a)) => a,
        Some(other) => {
            return Err(config_error(
                record,
                format!("branches must be an array, got {}", json_kind(other)),
            ))
        }
    };

    let mut branches = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let key = entry
            .get("key")
            .and_then(scalar_key)
            .ok_or_else(|| {
                config_error(record, format!("branch {} has no string or numeric key", i))
            })?;
        let target = entry
            .get("target")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| config_error(record, format!("branch '{}' has no target", key)))?;
        if !index.contains_key(target) {
            return Err(SimError::DanglingBranchTarget {
                node_id: record.node_id.clone(),
                key,
                target: target.to_string(),
            });
        }
        let label = entry
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        branches.push(BranchOption {
            key,
            label,
            target: target.to_string(),
        });
    }
    Ok(branches)
}

/// String form of a branch key or selection value. Numbers use their
/// decimal rendering so `1` and `"1"` compare equal.
pub(crate) fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_str<'a>(
    record: &NodeRecord,
    config: &'a Value,
    field: &str,
) -> Result<Option<&'a str>, SimError> {
    match config.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(config_error(
            record,
            format!("'{}' must be a string, got {}", field, json_kind(other)),
        )),
    }
}

fn config_error(record: &NodeRecord, message: String) -> SimError {
    SimError::InvalidNodeConfig {
        node_id: record.node_id.clone(),
        message,
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
