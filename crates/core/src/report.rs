//! Structural validation report for a scenario.

use std::collections::HashSet;

use serde::Serialize;

use crate::graph::{isolated_nodes, ScenarioGraph};
use crate::snapshot::{NodeType, ScenarioSnapshot};

/// Node count above which a scenario is flagged as complex.
pub const COMPLEXITY_NODE_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_id: Option<String>,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    /// Percentage of nodes visited by a simulation's history.
    pub coverage: f64,
}

impl ValidationReport {
    /// Check a raw snapshot without building a graph, reporting every
    /// problem found rather than stopping at the first.
    pub fn inspect(snapshot: &ScenarioSnapshot) -> Self {
        let mut seen = HashSet::new();
        let duplicates: Vec<String> = snapshot
            .nodes
            .iter()
            .filter(|n| !seen.insert(n.node_id.as_str()))
            .map(|n| format!("duplicate node id: {}", n.node_id))
            .collect();

        let mut report = structural(
            snapshot
                .nodes
                .iter()
                .map(|n| (n.node_id.as_str(), n.node_type)),
            snapshot
                .connections
                .iter()
                .map(|c| (c.source_node_id.as_str(), c.target_node_id.as_str())),
        );
        report.errors.extend(duplicates);

        // Config-level problems only surface once the structure is sound.
        if report.errors.is_empty() {
            if let Err(e) = ScenarioGraph::build(snapshot) {
                report.errors.push(e.to_string());
            }
        }
        report.is_valid = report.errors.is_empty();
        report
    }

    pub fn for_graph(graph: &ScenarioGraph) -> Self {
        structural(
            graph
                .nodes()
                .iter()
                .map(|n| (n.node_id.as_str(), n.node_type())),
            graph
                .connections()
                .iter()
                .map(|c| (c.source_node_id.as_str(), c.target_node_id.as_str())),
        )
    }
}

fn structural<'a>(
    nodes: impl Iterator<Item = (&'a str, NodeType)> + Clone,
    connections: impl Iterator<Item = (&'a str, &'a str)> + Clone,
) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut recommendations = Vec::new();

    let start_count = nodes.clone().filter(|(_, t)| *t == NodeType::Start).count();
    match start_count {
        0 => errors.push("no start node".to_string()),
        1 => {}
        _ => warnings.push("multiple start nodes".to_string()),
    }
    if !nodes.clone().any(|(_, t)| t == NodeType::End) {
        warnings.push("no end node".to_string());
    }

    let ids: HashSet<&str> = nodes.clone().map(|(id, _)| id).collect();
    for (source, target) in connections.clone() {
        if !ids.contains(source) {
            errors.push(format!("unknown source node: {}", source));
        }
        if !ids.contains(target) {
            errors.push(format!("unknown target node: {}", target));
        }
    }

    let isolated = isolated_nodes(nodes.clone().map(|(id, _)| id), connections);
    if !isolated.is_empty() {
        let list: Vec<&str> = isolated.into_iter().collect();
        warnings.push(format!("isolated nodes: {}", list.join(", ")));
    }

    if ids.len() > COMPLEXITY_NODE_LIMIT {
        recommendations.push(format!(
            "scenario has more than {} nodes; consider simplifying it",
            COMPLEXITY_NODE_LIMIT
        ));
    }

    ValidationReport {
        simulation_id: None,
        is_valid: errors.is_empty(),
        errors,
        warnings,
        recommendations,
        coverage: 0.0,
    }
}
