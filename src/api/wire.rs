use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::graph::{Edge, GraphSnapshot, GraphStats, Node, Severity};

/// Graph-store ids arrive as integers; hand-written fixtures use strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(serde_json::Number),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawNode {
    id: WireId,
    #[serde(default, rename = "type")]
    node_type: Option<String>,
    #[serde(default)]
    label: Option<Value>,
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    severity: Option<Value>,
    #[serde(default)]
    risk_level: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    source: WireId,
    target: WireId,
    #[serde(default)]
    relation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGraph {
    #[serde(default)]
    nodes: Option<Vec<Value>>,
    #[serde(default)]
    edges: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGraphCounts {
    #[serde(default)]
    nodes: BTreeMap<String, u64>,
    #[serde(default)]
    relationships: BTreeMap<String, u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStoreCounts {
    #[serde(default)]
    contracts: u64,
    #[serde(default)]
    queries: u64,
    #[serde(default)]
    risks: u64,
}

#[derive(Debug, Deserialize)]
struct RawStats {
    #[serde(default)]
    neo4j: Option<RawGraphCounts>,
    #[serde(default)]
    postgres: Option<RawStoreCounts>,
}

fn value_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

impl RawNode {
    fn into_node(self) -> Node {
        let label = value_text(self.label.as_ref())
            .or_else(|| value_text(self.name.as_ref()))
            .unwrap_or_default();
        let severity = value_text(self.severity.as_ref())
            .as_deref()
            .and_then(Severity::parse)
            .or_else(|| {
                value_text(self.risk_level.as_ref())
                    .as_deref()
                    .and_then(Severity::parse)
            });

        Node::new(
            self.id.into_string(),
            self.node_type.unwrap_or_default(),
            label,
        )
        .with_severity(severity)
    }
}

pub(super) fn parse_graph(raw: &str) -> Result<GraphSnapshot, serde_json::Error> {
    let parsed: RawGraph = serde_json::from_str(raw)?;

    let raw_nodes = parsed.nodes.unwrap_or_default();
    let raw_node_count = raw_nodes.len();
    let nodes = raw_nodes
        .into_iter()
        .filter_map(|value| RawNode::deserialize(value).ok())
        .map(RawNode::into_node)
        .collect::<Vec<_>>();

    let raw_edges = parsed.edges.unwrap_or_default();
    let raw_edge_count = raw_edges.len();
    let edges = raw_edges
        .into_iter()
        .filter_map(|value| RawEdge::deserialize(value).ok())
        .map(|edge| {
            Edge::new(
                edge.source.into_string(),
                edge.target.into_string(),
                edge.relation.unwrap_or_default(),
            )
        })
        .collect::<Vec<_>>();

    if nodes.len() < raw_node_count || edges.len() < raw_edge_count {
        debug!(
            skipped_nodes = raw_node_count - nodes.len(),
            skipped_edges = raw_edge_count - edges.len(),
            "skipped undecodable graph entries"
        );
    }

    Ok(GraphSnapshot::new(nodes, edges))
}

pub(super) fn parse_stats(raw: &str) -> Result<GraphStats, serde_json::Error> {
    let parsed: RawStats = serde_json::from_str(raw)?;
    let graph = parsed.neo4j.unwrap_or_default();
    let store = parsed.postgres.unwrap_or_default();

    Ok(GraphStats {
        contracts: store.contracts,
        queries: store.queries,
        risks: store.risks,
        ..GraphStats::new(graph.nodes, graph.relationships)
    })
}
