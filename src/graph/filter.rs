use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::model::{GraphSnapshot, Node, NodeKind, Relation};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TypeFilter {
    #[default]
    All,
    Kind(NodeKind),
    /// A type label outside the known kinds, matched verbatim.
    Label(String),
}

impl TypeFilter {
    /// The narrowest filter that selects `node`.
    pub fn of(node: &Node) -> Self {
        match node.kind {
            NodeKind::Unknown => Self::Label(node.type_label.clone()),
            kind => Self::Kind(kind),
        }
    }

    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Self::All => true,
            Self::Kind(selected) => node.kind == *selected,
            Self::Label(label) => node.kind == NodeKind::Unknown && node.type_label == *label,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Kind(kind) => kind.label(),
            Self::Label(label) => label,
        }
    }
}

/// One filter per distinct node type in `snapshot`, in order of first appearance.
/// Unknown type labels each get their own entry.
pub fn type_filters(snapshot: &GraphSnapshot) -> Vec<TypeFilter> {
    let mut seen = HashSet::new();
    snapshot
        .nodes()
        .iter()
        .map(TypeFilter::of)
        .filter(|filter| seen.insert(filter.clone()))
        .collect()
}

/// Edge whose endpoints are resolved to indices into [`FilteredView::nodes`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewEdge {
    pub source: usize,
    pub target: usize,
    pub relation: Relation,
}

#[derive(Clone, Debug, Default)]
pub struct FilteredView {
    nodes: Vec<Node>,
    edges: Vec<ViewEdge>,
    index_by_id: HashMap<String, usize>,
    dropped_edges: usize,
}

impl FilteredView {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[ViewEdge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Snapshot edges that did not survive the endpoint rule.
    pub fn dropped_edges(&self) -> usize {
        self.dropped_edges
    }
}

pub fn filter_by_type(snapshot: &GraphSnapshot, filter: &TypeFilter) -> FilteredView {
    filter_view(snapshot, |node| filter.matches(node))
}

/// Selects the nodes that satisfy `predicate` and keeps only the edges
/// with both endpoints among them. Edges pointing at ids that are filtered out
/// or were never present are dropped silently.
pub fn filter_view(snapshot: &GraphSnapshot, predicate: impl Fn(&Node) -> bool) -> FilteredView {
    let nodes = snapshot
        .nodes()
        .iter()
        .filter(|&node| predicate(node))
        .cloned()
        .collect::<Vec<_>>();

    let mut index_by_id = HashMap::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        index_by_id.insert(node.id.clone(), index);
    }

    let edges = snapshot
        .edges()
        .iter()
        .filter_map(|edge| {
            let source = index_by_id.get(&edge.source_id)?;
            let target = index_by_id.get(&edge.target_id)?;
            Some(ViewEdge {
                source: *source,
                target: *target,
                relation: edge.relation.clone(),
            })
        })
        .collect::<Vec<_>>();

    let dropped_edges = snapshot.edges().len() - edges.len();
    if dropped_edges > 0 {
        debug!(dropped_edges, kept = edges.len(), "dropped edges with missing endpoints");
    }

    FilteredView {
        nodes,
        edges,
        index_by_id,
        dropped_edges,
    }
}
