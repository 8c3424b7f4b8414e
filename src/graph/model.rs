use std::collections::HashSet;

use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Contract,
    Party,
    Clause,
    Jurisdiction,
    RiskFlag,
    Obligation,
    Unknown,
}

impl NodeKind {
    #[cfg(test)]
    pub const KNOWN: [NodeKind; 6] = [
        Self::Contract,
        Self::Party,
        Self::Clause,
        Self::Jurisdiction,
        Self::RiskFlag,
        Self::Obligation,
    ];

    pub fn from_label(label: &str) -> Self {
        match label {
            "Contract" => Self::Contract,
            "Party" => Self::Party,
            "Clause" => Self::Clause,
            "Jurisdiction" => Self::Jurisdiction,
            "RiskFlag" => Self::RiskFlag,
            "Obligation" => Self::Obligation,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Contract => "Contract",
            Self::Party => "Party",
            Self::Clause => "Clause",
            Self::Jurisdiction => "Jurisdiction",
            Self::RiskFlag => "RiskFlag",
            Self::Obligation => "Obligation",
            Self::Unknown => "Other",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationKind {
    HasParty,
    PartyTo,
    Contains,
    GovernedBy,
    ConflictsWith,
    RelatedTo,
    HasRisk,
    Imposes,
    Other,
}

impl RelationKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "HAS_PARTY" => Self::HasParty,
            "PARTY_TO" => Self::PartyTo,
            "CONTAINS" => Self::Contains,
            "GOVERNED_BY" => Self::GovernedBy,
            "CONFLICTS_WITH" => Self::ConflictsWith,
            "RELATED_TO" => Self::RelatedTo,
            "HAS_RISK" => Self::HasRisk,
            "IMPOSES" => Self::Imposes,
            _ => Self::Other,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    pub kind: RelationKind,
    pub name: String,
}

impl Relation {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: RelationKind::from_name(&name),
            name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    /// Type label as sent by the graph store, kept for display of unknown kinds.
    pub type_label: String,
    pub label: String,
    pub severity: Option<Severity>,
}

impl Node {
    pub fn new(
        id: impl Into<String>,
        type_label: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        let type_label = type_label.into();
        Self {
            id: id.into(),
            kind: NodeKind::from_label(&type_label),
            type_label,
            label: label.into(),
            severity: None,
        }
    }

    pub fn with_severity(mut self, severity: Option<Severity>) -> Self {
        self.severity = severity;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    pub relation: Relation,
}

impl Edge {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation: Relation::new(relation),
        }
    }
}

/// One fetched copy of the entity graph. Never mutated after construction.
#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut seen = HashSet::with_capacity(nodes.len());
        let total = nodes.len();
        let nodes = nodes
            .into_iter()
            .filter(|node| seen.insert(node.id.clone()))
            .collect::<Vec<_>>();

        let duplicates = total - nodes.len();
        if duplicates > 0 {
            warn!(duplicates, "discarded nodes with duplicate ids");
        }

        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let snapshot = GraphSnapshot::new(
            vec![
                Node::new("1", "Contract", "MSA"),
                Node::new("1", "Party", "Shadow"),
                Node::new("2", "Party", "Acme"),
            ],
            Vec::new(),
        );

        assert_eq!(snapshot.nodes().len(), 2);
        assert_eq!(snapshot.nodes()[0].label, "MSA");
    }

    #[test]
    fn relation_names_map_to_kinds() {
        assert_eq!(Relation::new("CONFLICTS_WITH").kind, RelationKind::ConflictsWith);
        let other = Relation::new("SIMILAR_TO");
        assert_eq!(other.kind, RelationKind::Other);
        assert_eq!(other.name, "SIMILAR_TO");
    }

    #[test]
    fn severity_parsing_is_case_insensitive() {
        assert_eq!(Severity::parse("HIGH"), Some(Severity::High));
        assert_eq!(Severity::parse(" medium "), Some(Severity::Medium));
        assert_eq!(Severity::parse("critical"), None);
    }
}
