/// Live counts from both stores, as reported by the stats endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub node_counts: Vec<(String, u64)>,
    pub relationship_counts: Vec<(String, u64)>,
    pub contracts: u64,
    pub queries: u64,
    pub risks: u64,
}

impl GraphStats {
    pub fn new(
        node_counts: impl IntoIterator<Item = (String, u64)>,
        relationship_counts: impl IntoIterator<Item = (String, u64)>,
    ) -> Self {
        Self {
            node_counts: ranked(node_counts),
            relationship_counts: ranked(relationship_counts),
            ..Self::default()
        }
    }

    pub fn max_node_count(&self) -> u64 {
        self.node_counts.iter().map(|(_, count)| *count).max().unwrap_or(0).max(1)
    }

    pub fn max_relationship_count(&self) -> u64 {
        self.relationship_counts
            .iter()
            .map(|(_, count)| *count)
            .max()
            .unwrap_or(0)
            .max(1)
    }

    #[cfg(test)]
    pub fn node_count(&self, label: &str) -> u64 {
        self.node_counts
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

fn ranked(counts: impl IntoIterator<Item = (String, u64)>) -> Vec<(String, u64)> {
    let mut counts = counts
        .into_iter()
        .filter(|(name, _)| !name.is_empty())
        .collect::<Vec<_>>();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}
