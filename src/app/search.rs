use std::collections::HashSet;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::graph::FilteredView;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

/// Fuzzy label search over the current view. Matches are recomputed only when
/// the query or the epoch changes.
#[derive(Debug, Default)]
pub(in crate::app) struct LabelSearch {
    pub query: String,
    matched_query: String,
    matched_epoch: Option<u64>,
    matches: HashSet<usize>,
    revision: u64,
}

impl LabelSearch {
    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty()
    }

    pub fn matches(&self) -> &HashSet<usize> {
        &self.matches
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn refresh(&mut self, epoch: u64, view: &FilteredView) {
        let query = self.query.trim();
        if self.matched_epoch == Some(epoch) && self.matched_query == query {
            return;
        }

        let matches = if query.is_empty() {
            HashSet::new()
        } else {
            let matcher = SkimMatcherV2::default();
            view.nodes()
                .iter()
                .enumerate()
                .filter(|(_, node)| fuzzy_match_score(&matcher, &node.label, query).is_some())
                .map(|(index, _)| index)
                .collect()
        };

        self.matched_query = query.to_owned();
        self.matched_epoch = Some(epoch);
        if matches != self.matches {
            self.matches = matches;
            self.revision += 1;
        }
    }
}
