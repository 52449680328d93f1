use crate::core::models::graph::Graph;
use crate::engine::matcher::Match;

/// A connected template together with all of its matches in one target.
#[derive(Debug, Clone, PartialEq)]
pub struct Pack {
    name: String,
    template: Graph,
    matches: Vec<Match>,
    revision: u64,
}

impl Pack {
    pub(super) fn new(name: String, template: Graph, matches: Vec<Match>) -> Self {
        Self {
            name,
            template,
            matches,
            revision: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &Graph {
        &self.template
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Bumped on every change of the match list; cached condition rows
    /// computed under an older revision are stale.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(super) fn replace_matches(&mut self, matches: Vec<Match>) {
        self.matches = matches;
        self.revision += 1;
    }
}
