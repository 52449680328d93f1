//! Subgraph matching of templates against target graphs.
//!
//! Matching is a backtracking search over a node compatibility matrix. The
//! template node with the fewest remaining candidates is assigned first, and
//! each assignment narrows the candidates of its template neighbours to the
//! target neighbours of the chosen atom. Cheap screens in [`profile`] reject
//! targets that cannot contain the template before any search starts.

pub mod profile;
mod search;
mod state;

use super::config::MatchOptions;
use super::error::EngineError;
use crate::core::models::graph::Graph;
use profile::{TargetProfile, TemplateProfile};
use std::sync::atomic::AtomicBool;

/// An injective map from template nodes to target nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Match(Vec<usize>);

impl Match {
    pub fn new(targets: Vec<usize>) -> Self {
        Self(targets)
    }

    /// Target node matched by template node `node`.
    pub fn target(&self, node: usize) -> usize {
        self.0[node]
    }

    pub fn targets(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    StopRequested,
    TimeBudgetExceeded,
    MatchLimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Complete,
    /// The search ended early; the match list is a prefix of the full result.
    Cancelled(CancelReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matches: Vec<Match>,
    pub status: MatchStatus,
}

impl MatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == MatchStatus::Complete
    }
}

/// A validated template ready to be matched against many targets.
#[derive(Debug, Clone)]
pub struct SubgraphMatcher<'a> {
    template: &'a Graph,
    profile: TemplateProfile,
    options: MatchOptions,
}

impl<'a> SubgraphMatcher<'a> {
    pub fn new(template: &'a Graph, options: MatchOptions) -> Result<Self, EngineError> {
        template.validate_template()?;
        Ok(Self {
            template,
            profile: TemplateProfile::of(template),
            options,
        })
    }

    pub fn template(&self) -> &'a Graph {
        self.template
    }

    pub fn profile(&self) -> &TemplateProfile {
        &self.profile
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// `false` if the screens prove the target holds no match.
    pub fn screen(&self, target: &TargetProfile) -> bool {
        self.profile.admits(target)
    }

    /// Enumerates matches in `target`, stopping early when `stop` is raised.
    ///
    /// Matches are reported in search order, which depends only on the two
    /// graphs and the options.
    pub fn find(&self, target: &Graph, stop: Option<&AtomicBool>) -> MatchOutcome {
        search::run(self.template, target, &self.options, stop)
    }
}

/// Matches a template against a single target.
pub fn match_graph(
    template: &Graph,
    target: &Graph,
    options: &MatchOptions,
) -> Result<MatchOutcome, EngineError> {
    Ok(SubgraphMatcher::new(template, *options)?.find(target, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom_types::AtomTypeSet;
    use crate::core::models::graph::{GraphError, Node};
    use crate::engine::config::MatchMode;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn substructure() -> MatchOptions {
        MatchOptions::default()
    }

    fn exact() -> MatchOptions {
        MatchOptions::with_mode(MatchMode::Exact)
    }

    fn graph(elements: &[i32], edges: &[(usize, usize)]) -> Graph {
        let mut g = Graph::new();
        for &z in elements {
            g.add_node(Node::element(z));
        }
        for &(u, v) in edges {
            g.add_edge(u, v).unwrap();
        }
        g
    }

    /// Six ring carbons 0..6, each carrying hydrogen `i + 6`.
    fn benzene() -> Graph {
        let mut edges: Vec<(usize, usize)> = (0..6).map(|i| (i, (i + 1) % 6)).collect();
        edges.extend((0..6).map(|i| (i, i + 6)));
        let mut elements = vec![6; 6];
        elements.extend([1; 6]);
        graph(&elements, &edges)
    }

    fn carbon_path(n: usize) -> Graph {
        let edges: Vec<_> = (1..n).map(|i| (i - 1, i)).collect();
        graph(&vec![6; n], &edges)
    }

    fn assert_valid_matches(template: &Graph, target: &Graph, outcome: &MatchOutcome) {
        for m in &outcome.matches {
            let mut seen = m.targets().to_vec();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), template.len(), "match {m:?} is not injective");
            for &(a, b) in template.edges() {
                assert!(target.has_edge(m.target(a), m.target(b)));
            }
        }
    }

    #[test]
    fn benzene_ring_template_has_twelve_embeddings() {
        let mut template = Graph::new();
        for _ in 0..6 {
            template.add_node(Node::element(6).with_coordination(2, 3));
        }
        for i in 0..6 {
            template.add_edge(i, (i + 1) % 6).unwrap();
        }
        let target = benzene();
        let outcome = match_graph(&template, &target, &substructure()).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.matches.len(), 12);
        assert_valid_matches(&template, &target, &outcome);
    }

    #[test]
    fn exact_mode_rejects_a_larger_molecule() {
        let template = carbon_path(3);
        let target = benzene();
        let exact_outcome = match_graph(&template, &target, &exact()).unwrap();
        assert!(exact_outcome.matches.is_empty());
        assert!(exact_outcome.is_complete());

        let sub = match_graph(&template, &target, &substructure()).unwrap();
        assert_eq!(sub.matches.len(), 12);
        assert_valid_matches(&template, &target, &sub);
    }

    #[test]
    fn exact_mode_matches_a_whole_component_with_the_same_bonds() {
        // Propane chain plus a separate three-membered carbon ring.
        let target = graph(&[6, 6, 6, 6, 6, 6], &[(0, 1), (1, 2), (3, 4), (4, 5), (5, 3)]);
        let outcome = match_graph(&carbon_path(3), &target, &exact()).unwrap();
        let found: Vec<&[usize]> = outcome.matches.iter().map(Match::targets).collect();
        assert_eq!(found, vec![&[0, 1, 2][..], &[2, 1, 0][..]]);
    }

    #[test]
    fn wildcard_node_matches_each_allowed_element() {
        // Target N-C-O with carbon in the middle.
        let target = graph(&[7, 6, 8], &[(0, 1), (1, 2)]);
        let mut template = Graph::new();
        let any = template.add_node(Node::new(AtomTypeSet::new([7, 8]).unwrap()));
        let carbon = template.add_node(Node::element(6));
        template.add_edge(any, carbon).unwrap();

        let outcome = match_graph(&template, &target, &substructure()).unwrap();
        let found: Vec<&[usize]> = outcome.matches.iter().map(Match::targets).collect();
        assert_eq!(found, vec![&[0, 1][..], &[2, 1][..]]);
    }

    #[test]
    fn wildcard_edge_must_exist_in_target() {
        // Target C-N-O: only nitrogen is bonded to the carbon.
        let target = graph(&[6, 7, 8], &[(0, 1), (1, 2)]);
        let mut template = Graph::new();
        let any = template.add_node(Node::new(AtomTypeSet::new([7, 8]).unwrap()));
        let carbon = template.add_node(Node::element(6));
        template.add_edge(any, carbon).unwrap();

        let outcome = match_graph(&template, &target, &substructure()).unwrap();
        assert_eq!(outcome.matches, vec![Match::new(vec![1, 0])]);
    }

    #[test]
    fn hydrogen_count_and_coordination_constrain_candidates() {
        // Methanol heavy skeleton with explicit hydrogens: C0 O1, H on both.
        let target = graph(&[6, 8, 1, 1, 1, 1], &[(0, 1), (0, 2), (0, 3), (0, 4), (1, 5)]);

        let mut hydroxyl = Graph::new();
        hydroxyl.add_node(Node::element(8).with_hydrogens(1));
        assert_eq!(match_graph(&hydroxyl, &target, &substructure()).unwrap().matches.len(), 1);

        let mut bare_oxygen = Graph::new();
        bare_oxygen.add_node(Node::element(8).with_hydrogens(0));
        assert!(match_graph(&bare_oxygen, &target, &substructure()).unwrap().matches.is_empty());

        let mut branched = Graph::new();
        branched.add_node(Node::element(6).with_coordination(2, 4));
        assert!(match_graph(&branched, &target, &substructure()).unwrap().matches.is_empty());
    }

    #[test]
    fn match_limit_truncates_with_status() {
        let options = MatchOptions {
            max_matches: 5,
            ..MatchOptions::default()
        };
        let outcome = match_graph(&carbon_path(3), &benzene(), &options).unwrap();
        assert_eq!(outcome.matches.len(), 5);
        assert_eq!(
            outcome.status,
            MatchStatus::Cancelled(CancelReason::MatchLimitReached)
        );
    }

    #[test]
    fn raised_stop_flag_cancels_before_any_match() {
        let template = carbon_path(3);
        let target = benzene();
        let matcher = SubgraphMatcher::new(&template, MatchOptions::default()).unwrap();
        let stop = AtomicBool::new(true);
        let outcome = matcher.find(&target, Some(&stop));
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.status, MatchStatus::Cancelled(CancelReason::StopRequested));

        stop.store(false, Ordering::Relaxed);
        assert!(matcher.find(&target, Some(&stop)).is_complete());
    }

    #[test]
    fn exhausted_time_budget_cancels() {
        let options = MatchOptions {
            time_budget: Some(Duration::ZERO),
            ..MatchOptions::default()
        };
        let outcome = match_graph(&carbon_path(3), &benzene(), &options).unwrap();
        assert_eq!(
            outcome.status,
            MatchStatus::Cancelled(CancelReason::TimeBudgetExceeded)
        );
    }

    #[test]
    fn unique_option_keeps_one_match_per_atom_set() {
        let options = MatchOptions {
            unique: true,
            ..MatchOptions::default()
        };
        let outcome = match_graph(&carbon_path(3), &benzene(), &options).unwrap();
        assert_eq!(outcome.matches.len(), 6);
    }

    #[test]
    fn empty_template_is_invalid() {
        let result = match_graph(&Graph::new(), &benzene(), &substructure());
        assert!(matches!(
            result,
            Err(EngineError::InvalidTemplate(GraphError::Empty))
        ));
    }

    #[test]
    fn repeated_searches_are_identical() {
        let template = carbon_path(4);
        let target = benzene();
        let first = match_graph(&template, &target, &substructure()).unwrap();
        let second = match_graph(&template, &target, &substructure()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn screen_rejects_targets_missing_elements() {
        let template = graph(&[7, 6], &[(0, 1)]);
        let matcher = SubgraphMatcher::new(&template, MatchOptions::default()).unwrap();
        assert!(!matcher.screen(&TargetProfile::of(&benzene())));
        assert!(matcher.screen(&TargetProfile::of(&graph(&[7, 6, 8], &[(0, 1), (1, 2)]))));
    }
}
