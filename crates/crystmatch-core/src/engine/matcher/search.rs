use super::state::{Frame, SearchState};
use super::{CancelReason, Match, MatchOutcome, MatchStatus};
use crate::core::models::graph::Graph;
use crate::engine::config::{MatchMode, MatchOptions};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

/// Steps between checkpoints below the top level.
const CHECK_INTERVAL: u64 = 4096;

/// Per-node target attributes used by the compatibility test.
struct TargetAttributes {
    hydrogens: Vec<u32>,
    heavy_degree: Vec<u32>,
}

impl TargetAttributes {
    fn of(target: &Graph) -> Self {
        Self {
            hydrogens: (0..target.len()).map(|u| target.hydrogen_count(u)).collect(),
            heavy_degree: (0..target.len()).map(|u| target.heavy_degree(u)).collect(),
        }
    }
}

fn compatible(
    template: &Graph,
    t: usize,
    target: &Graph,
    attrs: &TargetAttributes,
    u: usize,
) -> bool {
    let node = template.node(t);
    node.types.accepts(&target.node(u).types)
        && node.hydrogens.is_none_or(|h| attrs.hydrogens[u] == h)
        && node.coordination.contains(attrs.heavy_degree[u])
}

/// Rows of the compatibility matrix, each as an ascending candidate list.
/// In exact mode candidates must also lie in a component of the template's size.
fn initial_domains(template: &Graph, target: &Graph, mode: MatchMode) -> Vec<Vec<usize>> {
    let attrs = TargetAttributes::of(target);
    let sized = match mode {
        MatchMode::Substructure => None,
        MatchMode::Exact => {
            let labels = target.components();
            let mut sizes = vec![0usize; target.len()];
            for &label in &labels {
                sizes[label] += 1;
            }
            Some(
                labels
                    .iter()
                    .map(|&label| sizes[label] == template.len())
                    .collect::<Vec<_>>(),
            )
        }
    };

    (0..template.len())
        .map(|t| {
            (0..target.len())
                .filter(|&u| sized.as_ref().is_none_or(|ok| ok[u]))
                .filter(|&u| compatible(template, t, target, &attrs, u))
                .collect()
        })
        .collect()
}

/// Collects matches, applying the uniqueness filter and the match limit.
struct Recorder {
    matches: Vec<Match>,
    seen: HashSet<Vec<usize>>,
    unique: bool,
    limit: usize,
}

impl Recorder {
    fn new(options: &MatchOptions) -> Self {
        Self {
            matches: Vec::new(),
            seen: HashSet::new(),
            unique: options.unique,
            limit: options.max_matches,
        }
    }

    /// Returns `true` once the limit is reached.
    fn record(&mut self, mapping: Vec<usize>) -> bool {
        if self.unique {
            let mut key = mapping.clone();
            key.sort_unstable();
            if !self.seen.insert(key) {
                return false;
            }
        }
        self.matches.push(Match::new(mapping));
        self.limit > 0 && self.matches.len() >= self.limit
    }

    fn finish(self, status: MatchStatus) -> MatchOutcome {
        MatchOutcome {
            matches: self.matches,
            status,
        }
    }
}

fn interruption(
    stop: Option<&AtomicBool>,
    budget: Option<Duration>,
    started: Instant,
) -> Option<CancelReason> {
    if stop.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
        return Some(CancelReason::StopRequested);
    }
    if budget.is_some_and(|limit| started.elapsed() >= limit) {
        return Some(CancelReason::TimeBudgetExceeded);
    }
    None
}

/// Exact mode: an unmatched template pair must not be bonded in the target.
fn respects_non_edges(
    template: &Graph,
    target: &Graph,
    state: &SearchState,
    t: usize,
    u: usize,
) -> bool {
    state
        .assignments()
        .all(|(other, image)| template.has_edge(t, other) || !target.has_edge(u, image))
}

fn try_assign(
    template: &Graph,
    target: &Graph,
    mode: MatchMode,
    state: &mut SearchState,
    frame_mark: usize,
    t: usize,
    u: usize,
) -> bool {
    if state.is_used(u) {
        return false;
    }
    if mode == MatchMode::Exact && !respects_non_edges(template, target, state, t, u) {
        return false;
    }
    state.assign(t, u);
    for &neighbour in template.neighbors(t) {
        if state.assigned(neighbour).is_none() && !state.restrict(neighbour, target.neighbors(u)) {
            state.rollback(frame_mark);
            state.unassign(t);
            return false;
        }
    }
    true
}

/// Enumerates every embedding of `template` in `target`.
///
/// The recursion of a classic backtracking matcher is unrolled into an
/// explicit stack of [`Frame`]s. The stop flag and the time budget are
/// checked whenever the top-level frame advances, and every
/// `CHECK_INTERVAL` steps below it.
pub(super) fn run(
    template: &Graph,
    target: &Graph,
    options: &MatchOptions,
    stop: Option<&AtomicBool>,
) -> MatchOutcome {
    let started = Instant::now();
    let mut recorder = Recorder::new(options);

    let domains = initial_domains(template, target, options.mode);
    if domains.iter().any(Vec::is_empty) {
        return recorder.finish(MatchStatus::Complete);
    }

    let mut state = SearchState::new(domains, target.len());
    let mut stack = Vec::with_capacity(template.len());
    if let Some(first) = state.next_variable() {
        stack.push(Frame::open(first, &state));
    }

    let mut steps: u64 = 0;
    loop {
        let depth = stack.len();
        let Some(frame) = stack.last_mut() else { break };

        if state.assigned(frame.node).is_some() {
            state.unassign(frame.node);
            state.rollback(frame.mark);
        }

        steps += 1;
        if depth == 1 || steps % CHECK_INTERVAL == 0 {
            if let Some(reason) = interruption(stop, options.time_budget, started) {
                trace!(
                    steps,
                    matches = recorder.matches.len(),
                    ?reason,
                    "Subgraph search interrupted"
                );
                return recorder.finish(MatchStatus::Cancelled(reason));
            }
        }

        let mut advanced = false;
        while frame.next < frame.candidates.len() {
            let u = frame.candidates[frame.next];
            frame.next += 1;
            if try_assign(template, target, options.mode, &mut state, frame.mark, frame.node, u) {
                advanced = true;
                break;
            }
        }
        if !advanced {
            stack.pop();
            continue;
        }

        if state.is_complete() {
            if let Some(mapping) = state.mapping() {
                if recorder.record(mapping) {
                    trace!(steps, "Match limit reached");
                    return recorder.finish(MatchStatus::Cancelled(CancelReason::MatchLimitReached));
                }
            }
        } else if let Some(next) = state.next_variable() {
            stack.push(Frame::open(next, &state));
        }
    }

    trace!(steps, matches = recorder.matches.len(), "Subgraph search finished");
    recorder.finish(MatchStatus::Complete)
}
