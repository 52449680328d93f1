use crate::core::models::graph::Graph;
use std::collections::BTreeMap;

const MIN_RING: usize = 3;
const MAX_RING: usize = 8;

/// Bonded element pairs tracked by the fingerprint, lower atomic number first.
const BONDED_PAIRS: [(i32, i32); 16] = [
    (1, 6),
    (1, 7),
    (1, 8),
    (6, 6),
    (6, 7),
    (6, 8),
    (6, 9),
    (6, 15),
    (6, 16),
    (6, 17),
    (6, 35),
    (7, 7),
    (7, 8),
    (8, 15),
    (8, 16),
    (16, 16),
];

const PAIR_BASE: u32 = (MAX_RING - MIN_RING + 1) as u32;
const BRANCH_3: u32 = PAIR_BASE + BONDED_PAIRS.len() as u32;
const BRANCH_4: u32 = BRANCH_3 + 1;
/// C, N and S centres carrying at least two oxygens (carboxyl, nitro, sulfonyl).
const OXO_CENTRES: [(i32, u32); 3] = [(6, BRANCH_4 + 1), (7, BRANCH_4 + 2), (16, BRANCH_4 + 3)];

/// A set of small structural features present in a graph.
///
/// Every feature is monotone under subgraph embedding: if a template has it,
/// any target containing the template has it too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Fingerprint(u64);

impl Fingerprint {
    fn set(&mut self, bit: u32) {
        self.0 |= 1 << bit;
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    /// `true` if every feature of `other` is also present here.
    pub fn covers(&self, other: &Fingerprint) -> bool {
        other.0 & !self.0 == 0
    }

    /// Fingerprint of a graph. Element-dependent features are taken only
    /// from nodes with a single element; wildcards contribute ring and
    /// branching features.
    pub fn of(graph: &Graph) -> Self {
        let mut fp = Self::default();
        let element = |i: usize| graph.node(i).types.single_number();
        let heavy = |i: usize| !graph.node(i).types.admits_hydrogen();

        let rings = ring_sizes(graph);
        for size in MIN_RING..=MAX_RING {
            if rings & (1 << (size - MIN_RING)) != 0 {
                fp.set((size - MIN_RING) as u32);
            }
        }

        for &(u, v) in graph.edges() {
            if let (Some(a), Some(b)) = (element(u), element(v)) {
                let pair = (a.min(b), a.max(b));
                if let Some(slot) = BONDED_PAIRS.iter().position(|&p| p == pair) {
                    fp.set(PAIR_BASE + slot as u32);
                }
            }
        }

        for node in 0..graph.len() {
            let neighbours = graph.neighbors(node);
            let heavy_neighbours = neighbours.iter().filter(|&&n| heavy(n)).count();
            if heavy_neighbours >= 3 {
                fp.set(BRANCH_3);
            }
            if heavy_neighbours >= 4 {
                fp.set(BRANCH_4);
            }
            let Some(z) = element(node) else { continue };
            if let Some(&(_, bit)) = OXO_CENTRES.iter().find(|(centre, _)| *centre == z) {
                let oxygens = neighbours.iter().filter(|&&n| element(n) == Some(8)).count();
                if oxygens >= 2 {
                    fp.set(bit);
                }
            }
        }
        fp
    }
}

/// Bit `k - 3` is set when the graph has a simple cycle of length `k`.
fn ring_sizes(graph: &Graph) -> u8 {
    let all: u8 = (1 << (MAX_RING - MIN_RING + 1)) - 1;
    let mut found = 0u8;
    let mut on_path = vec![false; graph.len()];
    for start in 0..graph.len() {
        if found == all {
            break;
        }
        on_path[start] = true;
        walk(graph, start, start, 1, &mut on_path, &mut found);
        on_path[start] = false;
    }
    found
}

/// Extends a simple path rooted at its lowest node `start`; `depth` counts
/// the nodes on the path.
fn walk(
    graph: &Graph,
    start: usize,
    current: usize,
    depth: usize,
    on_path: &mut [bool],
    found: &mut u8,
) {
    for &next in graph.neighbors(current) {
        if next == start {
            if depth >= MIN_RING {
                *found |= 1 << (depth - MIN_RING);
            }
        } else if next > start && !on_path[next] && depth < MAX_RING {
            on_path[next] = true;
            walk(graph, start, next, depth + 1, on_path, found);
            on_path[next] = false;
        }
    }
}

fn concrete_counts(graph: &Graph) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for node in graph.nodes() {
        if let Some(z) = node.types.single_number() {
            *counts.entry(z).or_default() += 1;
        }
    }
    counts
}

/// Precomputed screening attributes of a target graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProfile {
    pub node_count: usize,
    pub element_counts: BTreeMap<i32, usize>,
    pub fingerprint: Fingerprint,
}

impl TargetProfile {
    pub fn of(graph: &Graph) -> Self {
        Self {
            node_count: graph.len(),
            element_counts: concrete_counts(graph),
            fingerprint: Fingerprint::of(graph),
        }
    }
}

/// Screening requirements derived from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateProfile {
    pub node_count: usize,
    /// Counts of template nodes with a single element; wildcards are not counted.
    pub element_counts: BTreeMap<i32, usize>,
    pub fingerprint: Fingerprint,
}

impl TemplateProfile {
    pub fn of(template: &Graph) -> Self {
        Self {
            node_count: template.len(),
            element_counts: concrete_counts(template),
            fingerprint: Fingerprint::of(template),
        }
    }

    /// Element multiset cover.
    pub fn counts_covered_by(&self, target: &TargetProfile) -> bool {
        target.node_count >= self.node_count
            && self.element_counts.iter().all(|(z, &needed)| {
                target.element_counts.get(z).copied().unwrap_or(0) >= needed
            })
    }

    /// Both screens; `false` guarantees the target holds no match.
    pub fn admits(&self, target: &TargetProfile) -> bool {
        self.counts_covered_by(target) && target.fingerprint.covers(&self.fingerprint)
    }
}
