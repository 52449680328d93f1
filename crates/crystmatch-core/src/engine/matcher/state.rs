/// Mutable working state of one search, local to the matcher.
///
/// Candidate domains shrink as template nodes are assigned; every change is
/// recorded on a trail so that backtracking restores the exact previous
/// domains.
#[derive(Debug)]
pub(super) struct SearchState {
    domains: Vec<Vec<usize>>,
    trail: Vec<(usize, Vec<usize>)>,
    assignment: Vec<Option<usize>>,
    used: Vec<bool>,
    assigned: usize,
}

impl SearchState {
    /// `domains[t]` lists the compatible target nodes of template node `t`
    /// in ascending order.
    pub fn new(domains: Vec<Vec<usize>>, target_len: usize) -> Self {
        let template_len = domains.len();
        Self {
            domains,
            trail: Vec::new(),
            assignment: vec![None; template_len],
            used: vec![false; target_len],
            assigned: 0,
        }
    }

    pub fn domain(&self, node: usize) -> &[usize] {
        &self.domains[node]
    }

    pub fn assigned(&self, node: usize) -> Option<usize> {
        self.assignment[node]
    }

    pub fn is_used(&self, target: usize) -> bool {
        self.used[target]
    }

    pub fn is_complete(&self) -> bool {
        self.assigned == self.assignment.len()
    }

    pub fn assignments(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.assignment
            .iter()
            .enumerate()
            .filter_map(|(t, u)| u.map(|u| (t, u)))
    }

    /// The full mapping, once every template node is assigned.
    pub fn mapping(&self) -> Option<Vec<usize>> {
        self.assignment.iter().copied().collect()
    }

    pub fn assign(&mut self, node: usize, target: usize) {
        debug_assert!(self.assignment[node].is_none() && !self.used[target]);
        self.assignment[node] = Some(target);
        self.used[target] = true;
        self.assigned += 1;
    }

    pub fn unassign(&mut self, node: usize) {
        if let Some(target) = self.assignment[node].take() {
            self.used[target] = false;
            self.assigned -= 1;
        }
    }

    pub fn trail_mark(&self) -> usize {
        self.trail.len()
    }

    /// Intersects the domain of `node` with the sorted list `allowed`.
    /// Returns `false` if the domain became empty.
    pub fn restrict(&mut self, node: usize, allowed: &[usize]) -> bool {
        let current = &self.domains[node];
        let mut narrowed = Vec::with_capacity(current.len().min(allowed.len()));
        let (mut i, mut j) = (0, 0);
        while i < current.len() && j < allowed.len() {
            match current[i].cmp(&allowed[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    narrowed.push(current[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        let empty = narrowed.is_empty();
        let previous = std::mem::replace(&mut self.domains[node], narrowed);
        self.trail.push((node, previous));
        !empty
    }

    /// Restores every domain changed since `mark`.
    pub fn rollback(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some((node, previous)) = self.trail.pop() {
                self.domains[node] = previous;
            }
        }
    }

    /// The unassigned template node with the fewest candidates; ties go to
    /// the lower index.
    pub fn next_variable(&self) -> Option<usize> {
        (0..self.assignment.len())
            .filter(|&t| self.assignment[t].is_none())
            .min_by_key(|&t| (self.domains[t].len(), t))
    }
}

/// One level of the explicit backtracking stack.
#[derive(Debug)]
pub(super) struct Frame {
    /// Template node being assigned at this level.
    pub node: usize,
    /// Snapshot of its domain when the frame was opened.
    pub candidates: Vec<usize>,
    /// Next candidate to try.
    pub next: usize,
    /// Trail length when the frame was opened.
    pub mark: usize,
}

impl Frame {
    pub fn open(node: usize, state: &SearchState) -> Self {
        Self {
            node,
            candidates: state.domain(node).to_vec(),
            next: 0,
            mark: state.trail_mark(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restrict_and_rollback_restore_domains() {
        let mut state = SearchState::new(vec![vec![0, 1, 2, 3], vec![1, 2]], 4);
        let mark = state.trail_mark();
        assert!(state.restrict(0, &[1, 3, 5]));
        assert_eq!(state.domain(0), &[1, 3]);
        assert!(!state.restrict(1, &[0, 3]));
        assert!(state.domain(1).is_empty());
        state.rollback(mark);
        assert_eq!(state.domain(0), &[0, 1, 2, 3]);
        assert_eq!(state.domain(1), &[1, 2]);
    }

    #[test]
    fn assignment_tracks_usage_and_completion() {
        let mut state = SearchState::new(vec![vec![0, 1], vec![1]], 2);
        assert_eq!(state.next_variable(), Some(1));
        state.assign(1, 1);
        assert!(state.is_used(1));
        assert_eq!(state.next_variable(), Some(0));
        state.assign(0, 0);
        assert!(state.is_complete());
        assert_eq!(state.mapping(), Some(vec![0, 1]));
        state.unassign(1);
        assert!(!state.is_used(1));
        assert_eq!(state.mapping(), None);
        assert_eq!(state.assignments().collect::<Vec<_>>(), vec![(0, 0)]);
    }
}
