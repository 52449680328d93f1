use super::pack::Pack;
use crate::core::models::ids::{ConditionId, PackId};
use slotmap::SlotMap;
use std::collections::HashMap;

/// One accepted combination: a match index per referenced pack and the
/// measured value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionRow {
    pub matches: Vec<usize>,
    pub value: f64,
}

/// Result of evaluating a condition. `rows[i].matches[k]` indexes the match
/// list of `packs[k]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionRows {
    pub packs: Vec<PackId>,
    pub rows: Vec<ConditionRow>,
}

impl ConditionRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    revisions: Vec<u64>,
    rows: ConditionRows,
}

/// Memoised condition rows, valid while the revisions of their packs are
/// unchanged.
#[derive(Debug, Default, Clone)]
pub struct EvaluationCache {
    entries: HashMap<ConditionId, CacheEntry>,
}

impl EvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn revisions(packs: &[PackId], registry: &SlotMap<PackId, Pack>) -> Option<Vec<u64>> {
        packs
            .iter()
            .map(|id| registry.get(*id).map(Pack::revision))
            .collect()
    }

    pub fn insert(
        &mut self,
        id: ConditionId,
        rows: ConditionRows,
        registry: &SlotMap<PackId, Pack>,
    ) {
        if let Some(revisions) = Self::revisions(&rows.packs, registry) {
            self.entries.insert(id, CacheEntry { revisions, rows });
        }
    }

    /// Cached rows, if they were computed under the current pack revisions.
    pub fn get(
        &self,
        id: ConditionId,
        registry: &SlotMap<PackId, Pack>,
    ) -> Option<&ConditionRows> {
        let entry = self.entries.get(&id)?;
        let current = Self::revisions(&entry.rows.packs, registry)?;
        (current == entry.revisions).then_some(&entry.rows)
    }

    pub fn remove(&mut self, id: ConditionId) {
        self.entries.remove(&id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
