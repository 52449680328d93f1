use super::cache::{ConditionRow, ConditionRows, EvaluationCache};
use super::pack::Pack;
use super::predicate::{Anchor, Condition};
use super::table::{SolutionRow, SolutionTable, TableCondition, TablePack};
use crate::core::models::graph::Graph;
use crate::core::models::ids::{ConditionId, PackId};
use crate::core::models::target::Target;
use crate::engine::error::EngineError;
use crate::engine::matcher::Match;
use itertools::Itertools;
use nalgebra::Point3;
use slotmap::SlotMap;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Packs, conditions and memoised evaluations over the atoms of one target.
///
/// The engine owns its packs and conditions; callers refer to them through
/// the keys returned on registration.
#[derive(Debug, Clone, Default)]
pub struct ConditionEngine {
    positions: Vec<Point3<f64>>,
    packs: SlotMap<PackId, Pack>,
    pack_order: Vec<PackId>,
    conditions: SlotMap<ConditionId, Condition>,
    condition_order: Vec<ConditionId>,
    cache: EvaluationCache,
}

impl ConditionEngine {
    /// `positions[i]` is the Cartesian position of target node `i`.
    pub fn new(positions: Vec<Point3<f64>>) -> Self {
        Self {
            positions,
            ..Self::default()
        }
    }

    pub fn for_target(target: &Target) -> Self {
        Self::new(target.positions().to_vec())
    }

    /// Registers a connected template with its matches.
    pub fn add_pack(
        &mut self,
        name: impl Into<String>,
        template: Graph,
        matches: Vec<Match>,
    ) -> Result<PackId, EngineError> {
        template.validate_template()?;
        template.require_connected()?;
        let name = name.into();
        self.check_matches(&name, &template, &matches)?;
        let id = self.packs.insert(Pack::new(name, template, matches));
        self.pack_order.push(id);
        Ok(id)
    }

    /// Replaces the matches of a pack, invalidating every cached evaluation
    /// that depends on it.
    pub fn set_matches(&mut self, id: PackId, matches: Vec<Match>) -> Result<(), EngineError> {
        let pack = self.packs.get(id).ok_or(EngineError::UnknownPack)?;
        self.check_matches(pack.name(), pack.template(), &matches)?;
        if let Some(pack) = self.packs.get_mut(id) {
            pack.replace_matches(matches);
        }
        Ok(())
    }

    fn check_matches(
        &self,
        name: &str,
        template: &Graph,
        matches: &[Match],
    ) -> Result<(), EngineError> {
        let fits = |m: &Match| {
            m.len() == template.len() && m.targets().iter().all(|&u| u < self.positions.len())
        };
        match matches.iter().position(|m| !fits(m)) {
            Some(index) => Err(EngineError::InvalidMatch {
                pack: name.to_string(),
                index,
            }),
            None => Ok(()),
        }
    }

    pub fn pack(&self, id: PackId) -> Option<&Pack> {
        self.packs.get(id)
    }

    /// Packs in registration order.
    pub fn packs(&self) -> impl Iterator<Item = (PackId, &Pack)> {
        self.pack_order.iter().map(|&id| (id, &self.packs[id]))
    }

    pub fn add_condition(&mut self, condition: Condition) -> Result<ConditionId, EngineError> {
        self.check_condition(&condition)?;
        let id = self.conditions.insert(condition);
        self.condition_order.push(id);
        Ok(id)
    }

    pub fn remove_condition(&mut self, id: ConditionId) -> Result<Condition, EngineError> {
        let condition = self.conditions.remove(id).ok_or(EngineError::UnknownCondition)?;
        self.condition_order.retain(|&c| c != id);
        self.cache.remove(id);
        Ok(condition)
    }

    pub fn condition(&self, id: ConditionId) -> Option<&Condition> {
        self.conditions.get(id)
    }

    /// Conditions in registration order.
    pub fn conditions(&self) -> impl Iterator<Item = (ConditionId, &Condition)> {
        self.condition_order
            .iter()
            .map(|&id| (id, &self.conditions[id]))
    }

    fn check_condition(&self, condition: &Condition) -> Result<(), EngineError> {
        if !condition.comparator.is_valid() {
            return Err(EngineError::InvalidCondition(format!(
                "'{}' has an invalid comparator {}",
                condition.name, condition.comparator
            )));
        }
        if condition.measure.anchor_sets().iter().any(|set| set.is_empty()) {
            return Err(EngineError::InvalidCondition(format!(
                "'{}' has an empty anchor set",
                condition.name
            )));
        }
        for anchor in condition.measure.anchors() {
            let pack = self.packs.get(anchor.pack).ok_or(EngineError::UnknownPack)?;
            let len = pack.template().len();
            if anchor.node >= len {
                return Err(EngineError::InvalidAnchor {
                    node: anchor.node,
                    len,
                });
            }
        }
        Ok(())
    }

    /// `true` if the rows of `id` are cached and still valid.
    pub fn is_cached(&self, id: ConditionId) -> bool {
        self.cache.get(id, &self.packs).is_some()
    }

    /// Rows of every match combination accepted by the condition, ordered
    /// lexicographically by match indices. Memoised until a referenced pack
    /// changes.
    pub fn evaluate(&mut self, id: ConditionId) -> Result<&ConditionRows, EngineError> {
        self.ensure_evaluated(id)?;
        self.cache
            .get(id, &self.packs)
            .ok_or(EngineError::UnknownCondition)
    }

    fn ensure_evaluated(&mut self, id: ConditionId) -> Result<(), EngineError> {
        let condition = self.conditions.get(id).ok_or(EngineError::UnknownCondition)?;
        if self.cache.get(id, &self.packs).is_some() {
            return Ok(());
        }
        let rows = self.compute_rows(condition)?;
        trace!(condition = %condition.name, rows = rows.len(), "Evaluated condition");
        self.cache.insert(id, rows, &self.packs);
        Ok(())
    }

    fn compute_rows(&self, condition: &Condition) -> Result<ConditionRows, EngineError> {
        let packs = condition.measure.packs();
        let mut match_lists = Vec::with_capacity(packs.len());
        for &id in &packs {
            match_lists.push(self.packs.get(id).ok_or(EngineError::UnknownPack)?.matches());
        }
        let column = |pack: PackId| packs.iter().position(|&p| p == pack).unwrap_or(0);

        let rows = match_lists
            .iter()
            .map(|list| 0..list.len())
            .multi_cartesian_product()
            .filter_map(|combination| {
                let position = |anchor: &Anchor| {
                    let k = column(anchor.pack);
                    let m = &match_lists[k][combination[k]];
                    self.positions[m.target(anchor.node)]
                };
                let value = condition.measure.evaluate(position)?;
                condition.comparator.accepts(value).then(|| ConditionRow {
                    matches: combination,
                    value,
                })
            })
            .collect();

        Ok(ConditionRows { packs, rows })
    }

    /// Joins the given conditions.
    ///
    /// Conditions are grouped by the transitive closure of pack sharing; each
    /// group yields one table whose rows satisfy every condition of the
    /// group. Groups appear in the order of their first condition.
    pub fn intersect(&mut self, ids: &[ConditionId]) -> Result<Vec<SolutionTable>, EngineError> {
        let ids: Vec<ConditionId> = ids.iter().copied().unique().collect();
        for &id in &ids {
            self.ensure_evaluated(id)?;
        }
        let groups = self.group_by_shared_packs(&ids)?;
        debug!(conditions = ids.len(), groups = groups.len(), "Joining conditions");
        groups.iter().map(|group| self.join(group)).collect()
    }

    fn rows_of(&self, id: ConditionId) -> Result<&ConditionRows, EngineError> {
        self.cache
            .get(id, &self.packs)
            .ok_or(EngineError::UnknownCondition)
    }

    fn group_by_shared_packs(
        &self,
        ids: &[ConditionId],
    ) -> Result<Vec<Vec<ConditionId>>, EngineError> {
        let mut parent: Vec<usize> = (0..ids.len()).collect();
        fn root(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        let mut owner: HashMap<PackId, usize> = HashMap::new();
        for (i, &id) in ids.iter().enumerate() {
            for &pack in &self.rows_of(id)?.packs {
                match owner.get(&pack) {
                    Some(&j) => {
                        let (a, b) = (root(&mut parent, i), root(&mut parent, j));
                        // Keep the earliest condition as the root.
                        parent[a.max(b)] = a.min(b);
                    }
                    None => {
                        owner.insert(pack, i);
                    }
                }
            }
        }

        let mut groups: Vec<Vec<ConditionId>> = Vec::new();
        let mut group_of_root: HashMap<usize, usize> = HashMap::new();
        for (i, &id) in ids.iter().enumerate() {
            let r = root(&mut parent, i);
            let slot = *group_of_root.entry(r).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(id);
        }
        Ok(groups)
    }

    /// Hash join of one connected group of conditions.
    fn join(&self, group: &[ConditionId]) -> Result<SolutionTable, EngineError> {
        let mut remaining: Vec<ConditionId> = group.to_vec();
        let first = remaining.remove(0);
        let first_rows = self.rows_of(first)?;

        let mut packs: Vec<PackId> = first_rows.packs.clone();
        let mut conditions = vec![first];
        let mut rows: Vec<(Vec<usize>, Vec<f64>)> = first_rows
            .rows
            .iter()
            .map(|r| (r.matches.clone(), vec![r.value]))
            .collect();

        while !remaining.is_empty() {
            let mut next_index = 0;
            for (i, &id) in remaining.iter().enumerate() {
                if self.rows_of(id)?.packs.iter().any(|p| packs.contains(p)) {
                    next_index = i;
                    break;
                }
            }
            let id = remaining.remove(next_index);
            let next = self.rows_of(id)?;

            // (column in the joined rows, column in the next condition)
            let shared: Vec<(usize, usize)> = next
                .packs
                .iter()
                .enumerate()
                .filter_map(|(k, p)| packs.iter().position(|q| q == p).map(|c| (c, k)))
                .collect();
            let fresh: Vec<usize> = (0..next.packs.len())
                .filter(|k| !shared.iter().any(|&(_, s)| s == *k))
                .collect();

            let mut index: HashMap<Vec<usize>, Vec<&ConditionRow>> = HashMap::new();
            for row in &next.rows {
                let key = shared.iter().map(|&(_, k)| row.matches[k]).collect();
                index.entry(key).or_default().push(row);
            }

            rows = rows
                .into_iter()
                .flat_map(|(matches, values)| {
                    let key: Vec<usize> = shared.iter().map(|&(c, _)| matches[c]).collect();
                    index
                        .get(&key)
                        .into_iter()
                        .flatten()
                        .map(|row| {
                            let mut joined = matches.clone();
                            joined.extend(fresh.iter().map(|&k| row.matches[k]));
                            let mut measured = values.clone();
                            measured.push(row.value);
                            (joined, measured)
                        })
                        .collect::<Vec<_>>()
                })
                .collect();
            packs.extend(fresh.iter().map(|&k| next.packs[k]));
            conditions.push(id);
        }

        rows.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(self.build_table(&packs, &conditions, rows))
    }

    fn build_table(
        &self,
        packs: &[PackId],
        conditions: &[ConditionId],
        rows: Vec<(Vec<usize>, Vec<f64>)>,
    ) -> SolutionTable {
        let rows = rows
            .into_iter()
            .map(|(matches, values)| {
                let atoms = packs
                    .iter()
                    .zip(&matches)
                    .flat_map(|(&p, &m)| self.packs[p].matches()[m].targets().iter().copied())
                    .collect();
                SolutionRow {
                    matches,
                    atoms,
                    values,
                }
            })
            .collect();
        SolutionTable {
            packs: packs
                .iter()
                .map(|&id| TablePack {
                    id,
                    name: self.packs[id].name().to_string(),
                    nodes: self.packs[id].template().len(),
                })
                .collect(),
            conditions: conditions
                .iter()
                .map(|&id| TableCondition {
                    id,
                    name: self.conditions[id].name.clone(),
                })
                .collect(),
            rows,
        }
    }

    /// Every match of one pack, as a table without condition columns.
    pub fn pack_table(&self, id: PackId) -> Result<SolutionTable, EngineError> {
        let pack = self.packs.get(id).ok_or(EngineError::UnknownPack)?;
        let rows = (0..pack.matches().len()).map(|i| (vec![i], Vec::new())).collect();
        Ok(self.build_table(&[id], &[], rows))
    }

    /// Tables for all registered conditions, followed by a standalone table
    /// for each pack that no condition references.
    pub fn solve(&mut self) -> Result<Vec<SolutionTable>, EngineError> {
        let ids = self.condition_order.clone();
        let mut tables = self.intersect(&ids)?;

        let referenced: HashSet<PackId> = self
            .conditions()
            .flat_map(|(_, c)| c.measure.packs())
            .collect();
        let standalone: Vec<PackId> = self
            .pack_order
            .iter()
            .copied()
            .filter(|id| !referenced.contains(id))
            .collect();
        for id in standalone {
            tables.push(self.pack_table(id)?);
        }
        Ok(tables)
    }
}
