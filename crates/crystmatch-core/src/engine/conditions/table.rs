use crate::core::io::table::Tabular;
use crate::core::models::ids::{ConditionId, PackId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePack {
    pub id: PackId,
    pub name: String,
    /// Number of template nodes, i.e. atom columns contributed by the pack.
    pub nodes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCondition {
    pub id: ConditionId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolutionRow {
    /// One match index per pack column.
    pub matches: Vec<usize>,
    /// Target atoms of those matches, pack by pack in template node order.
    pub atoms: Vec<usize>,
    /// One measured value per condition column.
    pub values: Vec<f64>,
}

/// Joined rows of match indices that jointly satisfy a group of conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionTable {
    pub packs: Vec<TablePack>,
    pub conditions: Vec<TableCondition>,
    pub rows: Vec<SolutionRow>,
}

impl SolutionTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column of a pack in `SolutionRow::matches`.
    pub fn pack_column(&self, pack: PackId) -> Option<usize> {
        self.packs.iter().position(|p| p.id == pack)
    }

    pub fn condition_column(&self, condition: ConditionId) -> Option<usize> {
        self.conditions.iter().position(|c| c.id == condition)
    }
}

impl Tabular for SolutionTable {
    /// `pack:node` for every matched atom (1-based nodes), then one column
    /// per condition.
    fn header(&self) -> Vec<String> {
        self.packs
            .iter()
            .flat_map(|p| (1..=p.nodes).map(move |n| format!("{}:{}", p.name, n)))
            .chain(self.conditions.iter().map(|c| c.name.clone()))
            .collect()
    }

    /// Target atoms are written 1-based.
    fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.atoms
                    .iter()
                    .map(|a| (a + 1).to_string())
                    .chain(row.values.iter().map(|v| format!("{v:.4}")))
                    .collect()
            })
            .collect()
    }
}
