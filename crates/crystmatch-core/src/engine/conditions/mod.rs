//! Geometric conditions over families of matches.
//!
//! A [`Pack`] is a connected template together with its matches in one
//! target; a [`Condition`] measures a geometric quantity over template nodes
//! of one or more packs. The [`ConditionEngine`] evaluates conditions over
//! every combination of matches, memoises the accepted rows, and joins
//! conditions that share packs into [`SolutionTable`]s.

mod cache;
mod pack;
mod predicate;
mod solver;
mod table;

pub use cache::{ConditionRow, ConditionRows, EvaluationCache};
pub use pack::Pack;
pub use predicate::{Anchor, Comparator, Condition, Measure};
pub use solver::ConditionEngine;
pub use table::{SolutionRow, SolutionTable, TableCondition, TablePack};
