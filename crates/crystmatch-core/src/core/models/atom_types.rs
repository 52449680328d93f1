use super::element;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-empty set of atomic numbers.
///
/// A singleton describes a concrete element; larger sets are wildcards used by
/// search templates ("C or N"). The numbers are kept sorted and unique so two
/// sets with the same members compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<i32>", into = "Vec<i32>")]
pub struct AtomTypeSet(Vec<i32>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("An atom type set must contain at least one atomic number")]
pub struct EmptyAtomTypeSet;

impl AtomTypeSet {
    /// Builds a set from any collection of atomic numbers; `None` if empty.
    pub fn new(numbers: impl IntoIterator<Item = i32>) -> Option<Self> {
        let mut numbers: Vec<i32> = numbers.into_iter().collect();
        numbers.sort_unstable();
        numbers.dedup();
        if numbers.is_empty() {
            None
        } else {
            Some(Self(numbers))
        }
    }

    /// A concrete element.
    pub fn single(number: i32) -> Self {
        Self(vec![number])
    }

    /// A concrete element given by symbol (unknown symbols give number 999).
    pub fn from_symbol(symbol: &str) -> Self {
        Self::single(element::by_symbol(symbol).number)
    }

    pub fn is_wildcard(&self) -> bool {
        self.0.len() > 1
    }

    /// The element of a singleton set.
    pub fn single_number(&self) -> Option<i32> {
        match self.0.as_slice() {
            [z] => Some(*z),
            _ => None,
        }
    }

    pub fn contains(&self, number: i32) -> bool {
        self.0.binary_search(&number).is_ok()
    }

    /// Returns `true` if this set may be hydrogen.
    pub fn admits_hydrogen(&self) -> bool {
        self.contains(element::HYDROGEN)
    }

    /// Returns `true` if this is exactly `{H}`.
    pub fn is_hydrogen(&self) -> bool {
        self.single_number() == Some(element::HYDROGEN)
    }

    /// Template-side compatibility: every member of `target` must be allowed here.
    ///
    /// For a concrete target `{z}` this is simply `z ∈ self`.
    pub fn accepts(&self, target: &AtomTypeSet) -> bool {
        target.0.iter().all(|&z| self.contains(z))
    }

    pub fn numbers(&self) -> &[i32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<i32>> for AtomTypeSet {
    type Error = EmptyAtomTypeSet;

    fn try_from(numbers: Vec<i32>) -> Result<Self, Self::Error> {
        Self::new(numbers).ok_or(EmptyAtomTypeSet)
    }
}

impl From<AtomTypeSet> for Vec<i32> {
    fn from(set: AtomTypeSet) -> Self {
        set.0
    }
}

impl fmt::Display for AtomTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbols: Vec<&str> = self
            .0
            .iter()
            .map(|&z| element::by_number(z).symbol)
            .collect();
        if self.is_wildcard() {
            write!(f, "[{}]", symbols.join(","))
        } else {
            write!(f, "{}", symbols.join(","))
        }
    }
}
