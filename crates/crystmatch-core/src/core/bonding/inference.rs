use super::grid::UniformGrid;
use crate::core::models::element;
use crate::core::models::molecule::Bond;
use nalgebra::Point3;
use tracing::trace;

pub const DEFAULT_BOND_TOLERANCE: f64 = 1.15;
pub const DEFAULT_MIN_BOND_DISTANCE: f64 = 0.4;

/// Distance criteria for covalent bond perception.
///
/// Two atoms are bonded when their separation `d` satisfies
/// `min_distance <= d <= tolerance * (r_i + r_j)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondingCriteria {
    /// Multiplier on the summed covalent radii.
    pub tolerance: f64,
    /// Hard floor below which two atoms are treated as a duplicate site.
    pub min_distance: f64,
}

impl Default for BondingCriteria {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_BOND_TOLERANCE,
            min_distance: DEFAULT_MIN_BOND_DISTANCE,
        }
    }
}

impl BondingCriteria {
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }

    pub fn max_bond_length(&self, r_i: f64, r_j: f64) -> f64 {
        self.tolerance * (r_i + r_j)
    }

    pub fn is_bonded(&self, distance: f64, r_i: f64, r_j: f64) -> bool {
        distance >= self.min_distance && distance <= self.max_bond_length(r_i, r_j)
    }

    /// Grid edge that keeps every bond within adjacent buckets.
    pub fn grid_edge(&self, max_radius: f64) -> f64 {
        2.0 * self.tolerance * max_radius
    }
}

/// Covalent radius used for bonding, `None` for atoms that never bond
/// (wildcards, pseudo-elements, unknown and zero-radius entries).
pub fn bonding_radius(number: Option<i32>) -> Option<f64> {
    let element = element::by_number(number?);
    element.can_bond().then_some(element.covalent_radius)
}

fn radii(numbers: &[Option<i32>]) -> Vec<Option<f64>> {
    numbers.iter().map(|&z| bonding_radius(z)).collect()
}

fn max_radius(radii: &[Option<f64>]) -> Option<f64> {
    radii.iter().flatten().copied().reduce(f64::max)
}

/// Perceives bonds within one set of atoms.
///
/// `numbers[i]` is the atomic number of the atom at `positions[i]`. Bonds are
/// returned once each, normalized and sorted.
pub fn infer_bonds(
    positions: &[Point3<f64>],
    numbers: &[Option<i32>],
    criteria: &BondingCriteria,
) -> Vec<Bond> {
    debug_assert_eq!(positions.len(), numbers.len());
    let radii = radii(numbers);
    let Some(r_max) = max_radius(&radii) else {
        return Vec::new();
    };
    let grid = UniformGrid::build(positions, criteria.grid_edge(r_max), |i| {
        radii[i].is_some()
    });

    let mut bonds = Vec::new();
    for (i, position) in positions.iter().enumerate() {
        let Some(r_i) = radii[i] else { continue };
        grid.for_each_candidate(position, |j| {
            if j <= i {
                return;
            }
            if let Some(r_j) = radii[j] {
                let d = nalgebra::distance(position, &positions[j]);
                if criteria.is_bonded(d, r_i, r_j) {
                    bonds.push(Bond::new(i, j));
                }
            }
        });
    }
    bonds.sort_unstable();
    trace!(atoms = positions.len(), bonds = bonds.len(), "Inferred bonds");
    bonds
}

/// Finds bonded pairs `(home, pool)` between two distinct atom lists.
///
/// Used for periodic images where the pool is a translated copy of the home
/// set; the distance floor keeps an atom from bonding to itself. Pairs are
/// sorted by home index, then pool index.
pub fn find_contacts(
    home: &[Point3<f64>],
    home_numbers: &[Option<i32>],
    pool: &[Point3<f64>],
    pool_numbers: &[Option<i32>],
    criteria: &BondingCriteria,
) -> Vec<(usize, usize)> {
    let home_radii = radii(home_numbers);
    let pool_radii = radii(pool_numbers);
    let r_max = match (max_radius(&home_radii), max_radius(&pool_radii)) {
        (Some(a), Some(b)) => a.max(b),
        _ => return Vec::new(),
    };
    let grid = UniformGrid::build(pool, criteria.grid_edge(r_max), |j| {
        pool_radii[j].is_some()
    });

    let mut contacts = Vec::new();
    for (i, position) in home.iter().enumerate() {
        let Some(r_i) = home_radii[i] else { continue };
        let start = contacts.len();
        grid.for_each_candidate(position, |j| {
            if let Some(r_j) = pool_radii[j] {
                let d = nalgebra::distance(position, &pool[j]);
                if criteria.is_bonded(d, r_i, r_j) {
                    contacts.push((i, j));
                }
            }
        });
        contacts[start..].sort_unstable();
    }
    contacts
}
