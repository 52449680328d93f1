//! Distance-based covalent bond perception.
//!
//! Bonds are found by comparing interatomic distances with summed covalent
//! radii; a uniform bucket grid keeps the search near-linear in atom count.

mod grid;
mod inference;

pub use grid::UniformGrid;
pub use inference::{
    BondingCriteria, DEFAULT_BOND_TOLERANCE, DEFAULT_MIN_BOND_DISTANCE, bonding_radius,
    find_contacts, infer_bonds,
};
