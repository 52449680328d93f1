use super::atom_types::AtomTypeSet;
use super::element;
use crate::core::bonding::{BondingCriteria, infer_bonds};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Provenance of an atom produced by structure assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtomSource {
    /// Index of the asymmetric-unit site this atom is an image of.
    pub site: usize,
    /// Index of the symmetry operation (after centring expansion) that produced it.
    pub operation: usize,
    /// Integer lattice translation applied on top of the wrapped image.
    pub cell_offset: [i32; 3],
}

/// An atom of a molecule, in Cartesian coordinates of the chosen frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// Cartesian position in Ångström. Not necessarily inside the home cell.
    pub position: Point3<f64>,
    /// Element of the atom.
    pub types: AtomTypeSet,
    /// Back-pointer to the generating site, if the atom came from a crystal.
    pub source: Option<AtomSource>,
    /// Label inherited from the site, if any.
    pub label: Option<String>,
}

impl Atom {
    pub fn new(types: AtomTypeSet, position: Point3<f64>) -> Self {
        Self {
            position,
            types,
            source: None,
            label: None,
        }
    }

    /// Convenience constructor for a concrete element.
    pub fn from_symbol(symbol: &str, x: f64, y: f64, z: f64) -> Self {
        Self::new(AtomTypeSet::from_symbol(symbol), Point3::new(x, y, z))
    }

    /// Atomic number used for bonding; `None` for wildcard atoms.
    pub fn atomic_number(&self) -> Option<i32> {
        self.types.single_number()
    }
}

/// An unordered pair of atom indices. Stored with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bond {
    pub a: usize,
    pub b: usize,
}

impl Bond {
    /// Creates a bond with normalized endpoint order.
    pub fn new(i: usize, j: usize) -> Self {
        if i <= j {
            Self { a: i, b: j }
        } else {
            Self { a: j, b: i }
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.a == index || self.b == index
    }

    /// The endpoint opposite `index`, if `index` is an endpoint.
    pub fn partner(&self, index: usize) -> Option<usize> {
        if self.a == index {
            Some(self.b)
        } else if self.b == index {
            Some(self.a)
        } else {
            None
        }
    }
}

/// An ordered list of atoms and the covalent bonds between them.
///
/// Invariant: every bond endpoint indexes an atom of this molecule and no bond
/// appears twice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
}

impl Molecule {
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self {
            atoms,
            bonds: Vec::new(),
        }
    }

    /// Builds a molecule and perceives its bonds from distances alone.
    pub fn with_inferred_bonds(atoms: Vec<Atom>, criteria: &BondingCriteria) -> Self {
        let positions: Vec<Point3<f64>> = atoms.iter().map(|a| a.position).collect();
        let numbers: Vec<Option<i32>> = atoms.iter().map(Atom::atomic_number).collect();
        let bonds = infer_bonds(&positions, &numbers, criteria);
        Self { atoms, bonds }
    }

    /// Builds a molecule from atoms and a bond list in one pass.
    ///
    /// Bonds with an out-of-range or repeated endpoint are skipped, and a bond
    /// listed more than once is kept at its first position.
    pub fn from_parts(atoms: Vec<Atom>, bonds: impl IntoIterator<Item = Bond>) -> Self {
        let n = atoms.len();
        let mut seen = HashSet::new();
        let bonds = bonds
            .into_iter()
            .map(|bond| Bond::new(bond.a, bond.b))
            .filter(|bond| bond.a != bond.b && bond.b < n && seen.insert(*bond))
            .collect();
        Self { atoms, bonds }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Appends an atom and returns its index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    /// Adds a bond between two atoms.
    ///
    /// Idempotent: adding an existing bond succeeds without duplicating it.
    /// Returns `None` if either index is out of range or both are equal.
    pub fn add_bond(&mut self, i: usize, j: usize) -> Option<()> {
        if i == j || i >= self.atoms.len() || j >= self.atoms.len() {
            return None;
        }
        let bond = Bond::new(i, j);
        if !self.bonds.contains(&bond) {
            self.bonds.push(bond);
        }
        Some(())
    }

    /// Adjacency lists in atom order; each list is sorted ascending.
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.atoms.len()];
        for bond in &self.bonds {
            adjacency[bond.a].push(bond.b);
            adjacency[bond.b].push(bond.a);
        }
        for list in &mut adjacency {
            list.sort_unstable();
        }
        adjacency
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    /// Geometric centre of the atoms, `None` for an empty molecule.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        crate::core::utils::geometry::centroid(&self.positions())
    }

    /// Hill-order formula (C, H, then alphabetical), e.g. `"H2O"` or `"C6H6"`.
    pub fn formula(&self) -> String {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for atom in &self.atoms {
            for &z in atom.types.numbers() {
                *counts.entry(element::by_number(z).symbol).or_default() += 1;
            }
        }

        let mut formula = String::new();
        let mut push = |symbol: &str, count: usize| {
            formula.push_str(symbol);
            if count > 1 {
                formula.push_str(&count.to_string());
            }
        };

        let has_carbon = counts.contains_key("C");
        if has_carbon {
            for symbol in ["C", "H"] {
                if let Some(count) = counts.remove(symbol) {
                    push(symbol, count);
                }
            }
        }
        for (symbol, count) in counts {
            push(symbol, count);
        }
        formula
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> Molecule {
        let mut molecule = Molecule::new(vec![
            Atom::from_symbol("O", 0.0, 0.0, 0.0),
            Atom::from_symbol("H", 0.96, 0.0, 0.0),
            Atom::from_symbol("H", -0.24, 0.93, 0.0),
        ]);
        molecule.add_bond(0, 1).unwrap();
        molecule.add_bond(2, 0).unwrap();
        molecule
    }

    #[test]
    fn bond_endpoints_are_normalized() {
        let bond = Bond::new(5, 2);
        assert_eq!((bond.a, bond.b), (2, 5));
        assert!(bond.contains(5));
        assert_eq!(bond.partner(2), Some(5));
        assert_eq!(bond.partner(7), None);
    }

    #[test]
    fn add_bond_is_idempotent_and_validates_indices() {
        let mut molecule = water();
        assert_eq!(molecule.add_bond(1, 0), Some(()));
        assert_eq!(molecule.bonds().len(), 2);
        assert_eq!(molecule.add_bond(0, 0), None);
        assert_eq!(molecule.add_bond(0, 9), None);
    }

    #[test]
    fn from_parts_keeps_first_copy_of_each_bond() {
        let atoms = water().atoms().to_vec();
        let bonds = [
            Bond::new(0, 1),
            Bond::new(2, 0),
            Bond::new(1, 0),
            Bond::new(1, 1),
            Bond::new(0, 3),
        ];
        let molecule = Molecule::from_parts(atoms, bonds);
        assert_eq!(molecule.bonds(), &[Bond::new(0, 1), Bond::new(0, 2)]);
        assert_eq!(molecule, water());
    }

    #[test]
    fn adjacency_is_sorted() {
        let adjacency = water().adjacency();
        assert_eq!(adjacency[0], vec![1, 2]);
        assert_eq!(adjacency[1], vec![0]);
        assert_eq!(adjacency[2], vec![0]);
    }

    #[test]
    fn formula_uses_hill_order() {
        assert_eq!(water().formula(), "H2O");
        let methanol = Molecule::new(vec![
            Atom::from_symbol("O", 0.0, 0.0, 0.0),
            Atom::from_symbol("C", 1.4, 0.0, 0.0),
            Atom::from_symbol("H", 0.0, 0.0, 0.0),
            Atom::from_symbol("H", 0.0, 0.0, 0.0),
            Atom::from_symbol("H", 0.0, 0.0, 0.0),
            Atom::from_symbol("H", 0.0, 0.0, 0.0),
        ]);
        assert_eq!(methanol.formula(), "CH4O");
    }

    #[test]
    fn with_inferred_bonds_perceives_water() {
        let atoms = water().atoms().to_vec();
        let molecule = Molecule::with_inferred_bonds(atoms, &BondingCriteria::default());
        assert_eq!(molecule.bonds(), &[Bond::new(0, 1), Bond::new(0, 2)]);
    }

    #[test]
    fn centroid_of_empty_molecule_is_none() {
        assert!(Molecule::default().centroid().is_none());
    }
}
