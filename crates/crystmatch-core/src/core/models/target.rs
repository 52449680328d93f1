use super::graph::Graph;
use super::molecule::Molecule;
use nalgebra::Point3;

/// A searchable structure: the union of several molecules as one graph.
///
/// Every molecule becomes a connected component of [`Target::graph`]; node
/// indices are assigned molecule by molecule in input order, so node `i`
/// corresponds to `positions[i]`.
#[derive(Debug, Clone, Default)]
pub struct Target {
    graph: Graph,
    positions: Vec<Point3<f64>>,
    origins: Vec<(usize, usize)>,
}

impl Target {
    pub fn from_molecules(molecules: &[Molecule]) -> Self {
        let mut graph = Graph::new();
        let mut positions = Vec::new();
        let mut origins = Vec::new();

        for (molecule_index, molecule) in molecules.iter().enumerate() {
            let offset = graph.len();
            let part = Graph::from(molecule);
            for (atom_index, node) in part.nodes().iter().enumerate() {
                graph.add_node(node.clone());
                origins.push((molecule_index, atom_index));
            }
            for &(u, v) in part.edges() {
                // Endpoints come from a valid graph shifted by a common offset.
                let _ = graph.add_edge(u + offset, v + offset);
            }
            positions.extend(molecule.atoms().iter().map(|a| a.position));
        }

        Self {
            graph,
            positions,
            origins,
        }
    }

    pub fn from_molecule(molecule: &Molecule) -> Self {
        Self::from_molecules(std::slice::from_ref(molecule))
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// `(molecule index, atom index within that molecule)` of a node.
    pub fn origin(&self, node: usize) -> Option<(usize, usize)> {
        self.origins.get(node).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::Atom;

    fn diatomic(symbol: &str, x: f64) -> Molecule {
        let mut molecule = Molecule::new(vec![
            Atom::from_symbol(symbol, x, 0.0, 0.0),
            Atom::from_symbol("H", x + 1.0, 0.0, 0.0),
        ]);
        molecule.add_bond(0, 1).unwrap();
        molecule
    }

    #[test]
    fn molecules_become_disjoint_components() {
        let target = Target::from_molecules(&[diatomic("Cl", 0.0), diatomic("F", 5.0)]);
        assert_eq!(target.len(), 4);
        assert_eq!(target.graph().edges(), &[(0, 1), (2, 3)]);
        assert_eq!(target.graph().component_count(), 2);
        assert_eq!(target.positions()[2], Point3::new(5.0, 0.0, 0.0));
        assert_eq!(target.origin(3), Some((1, 1)));
        assert_eq!(target.origin(4), None);
    }
}
