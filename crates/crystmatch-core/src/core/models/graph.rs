use super::atom_types::AtomTypeSet;
use super::molecule::Molecule;
use serde::Serialize;
use thiserror::Error;

/// Upper bound of the coordination range a node may request.
pub const MAX_COORDINATION: u32 = 14;

/// Inclusive range of allowed non-hydrogen neighbour counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CoordinationRange {
    pub min: u32,
    pub max: u32,
}

impl CoordinationRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// A range admitting exactly `n` neighbours.
    pub fn exactly(n: u32) -> Self {
        Self { min: n, max: n }
    }

    pub fn contains(&self, n: u32) -> bool {
        self.min <= n && n <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max && self.max <= MAX_COORDINATION
    }
}

impl Default for CoordinationRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: MAX_COORDINATION,
        }
    }
}

/// Attributes of one graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Node {
    /// Allowed element(s).
    pub types: AtomTypeSet,
    /// Required number of hydrogen neighbours; `None` means unspecified.
    pub hydrogens: Option<u32>,
    /// Allowed non-hydrogen degree.
    pub coordination: CoordinationRange,
}

impl Node {
    /// A node with no hydrogen requirement and the default coordination range.
    pub fn new(types: AtomTypeSet) -> Self {
        Self {
            types,
            hydrogens: None,
            coordination: CoordinationRange::default(),
        }
    }

    pub fn element(number: i32) -> Self {
        Self::new(AtomTypeSet::single(number))
    }

    pub fn with_hydrogens(mut self, count: u32) -> Self {
        self.hydrogens = Some(count);
        self
    }

    pub fn with_coordination(mut self, min: u32, max: u32) -> Self {
        self.coordination = CoordinationRange::new(min, max);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Node index {index} is out of range for a graph with {len} nodes")]
    NodeOutOfRange { index: usize, len: usize },
    #[error("Edge endpoints must be distinct (node {0})")]
    SelfLoop(usize),
    #[error("Edge ({0}, {1}) appears more than once")]
    DuplicateEdge(usize, usize),
    #[error("Node {node} has invalid coordination range [{min}, {max}]")]
    InvalidCoordination { node: usize, min: u32, max: u32 },
    #[error("Template has no nodes")]
    Empty,
    #[error("Template is not connected ({components} components)")]
    Disconnected { components: usize },
}

/// Adjacency representation shared by target molecules and search templates.
///
/// Edges are unordered pairs without multiplicity, kept in insertion order with
/// normalized endpoints `(u, v)`, `u < v`. Neighbour lists are kept sorted so
/// candidate enumeration follows the natural index order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<(usize, usize)>,
    #[serde(skip)]
    adjacency: Vec<Vec<usize>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.adjacency.push(Vec::new());
        self.nodes.len() - 1
    }

    /// Adds an undirected edge between two existing, distinct nodes.
    pub fn add_edge(&mut self, u: usize, v: usize) -> Result<(), GraphError> {
        let len = self.nodes.len();
        for index in [u, v] {
            if index >= len {
                return Err(GraphError::NodeOutOfRange { index, len });
            }
        }
        if u == v {
            return Err(GraphError::SelfLoop(u));
        }
        let (u, v) = if u < v { (u, v) } else { (v, u) };
        let slot = match self.adjacency[u].binary_search(&v) {
            Ok(_) => return Err(GraphError::DuplicateEdge(u, v)),
            Err(slot) => slot,
        };
        self.adjacency[u].insert(slot, v);
        let slot = self.adjacency[v].binary_search(&u).unwrap_or_else(|s| s);
        self.adjacency[v].insert(slot, u);
        self.edges.push((u, v));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn node_mut(&mut self, index: usize) -> &mut Node {
        &mut self.nodes[index]
    }

    /// Edges as normalized pairs in insertion order.
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Sorted neighbour list of a node.
    pub fn neighbors(&self, index: usize) -> &[usize] {
        &self.adjacency[index]
    }

    pub fn degree(&self, index: usize) -> usize {
        self.adjacency[index].len()
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.adjacency
            .get(u)
            .is_some_and(|list| list.binary_search(&v).is_ok())
    }

    /// Number of neighbours that are exactly hydrogen.
    pub fn hydrogen_count(&self, index: usize) -> u32 {
        self.adjacency[index]
            .iter()
            .filter(|&&n| self.nodes[n].types.is_hydrogen())
            .count() as u32
    }

    /// Number of neighbours that are not hydrogen.
    pub fn heavy_degree(&self, index: usize) -> u32 {
        self.degree(index) as u32 - self.hydrogen_count(index)
    }

    /// Connected-component label of every node.
    ///
    /// Components are numbered in order of their lowest node index.
    pub fn components(&self) -> Vec<usize> {
        const UNSET: usize = usize::MAX;
        let mut labels = vec![UNSET; self.nodes.len()];
        let mut next = 0;
        let mut stack = Vec::new();
        for start in 0..self.nodes.len() {
            if labels[start] != UNSET {
                continue;
            }
            labels[start] = next;
            stack.push(start);
            while let Some(node) = stack.pop() {
                for &neighbor in &self.adjacency[node] {
                    if labels[neighbor] == UNSET {
                        labels[neighbor] = next;
                        stack.push(neighbor);
                    }
                }
            }
            next += 1;
        }
        labels
    }

    pub fn component_count(&self) -> usize {
        self.components().into_iter().max().map_or(0, |m| m + 1)
    }

    pub fn is_connected(&self) -> bool {
        self.component_count() <= 1
    }

    /// Checks node attribute invariants.
    ///
    /// Edge invariants are enforced by [`Graph::add_edge`] and cannot be broken
    /// through the public API.
    pub fn validate(&self) -> Result<(), GraphError> {
        for (node, attributes) in self.nodes.iter().enumerate() {
            let range = attributes.coordination;
            if !range.is_valid() {
                return Err(GraphError::InvalidCoordination {
                    node,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }

    /// Checks everything a search template must satisfy: valid attributes, at
    /// least one node.
    pub fn validate_template(&self) -> Result<(), GraphError> {
        if self.is_empty() {
            return Err(GraphError::Empty);
        }
        self.validate()
    }

    /// Checks that the template forms a single connected component.
    pub fn require_connected(&self) -> Result<(), GraphError> {
        match self.component_count() {
            0 | 1 => Ok(()),
            components => Err(GraphError::Disconnected { components }),
        }
    }
}

impl From<&Molecule> for Graph {
    /// Target graph of a molecule: every atom becomes a node carrying its
    /// observed hydrogen count and an exact heavy-atom coordination.
    fn from(molecule: &Molecule) -> Self {
        let mut graph = Graph::new();
        for atom in molecule.atoms() {
            graph.add_node(Node::new(atom.types.clone()));
        }
        for bond in molecule.bonds() {
            // Molecule bonds are unique and in range.
            let _ = graph.add_edge(bond.a, bond.b);
        }
        for index in 0..graph.len() {
            let hydrogens = graph.hydrogen_count(index);
            let heavy = graph.heavy_degree(index);
            let node = graph.node_mut(index);
            node.hydrogens = Some(hydrogens);
            node.coordination = CoordinationRange::exactly(heavy.min(MAX_COORDINATION));
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::Atom;

    fn path(len: usize) -> Graph {
        let mut graph = Graph::new();
        for _ in 0..len {
            graph.add_node(Node::element(6));
        }
        for i in 1..len {
            graph.add_edge(i - 1, i).unwrap();
        }
        graph
    }

    #[test]
    fn add_edge_rejects_invalid_edges() {
        let mut graph = path(3);
        assert_eq!(
            graph.add_edge(0, 5),
            Err(GraphError::NodeOutOfRange { index: 5, len: 3 })
        );
        assert_eq!(graph.add_edge(1, 1), Err(GraphError::SelfLoop(1)));
        assert_eq!(graph.add_edge(1, 0), Err(GraphError::DuplicateEdge(0, 1)));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn neighbors_are_sorted_and_symmetric() {
        let mut graph = path(4);
        graph.add_edge(3, 0).unwrap();
        assert_eq!(graph.neighbors(0), &[1, 3]);
        assert!(graph.has_edge(3, 0));
        assert!(graph.has_edge(0, 3));
        assert!(!graph.has_edge(0, 2));
        assert_eq!(graph.edges().last(), Some(&(0, 3)));
    }

    #[test]
    fn components_are_labelled_by_lowest_node() {
        let mut graph = path(3);
        graph.add_node(Node::element(8));
        let a = graph.add_node(Node::element(1));
        graph.add_edge(3, a).unwrap();
        assert_eq!(graph.components(), vec![0, 0, 0, 1, 1]);
        assert_eq!(graph.component_count(), 2);
        assert_eq!(
            graph.require_connected(),
            Err(GraphError::Disconnected { components: 2 })
        );
    }

    #[test]
    fn validate_checks_coordination_ranges() {
        let mut graph = path(2);
        assert!(graph.validate().is_ok());
        graph.node_mut(1).coordination = CoordinationRange::new(3, 2);
        assert_eq!(
            graph.validate(),
            Err(GraphError::InvalidCoordination {
                node: 1,
                min: 3,
                max: 2
            })
        );
        graph.node_mut(1).coordination = CoordinationRange::new(0, 15);
        assert!(graph.validate().is_err());
        assert_eq!(Graph::new().validate_template(), Err(GraphError::Empty));
    }

    #[test]
    fn molecule_graph_records_hydrogens_and_heavy_degree() {
        let mut molecule = Molecule::new(vec![
            Atom::from_symbol("C", 0.0, 0.0, 0.0),
            Atom::from_symbol("O", 1.4, 0.0, 0.0),
            Atom::from_symbol("H", -0.5, 0.9, 0.0),
            Atom::from_symbol("H", 1.8, 0.9, 0.0),
        ]);
        molecule.add_bond(0, 1).unwrap();
        molecule.add_bond(0, 2).unwrap();
        molecule.add_bond(1, 3).unwrap();

        let graph = Graph::from(&molecule);
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.node(0).hydrogens, Some(1));
        assert_eq!(graph.node(0).coordination, CoordinationRange::exactly(1));
        assert_eq!(graph.heavy_degree(1), 1);
        assert_eq!(graph.hydrogen_count(2), 0);
    }
}
