//! # Core Models Module
//!
//! This module contains the data structures shared by every stage of the
//! pipeline, from the asymmetric unit handed in by a file parser to the graphs
//! the matcher walks.
//!
//! ## Key Components
//!
//! - [`element`] - Static element table (symbols, covalent radii, colours)
//! - [`atom_types`] - Sets of allowed atomic numbers, singleton or wildcard
//! - [`site`] - Asymmetric-unit sites in fractional coordinates
//! - [`molecule`] - Atoms in Cartesian space with their covalent bonds
//! - [`graph`] - Attributed adjacency structure for targets and templates
//! - [`target`] - A whole structure flattened into one searchable graph
//! - [`ids`] - Stable handles for packs and conditions
//!
//! ## Usage
//!
//! ```ignore
//! use crystmatch::core::models::{graph::Graph, molecule::{Atom, Molecule}};
//!
//! let mut molecule = Molecule::new(vec![
//!     Atom::from_symbol("O", 0.0, 0.0, 0.0),
//!     Atom::from_symbol("H", 0.96, 0.0, 0.0),
//! ]);
//! molecule.add_bond(0, 1);
//! let graph = Graph::from(&molecule);
//! ```

pub mod atom_types;
pub mod element;
pub mod graph;
pub mod ids;
pub mod molecule;
pub mod site;
pub mod target;
