//! # Core Module
//!
//! Stateless data structures and pure algorithms that the rest of the crate
//! builds on.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Elements, sites, molecules and attributed graphs
//! - **Cell Geometry** ([`lattice`]) - Cell parameters, centring, coordinate conversion and
//!   Niggli reduction
//! - **Symmetry** ([`symmetry`]) - Exact parsing and application of space-group operations
//! - **Bond Perception** ([`bonding`]) - Covalent-radius bond inference on a uniform grid
//! - **Interchange** ([`io`]) - The integer graph format and CSV export
//! - **Geometry** ([`utils`]) - Distances, angles, centroids and least-squares planes
//!
//! Nothing here keeps state between calls; every function is a transformation
//! of values owned by the caller.

pub mod bonding;
pub mod io;
pub mod lattice;
pub mod models;
pub mod symmetry;
pub mod utils;
