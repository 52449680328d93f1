//! # CrystMatch Core Library
//!
//! Crystal structure assembly, covalent bond perception and geometric
//! substructure search.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Site`, `Molecule`, `Graph`),
//!   cell geometry and Niggli reduction, exact symmetry operations, bond inference and
//!   the integer graph interchange format.
//!
//! - **[`engine`]: The Logic Core.** Molecule assembly under a space group, the
//!   subgraph matcher with its pre-filters and cancellation, and the condition
//!   engine that joins geometric predicates over families of matches.
//!
//! - **[`workflows`]: The Public API.** Entry points that tie `core` and `engine`
//!   together: building molecules from an asymmetric unit, evaluating predicates
//!   over matches, and searching many structures for a query.
//!
//! The library never installs a logging subscriber and never prints; it emits
//! `tracing` events that the embedding application may collect.

pub mod core;
pub mod engine;
pub mod workflows;
