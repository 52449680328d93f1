//! Interchange formats at the boundary of the core.
//!
//! The integer graph serialization is the contract shared with template
//! parsers and storage; solution tables leave the core as CSV.

pub mod graph_format;
pub mod table;
