//! Unit-cell geometry: parameters, centring, coordinate conversion and
//! Niggli reduction.

pub mod cell;
pub mod niggli;

pub use cell::{CellError, CellParameters, Centring, UnitCell};
pub use niggli::{ReducedCell, reduce_cell};
