//! Space-group symmetry operations on fractional coordinates.
//!
//! Operations are parsed from the usual `x,-y,z+1/2` notation into exact
//! rational affine maps and applied modulo the unit cell.

pub mod expand;
pub mod fraction;
pub mod operation;

pub use expand::{ExpandedSite, expand};
pub use fraction::Fraction;
pub use operation::{SymmetryOperation, SymopErrorReason, SymopParseError, wrap_fractional};
