use crate::core::lattice::UnitCell;
use crate::core::models::molecule::Molecule;
use crate::core::models::site::Site;
use crate::core::models::target::Target;
use crate::core::symmetry::SymmetryOperation;
use crate::engine::assembly;
use crate::engine::config::BuildOptions;
use crate::engine::error::EngineError;
use tracing::{info, instrument};

/// A crystal structure as read from a file: the asymmetric unit together
/// with its cell and symmetry operations.
#[derive(Debug, Clone)]
pub struct Structure {
    pub name: String,
    pub cell: UnitCell,
    pub sites: Vec<Site>,
    pub operations: Vec<SymmetryOperation>,
}

impl Structure {
    pub fn new(
        name: impl Into<String>,
        cell: UnitCell,
        sites: Vec<Site>,
        operations: Vec<SymmetryOperation>,
    ) -> Self {
        Self {
            name: name.into(),
            cell,
            sites,
            operations,
        }
    }

    pub fn build(&self, options: &BuildOptions) -> Result<Vec<Molecule>, EngineError> {
        build_molecules(&self.cell, &self.sites, &self.operations, options)
    }

    /// Builds the molecules and merges them into one searchable target.
    pub fn build_target(&self, options: &BuildOptions) -> Result<Target, EngineError> {
        Ok(Target::from_molecules(&self.build(options)?))
    }
}

/// Expands an asymmetric unit into the molecules of the crystal.
#[instrument(skip_all, name = "build_molecules_workflow")]
pub fn build_molecules(
    cell: &UnitCell,
    sites: &[Site],
    operations: &[SymmetryOperation],
    options: &BuildOptions,
) -> Result<Vec<Molecule>, EngineError> {
    info!(
        "Building molecules from {} site(s) and {} symmetry operation(s).",
        sites.len(),
        operations.len()
    );

    let molecules = assembly::assemble(cell, sites, operations, options)?;

    info!(
        "Assembled {} molecule(s) with {} atom(s) in total.",
        molecules.len(),
        molecules.iter().map(Molecule::len).sum::<usize>()
    );
    Ok(molecules)
}
