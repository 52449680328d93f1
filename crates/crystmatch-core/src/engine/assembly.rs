use super::config::BuildOptions;
use super::error::EngineError;
use crate::core::bonding::{BondingCriteria, find_contacts, infer_bonds};
use crate::core::lattice::{Centring, UnitCell};
use crate::core::models::atom_types::AtomTypeSet;
use crate::core::models::molecule::{Atom, AtomSource, Bond, Molecule};
use crate::core::models::site::Site;
use crate::core::symmetry::{SymmetryOperation, SymopErrorReason, SymopParseError, expand};
use itertools::{Itertools, iproduct};
use nalgebra::Point3;
use std::collections::VecDeque;
use tracing::debug;

type Offset = [i32; 3];

/// A symmetry image of a site, wrapped into the home cell.
#[derive(Debug, Clone)]
struct Image {
    site: usize,
    operation: usize,
    fractional: Point3<f64>,
    cartesian: Point3<f64>,
    types: AtomTypeSet,
    label: Option<String>,
}

fn add_offsets(a: Offset, b: Offset) -> Offset {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// The 27 lattice translations around the origin cell, in lexicographic order.
fn neighbourhood() -> Vec<Offset> {
    iproduct!(-1..=1, -1..=1, -1..=1)
        .map(|(i, j, k)| [i, j, k])
        .collect()
}

/// Assembles the molecules of a crystal from its asymmetric unit.
///
/// Molecules are ordered by their lowest image index and atoms within a
/// molecule by image index, so the output is reproducible for fixed input.
pub fn assemble(
    cell: &UnitCell,
    sites: &[Site],
    operations: &[SymmetryOperation],
    options: &BuildOptions,
) -> Result<Vec<Molecule>, EngineError> {
    options.validate()?;
    check_sites(sites)?;
    let operations = full_operations(operations, cell.centring())?;

    let images = unique_images(cell, sites, &operations, options.dedup_tolerance);
    debug!(
        sites = sites.len(),
        operations = operations.len(),
        images = images.len(),
        "Expanded asymmetric unit"
    );

    let molecules = if options.pack_complete {
        let neighbours = periodic_neighbours(cell, &images, &options.bonding);
        grow_molecules(cell, &images, &neighbours)
    } else {
        home_cell_molecules(&images, &options.bonding)
    };
    debug!(molecules = molecules.len(), "Assembled molecules");
    Ok(molecules)
}

fn check_sites(sites: &[Site]) -> Result<(), EngineError> {
    match sites.iter().position(|s| s.types.is_wildcard()) {
        Some(site) => Err(EngineError::UnorderedStructure {
            site,
            types: sites[site].types.to_string(),
        }),
        None => Ok(()),
    }
}

/// Composes every operation with every centring vector of the lattice.
fn full_operations(
    operations: &[SymmetryOperation],
    centring: Centring,
) -> Result<Vec<SymmetryOperation>, EngineError> {
    if operations.is_empty() {
        return Err(EngineError::NoSymmetry("no symmetry operations supplied"));
    }
    if !operations
        .iter()
        .any(SymmetryOperation::is_pure_lattice_translation)
    {
        return Err(EngineError::NoSymmetry("operation list contains no identity"));
    }
    let translations = centring.translations();
    let composed = iproduct!(operations, &translations)
        .map(|(op, t)| {
            op.translated(t).ok_or_else(|| SymopParseError {
                input: op.to_string(),
                reason: SymopErrorReason::Overflow,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(composed.into_iter().unique().collect())
}

/// Two wrapped fractional points coincide if every component agrees modulo 1.
fn coincide(a: &Point3<f64>, b: &Point3<f64>, tolerance: f64) -> bool {
    (0..3).all(|i| {
        let d = a[i] - b[i];
        (d - d.round()).abs() < tolerance
    })
}

fn unique_images(
    cell: &UnitCell,
    sites: &[Site],
    operations: &[SymmetryOperation],
    tolerance: f64,
) -> Vec<Image> {
    let mut images: Vec<Image> = Vec::new();
    for expanded in expand(sites, operations, false) {
        // Images of one site are emitted contiguously.
        let duplicate = images
            .iter()
            .rev()
            .take_while(|kept| kept.site == expanded.site)
            .any(|kept| coincide(&kept.fractional, &expanded.fractional, tolerance));
        if duplicate {
            continue;
        }
        images.push(Image {
            site: expanded.site,
            operation: expanded.operation,
            cartesian: cell.to_cartesian(&expanded.fractional),
            fractional: expanded.fractional,
            types: expanded.types,
            label: sites[expanded.site].label.clone(),
        });
    }
    images
}

fn atomic_numbers(images: &[Image]) -> Vec<Option<i32>> {
    images.iter().map(|i| i.types.single_number()).collect()
}

fn make_atom(image: &Image, offset: Offset, position: Point3<f64>) -> Atom {
    let mut atom = Atom::new(image.types.clone(), position);
    atom.source = Some(AtomSource {
        site: image.site,
        operation: image.operation,
        cell_offset: offset,
    });
    atom.label = image.label.clone();
    atom
}

/// Connected components of bonds between home-cell images only.
fn home_cell_molecules(images: &[Image], criteria: &BondingCriteria) -> Vec<Molecule> {
    let positions: Vec<Point3<f64>> = images.iter().map(|i| i.cartesian).collect();
    let bonds = infer_bonds(&positions, &atomic_numbers(images), criteria);

    let mut adjacency = vec![Vec::new(); images.len()];
    for bond in &bonds {
        adjacency[bond.a].push(bond.b);
        adjacency[bond.b].push(bond.a);
    }

    // Component of each image and its index within that component.
    let mut component = vec![usize::MAX; images.len()];
    let mut local = vec![0; images.len()];
    let mut members_of: Vec<Vec<usize>> = Vec::new();
    for start in 0..images.len() {
        if component[start] != usize::MAX {
            continue;
        }
        let id = members_of.len();
        component[start] = id;
        let mut members = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(i) = queue.pop_front() {
            for &j in &adjacency[i] {
                if component[j] == usize::MAX {
                    component[j] = id;
                    members.push(j);
                    queue.push_back(j);
                }
            }
        }
        members.sort_unstable();
        for (l, &g) in members.iter().enumerate() {
            local[g] = l;
        }
        members_of.push(members);
    }

    let mut bonds_of: Vec<Vec<Bond>> = vec![Vec::new(); members_of.len()];
    for bond in &bonds {
        bonds_of[component[bond.a]].push(Bond::new(local[bond.a], local[bond.b]));
    }

    members_of
        .into_iter()
        .zip(bonds_of)
        .map(|(members, bonds)| {
            let atoms = members
                .iter()
                .map(|&g| make_atom(&images[g], [0; 3], images[g].cartesian))
                .collect();
            Molecule::from_parts(atoms, bonds)
        })
        .collect()
}

/// For each home image, the images bonded to it in the 27-cell neighbourhood,
/// as `(image, lattice offset)` sorted by image then offset.
fn periodic_neighbours(
    cell: &UnitCell,
    images: &[Image],
    criteria: &BondingCriteria,
) -> Vec<Vec<(usize, Offset)>> {
    let home: Vec<Point3<f64>> = images.iter().map(|i| i.cartesian).collect();
    let numbers = atomic_numbers(images);

    let mut neighbours = vec![Vec::new(); images.len()];
    for offset in neighbourhood() {
        let shift = cell.lattice_vector(offset);
        let pool: Vec<Point3<f64>> = home.iter().map(|p| p + shift).collect();
        for (i, j) in find_contacts(&home, &numbers, &pool, &numbers, criteria) {
            neighbours[i].push((j, offset));
        }
    }
    for list in &mut neighbours {
        list.sort_unstable();
    }
    neighbours
}

/// Breadth-first growth across cell boundaries. Each image joins at most one
/// molecule, at the lattice offset through which it was first reached.
fn grow_molecules(
    cell: &UnitCell,
    images: &[Image],
    neighbours: &[Vec<(usize, Offset)>],
) -> Vec<Molecule> {
    let mut placed: Vec<Option<Offset>> = vec![None; images.len()];
    let mut local = vec![0; images.len()];
    let mut owner = vec![usize::MAX; images.len()];
    let mut molecules = Vec::new();

    for seed in 0..images.len() {
        if placed[seed].is_some() {
            continue;
        }
        let id = molecules.len();
        placed[seed] = Some([0; 3]);
        owner[seed] = id;
        let mut members = vec![seed];
        let mut bonds = Vec::new();
        let mut queue = VecDeque::from([seed]);

        while let Some(i) = queue.pop_front() {
            let Some(offset_i) = placed[i] else { continue };
            for &(j, step) in &neighbours[i] {
                let offset_j = add_offsets(offset_i, step);
                match placed[j] {
                    None => {
                        placed[j] = Some(offset_j);
                        owner[j] = id;
                        members.push(j);
                        bonds.push((i, j));
                        queue.push_back(j);
                    }
                    // A different offset means the walk wrapped onto an
                    // image already in the molecule (a polymer); no bond.
                    Some(existing) if existing == offset_j && owner[j] == id => {
                        bonds.push((i, j))
                    }
                    Some(_) => {}
                }
            }
        }
        members.sort_unstable();
        for (l, &g) in members.iter().enumerate() {
            local[g] = l;
        }

        let atoms = members
            .iter()
            .map(|&g| {
                let offset = placed[g].unwrap_or([0; 3]);
                let position = images[g].cartesian + cell.lattice_vector(offset);
                make_atom(&images[g], offset, position)
            })
            .collect();
        let bonds = bonds.into_iter().map(|(a, b)| Bond::new(local[a], local[b]));
        molecules.push(Molecule::from_parts(atoms, bonds));
    }
    molecules
}
