use super::operation::SymmetryOperation;
use crate::core::models::atom_types::AtomTypeSet;
use crate::core::models::site::Site;
use nalgebra::{Point3, Vector3};

/// The six unit translations applied after each wrapped image, in emission order.
pub const CELL_TRANSLATIONS: [[i32; 3]; 6] = [
    [1, 0, 0],
    [-1, 0, 0],
    [0, 1, 0],
    [0, -1, 0],
    [0, 0, 1],
    [0, 0, -1],
];

/// One symmetry image of an asymmetric-unit site.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedSite {
    /// Index of the parent site.
    pub site: usize,
    /// Index of the operation that produced the image.
    pub operation: usize,
    /// Lattice translation added on top of the wrapped image.
    pub shift: [i32; 3],
    /// Fractional position.
    pub fractional: Point3<f64>,
    /// Element(s), copied from the parent site.
    pub types: AtomTypeSet,
}

/// Applies every operation to every site.
///
/// Images are emitted with the sites as the outer loop and the operations in
/// supplied order as the inner loop. Each wrapped image is followed, when
/// `cell_translations` is set, by its six unit translations along ±a, ±b, ±c.
pub fn expand(
    sites: &[Site],
    operations: &[SymmetryOperation],
    cell_translations: bool,
) -> Vec<ExpandedSite> {
    let per_image = if cell_translations { 7 } else { 1 };
    let mut images = Vec::with_capacity(sites.len() * operations.len() * per_image);
    for (site_index, site) in sites.iter().enumerate() {
        for (op_index, op) in operations.iter().enumerate() {
            let base = op.apply(&site.fractional, true);
            images.push(ExpandedSite {
                site: site_index,
                operation: op_index,
                shift: [0; 3],
                fractional: base,
                types: site.types.clone(),
            });
            if !cell_translations {
                continue;
            }
            for shift in CELL_TRANSLATIONS {
                let offset = Vector3::new(shift[0] as f64, shift[1] as f64, shift[2] as f64);
                images.push(ExpandedSite {
                    site: site_index,
                    operation: op_index,
                    shift,
                    fractional: base + offset,
                    types: site.types.clone(),
                });
            }
        }
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(texts: &[&str]) -> Vec<SymmetryOperation> {
        texts.iter().map(|t| SymmetryOperation::parse(t).unwrap()).collect()
    }

    #[test]
    fn emits_sites_outer_operations_inner() {
        let sites = [
            Site::from_symbol("C", 0.1, 0.2, 0.3),
            Site::from_symbol("O", 0.4, 0.5, 0.6),
        ];
        let images = expand(&sites, &ops(&["x,y,z", "-x,-y,-z"]), false);
        let order: Vec<(usize, usize)> = images.iter().map(|i| (i.site, i.operation)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert!((images[1].fractional - Point3::new(0.9, 0.8, 0.7)).norm() < 1e-12);
    }

    #[test]
    fn images_keep_the_site_type() {
        let sites = [Site::from_symbol("N", 0.25, 0.5, 0.75)];
        for image in expand(&sites, &ops(&["x,y,z", "y,x,-z", "-x+1/2,y+1/2,z"]), true) {
            assert_eq!(image.types, sites[0].types);
        }
    }

    #[test]
    fn cell_translations_follow_each_image() {
        let sites = [Site::from_symbol("C", 0.1, 0.1, 0.1)];
        let images = expand(&sites, &ops(&["x,y,z"]), true);
        assert_eq!(images.len(), 7);
        assert_eq!(images[0].shift, [0, 0, 0]);
        assert_eq!(images[2].shift, [-1, 0, 0]);
        assert!((images[2].fractional.x + 0.9).abs() < 1e-12);
        assert!((images[5].fractional.z - 1.1).abs() < 1e-12);
    }
}
