use nalgebra::Point3;
use std::collections::HashMap;

type CellKey = (i64, i64, i64);

/// Uniform grid of cubic buckets over Cartesian space.
///
/// With a bucket edge no shorter than the longest possible bond, every bonded
/// partner of a point lies in the 3×3×3 block of buckets around it.
#[derive(Debug, Clone)]
pub struct UniformGrid {
    edge: f64,
    buckets: HashMap<CellKey, Vec<usize>>,
}

impl UniformGrid {
    /// Buckets the given points, keeping only those selected by `include`.
    ///
    /// Within a bucket, point indices stay in ascending order.
    pub fn build<F>(points: &[Point3<f64>], edge: f64, include: F) -> Self
    where
        F: Fn(usize) -> bool,
    {
        debug_assert!(edge > 0.0, "grid edge must be positive");
        let mut buckets: HashMap<CellKey, Vec<usize>> = HashMap::new();
        for (index, point) in points.iter().enumerate() {
            if include(index) {
                buckets.entry(key(point, edge)).or_default().push(index);
            }
        }
        Self { edge, buckets }
    }

    pub fn edge(&self) -> f64 {
        self.edge
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Calls `f` for every stored index in the 27 buckets surrounding `point`.
    ///
    /// No distance check is applied; candidates are visited bucket by bucket.
    pub fn for_each_candidate<F: FnMut(usize)>(&self, point: &Point3<f64>, mut f: F) {
        let (cx, cy, cz) = key(point, self.edge);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(indices) = self.buckets.get(&(cx + dx, cy + dy, cz + dz)) {
                        indices.iter().copied().for_each(&mut f);
                    }
                }
            }
        }
    }
}

fn key(point: &Point3<f64>, edge: f64) -> CellKey {
    (
        (point.x / edge).floor() as i64,
        (point.y / edge).floor() as i64,
        (point.z / edge).floor() as i64,
    )
}
