use nalgebra::{DMatrix, Point3, Unit, Vector3};

/// Vectors shorter than this have no usable direction.
pub const DIRECTION_EPSILON: f64 = 1e-9;

pub fn distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    nalgebra::distance(a, b)
}

/// Angle at `vertex` between the rays to `a` and `c`, in degrees within [0, 180].
///
/// Returns `None` if either ray is shorter than [`DIRECTION_EPSILON`].
pub fn angle_degrees(a: &Point3<f64>, vertex: &Point3<f64>, c: &Point3<f64>) -> Option<f64> {
    let u = a - vertex;
    let v = c - vertex;
    let (nu, nv) = (u.norm(), v.norm());
    if nu < DIRECTION_EPSILON || nv < DIRECTION_EPSILON {
        return None;
    }
    let cos = (u.dot(&v) / (nu * nv)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

/// A least-squares plane through a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub origin: Point3<f64>,
    pub normal: Unit<Vector3<f64>>,
}

impl Plane {
    /// Fits a plane through at least three points.
    ///
    /// The normal is the right singular vector of the centred coordinate matrix
    /// with the smallest singular value.
    pub fn fit(points: &[Point3<f64>]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let origin = centroid(points)?;
        let centred = DMatrix::from_fn(points.len(), 3, |row, col| points[row][col] - origin[col]);
        let svd = centred.svd(false, true);
        let v_t = svd.v_t?;
        let smallest = svd
            .singular_values
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(index, _)| index)?;
        let row = v_t.row(smallest);
        let normal = Unit::try_new(Vector3::new(row[0], row[1], row[2]), DIRECTION_EPSILON)?;
        Some(Self { origin, normal })
    }

    /// Unsigned perpendicular distance of `point` from the plane.
    pub fn distance_to(&self, point: &Point3<f64>) -> f64 {
        (point - self.origin).dot(&self.normal).abs()
    }
}

/// Angle between two planes in degrees within [0, 90].
pub fn plane_angle_degrees(first: &Plane, second: &Plane) -> f64 {
    let cos = first.normal.dot(&second.normal).abs().min(1.0);
    cos.acos().to_degrees()
}

/// Largest distance of any point from the best-fit plane through all of them.
pub fn max_plane_deviation(points: &[Point3<f64>]) -> Option<f64> {
    let plane = Plane::fit(points)?;
    Some(
        points
            .iter()
            .map(|p| plane.distance_to(p))
            .fold(0.0, f64::max),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    #[test]
    fn angle_is_symmetric_and_in_degrees() {
        let (a, b, c) = (p(1.0, 0.0, 0.0), p(0.0, 0.0, 0.0), p(0.0, 2.0, 0.0));
        let abc = angle_degrees(&a, &b, &c).unwrap();
        let cba = angle_degrees(&c, &b, &a).unwrap();
        assert!((abc - 90.0).abs() < 1e-12);
        assert_eq!(abc, cba);
        let straight = angle_degrees(&p(-1.0, 0.0, 0.0), &b, &a).unwrap();
        assert!((straight - 180.0).abs() < 1e-9);
    }

    #[test]
    fn angle_with_coincident_points_is_undefined() {
        let origin = p(0.0, 0.0, 0.0);
        assert!(angle_degrees(&origin, &origin, &p(1.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn centroid_averages_points() {
        let c = centroid(&[p(0.0, 0.0, 0.0), p(2.0, 4.0, -2.0)]).unwrap();
        assert_eq!(c, p(1.0, 2.0, -1.0));
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn plane_fit_recovers_axis_normal() {
        let points = [
            p(0.0, 0.0, 1.0),
            p(1.0, 0.0, 1.0),
            p(0.0, 1.0, 1.0),
            p(1.0, 1.0, 1.0),
        ];
        let plane = Plane::fit(&points).unwrap();
        assert!((plane.normal.z.abs() - 1.0).abs() < 1e-9);
        assert!(max_plane_deviation(&points).unwrap() < 1e-9);
        assert!(Plane::fit(&points[..2]).is_none());
    }

    #[test]
    fn max_deviation_reports_out_of_plane_point() {
        let points = [
            p(0.0, 0.0, 0.0),
            p(2.0, 0.0, 0.0),
            p(0.0, 2.0, 0.0),
            p(2.0, 2.0, 0.0),
            p(1.0, 1.0, 0.5),
        ];
        let deviation = max_plane_deviation(&points).unwrap();
        assert!(deviation > 0.3 && deviation < 0.5);
    }

    #[test]
    fn plane_angle_is_symmetric_and_folded() {
        let xy = Plane::fit(&[p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)]).unwrap();
        let xz = Plane::fit(&[p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 0.0, 1.0)]).unwrap();
        let tilted = Plane::fit(&[p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 1.0)]).unwrap();
        assert!((plane_angle_degrees(&xy, &xz) - 90.0).abs() < 1e-9);
        assert!((plane_angle_degrees(&xy, &tilted) - 45.0).abs() < 1e-9);
        assert_eq!(
            plane_angle_degrees(&xy, &tilted),
            plane_angle_degrees(&tilted, &xy)
        );
        assert!(plane_angle_degrees(&xy, &xy).abs() < 1e-4);
    }
}
