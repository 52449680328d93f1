use crate::core::symmetry::Fraction;
use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Angles closer than this (in radians) to 0° or 180° are degenerate.
pub const ANGLE_EPSILON: f64 = 1e-6;

/// Smallest accepted value of the normalized volume factor under the square root.
const VOLUME_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CellError {
    #[error("Cell length {name} = {value} must be positive")]
    NonPositiveLength { name: &'static str, value: f64 },
    #[error("Cell angle {name} = {value}° must lie strictly between 0° and 180°")]
    DegenerateAngle { name: &'static str, value: f64 },
    #[error("Cell axes are coplanar (volume {0})")]
    ZeroVolume(f64),
    #[error("Niggli reduction did not converge after {0} iterations")]
    ReductionDiverged(usize),
    #[error("Unknown lattice centring '{0}'")]
    UnknownCentring(String),
}

/// Lattice centring type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Centring {
    #[default]
    P,
    I,
    A,
    B,
    C,
    F,
    /// Rhombohedral centring of a hexagonal cell, obverse setting.
    R,
}

impl Centring {
    /// Centring translations, including the zero vector first.
    pub fn translations(&self) -> Vec<[Fraction; 3]> {
        let f = |n: i64, d: i64| Fraction::new(n, d).unwrap_or(Fraction::ZERO);
        let zero = Fraction::ZERO;
        let half = f(1, 2);
        let mut list = vec![[zero; 3]];
        match self {
            Centring::P => {}
            Centring::I => list.push([half, half, half]),
            Centring::A => list.push([zero, half, half]),
            Centring::B => list.push([half, zero, half]),
            Centring::C => list.push([half, half, zero]),
            Centring::F => list.extend([
                [zero, half, half],
                [half, zero, half],
                [half, half, zero],
            ]),
            Centring::R => list.extend([[f(2, 3), f(1, 3), f(1, 3)], [f(1, 3), f(2, 3), f(2, 3)]]),
        }
        list
    }

    /// Rows express the primitive basis vectors in the conventional basis.
    pub fn primitive_transform(&self) -> Matrix3<f64> {
        let third = 1.0 / 3.0;
        match self {
            Centring::P => Matrix3::identity(),
            Centring::I => Matrix3::new(-0.5, 0.5, 0.5, 0.5, -0.5, 0.5, 0.5, 0.5, -0.5),
            Centring::F => Matrix3::new(0.0, 0.5, 0.5, 0.5, 0.0, 0.5, 0.5, 0.5, 0.0),
            Centring::A => Matrix3::new(1.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0, 1.0),
            Centring::B => Matrix3::new(0.5, 0.0, 0.5, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0),
            Centring::C => Matrix3::new(0.5, 0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0),
            Centring::R => Matrix3::new(
                2.0 * third,
                third,
                third,
                -third,
                third,
                third,
                -third,
                -2.0 * third,
                third,
            ),
        }
    }

    /// Number of lattice points per conventional cell.
    pub fn multiplicity(&self) -> usize {
        self.translations().len()
    }
}

impl FromStr for Centring {
    type Err = CellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P" => Ok(Centring::P),
            "I" => Ok(Centring::I),
            "A" => Ok(Centring::A),
            "B" => Ok(Centring::B),
            "C" => Ok(Centring::C),
            "F" => Ok(Centring::F),
            "R" => Ok(Centring::R),
            _ => Err(CellError::UnknownCentring(s.to_string())),
        }
    }
}

impl fmt::Display for Centring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Cell lengths (Å) and angles (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl CellParameters {
    pub fn new(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
        }
    }

    pub fn cubic(a: f64) -> Self {
        Self::new(a, a, a, 90.0, 90.0, 90.0)
    }

    /// Parameters of the cell spanned by three Cartesian vectors.
    pub fn from_vectors(a: &Vector3<f64>, b: &Vector3<f64>, c: &Vector3<f64>) -> Self {
        let angle = |u: &Vector3<f64>, v: &Vector3<f64>| {
            (u.dot(v) / (u.norm() * v.norm()))
                .clamp(-1.0, 1.0)
                .acos()
                .to_degrees()
        };
        Self::new(a.norm(), b.norm(), c.norm(), angle(b, c), angle(a, c), angle(a, b))
    }

    pub fn validate(&self) -> Result<(), CellError> {
        for (name, value) in [("a", self.a), ("b", self.b), ("c", self.c)] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(CellError::NonPositiveLength { name, value });
            }
        }
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta), ("gamma", self.gamma)] {
            let radians = value.to_radians();
            if !radians.is_finite()
                || radians < ANGLE_EPSILON
                || radians > std::f64::consts::PI - ANGLE_EPSILON
            {
                return Err(CellError::DegenerateAngle { name, value });
            }
        }
        Ok(())
    }

    /// Cell volume in Å³.
    pub fn volume(&self) -> Result<f64, CellError> {
        self.validate()?;
        let (ca, cb, cg) = self.cosines();
        let radicand = 1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg;
        let volume = self.a * self.b * self.c * radicand.max(0.0).sqrt();
        if radicand <= VOLUME_EPSILON || volume <= 0.0 {
            return Err(CellError::ZeroVolume(volume));
        }
        Ok(volume)
    }

    /// The fractional→Cartesian matrix with a along x and b in the xy-plane.
    pub fn cartesian_matrix(&self) -> Result<Matrix3<f64>, CellError> {
        let volume = self.volume()?;
        let (ca, cb, cg) = self.cosines();
        let sg = self.gamma.to_radians().sin();
        Ok(Matrix3::new(
            self.a,
            self.b * cg,
            self.c * cb,
            0.0,
            self.b * sg,
            self.c * (ca - cb * cg) / sg,
            0.0,
            0.0,
            volume / (self.a * self.b * sg),
        ))
    }

    fn cosines(&self) -> (f64, f64, f64) {
        (
            self.alpha.to_radians().cos(),
            self.beta.to_radians().cos(),
            self.gamma.to_radians().cos(),
        )
    }

    /// Returns `true` if all six parameters agree within the given tolerances.
    pub fn approx_eq(&self, other: &Self, length_tol: f64, angle_tol: f64) -> bool {
        (self.a - other.a).abs() <= length_tol
            && (self.b - other.b).abs() <= length_tol
            && (self.c - other.c).abs() <= length_tol
            && (self.alpha - other.alpha).abs() <= angle_tol
            && (self.beta - other.beta).abs() <= angle_tol
            && (self.gamma - other.gamma).abs() <= angle_tol
    }
}

impl fmt::Display for CellParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "a={:.4} b={:.4} c={:.4} alpha={:.3} beta={:.3} gamma={:.3}",
            self.a, self.b, self.c, self.alpha, self.beta, self.gamma
        )
    }
}

/// A validated unit cell with its conversion matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitCell {
    params: CellParameters,
    centring: Centring,
    matrix: Matrix3<f64>,
    inverse: Matrix3<f64>,
    volume: f64,
}

impl UnitCell {
    pub fn new(params: CellParameters, centring: Centring) -> Result<Self, CellError> {
        let matrix = params.cartesian_matrix()?;
        let volume = params.volume()?;
        let inverse = matrix
            .try_inverse()
            .ok_or(CellError::ZeroVolume(volume))?;
        Ok(Self {
            params,
            centring,
            matrix,
            inverse,
            volume,
        })
    }

    pub fn primitive(params: CellParameters) -> Result<Self, CellError> {
        Self::new(params, Centring::P)
    }

    pub fn params(&self) -> &CellParameters {
        &self.params
    }

    pub fn centring(&self) -> Centring {
        self.centring
    }

    /// Cartesian = M · fractional.
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn to_cartesian(&self, fractional: &Point3<f64>) -> Point3<f64> {
        self.matrix * fractional
    }

    pub fn to_fractional(&self, cartesian: &Point3<f64>) -> Point3<f64> {
        self.inverse * cartesian
    }

    /// Cartesian displacement of an integer lattice translation.
    pub fn lattice_vector(&self, shift: [i32; 3]) -> Vector3<f64> {
        self.matrix * Vector3::new(shift[0] as f64, shift[1] as f64, shift[2] as f64)
    }

    /// Lattice basis vectors a, b, c in Cartesian coordinates.
    pub fn basis(&self) -> [Vector3<f64>; 3] {
        [
            self.matrix.column(0).into_owned(),
            self.matrix.column(1).into_owned(),
            self.matrix.column(2).into_owned(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_cell_matrix_is_diagonal() {
        let cell = UnitCell::primitive(CellParameters::cubic(10.0)).unwrap();
        assert!((cell.matrix() - Matrix3::from_diagonal_element(10.0)).norm() < 1e-9);
        assert!((cell.volume() - 1000.0).abs() < 1e-9);
        let cart = cell.to_cartesian(&Point3::new(0.2, 0.3, 0.4));
        assert!((cart - Point3::new(2.0, 3.0, 4.0)).norm() < 1e-9);
    }

    #[test]
    fn fractional_round_trip_in_triclinic_cell() {
        let params = CellParameters::new(5.1, 6.3, 7.2, 81.0, 95.5, 103.2);
        let cell = UnitCell::primitive(params).unwrap();
        let frac = Point3::new(0.13, -0.42, 0.77);
        let back = cell.to_fractional(&cell.to_cartesian(&frac));
        assert!((back - frac).norm() < 1e-12);
        assert!(cell.matrix().determinant() > 0.0);
        assert!((cell.matrix().determinant() - cell.volume()).abs() < 1e-9);
        let basis = cell.basis();
        let recovered = CellParameters::from_vectors(&basis[0], &basis[1], &basis[2]);
        assert!(recovered.approx_eq(&params, 1e-9, 1e-9));
    }

    #[test]
    fn degenerate_cells_are_rejected() {
        let flat = CellParameters::new(5.0, 5.0, 5.0, 90.0, 90.0, 180.0);
        assert!(matches!(
            UnitCell::primitive(flat),
            Err(CellError::DegenerateAngle { name: "gamma", .. })
        ));
        let zero = CellParameters::new(0.0, 5.0, 5.0, 90.0, 90.0, 90.0);
        assert!(matches!(
            zero.volume(),
            Err(CellError::NonPositiveLength { name: "a", .. })
        ));
        let coplanar = CellParameters::new(5.0, 5.0, 5.0, 120.0, 120.0, 120.0);
        assert!(matches!(coplanar.volume(), Err(CellError::ZeroVolume(_))));
    }

    #[test]
    fn centring_translations_and_parsing() {
        assert_eq!(Centring::P.multiplicity(), 1);
        assert_eq!(Centring::I.multiplicity(), 2);
        assert_eq!(Centring::F.multiplicity(), 4);
        assert_eq!(Centring::R.multiplicity(), 3);
        assert_eq!("c".parse::<Centring>().unwrap(), Centring::C);
        assert!("Q".parse::<Centring>().is_err());
    }

    #[test]
    fn primitive_transforms_preserve_lattice_point_density() {
        let centred = [
            Centring::I,
            Centring::A,
            Centring::B,
            Centring::C,
            Centring::F,
            Centring::R,
        ];
        for centring in centred {
            let det = centring.primitive_transform().determinant().abs();
            assert!((det * centring.multiplicity() as f64 - 1.0).abs() < 1e-12, "{centring}");
        }
    }
}
