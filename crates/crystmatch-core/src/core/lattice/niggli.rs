use super::cell::{CellError, CellParameters, Centring};
use nalgebra::Vector3;
use tracing::trace;

const MAX_ITERATIONS: usize = 1000;
const RELATIVE_EPSILON: f64 = 1e-5;

/// Result of a Niggli reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReducedCell {
    /// Niggli-reduced primitive cell parameters.
    pub params: CellParameters,
    /// Volume of the reduced (primitive) cell.
    pub volume: f64,
}

/// Metric tensor in the G6 form `(A, B, C, ξ, η, ζ)` =
/// `(a·a, b·b, c·c, 2b·c, 2a·c, 2a·b)`.
#[derive(Debug, Clone, Copy)]
struct G6 {
    a: f64,
    b: f64,
    c: f64,
    xi: f64,
    eta: f64,
    zeta: f64,
    eps: f64,
}

impl G6 {
    fn from_vectors(a: &Vector3<f64>, b: &Vector3<f64>, c: &Vector3<f64>, eps: f64) -> Self {
        Self {
            a: a.dot(a),
            b: b.dot(b),
            c: c.dot(c),
            xi: 2.0 * b.dot(c),
            eta: 2.0 * a.dot(c),
            zeta: 2.0 * a.dot(b),
            eps,
        }
    }

    fn lt(&self, x: f64, y: f64) -> bool {
        x < y - self.eps
    }

    fn gt(&self, x: f64, y: f64) -> bool {
        self.lt(y, x)
    }

    fn eq(&self, x: f64, y: f64) -> bool {
        !(self.lt(x, y) || self.gt(x, y))
    }

    fn sign(&self, x: f64) -> i32 {
        if self.gt(x, 0.0) {
            1
        } else if self.lt(x, 0.0) {
            -1
        } else {
            0
        }
    }

    /// One pass of the Křivý–Gruber steps; returns `true` once reduced.
    fn step(&mut self) -> bool {
        // N1
        if self.gt(self.a, self.b)
            || (self.eq(self.a, self.b) && self.gt(self.xi.abs(), self.eta.abs()))
        {
            std::mem::swap(&mut self.a, &mut self.b);
            std::mem::swap(&mut self.xi, &mut self.eta);
        }
        // N2
        if self.gt(self.b, self.c)
            || (self.eq(self.b, self.c) && self.gt(self.eta.abs(), self.zeta.abs()))
        {
            std::mem::swap(&mut self.b, &mut self.c);
            std::mem::swap(&mut self.eta, &mut self.zeta);
            return false;
        }
        // N3 and N4: make the three off-diagonal terms all positive or all non-positive.
        let (l, m, n) = (self.sign(self.xi), self.sign(self.eta), self.sign(self.zeta));
        if l * m * n == 1 {
            self.xi = self.xi.abs();
            self.eta = self.eta.abs();
            self.zeta = self.zeta.abs();
        } else {
            let mut factors = [1, 1, 1];
            let mut free = None;
            for (slot, s) in [l, m, n].into_iter().enumerate() {
                match s {
                    1 => factors[slot] = -1,
                    0 => free = Some(slot),
                    _ => {}
                }
            }
            if factors.iter().product::<i32>() < 0 {
                if let Some(slot) = free {
                    factors[slot] = -1;
                }
            }
            self.xi *= factors[0] as f64;
            self.eta *= factors[1] as f64;
            self.zeta *= factors[2] as f64;
        }
        // N5
        if self.gt(self.xi.abs(), self.b)
            || (self.eq(self.xi, self.b) && self.lt(2.0 * self.eta, self.zeta))
            || (self.eq(self.xi, -self.b) && self.lt(self.zeta, 0.0))
        {
            let s = self.xi.signum();
            self.c = self.b + self.c - self.xi * s;
            self.eta -= self.zeta * s;
            self.xi -= 2.0 * self.b * s;
            return false;
        }
        // N6
        if self.gt(self.eta.abs(), self.a)
            || (self.eq(self.eta, self.a) && self.lt(2.0 * self.xi, self.zeta))
            || (self.eq(self.eta, -self.a) && self.lt(self.zeta, 0.0))
        {
            let s = self.eta.signum();
            self.c = self.a + self.c - self.eta * s;
            self.xi -= self.zeta * s;
            self.eta -= 2.0 * self.a * s;
            return false;
        }
        // N7
        if self.gt(self.zeta.abs(), self.a)
            || (self.eq(self.zeta, self.a) && self.lt(2.0 * self.xi, self.eta))
            || (self.eq(self.zeta, -self.a) && self.lt(self.eta, 0.0))
        {
            let s = self.zeta.signum();
            self.b = self.a + self.b - self.zeta * s;
            self.xi -= self.eta * s;
            self.zeta -= 2.0 * self.a * s;
            return false;
        }
        // N8
        let sum = self.xi + self.eta + self.zeta + self.a + self.b;
        if self.lt(sum, 0.0)
            || (self.eq(sum, 0.0) && self.gt(2.0 * (self.a + self.eta) + self.zeta, 0.0))
        {
            self.c += sum;
            self.xi = 2.0 * self.b + self.xi + self.zeta;
            self.eta = 2.0 * self.a + self.eta + self.zeta;
            return false;
        }
        true
    }

    fn params(&self) -> CellParameters {
        let (a, b, c) = (self.a.sqrt(), self.b.sqrt(), self.c.sqrt());
        let angle = |two_dot: f64, u: f64, v: f64| {
            (two_dot / (2.0 * u * v)).clamp(-1.0, 1.0).acos().to_degrees()
        };
        CellParameters::new(
            a,
            b,
            c,
            angle(self.xi, b, c),
            angle(self.eta, a, c),
            angle(self.zeta, a, b),
        )
    }
}

/// Niggli-reduces a cell, converting a centred cell to a primitive one first.
///
/// Uses the Křivý–Gruber algorithm with the epsilon comparisons of
/// Grosse-Kunstleve, Sauter and Adams (2004); the tolerance is relative to
/// the cell volume.
pub fn reduce_cell(params: &CellParameters, centring: Centring) -> Result<ReducedCell, CellError> {
    let matrix = params.cartesian_matrix()?;
    let transform = centring.primitive_transform();
    let conventional = [
        matrix.column(0).into_owned(),
        matrix.column(1).into_owned(),
        matrix.column(2).into_owned(),
    ];
    let primitive: Vec<Vector3<f64>> = (0..3)
        .map(|row| {
            (0..3)
                .map(|col| conventional[col] * transform[(row, col)])
                .fold(Vector3::zeros(), |acc, v| acc + v)
        })
        .collect();

    let primitive_volume = params.volume()? / centring.multiplicity() as f64;
    let eps = RELATIVE_EPSILON * primitive_volume.powf(2.0 / 3.0);
    let mut g6 = G6::from_vectors(&primitive[0], &primitive[1], &primitive[2], eps);

    let mut iterations = 0;
    while !g6.step() {
        iterations += 1;
        if iterations >= MAX_ITERATIONS {
            return Err(CellError::ReductionDiverged(iterations));
        }
    }
    trace!(iterations, %centring, "Niggli reduction converged");

    let reduced = g6.params();
    let volume = reduced.volume()?;
    Ok(ReducedCell {
        params: reduced,
        volume,
    })
}
