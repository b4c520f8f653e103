//! Natural cubic smoothing spline after Reinsch (Numerische Mathematik 10, 1967).
//!
//! Among all twice differentiable functions g, the spline minimises the roughness
//! `∫ g''(t)² dt` subject to `Σ (y_i - g(x_i))² <= s`. With `s = 0` the spline interpolates the
//! data; as `s` grows it relaxes toward the least-squares straight line. Knots sit on every
//! sample, and the second derivative is zero at both ends.
use ndarray::Array1;

use super::constants::{MAX_SMOOTHING_ITERATIONS, MIN_SPLINE_POINTS};
use super::error::SplineError;

/// Symmetric pentadiagonal matrix stored by its three distinct diagonals
#[derive(Debug, Clone)]
struct Pentadiagonal {
    diag: Vec<f64>,
    off1: Vec<f64>,
    off2: Vec<f64>,
}

/// L D L^T factors of a Pentadiagonal. L is unit lower triangular with two sub-diagonals.
#[derive(Debug, Clone)]
struct BandFactors {
    d: Vec<f64>,
    l1: Vec<f64>,
    l2: Vec<f64>,
}

impl Pentadiagonal {
    /// `lhs + scale * rhs`, diagonal by diagonal
    fn scaled_sum(lhs: &Self, rhs: &Self, scale: f64) -> Self {
        let combine = |a: &[f64], b: &[f64]| -> Vec<f64> {
            a.iter().zip(b.iter()).map(|(x, y)| x + scale * y).collect()
        };
        Self {
            diag: combine(&lhs.diag, &rhs.diag),
            off1: combine(&lhs.off1, &rhs.off1),
            off2: combine(&lhs.off2, &rhs.off2),
        }
    }

    fn factor(&self) -> BandFactors {
        let m = self.diag.len();
        let mut d = vec![0.0; m];
        let mut l1 = vec![0.0; m];
        let mut l2 = vec![0.0; m];
        for k in 0..m {
            let mut pivot = self.diag[k];
            if k >= 2 {
                l2[k] = self.off2[k - 2] / d[k - 2];
                pivot -= l2[k] * l2[k] * d[k - 2];
            }
            if k >= 1 {
                let mut coupling = self.off1[k - 1];
                if k >= 2 {
                    coupling -= l2[k] * d[k - 2] * l1[k - 1];
                }
                l1[k] = coupling / d[k - 1];
                pivot -= l1[k] * l1[k] * d[k - 1];
            }
            d[k] = pivot;
        }
        BandFactors { d, l1, l2 }
    }
}

impl BandFactors {
    fn solve(&self, rhs: &[f64]) -> Vec<f64> {
        let m = rhs.len();
        let mut z = vec![0.0; m];
        for k in 0..m {
            let mut value = rhs[k];
            if k >= 1 {
                value -= self.l1[k] * z[k - 1];
            }
            if k >= 2 {
                value -= self.l2[k] * z[k - 2];
            }
            z[k] = value;
        }
        for k in 0..m {
            z[k] /= self.d[k];
        }
        for k in (0..m).rev() {
            let mut value = z[k];
            if k + 1 < m {
                value -= self.l1[k + 1] * z[k + 1];
            }
            if k + 2 < m {
                value -= self.l2[k + 2] * z[k + 2];
            }
            z[k] = value;
        }
        z
    }
}

/// A fitted smoothing spline. Piece `i` on `[x_i, x_{i+1})` is
/// `a_i + b_i t + c_i t² + d_i t³` with `t = x - x_i`.
#[derive(Debug, Clone)]
pub struct SmoothingSpline {
    knots: Vec<f64>,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
    multiplier: f64,
    residual: f64,
}

impl SmoothingSpline {
    /// Fit the spline to (x, y) with smoothing factor `smoothing`
    pub fn fit(x: &[f64], y: &[f64], smoothing: f64) -> Result<Self, SplineError> {
        if x.len() != y.len() {
            return Err(SplineError::LengthMismatch(x.len(), y.len()));
        }
        if x.len() < MIN_SPLINE_POINTS {
            return Err(SplineError::TooFewPoints(x.len()));
        }
        if !smoothing.is_finite() || smoothing < 0.0 {
            return Err(SplineError::BadSmoothing(smoothing));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(SplineError::NonFiniteData);
        }
        for idx in 1..x.len() {
            if x[idx] <= x[idx - 1] {
                return Err(SplineError::NotIncreasing(idx));
            }
        }

        let n = x.len() - 1; // number of pieces
        let m = n - 1; // number of interior knots
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

        // Second divided differences of the data, one per interior knot
        let q: Vec<f64> = (0..m)
            .map(|k| (y[k + 2] - y[k + 1]) / h[k + 1] - (y[k + 1] - y[k]) / h[k])
            .collect();

        // Continuity of the first derivative across interior knots
        let continuity = Pentadiagonal {
            diag: (0..m).map(|k| 2.0 * (h[k] + h[k + 1]) / 3.0).collect(),
            off1: (0..m.saturating_sub(1)).map(|k| h[k + 1] / 3.0).collect(),
            off2: vec![0.0; m.saturating_sub(2)],
        };
        // Q^T Q, the normal matrix of the second difference operator
        let roughness = Pentadiagonal {
            diag: (0..m)
                .map(|k| {
                    let r0 = 1.0 / h[k];
                    let r1 = 1.0 / h[k] + 1.0 / h[k + 1];
                    let r2 = 1.0 / h[k + 1];
                    r0 * r0 + r1 * r1 + r2 * r2
                })
                .collect(),
            off1: (0..m.saturating_sub(1))
                .map(|k| {
                    -(1.0 / h[k] + 1.0 / h[k + 1]) / h[k + 1]
                        - (1.0 / h[k + 1] + 1.0 / h[k + 2]) / h[k + 1]
                })
                .collect(),
            off2: (0..m.saturating_sub(2))
                .map(|k| 1.0 / (h[k + 1] * h[k + 2]))
                .collect(),
        };

        let mut p = 0.0;
        let mut previous = -smoothing;
        let mut interior: Vec<f64>;
        let mut jumps: Vec<f64>;
        let mut iteration = 0;
        loop {
            let system = Pentadiagonal::scaled_sum(&continuity, &roughness, p);
            let factors = system.factor();
            interior = factors.solve(&q);
            jumps = slope_jumps(&interior, &h);
            let energy: f64 = jumps.iter().map(|v| v * v).sum();
            let residual = p * p * energy;

            iteration += 1;
            if residual >= smoothing
                || residual <= previous
                || iteration >= MAX_SMOOTHING_ITERATIONS
            {
                break;
            }
            previous = residual;

            // Newton step on sqrt(residual(p)) = sqrt(smoothing)
            let g: Vec<f64> = (0..m)
                .map(|k| {
                    jumps[k] / h[k] - jumps[k + 1] * (1.0 / h[k] + 1.0 / h[k + 1])
                        + jumps[k + 2] / h[k + 1]
                })
                .collect();
            let z = factors.solve(&g);
            let curvature: f64 = g.iter().zip(z.iter()).map(|(a, b)| a * b).sum();
            let slope = energy - p * curvature;
            if slope <= 0.0 {
                break;
            }
            p += (smoothing - residual) / (((smoothing / energy).sqrt() + p) * slope);
        }

        let a: Vec<f64> = y
            .iter()
            .zip(jumps.iter())
            .map(|(yv, v)| yv - p * v)
            .collect();
        let mut c = vec![0.0; n + 1];
        c[1..n].copy_from_slice(&interior);
        let mut b = vec![0.0; n];
        let mut d = vec![0.0; n];
        for i in 0..n {
            d[i] = (c[i + 1] - c[i]) / (3.0 * h[i]);
            b[i] = (a[i + 1] - a[i]) / h[i] - (h[i] * d[i] + c[i]) * h[i];
        }
        let residual = y
            .iter()
            .zip(a.iter())
            .map(|(yv, av)| (yv - av) * (yv - av))
            .sum();

        spdlog::debug!(
            "Fit smoothing spline over {} knots: multiplier {p:.6e}, residual {residual:.6e} (target {smoothing})",
            n + 1
        );

        Ok(Self {
            knots: x.to_vec(),
            a,
            b,
            c,
            d,
            multiplier: p,
            residual,
        })
    }

    /// Evaluate the spline (order 0) or one of its derivatives at `x`
    pub fn evaluate(&self, x: f64, order: usize) -> f64 {
        let i = self.piece_index(x);
        let t = x - self.knots[i];
        let (a, b, c, d) = (self.a[i], self.b[i], self.c[i], self.d[i]);
        match order {
            0 => a + t * (b + t * (c + t * d)),
            1 => b + t * (2.0 * c + 3.0 * d * t),
            2 => 2.0 * c + 6.0 * d * t,
            3 => 6.0 * d,
            _ => 0.0,
        }
    }

    /// Evaluate over a grid
    pub fn evaluate_grid(&self, grid: &Array1<f64>, order: usize) -> Array1<f64> {
        grid.mapv(|x| self.evaluate(x, order))
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Smoothed values at the knots
    pub fn values(&self) -> &[f64] {
        &self.a
    }

    /// The Lagrange multiplier balancing roughness against fidelity; 0 for interpolation
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Sum of squared residuals at the knots
    pub fn residual(&self) -> f64 {
        self.residual
    }

    /// Piece containing x; points outside the knot span use the end pieces
    fn piece_index(&self, x: f64) -> usize {
        let last_piece = self.knots.len() - 2;
        let upper = self.knots.partition_point(|k| *k <= x);
        upper.saturating_sub(1).min(last_piece)
    }
}

/// Jumps in the slope of the second-derivative profile at each knot, i.e. Q c with the natural
/// end conditions c_0 = c_n = 0.
fn slope_jumps(interior: &[f64], h: &[f64]) -> Vec<f64> {
    let n = h.len();
    let c = |i: usize| -> f64 {
        if i == 0 || i == n {
            0.0
        } else {
            interior[i - 1]
        }
    };
    let mut jumps = vec![0.0; n + 1];
    let mut previous = 0.0;
    for j in 0..n {
        let slope = (c(j + 1) - c(j)) / h[j];
        jumps[j] = slope - previous;
        previous = slope;
    }
    jumps[n] = -previous;
    jumps
}
