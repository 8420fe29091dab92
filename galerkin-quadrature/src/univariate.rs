//! Quadrature rules for the one-dimensional domain `[-1, 1]`.
//!
//! The points of every family are returned in ascending order. Weights are not given by
//! closed-form expressions but computed by matching the Legendre moments of the domain,
//! i.e. by solving the small dense system
//!
//! ```text
//!   sum_j P_i(x_j) w_j = integral of P_i over [-1, 1] = 2 delta_{i0},   i = 0, ..., n - 1.
//! ```
use crate::Rule;
use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;

/// Recurrence relation for Legendre polynomials.
///
/// Note: we use a formula for which derivatives are *not* defined at |x| == 1, so it is only
/// suitable for evaluation in the open interval (-1, 1). Values are fine everywhere.
#[derive(Debug, Default)]
struct LegendreRecurrence {
    n: usize,
    x: f64,
    // The current value, i.e. p_n(x)
    p1: f64,
    // The previous value in the recurrence, i.e. p_{n - 1}(x)
    p2: f64,
}

impl LegendreRecurrence {
    pub fn evaluate(n: usize, x: f64) -> Self {
        //  m P_m(x) = (2m - 1) * x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let mut p1 = 1.0;
        let mut p2 = 0.0;
        let mut p3;
        for m in 1..=n {
            let m = m as f64;
            p3 = p2;
            p2 = p1;
            p1 = ((2.0 * m - 1.0) * x * p2 - (m - 1.0) * p3) / m;
        }

        Self { n, x, p1, p2 }
    }

    fn value(&self) -> f64 {
        self.p1
    }

    fn previous_value(&self) -> f64 {
        self.p2
    }

    fn derivative(&self) -> f64 {
        let Self { n, x, p1, p2 } = &self;
        let n = *n as f64;
        // dp_n/dx (x) = n * (x * p_n(x) - p_{n - 1}(x)) / (x^2 - 1)
        n * (x * p1 - p2) / (x * x - 1.0)
    }

    fn value_and_derivative(&self) -> (f64, f64) {
        (self.value(), self.derivative())
    }
}

/// The three classical families of interpolatory rules on `[-1, 1]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Family {
    /// No end points.
    Gauss,
    /// Includes the left end point `-1`.
    Radau,
    /// Includes both end points.
    Lobatto,
}

impl Family {
    /// Returns the rule of this family with the given number of points.
    pub fn rule(&self, num_points: usize) -> Rule<1> {
        match self {
            Family::Gauss => gauss(num_points),
            Family::Radau => radau(num_points),
            Family::Lobatto => lobatto(num_points),
        }
    }

    /// The highest polynomial degree integrated exactly by the rule with `num_points` points.
    pub fn degree_of_exactness(&self, num_points: usize) -> usize {
        let n = num_points;
        match (self, n) {
            // The degenerate midpoint rule
            (_, 0) | (Family::Lobatto, 1) => 1,
            (Family::Gauss, n) => 2 * n - 1,
            (Family::Radau, n) => 2 * n - 2,
            (Family::Lobatto, n) => 2 * n - 3,
        }
    }
}

/// The degenerate one-point rule: the midpoint of `[-1, 1]` with weight equal to its length.
pub fn degenerate() -> Rule<1> {
    (vec![2.0], vec![[0.0]])
}

/// Gauss quadrature for the reference interval [-1, 1].
///
/// Returns the [Gauss quadrature rule] with the given number of points. Given `n` points,
/// the rule integrates polynomials of order up to `2 n - 1` exactly. Requesting zero points
/// gives the [degenerate] rule.
///
/// [Gauss quadrature rule]: https://en.wikipedia.org/wiki/Gaussian_quadrature
pub fn gauss(num_points: usize) -> Rule<1> {
    let n = num_points;
    if n == 0 {
        return degenerate();
    }

    // Loosely based on the procedure used in
    // Numerical Recipes, The art of Scientific Computing, Third Edition (2007)
    let m = (n + 1) / 2;
    let mut points = Vec::with_capacity(n);

    // Only find the first m roots (in descending order). The remaining roots follow by symmetry
    for i in 0..m {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let (mut p, mut dp) = LegendreRecurrence::evaluate(n, x).value_and_derivative();

        // Newton converges quadratically from the initial guess above. The iteration cap only
        // protects against oscillation in the last bit.
        for _ in 0..100 {
            let dx = -p / dp;
            x += dx;
            let (p_new, dp_new) = LegendreRecurrence::evaluate(n, x).value_and_derivative();
            p = p_new;
            dp = dp_new;
            if dx.abs() <= 1e-15 {
                break;
            }
        }
        points.push(x);
    }

    for i in m..n {
        let mirror_idx = n - i - 1;
        points.push(-points[mirror_idx]);
    }

    points.reverse();
    assert_eq!(points.len(), n, "Internal error: incorrect number of points produced");
    finish_rule(points)
}

/// Gauss-Radau quadrature for the reference interval [-1, 1].
///
/// The rule with `n` points includes the left end point `-1` and integrates polynomials of
/// degree up to `2 n - 2` exactly. The remaining points are the zeros of
/// `(P_{n-1}(x) + P_n(x)) / (1 + x)`. Requesting zero points gives the [degenerate] rule.
pub fn radau(num_points: usize) -> Rule<1> {
    let n = num_points;
    if n == 0 {
        return degenerate();
    }

    let mut points = vec![-1.0];
    points.extend(bracketed_roots(n, |x| {
        let recurrence = LegendreRecurrence::evaluate(n, x);
        recurrence.value() + recurrence.previous_value()
    }));
    assert_eq!(points.len(), n, "Internal error: incorrect number of Radau points produced");
    finish_rule(points)
}

/// Gauss-Lobatto quadrature for the reference interval [-1, 1].
///
/// The rule with `n >= 2` points includes both end points and integrates polynomials of
/// degree up to `2 n - 3` exactly. The interior points are the zeros of `P'_{n-1}`.
///
/// A single point cannot include both end points, so `n = 1` (like `n = 0`) gives the
/// [degenerate] rule.
pub fn lobatto(num_points: usize) -> Rule<1> {
    let n = num_points;
    if n <= 1 {
        return degenerate();
    }

    let mut points = vec![-1.0];
    points.extend(bracketed_roots(n, |x| LegendreRecurrence::evaluate(n - 1, x).derivative()));
    points.push(1.0);
    assert_eq!(points.len(), n, "Internal error: incorrect number of Lobatto points produced");
    finish_rule(points)
}

/// Finds the zeros of `g` in the open interval (-1, 1).
///
/// Sign changes are bracketed on a Chebyshev grid that is considerably finer than the expected
/// spacing of the zeros of a degree `n` polynomial, then each bracket is refined by bisection
/// until the bracket can no longer shrink.
fn bracketed_roots(n: usize, g: impl Fn(f64) -> f64) -> Vec<f64> {
    let grid_size = 40 * (n + 1);
    let grid: Vec<f64> = (1..grid_size)
        .map(|k| -(PI * k as f64 / grid_size as f64).cos())
        .collect();
    let values: Vec<f64> = grid.iter().map(|&x| g(x)).collect();

    let mut roots = Vec::new();
    for k in 0..grid.len() {
        if values[k] == 0.0 {
            roots.push(grid[k]);
        } else if k + 1 < grid.len() && values[k] * values[k + 1] < 0.0 {
            roots.push(bisect(&g, grid[k], grid[k + 1], values[k]));
        }
    }
    roots
}

fn bisect(g: impl Fn(f64) -> f64, mut a: f64, mut b: f64, mut g_a: f64) -> f64 {
    loop {
        let mid = 0.5 * (a + b);
        if mid <= a || mid >= b {
            return mid;
        }
        let g_mid = g(mid);
        if g_mid == 0.0 {
            return mid;
        } else if g_mid * g_a < 0.0 {
            b = mid;
        } else {
            a = mid;
            g_a = g_mid;
        }
    }
}

fn finish_rule(points: Vec<f64>) -> Rule<1> {
    let weights = legendre_moment_weights(&points);
    (weights, points.into_iter().map(|x| [x]).collect())
}

/// Computes the weights of the interpolatory rule on `[-1, 1]` with the given (distinct) points.
///
/// # Panics
///
/// Panics if the points are not distinct, in which case the moment system is singular.
pub fn legendre_moment_weights(points: &[f64]) -> Vec<f64> {
    let n = points.len();
    let matrix = DMatrix::from_fn(n, n, |i, j| LegendreRecurrence::evaluate(i, points[j]).value());
    let mut moments = DVector::zeros(n);
    if n > 0 {
        moments[0] = 2.0;
    }
    let weights = matrix
        .lu()
        .solve(&moments)
        .expect("Legendre moment system must be non-singular for distinct points");
    weights.iter().copied().collect()
}
