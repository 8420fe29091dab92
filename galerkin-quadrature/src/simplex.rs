//! Gauss rules on the reference simplices.
//!
//! The rules are tensor products of univariate Gauss rules pulled back to the simplex through
//! collapsed (Duffy) coordinates. They are not the most economical rules for a given degree,
//! but they exist for every degree, have strictly positive weights and strictly interior points.
//!
//! The collapsed directions carry the polynomial Jacobian factor of the map, so they use one
//! more point than the last direction. A rule built from `n` points is then exact for total
//! degree `2n - 1`, just like the univariate rule.
use crate::univariate::gauss;
use crate::{Error, Rule, Rule1d, Rule2d, Rule3d};

/// Measure of the reference simplex of the given dimension (`1 / dim!`).
pub fn reference_measure(dim: usize) -> f64 {
    (1..=dim).map(|k| 1.0 / k as f64).product()
}

/// Gauss rule with `n` points on the reference interval `[0, 1]`.
///
/// `n = 0` gives the degenerate midpoint rule with weight 1.
pub fn interval_gauss(n: usize) -> Rule1d {
    let (weights, points) = gauss(n);
    let weights = weights.into_iter().map(|w| 0.5 * w).collect();
    let points = points.into_iter().map(|[x]| [0.5 * (x + 1.0)]).collect();
    (weights, points)
}

/// Collapsed Gauss rule on the reference triangle, exact for total degree `2n - 1`.
///
/// Uses `n + 1` points in the collapsed direction and `n` in the other.
/// `n = 0` gives the degenerate rule: the centroid with weight 1/2.
pub fn triangle_gauss(n: usize) -> Rule2d {
    if n == 0 {
        return (vec![0.5], vec![[1.0 / 3.0, 1.0 / 3.0]]);
    }

    let (wu1d, xu1d) = interval_gauss(n + 1);
    let (wv1d, xv1d) = interval_gauss(n);
    let mut weights = Vec::with_capacity((n + 1) * n);
    let mut points = Vec::with_capacity((n + 1) * n);
    for (&wu, &[u]) in wu1d.iter().zip(&xu1d) {
        for (&wv, &[v]) in wv1d.iter().zip(&xv1d) {
            // (u, v) in [0, 1]^2 maps to (u, v (1 - u)) with Jacobian determinant (1 - u)
            weights.push(wu * wv * (1.0 - u));
            points.push([u, v * (1.0 - u)]);
        }
    }
    (weights, points)
}

/// Collapsed Gauss rule on the reference tetrahedron, exact for total degree `2n - 1`.
///
/// Uses `n + 1` points in the two collapsed directions and `n` in the last one.
/// `n = 0` gives the degenerate rule: the centroid with weight 1/6.
pub fn tetrahedron_gauss(n: usize) -> Rule3d {
    if n == 0 {
        return (vec![1.0 / 6.0], vec![[0.25, 0.25, 0.25]]);
    }

    let (wc1d, xc1d) = interval_gauss(n + 1);
    let (ww1d, xw1d) = interval_gauss(n);
    let mut weights = Vec::with_capacity((n + 1) * (n + 1) * n);
    let mut points = Vec::with_capacity((n + 1) * (n + 1) * n);
    for (&wu, &[u]) in wc1d.iter().zip(&xc1d) {
        for (&wv, &[v]) in wc1d.iter().zip(&xc1d) {
            for (&ww, &[w]) in ww1d.iter().zip(&xw1d) {
                let y = v * (1.0 - u);
                let z = w * (1.0 - u) * (1.0 - v);
                weights.push(wu * wv * ww * (1.0 - u).powi(2) * (1.0 - v));
                points.push([u, y, z]);
            }
        }
    }
    (weights, points)
}

/// The parameter `n` of [`simplex_gauss`] needed to integrate polynomials of total degree
/// `degree` exactly on the reference simplex of dimension `dim`.
pub fn points_for_degree(_dim: usize, degree: usize) -> usize {
    degree / 2 + 1
}

/// A quadrature rule on a reference simplex of dimension known only at runtime.
///
/// Points are stored contiguously, `dim` coordinates per point.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexRule {
    dim: usize,
    weights: Vec<f64>,
    points: Vec<f64>,
}

impl SimplexRule {
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn num_points(&self) -> usize {
        self.weights.len()
    }

    pub fn point(&self, i: usize) -> &[f64] {
        &self.points[self.dim * i..self.dim * (i + 1)]
    }

    pub fn points(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.num_points()).map(move |i| self.point(i))
    }

    fn from_rule<const D: usize>((weights, points): Rule<D>) -> Self {
        Self {
            dim: D,
            weights,
            points: points.into_iter().flatten().collect(),
        }
    }
}

/// Collapsed Gauss rule of parameter `n` on the reference simplex of dimension `dim`, exact for
/// total degree `2n - 1`.
///
/// Dimension 0 is the trivial point rule with unit weight.
pub fn simplex_gauss(dim: usize, n: usize) -> Result<SimplexRule, Error> {
    match dim {
        0 => Ok(SimplexRule {
            dim: 0,
            weights: vec![1.0],
            points: Vec::new(),
        }),
        1 => Ok(SimplexRule::from_rule(interval_gauss(n))),
        2 => Ok(SimplexRule::from_rule(triangle_gauss(n))),
        3 => Ok(SimplexRule::from_rule(tetrahedron_gauss(n))),
        _ => Err(Error::NoRuleAvailable),
    }
}

/// Gauss rule on the reference simplex of dimension `dim` that integrates polynomials of total
/// degree up to `degree` exactly.
pub fn simplex_rule_for_degree(dim: usize, degree: usize) -> Result<SimplexRule, Error> {
    simplex_gauss(dim, points_for_degree(dim, degree))
}
