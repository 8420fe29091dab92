//! Quadrature rules for finite element reference domains.
//!
//! Univariate rules live on the reference interval `[-1, 1]` and come in the three classical
//! families (Gauss, Radau, Lobatto), which differ only in which end points they include.
//! Simplex rules live on the reference simplices
//!
//! - interval: `[0, 1]`,
//! - triangle: `(0, 0), (1, 0), (0, 1)`,
//! - tetrahedron: `(0, 0, 0), (1, 0, 0), (0, 1, 0), (0, 0, 1)`,
//!
//! and are constructed from Gauss rules through collapsed coordinates.
//!
//! A rule with zero points is never an error: every family returns the *degenerate* rule, a
//! single point at the midpoint (centroid) of the domain whose weight is the measure of the
//! domain.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod simplex;
pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a rule satisfying the given requirements is not available.
    NoRuleAvailable,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable => {
                write!(f, "There is no quadrature rule satisfying the requirements available")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A two-dimensional point.
pub type Point2 = Point<2>;

/// A three-dimensional point.
pub type Point3 = Point<3>;

/// A D-dimensional rule.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A one-dimensional quadrature rule.
pub type Rule1d = Rule<1>;

/// A two-dimensional quadrature rule.
pub type Rule2d = Rule<2>;

/// A three-dimensional rule.
pub type Rule3d = Rule<3>;

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    assert_eq!(weights.len(), points.len(), "weights and points must have the same length");
    weights
        .iter()
        .zip(points)
        .map(|(w, x)| w * f(x))
        .sum()
}

/// Sum of the weights of a rule, i.e. the measure of the domain it integrates over.
pub fn total_weight<const D: usize>(rule: &Rule<D>) -> f64 {
    rule.0.iter().sum()
}
