use galerkin_quadrature::simplex::{
    reference_measure, simplex_gauss, simplex_rule_for_degree, tetrahedron_gauss, triangle_gauss,
};
use galerkin_quadrature::{integrate, total_weight, Error};

use matrixcompare::assert_scalar_eq;
use proptest::prelude::*;

fn factorial(n: u32) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

// Integral of x^a y^b over the reference triangle
fn triangle_monomial_integral(a: u32, b: u32) -> f64 {
    factorial(a) * factorial(b) / factorial(a + b + 2)
}

// Integral of x^a y^b z^c over the reference tetrahedron
fn tetrahedron_monomial_integral(a: u32, b: u32, c: u32) -> f64 {
    factorial(a) * factorial(b) * factorial(c) / factorial(a + b + c + 3)
}

#[test]
fn reference_measures() {
    assert_eq!(reference_measure(0), 1.0);
    assert_eq!(reference_measure(1), 1.0);
    assert_eq!(reference_measure(2), 0.5);
    assert_scalar_eq!(reference_measure(3), 1.0 / 6.0, comp = abs, tol = 1e-16);
}

#[test]
fn triangle_rules_for_degree_are_exact() {
    for degree in 0..=8u32 {
        let rule = simplex_rule_for_degree(2, degree as usize).unwrap();
        for a in 0..=degree {
            for b in 0..=(degree - a) {
                let estimated: f64 = rule
                    .weights()
                    .iter()
                    .zip(rule.points())
                    .map(|(w, p)| w * p[0].powi(a as i32) * p[1].powi(b as i32))
                    .sum();
                assert_scalar_eq!(estimated, triangle_monomial_integral(a, b), comp = abs, tol = 1e-14);
            }
        }
    }
}

#[test]
fn tetrahedron_rules_for_degree_are_exact() {
    for degree in 0..=6u32 {
        let rule = simplex_rule_for_degree(3, degree as usize).unwrap();
        for a in 0..=degree {
            for b in 0..=(degree - a) {
                for c in 0..=(degree - a - b) {
                    let estimated: f64 = rule
                        .weights()
                        .iter()
                        .zip(rule.points())
                        .map(|(w, p)| w * p[0].powi(a as i32) * p[1].powi(b as i32) * p[2].powi(c as i32))
                        .sum();
                    let expected = tetrahedron_monomial_integral(a, b, c);
                    assert_scalar_eq!(estimated, expected, comp = abs, tol = 1e-14);
                }
            }
        }
    }
}

#[test]
fn single_point_rules_carry_the_reference_measure() {
    let (weights, _) = tetrahedron_gauss(1);
    assert_scalar_eq!(weights.iter().sum::<f64>(), 1.0 / 6.0, comp = abs, tol = 1e-15);
    let (weights, _) = triangle_gauss(1);
    assert_scalar_eq!(weights.iter().sum::<f64>(), 0.5, comp = abs, tol = 1e-15);
}

#[test]
fn tetrahedron_rules_are_exact_for_degree_two_n_minus_one() {
    for n in 1..=4u32 {
        let rule = simplex_gauss(3, n as usize).unwrap();
        let degree = 2 * n - 1;
        for a in 0..=degree {
            for b in 0..=(degree - a) {
                for c in 0..=(degree - a - b) {
                    let estimated: f64 = rule
                        .weights()
                        .iter()
                        .zip(rule.points())
                        .map(|(w, p)| w * p[0].powi(a as i32) * p[1].powi(b as i32) * p[2].powi(c as i32))
                        .sum();
                    let expected = tetrahedron_monomial_integral(a, b, c);
                    assert_scalar_eq!(estimated, expected, comp = abs, tol = 1e-14);
                }
            }
        }
    }
}

#[test]
fn simplex_points_are_interior() {
    let (_, points) = triangle_gauss(5);
    assert!(points.iter().all(|&[x, y]| x > 0.0 && y > 0.0 && x + y < 1.0));
    let (_, points) = tetrahedron_gauss(4);
    assert!(points
        .iter()
        .all(|&[x, y, z]| x > 0.0 && y > 0.0 && z > 0.0 && x + y + z < 1.0));
}

#[test]
fn zero_point_simplex_rules_are_degenerate() {
    let rule = triangle_gauss(0);
    assert_eq!(rule.0, vec![0.5]);
    assert_scalar_eq!(integrate(&rule, |p| p[0] + p[1]), 1.0 / 3.0, comp = abs, tol = 1e-15);

    let rule = simplex_gauss(1, 0).unwrap();
    assert_eq!(rule.weights(), &[1.0]);
    assert_eq!(rule.point(0), &[0.5]);
}

#[test]
fn unsupported_dimension_has_no_rule() {
    assert_eq!(simplex_gauss(4, 2), Err(Error::NoRuleAvailable));
}

proptest! {
    #[test]
    fn simplex_weights_sum_to_reference_measure(dim in 0..=3usize, n in 0..=8usize) {
        let rule = simplex_gauss(dim, n).unwrap();
        let sum: f64 = rule.weights().iter().sum();
        prop_assert!((sum - reference_measure(dim)).abs() <= 1e-12);
    }

    #[test]
    fn triangle_rule_weight_sum(n in 0..=12usize) {
        prop_assert!((total_weight(&triangle_gauss(n)) - 0.5).abs() <= 1e-12);
    }
}
