use galerkin_quadrature::univariate::{gauss, lobatto, radau, Family};
use galerkin_quadrature::{integrate, total_weight};

use matrixcompare::assert_scalar_eq;
use proptest::prelude::*;

fn monomial_integral(alpha: i32) -> f64 {
    (1.0 - (-1.0f64).powi(alpha + 1)) / (alpha as f64 + 1.0)
}

fn assert_exact_up_to_degree(family: Family, n: usize) {
    let rule = family.rule(n);
    assert_eq!(rule.0.len(), rule.1.len());

    // Also test that weights are positive
    assert!(rule.0.iter().all(|&w| w > 0.0), "{family:?}({n}) has non-positive weights");

    // Points must be sorted and within the reference interval
    assert!(rule.1.windows(2).all(|w| w[0][0] < w[1][0]));
    assert!(rule.1.iter().all(|&[x]| (-1.0..=1.0).contains(&x)));

    for alpha in 0..=family.degree_of_exactness(n) as i32 {
        let estimated_integral = integrate(&rule, |x| x[0].powi(alpha));
        assert_scalar_eq!(estimated_integral, monomial_integral(alpha), comp = abs, tol = 1e-12);
    }
}

#[test]
fn gauss_rules_satisfy_expected_accuracy() {
    for n in 1..=40 {
        assert_eq!(gauss(n).0.len(), n);
        assert_exact_up_to_degree(Family::Gauss, n);
    }
}

#[test]
fn radau_rules_satisfy_expected_accuracy() {
    for n in 1..=40 {
        let rule = radau(n);
        assert_eq!(rule.0.len(), n);
        // Radau includes the left end point only
        assert_eq!(rule.1.first().unwrap(), &[-1.0]);
        if n > 1 {
            assert!(rule.1.last().unwrap()[0] < 1.0);
        }
        assert_exact_up_to_degree(Family::Radau, n);
    }
}

#[test]
fn lobatto_rules_satisfy_expected_accuracy() {
    for n in 2..=40 {
        let rule = lobatto(n);
        assert_eq!(rule.0.len(), n);

        // Check that rule contains endpoints, like Gauss-Lobatto should
        assert_eq!(rule.1.first().unwrap(), &[-1.0]);
        assert_eq!(rule.1.last().unwrap(), &[1.0]);
        assert_exact_up_to_degree(Family::Lobatto, n);
    }
}

#[test]
fn known_low_order_rules() {
    let (weights, points) = gauss(2);
    let x = 1.0 / 3.0f64.sqrt();
    assert_scalar_eq!(points[0][0], -x, comp = abs, tol = 1e-15);
    assert_scalar_eq!(points[1][0], x, comp = abs, tol = 1e-15);
    assert_scalar_eq!(weights[0], 1.0, comp = abs, tol = 1e-14);

    // Simpson's rule
    let (weights, points) = lobatto(3);
    assert_eq!(points[0], [-1.0]);
    assert_scalar_eq!(points[1][0], 0.0, comp = abs, tol = 1e-15);
    assert_eq!(points[2], [1.0]);
    assert_scalar_eq!(weights[0], 1.0 / 3.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(weights[1], 4.0 / 3.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(weights[2], 1.0 / 3.0, comp = abs, tol = 1e-14);

    let (weights, points) = radau(2);
    assert_scalar_eq!(points[1][0], 1.0 / 3.0, comp = abs, tol = 1e-15);
    assert_scalar_eq!(weights[0], 0.5, comp = abs, tol = 1e-14);
    assert_scalar_eq!(weights[1], 1.5, comp = abs, tol = 1e-14);
}

#[test]
fn zero_point_rules_are_degenerate() {
    for family in [Family::Gauss, Family::Radau, Family::Lobatto] {
        let rule = family.rule(0);
        assert_eq!(rule, (vec![2.0], vec![[0.0]]));
    }
    // One Lobatto point cannot include both end points
    assert_eq!(lobatto(1), (vec![2.0], vec![[0.0]]));
    assert_exact_up_to_degree(Family::Lobatto, 1);
}

proptest! {
    #[test]
    fn weights_sum_to_interval_length(n in 0..=64usize) {
        for family in [Family::Gauss, Family::Radau, Family::Lobatto] {
            let rule = family.rule(n);
            prop_assert!((total_weight(&rule) - 2.0).abs() <= 1e-12);
        }
    }
}
