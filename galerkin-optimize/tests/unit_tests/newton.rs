use galerkin_optimize::fixed_point::{fixed_point, FixedPointMap};
use galerkin_optimize::newton::*;
use nalgebra::{DVector, DVectorView, DVectorViewMut, Matrix3, Vector3};
use std::error::Error;

fn system_matrix() -> Matrix3<f64> {
    Matrix3::new(5.0, 1.0, 2.0, 1.0, 4.0, 2.0, 2.0, 2.0, 4.0)
}

#[derive(Default)]
struct MockLinearSystem {
    jacobian_updates: usize,
}

impl NewtonSystem for MockLinearSystem {
    fn dimension(&self) -> usize {
        3
    }

    fn residual(&mut self, mut b: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        let r = system_matrix() * x - Vector3::new(1.0, 2.0, 3.0);
        b.copy_from(&(-r));
        Ok(())
    }

    fn update_jacobian(&mut self, _x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        self.jacobian_updates += 1;
        Ok(())
    }

    fn solve_jacobian_system(
        &mut self,
        mut dx: DVectorViewMut<f64>,
        _x: DVectorView<f64>,
        b: DVectorView<f64>,
    ) -> Result<(), Box<dyn Error>> {
        let a_inv = system_matrix().try_inverse().unwrap();
        dx.copy_from(&(a_inv * b));
        Ok(())
    }
}

#[test]
fn newton_converges_in_two_iterations_for_linear_system() {
    let expected_solution = Vector3::new(-0.125, 0.16666667, 0.72916667);

    let settings = NewtonSettings {
        max_iterations: Some(5),
        tolerance: 1e-10,
        ..NewtonSettings::default()
    };

    let mut system = MockLinearSystem::default();
    let mut x = DVector::zeros(3);
    let result = newton(&mut system, &mut x, &settings).expect("Newton iterations must succeed");
    let diff = x - expected_solution;
    assert!(diff.norm() < 1e-6);
    // The first step solves the system exactly, the second confirms a vanishing increment
    assert_eq!(result.iterations, 2);
    assert_eq!(result.jacobian_updates, 1);
    assert_eq!(system.jacobian_updates, 1);
}

/// Scalar equation x^2 = 2 with a Jacobian frozen at the initial guess unless refreshed.
struct FrozenJacobianSqrt {
    slope: f64,
}

impl NewtonSystem for FrozenJacobianSqrt {
    fn dimension(&self) -> usize {
        1
    }

    fn residual(&mut self, mut b: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        b[0] = 2.0 - x[0] * x[0];
        Ok(())
    }

    fn update_jacobian(&mut self, x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        self.slope = 2.0 * x[0];
        Ok(())
    }

    fn solve_jacobian_system(
        &mut self,
        mut dx: DVectorViewMut<f64>,
        _x: DVectorView<f64>,
        b: DVectorView<f64>,
    ) -> Result<(), Box<dyn Error>> {
        dx[0] = b[0] / self.slope;
        Ok(())
    }
}

#[test]
fn newton_with_stale_jacobian_converges() {
    let settings = NewtonSettings {
        tolerance: 1e-13,
        ..NewtonSettings::default()
    };
    let mut x = DVector::from_element(1, 1.0);
    let result = newton(FrozenJacobianSqrt { slope: 0.0 }, &mut x, &settings).unwrap();
    assert!((x[0] - 2.0f64.sqrt()).abs() < 1e-12);
    assert!(result.increment_norm < 1e-13);
    assert!(result.jacobian_updates >= 1);
}

#[test]
fn newton_never_refreshes_with_permissive_rate() {
    // A rate above one keeps the initial Jacobian: the chord method still converges here
    let settings = NewtonSettings {
        tolerance: 1e-12,
        jacobian_refresh_rate: 2.0,
        ..NewtonSettings::default()
    };
    let mut x = DVector::from_element(1, 1.5);
    let result = newton(FrozenJacobianSqrt { slope: 0.0 }, &mut x, &settings).unwrap();
    assert_eq!(result.jacobian_updates, 1);
    assert!((x[0] - 2.0f64.sqrt()).abs() < 1e-11);
}

/// An iteration whose increment never shrinks.
struct Oscillating;

impl NewtonSystem for Oscillating {
    fn dimension(&self) -> usize {
        1
    }

    fn residual(&mut self, mut b: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        b[0] = if x[0] > 0.0 { -2.0 } else { 2.0 };
        Ok(())
    }

    fn update_jacobian(&mut self, _x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn solve_jacobian_system(
        &mut self,
        mut dx: DVectorViewMut<f64>,
        _x: DVectorView<f64>,
        b: DVectorView<f64>,
    ) -> Result<(), Box<dyn Error>> {
        dx[0] = b[0];
        Ok(())
    }
}

#[test]
fn newton_reports_exhausted_iteration_budget() {
    let settings = NewtonSettings {
        max_iterations: Some(7),
        tolerance: 1e-8,
        ..NewtonSettings::default()
    };
    let mut x = DVector::from_element(1, 1.0);
    let err = newton(Oscillating, &mut x, &settings).unwrap_err();
    assert!(matches!(err, NewtonError::MaximumIterationsReached(7)));
}

struct Exploding;

impl NewtonSystem for Exploding {
    fn dimension(&self) -> usize {
        1
    }

    fn residual(&mut self, mut b: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        b[0] = 1e4 * x[0];
        Ok(())
    }

    fn update_jacobian(&mut self, _x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn solve_jacobian_system(
        &mut self,
        mut dx: DVectorViewMut<f64>,
        _x: DVectorView<f64>,
        b: DVectorView<f64>,
    ) -> Result<(), Box<dyn Error>> {
        dx[0] = b[0];
        Ok(())
    }
}

#[test]
fn newton_detects_divergence() {
    let mut x = DVector::from_element(1, 1.0);
    let err = newton(Exploding, &mut x, &NewtonSettings::default()).unwrap_err();
    assert!(matches!(err, NewtonError::Diverged { iteration: 2, .. }));
}

struct Cosine;

impl FixedPointMap for Cosine {
    fn dimension(&self) -> usize {
        1
    }

    fn apply(&mut self, mut y: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        y[0] = x[0].cos();
        Ok(())
    }
}

#[test]
fn fixed_point_finds_dottie_number() {
    let settings = NewtonSettings {
        tolerance: 1e-12,
        ..NewtonSettings::default()
    };
    let mut x = DVector::from_element(1, 1.0);
    let result = fixed_point(Cosine, &mut x, &settings).unwrap();
    assert!((x[0] - 0.7390851332151607).abs() < 1e-11);
    assert_eq!(result.jacobian_updates, 0);
}

#[test]
fn settings_serde_roundtrip() {
    let settings = NewtonSettings::default();
    let json = serde_json::to_string(&settings).unwrap();
    let deserialized: NewtonSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(settings, deserialized);
}
