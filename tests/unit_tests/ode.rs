use galerkin::error::FemError;
use galerkin::ode::{
    Dependencies, MethodCache, MethodKind, NonlinearSolverKind, Ode, OdeSettings, TimeStepper,
};
use matrixcompare::assert_scalar_eq;

/// u' = -λ u
struct Decay {
    lambda: f64,
}

impl Ode for Decay {
    fn size(&self) -> usize {
        1
    }

    fn initial_value(&self, u: &mut [f64]) {
        u[0] = 1.0;
    }

    fn f_component(&self, u: &[f64], _t: f64, _i: usize) -> f64 {
        -self.lambda * u[0]
    }
}

/// u' = 1 on [0, 2]
struct Ramp;

impl Ode for Ramp {
    fn size(&self) -> usize {
        1
    }

    fn initial_value(&self, u: &mut [f64]) {
        u[0] = 0.0;
    }

    fn f_component(&self, _u: &[f64], _t: f64, _i: usize) -> f64 {
        1.0
    }

    fn end_time(&self) -> f64 {
        2.0
    }
}

struct Empty;

impl Ode for Empty {
    fn size(&self) -> usize {
        0
    }

    fn initial_value(&self, _u: &mut [f64]) {}

    fn f_component(&self, _u: &[f64], _t: f64, _i: usize) -> f64 {
        0.0
    }
}

/// Three decoupled components, the last one coupled to the first: u0' = -u0, u1' = cos(t),
/// u2' = u0 - u2.
struct Chain {
    stop_at: Option<f64>,
    updates: usize,
}

impl Ode for Chain {
    fn size(&self) -> usize {
        3
    }

    fn initial_value(&self, u: &mut [f64]) {
        u.copy_from_slice(&[1.0, 0.0, 0.0]);
    }

    fn f_component(&self, u: &[f64], t: f64, i: usize) -> f64 {
        match i {
            0 => -u[0],
            1 => t.cos(),
            _ => u[0] - u[2],
        }
    }

    fn update(&mut self, _u: &[f64], t: f64, _end: bool) -> bool {
        self.updates += 1;
        self.stop_at.map_or(true, |stop| t < stop)
    }
}

#[test]
fn settings_deserialize_with_defaults() {
    let settings: OdeSettings = serde_json::from_str(r#"{ "order": 3, "method": "DiscontinuousGalerkin" }"#).unwrap();
    assert_eq!(settings.order, 3);
    assert_eq!(settings.method, MethodKind::DiscontinuousGalerkin);
    assert_eq!(settings.maximum_iterations, OdeSettings::default().maximum_iterations);
    assert_scalar_eq!(settings.effective_discrete_tolerance(), 1e-4, comp = abs, tol = 1e-18);

    let json = serde_json::to_string(&settings).unwrap();
    let round_trip: OdeSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(round_trip, settings);
}

#[test]
fn method_cache_shares_methods() {
    let cache = MethodCache::new();
    let a = cache.get(MethodKind::ContinuousGalerkin, 2).unwrap();
    let b = cache.get(MethodKind::ContinuousGalerkin, 2).unwrap();
    let c = cache.get(MethodKind::DiscontinuousGalerkin, 2).unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert!(!std::sync::Arc::ptr_eq(&a, &c));
    assert_eq!(cache.len(), 2);
    assert_eq!((a.order(), c.order()), (4, 5));
}

#[test]
fn dependencies_are_detected_by_perturbation() {
    let chain = Chain {
        stop_at: None,
        updates: 0,
    };
    let dependencies = Dependencies::detect(&chain, &[1.0, 0.5, 0.25], 0.0);
    assert!(dependencies.is_sparse());
    assert_eq!(dependencies.get(0).collect::<Vec<_>>(), vec![0]);
    assert_eq!(dependencies.get(1).count(), 0);
    assert_eq!(dependencies.get(2).collect::<Vec<_>>(), vec![0, 2]);
}

#[test]
fn default_jacobian_uses_finite_differences() {
    let chain = Chain {
        stop_at: None,
        updates: 0,
    };
    let u = [0.7, 0.1, -0.3];
    assert_scalar_eq!(chain.dfdu(&u, 0.0, 0, 0), -1.0, comp = abs, tol = 1e-7);
    assert_scalar_eq!(chain.dfdu(&u, 0.0, 2, 0), 1.0, comp = abs, tol = 1e-7);
    assert_scalar_eq!(chain.dfdu(&u, 0.0, 1, 2), 0.0, comp = abs, tol = 1e-7);
}

#[test]
fn exponential_decay_is_accurate() {
    let cache = MethodCache::new();
    for (method, order) in [
        (MethodKind::ContinuousGalerkin, 1),
        (MethodKind::ContinuousGalerkin, 3),
        (MethodKind::DiscontinuousGalerkin, 0),
        (MethodKind::DiscontinuousGalerkin, 2),
    ] {
        let settings = OdeSettings {
            method,
            order,
            tolerance: 1e-4,
            discrete_tolerance: Some(1e-12),
            ..OdeSettings::default()
        };
        let mut ode = Decay { lambda: 2.0 };
        let solution = TimeStepper::new(&mut ode, settings, &cache)
            .unwrap()
            .solve(0.0, 1.0)
            .unwrap();
        let (t, u) = solution.last().unwrap();
        assert_eq!(t, 1.0);
        assert_scalar_eq!(u[0], (-2.0f64).exp(), comp = abs, tol = 1e-3);
    }
}

#[test]
fn fixed_point_and_newton_agree() {
    let cache = MethodCache::new();
    let mut finals = Vec::new();
    for nonlinear_solver in [NonlinearSolverKind::Newton, NonlinearSolverKind::FixedPoint] {
        let settings = OdeSettings {
            order: 2,
            fixed_time_step: true,
            initial_time_step: 0.05,
            discrete_tolerance: Some(1e-13),
            nonlinear_solver,
            ..OdeSettings::default()
        };
        let mut ode = Chain {
            stop_at: None,
            updates: 0,
        };
        let solution = TimeStepper::new(&mut ode, settings, &cache)
            .unwrap()
            .solve(0.0, 1.0)
            .unwrap();
        finals.push(solution.last().unwrap().1.to_vec());
    }
    for (a, b) in finals[0].iter().zip(&finals[1]) {
        assert_scalar_eq!(*a, *b, comp = abs, tol = 1e-10);
    }
    // u1 = sin(t) is integrated exactly up to quadrature
    assert_scalar_eq!(finals[0][1], 1.0f64.sin(), comp = abs, tol = 1e-8);
}

#[test]
fn ode_can_stop_the_time_stepping() {
    let cache = MethodCache::new();
    let settings = OdeSettings {
        fixed_time_step: true,
        initial_time_step: 0.1,
        ..OdeSettings::default()
    };
    let mut ode = Chain {
        stop_at: Some(0.35),
        updates: 0,
    };
    let solution = TimeStepper::new(&mut ode, settings, &cache)
        .unwrap()
        .solve(0.0, 1.0)
        .unwrap();
    let (t, _) = solution.last().unwrap();
    assert!(t > 0.35 && t < 0.5);
    assert_eq!(ode.updates, 4);
}

#[test]
fn samples_cover_the_interval() {
    let cache = MethodCache::new();
    let settings = OdeSettings {
        number_of_samples: 10,
        ..OdeSettings::default()
    };
    let mut ode = Decay { lambda: 1.0 };
    let solution = TimeStepper::new(&mut ode, settings, &cache)
        .unwrap()
        .solve(0.0, 2.0)
        .unwrap();
    let times = solution.times();
    assert_eq!(times[0], 0.0);
    assert_eq!(*times.last().unwrap(), 2.0);
    assert!(times.windows(2).all(|w| w[0] < w[1]));
    assert!(solution.num_samples() >= 11);

    let mut u = [0.0];
    solution.eval(1.0, &mut u);
    assert_scalar_eq!(u[0], (-1.0f64).exp(), comp = abs, tol = 1e-2);
    assert!(solution.statistics().num_slabs > 0);
}

#[test]
fn invalid_settings_are_rejected() {
    let cache = MethodCache::new();
    let mut ode = Decay { lambda: 1.0 };
    let settings = OdeSettings {
        maximum_time_step: 0.0,
        ..OdeSettings::default()
    };
    assert!(matches!(
        TimeStepper::new(&mut ode, settings, &cache),
        Err(FemError::Consistency(_))
    ));

    let settings = OdeSettings {
        order: 0,
        ..OdeSettings::default()
    };
    assert!(matches!(
        TimeStepper::new(&mut ode, settings, &cache),
        Err(FemError::UnsupportedElement(_))
    ));

    let mut stepper = TimeStepper::new(&mut ode, OdeSettings::default(), &cache).unwrap();
    assert!(matches!(stepper.solve(1.0, 1.0), Err(FemError::Consistency(_))));
}

#[test]
fn exhausted_iteration_budget_is_a_convergence_error() {
    let cache = MethodCache::new();
    let settings = OdeSettings {
        maximum_iterations: 1,
        discrete_tolerance: Some(1e-30),
        ..OdeSettings::default()
    };
    let mut ode = Decay { lambda: 1.0 };
    let result = TimeStepper::new(&mut ode, settings, &cache)
        .unwrap()
        .solve(0.0, 1.0);
    match result {
        Err(FemError::Convergence(message)) => {
            assert!(message.starts_with("Time slab system did not converge"))
        }
        other => panic!("expected a convergence error, got {:?}", other.map(|s| s.num_samples())),
    }
}

#[test]
fn ode_without_components_is_rejected() {
    let cache = MethodCache::new();
    let mut ode = Empty;
    assert!(matches!(
        TimeStepper::new(&mut ode, OdeSettings::default(), &cache),
        Err(FemError::Consistency(_))
    ));
}

#[test]
fn time_steps_below_the_resolution_of_time_are_an_error() {
    let cache = MethodCache::new();
    let mut ode = Decay { lambda: 1.0 };
    let result = TimeStepper::new(&mut ode, OdeSettings::default(), &cache)
        .unwrap()
        .solve(1e17, 1e17 + 100.0);
    assert!(matches!(result, Err(FemError::Consistency(_))));
}

#[test]
fn solve_from_integrates_up_to_the_end_time_of_the_ode() {
    let cache = MethodCache::new();
    let mut ode = Ramp;
    let solution = TimeStepper::new(&mut ode, OdeSettings::default(), &cache)
        .unwrap()
        .solve_from(0.0)
        .unwrap();
    let (t, u) = solution.last().unwrap();
    assert_eq!(t, 2.0);
    assert_scalar_eq!(u[0], 2.0, comp = abs, tol = 1e-10);
}
