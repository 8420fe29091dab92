use crate::ode::MethodKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NonlinearSolverKind {
    /// Newton's method with GMRES for the slab Jacobian.
    Newton,
    /// Plain fixed-point iteration on the element equations.
    FixedPoint,
}

/// Parameters of the multi-adaptive time stepper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdeSettings {
    pub method: MethodKind,
    /// The degree q of cG(q) or dG(q).
    pub order: usize,
    /// Tolerance for the error estimate that drives the choice of time steps.
    pub tolerance: f64,
    /// Tolerance for the increments of the nonlinear solver. When absent,
    /// `discrete_tolerance_factor * tolerance` is used.
    pub discrete_tolerance: Option<f64>,
    pub discrete_tolerance_factor: f64,
    pub initial_time_step: f64,
    pub maximum_time_step: f64,
    /// Components whose step is at least this fraction of the largest remaining step are
    /// grouped together.
    pub partitioning_threshold: f64,
    /// A sub-slab is only shortened to the step of its group if that step is below this
    /// fraction of the available interval.
    pub interval_threshold: f64,
    pub safety_factor: f64,
    /// Keep the initial (or user-provided) time steps instead of adapting them.
    pub fixed_time_step: bool,
    /// When false, all components share one time step (mono-adaptive stepping).
    pub multi_adaptive: bool,
    pub nonlinear_solver: NonlinearSolverKind,
    pub maximum_iterations: usize,
    pub jacobian_refresh_rate: f64,
    /// Number of uniformly spaced samples of the solution, in addition to the slab end points.
    pub number_of_samples: usize,
    /// Detect the sparsity of the right-hand side by perturbation before the first slab.
    pub detect_dependencies: bool,
}

impl Default for OdeSettings {
    fn default() -> Self {
        Self {
            method: MethodKind::ContinuousGalerkin,
            order: 1,
            tolerance: 0.1,
            discrete_tolerance: None,
            discrete_tolerance_factor: 0.001,
            initial_time_step: 0.01,
            maximum_time_step: 0.1,
            partitioning_threshold: 0.1,
            interval_threshold: 0.9,
            safety_factor: 0.9,
            fixed_time_step: false,
            multi_adaptive: true,
            nonlinear_solver: NonlinearSolverKind::Newton,
            maximum_iterations: 100,
            jacobian_refresh_rate: 0.5,
            number_of_samples: 100,
            detect_dependencies: false,
        }
    }
}

impl OdeSettings {
    /// Increment tolerance of the nonlinear solver on each slab.
    pub fn effective_discrete_tolerance(&self) -> f64 {
        self.discrete_tolerance
            .unwrap_or(self.discrete_tolerance_factor * self.tolerance)
    }
}
