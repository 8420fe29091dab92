//! Multi-adaptive Galerkin time stepping for systems of ODEs `u' = f(u, t)`.
//!
//! Every component of the system is integrated with its own sequence of time steps. The time
//! interval is traversed in time slabs, each of which holds one or more cG(q) or dG(q) elements
//! per component. The element equations of a slab are coupled and solved together by a Newton
//! iteration (or plain fixed-point iteration), after which the end-point residuals of each
//! component determine its next time step.
use galerkin_optimize::calculus::approximate_derivative;

mod adaptivity;
mod dependencies;
mod jacobian;
mod lagrange;
mod method;
mod partition;
mod settings;
mod solution;
mod solver;
mod stepper;
mod timeslab;

pub use adaptivity::{MultiAdaptivity, Regulator};
pub use dependencies::Dependencies;
pub use method::{Method, MethodCache, MethodKind};
pub use partition::Partition;
pub use settings::{NonlinearSolverKind, OdeSettings};
pub use solution::{OdeSolution, OdeStatistics};
pub use solver::solve_slab;
pub use stepper::TimeStepper;
pub use timeslab::{SlabState, TimeSlab};

/// A system of ordinary differential equations `u' = f(u, t)`.
pub trait Ode {
    /// Number of components.
    fn size(&self) -> usize;

    fn initial_value(&self, u: &mut [f64]);

    /// Component `i` of the right-hand side.
    ///
    /// Only the components of `u` that component `i` depends on (see
    /// [`dependencies`](Self::dependencies)) are guaranteed to be up to date.
    fn f_component(&self, u: &[f64], t: f64, i: usize) -> f64;

    /// The full right-hand side.
    fn f(&self, u: &[f64], t: f64, y: &mut [f64]) {
        for (i, y_i) in y.iter_mut().enumerate() {
            *y_i = self.f_component(u, t, i);
        }
    }

    /// The derivative `df_i/du_j`, by central differences unless overridden.
    fn dfdu(&self, u: &[f64], t: f64, i: usize, j: usize) -> f64 {
        let h = f64::EPSILON.sqrt() * u[j].abs().max(1.0);
        let mut perturbed = u.to_vec();
        approximate_derivative(
            |u_j| {
                perturbed[j] = u_j;
                self.f_component(&perturbed, t, i)
            },
            u[j],
            h,
        )
    }

    /// The time step of component `i` at time `t` when time steps are fixed.
    fn timestep(&self, _t: f64, _i: usize, k0: f64) -> f64 {
        k0
    }

    /// Called with the end state of every accepted slab. Returning `false` stops the time
    /// stepping.
    fn update(&mut self, _u: &[f64], _t: f64, _end: bool) -> bool {
        true
    }

    /// The end of the time interval the system is meant to be solved on.
    fn end_time(&self) -> f64 {
        1.0
    }

    fn dependencies(&self) -> Dependencies {
        Dependencies::dense(self.size())
    }
}
