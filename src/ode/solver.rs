//! Nonlinear solvers for the equations of a time slab.
use crate::error::Result;
use crate::ode::jacobian::SlabJacobian;
use crate::ode::timeslab::{SlabState, TimeSlab};
use crate::ode::{NonlinearSolverKind, Ode, OdeSettings};
use galerkin_optimize::fixed_point::{fixed_point, FixedPointMap};
use galerkin_optimize::newton::{newton, NewtonResult, NewtonSettings, NewtonSystem};
use galerkin_sparse::{gmres, GmresSettings, SolveErrorKind};
use log::debug;
use nalgebra::{DVector, DVectorView, DVectorViewMut};
use std::error::Error;

/// The slab equations `F(x) = x - G(x) = 0` with a matrix-free Jacobian.
struct SlabSystem<'a, O: ?Sized> {
    ode: &'a O,
    slab: &'a TimeSlab,
    jacobian: SlabJacobian<'a>,
    gmres_settings: GmresSettings,
}

impl<'a, O> NewtonSystem for SlabSystem<'a, O>
where
    O: ?Sized + Ode,
{
    fn dimension(&self) -> usize {
        self.slab.nodal_values().len()
    }

    fn residual(&mut self, mut b: DVectorViewMut<f64>, x: DVectorView<f64>) -> std::result::Result<(), Box<dyn Error>> {
        let mut g = DVector::zeros(x.len());
        self.slab.feval(self.ode, x.as_slice(), g.as_mut_slice());
        b.copy_from(&g);
        b -= &x;
        Ok(())
    }

    fn update_jacobian(&mut self, x: DVectorView<f64>) -> std::result::Result<(), Box<dyn Error>> {
        self.jacobian.update(self.ode, x.as_slice());
        Ok(())
    }

    fn solve_jacobian_system(
        &mut self,
        dx: DVectorViewMut<f64>,
        _x: DVectorView<f64>,
        b: DVectorView<f64>,
    ) -> std::result::Result<(), Box<dyn Error>> {
        let preconditioner = self.jacobian.preconditioner();
        match gmres(&self.jacobian, dx, b, preconditioner, &self.gmres_settings) {
            Ok(output) => {
                debug!(
                    "GMRES converged in {} iterations (residual {:e})",
                    output.num_iterations, output.residual_norm
                );
                Ok(())
            }
            // An inexact increment still moves Newton forward
            Err(err) if matches!(err.kind, SolveErrorKind::MaxIterationsReached { .. }) => {
                debug!("{}", err);
                Ok(())
            }
            Err(err) => Err(Box::new(err)),
        }
    }
}

/// The slab map `x -> G(x)`.
struct SlabMap<'a, O: ?Sized> {
    ode: &'a O,
    slab: &'a TimeSlab,
}

impl<'a, O> FixedPointMap for SlabMap<'a, O>
where
    O: ?Sized + Ode,
{
    fn dimension(&self) -> usize {
        self.slab.nodal_values().len()
    }

    fn apply(&mut self, mut y: DVectorViewMut<f64>, x: DVectorView<f64>) -> std::result::Result<(), Box<dyn Error>> {
        let mut g = DVector::zeros(x.len());
        self.slab.feval(self.ode, x.as_slice(), g.as_mut_slice());
        y.copy_from(&g);
        Ok(())
    }
}

/// Solves the equations of a built slab, starting from its current nodal values.
///
/// On success the slab holds the solution and is accepted. On failure the slab is rejected and
/// its nodal values are left unchanged.
pub fn solve_slab<O>(slab: &mut TimeSlab, ode: &O, settings: &OdeSettings) -> Result<NewtonResult>
where
    O: ?Sized + Ode,
{
    let tolerance = settings.effective_discrete_tolerance();
    let newton_settings = NewtonSettings {
        max_iterations: Some(settings.maximum_iterations),
        tolerance,
        jacobian_refresh_rate: settings.jacobian_refresh_rate,
        ..NewtonSettings::default()
    };
    let mut x = slab.nodal_values().clone();

    let result = match settings.nonlinear_solver {
        NonlinearSolverKind::Newton => {
            let system = SlabSystem {
                ode,
                slab: &*slab,
                jacobian: SlabJacobian::new(slab),
                gmres_settings: GmresSettings {
                    restart: 30,
                    max_iterations: 10 * x.len().max(30),
                    relative_tolerance: 0.01,
                    absolute_tolerance: 0.01 * tolerance,
                },
            };
            newton(system, &mut x, &newton_settings)
        }
        NonlinearSolverKind::FixedPoint => {
            let map = SlabMap { ode, slab: &*slab };
            fixed_point(map, &mut x, &newton_settings)
        }
    };
    let result = match result {
        Ok(result) => result,
        Err(err) => {
            slab.set_state(SlabState::Rejected);
            return Err(err.into());
        }
    };

    debug!(
        "Solved time slab [{:.6}, {:.6}] in {} iterations ({} Jacobian updates)",
        slab.start_time(),
        slab.end_time(),
        result.iterations,
        result.jacobian_updates
    );
    slab.set_nodal_values(x);
    slab.set_state(SlabState::Accepted);
    Ok(result)
}
