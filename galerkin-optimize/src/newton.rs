use log::{debug, warn};
use nalgebra::{DVector, DVectorView, DVectorViewMut};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// A nonlinear system `F(x) = 0` together with the means to solve its linearization.
///
/// The Jacobian is owned by the system. Newton only decides *when* it is rebuilt, so
/// that implementations are free to keep a stale Jacobian between iterations.
pub trait NewtonSystem {
    fn dimension(&self) -> usize;

    /// Evaluates `b = -F(x)`.
    fn residual(&mut self, b: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), Box<dyn Error>>;

    /// Rebuilds the Jacobian at `x`.
    fn update_jacobian(&mut self, x: DVectorView<f64>) -> Result<(), Box<dyn Error>>;

    /// Solves `J dx = b` with the current Jacobian.
    fn solve_jacobian_system(
        &mut self,
        dx: DVectorViewMut<f64>,
        x: DVectorView<f64>,
        b: DVectorView<f64>,
    ) -> Result<(), Box<dyn Error>>;
}

impl<'a, S> NewtonSystem for &'a mut S
where
    S: ?Sized + NewtonSystem,
{
    fn dimension(&self) -> usize {
        S::dimension(self)
    }

    fn residual(&mut self, b: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        S::residual(self, b, x)
    }

    fn update_jacobian(&mut self, x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        S::update_jacobian(self, x)
    }

    fn solve_jacobian_system(
        &mut self,
        dx: DVectorViewMut<f64>,
        x: DVectorView<f64>,
        b: DVectorView<f64>,
    ) -> Result<(), Box<dyn Error>> {
        S::solve_jacobian_system(self, dx, x, b)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewtonSettings {
    pub max_iterations: Option<usize>,
    /// Converged when the max-norm of the increment drops below this value.
    pub tolerance: f64,
    /// The Jacobian is rebuilt when the increment contraction rate `|dx_k| / |dx_{k-1}|`
    /// exceeds this value.
    pub jacobian_refresh_rate: f64,
    /// The iteration is considered divergent when `|dx_k| > divergence_factor * |dx_{k-1}|`.
    pub divergence_factor: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_iterations: Some(100),
            tolerance: 1e-10,
            jacobian_refresh_rate: 0.5,
            divergence_factor: 1000.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NewtonResult {
    pub iterations: usize,
    pub jacobian_updates: usize,
    /// Max-norm of the last increment.
    pub increment_norm: f64,
}

#[derive(Debug)]
pub enum NewtonError {
    /// The procedure failed because the maximum number of iterations was reached.
    MaximumIterationsReached(usize),
    /// The increment grew too fast or became non-finite.
    Diverged { iteration: usize, increment_norm: f64 },
    /// The procedure failed because evaluating the residual failed.
    ResidualError(Box<dyn Error>),
    /// The procedure failed because updating or solving the Jacobian system failed.
    JacobianError(Box<dyn Error>),
}

impl Display for NewtonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            &NewtonError::MaximumIterationsReached(maxit) => {
                write!(f, "Failed to converge within maximum number of iterations ({}).", maxit)
            }
            &NewtonError::Diverged {
                iteration,
                increment_norm,
            } => {
                write!(
                    f,
                    "Newton iteration diverged at iteration {} (increment norm {:e}).",
                    iteration, increment_norm
                )
            }
            &NewtonError::ResidualError(ref err) => {
                write!(f, "Failed to evaluate residual. Error: {}", err)
            }
            &NewtonError::JacobianError(ref err) => {
                write!(f, "Failed to solve Jacobian system. Error: {}", err)
            }
        }
    }
}

impl Error for NewtonError {}

/// Attempts to solve the non-linear equation F(x) = 0 starting from the contents of `x`.
///
/// Each iteration evaluates `b = -F(x)`, solves `J dx = b` and updates `x += dx`. The solution
/// is said to have converged if ```|dx|_inf < tolerance```.
///
/// The Jacobian is built once before the first iteration and afterwards only when the
/// contraction rate of the increments exceeds `jacobian_refresh_rate`.
///
/// On error the contents of `x` are unspecified and must not be used as a solution.
pub fn newton<'a, S>(
    mut system: S,
    x: impl Into<DVectorViewMut<'a, f64>>,
    settings: &NewtonSettings,
) -> Result<NewtonResult, NewtonError>
where
    S: NewtonSystem,
{
    let mut x = x.into();
    let n = system.dimension();
    assert_eq!(x.nrows(), n, "initial guess must match the dimension of the system");

    let mut b = DVector::zeros(n);
    let mut dx = DVector::zeros(n);

    system
        .update_jacobian(DVectorView::from(&x))
        .map_err(NewtonError::JacobianError)?;
    let mut jacobian_updates = 1;

    let mut previous_increment: Option<f64> = None;
    let mut iter = 0;

    loop {
        if settings
            .max_iterations
            .map(|max_iter| iter == max_iter)
            .unwrap_or(false)
        {
            return Err(NewtonError::MaximumIterationsReached(iter));
        }

        system
            .residual(DVectorViewMut::from(&mut b), DVectorView::from(&x))
            .map_err(NewtonError::ResidualError)?;

        dx.fill(0.0);
        system
            .solve_jacobian_system(DVectorViewMut::from(&mut dx), DVectorView::from(&x), DVectorView::from(&b))
            .map_err(NewtonError::JacobianError)?;

        x += &dx;
        iter += 1;

        let increment = dx.amax();
        let diverged = !increment.is_finite()
            || previous_increment
                .map(|d0| increment > settings.divergence_factor * d0)
                .unwrap_or(false);
        if diverged {
            warn!("Newton diverged at iteration {}: |dx| = {:e}", iter, increment);
            return Err(NewtonError::Diverged {
                iteration: iter,
                increment_norm: increment,
            });
        }

        debug!("Newton iteration {}: |dx| = {:e}", iter, increment);
        if increment < settings.tolerance {
            return Ok(NewtonResult {
                iterations: iter,
                jacobian_updates,
                increment_norm: increment,
            });
        }

        if let Some(d0) = previous_increment {
            let rate = increment / d0;
            if rate > settings.jacobian_refresh_rate {
                debug!("Newton contraction rate {:.3} too slow, updating Jacobian", rate);
                system
                    .update_jacobian(DVectorView::from(&x))
                    .map_err(NewtonError::JacobianError)?;
                jacobian_updates += 1;
            }
        }
        previous_increment = Some(increment);
    }
}
