use log::{debug, warn};
use nalgebra::{DVector, DVectorView, DVectorViewMut};
use std::error::Error;

use crate::newton::{NewtonError, NewtonResult, NewtonSettings};

/// A map `G` whose fixed point `x = G(x)` is sought.
pub trait FixedPointMap {
    fn dimension(&self) -> usize;

    /// Evaluates `y = G(x)`.
    fn apply(&mut self, y: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), Box<dyn Error>>;
}

/// Iterates `x <- G(x)` until `|G(x) - x|_inf < tolerance`.
///
/// Uses the same settings, result and error types as [`newton`](crate::newton::newton), so the
/// two solvers are interchangeable. The Jacobian-related settings are ignored.
pub fn fixed_point<'a, G>(
    mut map: G,
    x: impl Into<DVectorViewMut<'a, f64>>,
    settings: &NewtonSettings,
) -> Result<NewtonResult, NewtonError>
where
    G: FixedPointMap,
{
    let mut x = x.into();
    let n = map.dimension();
    assert_eq!(x.nrows(), n, "initial guess must match the dimension of the map");

    let mut y = DVector::zeros(n);
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

        map.apply(DVectorViewMut::from(&mut y), DVectorView::from(&x))
            .map_err(NewtonError::ResidualError)?;
        let increment = (&y - &x).amax();
        x.copy_from(&y);
        iter += 1;

        let diverged = !increment.is_finite()
            || previous_increment
                .map(|d0| increment > settings.divergence_factor * d0)
                .unwrap_or(false);
        if diverged {
            warn!("Fixed-point iteration diverged at iteration {}: |dx| = {:e}", iter, increment);
            return Err(NewtonError::Diverged {
                iteration: iter,
                increment_norm: increment,
            });
        }

        debug!("Fixed-point iteration {}: |dx| = {:e}", iter, increment);
        if increment < settings.tolerance {
            return Ok(NewtonResult {
                iterations: iter,
                jacobian_updates: 0,
                increment_norm: increment,
            });
        }
        previous_increment = Some(increment);
    }
}
