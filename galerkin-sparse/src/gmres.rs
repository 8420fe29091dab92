//! Restarted GMRES with right preconditioning.
//!
//! Right preconditioning means that the residual monitored by the Arnoldi process is the true
//! residual `b - A x` of the unpreconditioned system, so the tolerances have the same meaning
//! regardless of the preconditioner.
use crate::operator::{LinearOperator, Preconditioner};
use core::fmt;
use log::debug;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};
use serde::{Deserialize, Serialize};
use std::error::Error;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmresSettings {
    /// Dimension of the Krylov subspace before restarting.
    pub restart: usize,
    /// Maximum total number of Arnoldi steps over all restarts.
    pub max_iterations: usize,
    /// Converged when `|r| <= relative_tolerance * |r_0|` ...
    pub relative_tolerance: f64,
    /// ... or when `|r| <= absolute_tolerance`.
    pub absolute_tolerance: f64,
}

impl Default for GmresSettings {
    fn default() -> Self {
        Self {
            restart: 30,
            max_iterations: 1000,
            relative_tolerance: 1e-8,
            absolute_tolerance: 1e-15,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GmresOutput {
    /// Total number of Arnoldi steps, i.e. operator applications excluding residual checks.
    pub num_iterations: usize,
    /// Norm of the true residual at exit.
    pub residual_norm: f64,
}

#[derive(Debug)]
#[non_exhaustive]
pub enum SolveErrorKind {
    OperatorError(Box<dyn Error>),
    PreconditionerError(Box<dyn Error>),
    NonFiniteResidual,
    MaxIterationsReached { max_iter: usize },
}

impl fmt::Display for SolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperatorError(err) => {
                write!(f, "Error applying operator: ")?;
                err.fmt(f)
            }
            Self::PreconditionerError(err) => {
                write!(f, "Error applying preconditioner: ")?;
                err.fmt(f)
            }
            Self::NonFiniteResidual => write!(f, "Residual is not finite."),
            Self::MaxIterationsReached { max_iter } => {
                write!(f, "Max iterations ({}) reached.", max_iter)
            }
        }
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct SolveError {
    pub num_iterations: usize,
    pub kind: SolveErrorKind,
}

impl SolveError {
    fn new(num_iterations: usize, kind: SolveErrorKind) -> Self {
        Self { num_iterations, kind }
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GMRES solve failed after {} iterations. ", self.num_iterations)?;
        write!(f, "Error: {}", self.kind)
    }
}

impl Error for SolveError {}

/// Solves `A x = b` with restarted GMRES, using the contents of `x` as the initial guess.
///
/// Returns the number of iterations and the final residual norm on success. On failure,
/// `x` holds the last (unconverged) iterate and must not be used as a solution.
pub fn gmres<'a, A, P>(
    operator: &A,
    x: impl Into<DVectorViewMut<'a, f64>>,
    b: impl Into<DVectorView<'a, f64>>,
    preconditioner: &P,
    settings: &GmresSettings,
) -> Result<GmresOutput, SolveError>
where
    A: ?Sized + LinearOperator,
    P: ?Sized + Preconditioner,
{
    let mut x = x.into();
    let b = b.into();
    let n = b.len();
    assert_eq!(x.len(), n, "solution and right-hand side must have the same length");

    let m = settings.restart.max(1);
    let mut iterations = 0;

    // r = b - A x
    let mut r = DVector::zeros(n);
    let mut z = DVector::zeros(n);
    let mut w = DVector::zeros(n);
    let residual = |r: &mut DVector<f64>, x: DVectorView<f64>, iterations| -> Result<f64, SolveError> {
        operator
            .apply(DVectorViewMut::from(&mut *r), x)
            .map_err(|err| SolveError::new(iterations, SolveErrorKind::OperatorError(err)))?;
        r.zip_apply(&b, |ax_i, b_i| *ax_i = b_i - *ax_i);
        Ok(r.norm())
    };

    let mut beta = residual(&mut r, DVectorView::from(&x), iterations)?;
    let threshold = settings.absolute_tolerance.max(settings.relative_tolerance * beta);

    let mut basis: Vec<DVector<f64>> = Vec::with_capacity(m + 1);
    let mut h = DMatrix::zeros(m + 1, m);
    let mut cs = vec![0.0; m];
    let mut sn = vec![0.0; m];
    let mut g = DVector::zeros(m + 1);

    loop {
        if !beta.is_finite() {
            return Err(SolveError::new(iterations, SolveErrorKind::NonFiniteResidual));
        }
        if beta <= threshold {
            debug!("GMRES converged in {} iterations (residual {:.3e})", iterations, beta);
            return Ok(GmresOutput {
                num_iterations: iterations,
                residual_norm: beta,
            });
        }
        if iterations >= settings.max_iterations {
            return Err(SolveError::new(
                iterations,
                SolveErrorKind::MaxIterationsReached {
                    max_iter: settings.max_iterations,
                },
            ));
        }

        basis.clear();
        basis.push(&r / beta);
        h.fill(0.0);
        g.fill(0.0);
        g[0] = beta;

        let mut k_used = 0;
        for k in 0..m {
            // w = A P^{-1} v_k
            preconditioner
                .solve(DVectorViewMut::from(&mut z), DVectorView::from(&basis[k]))
                .map_err(|err| SolveError::new(iterations, SolveErrorKind::PreconditionerError(err)))?;
            operator
                .apply(DVectorViewMut::from(&mut w), DVectorView::from(&z))
                .map_err(|err| SolveError::new(iterations, SolveErrorKind::OperatorError(err)))?;

            // Modified Gram-Schmidt
            for (i, v_i) in basis.iter().enumerate() {
                let h_ik = w.dot(v_i);
                h[(i, k)] = h_ik;
                w.axpy(-h_ik, v_i, 1.0);
            }
            let h_next = w.norm();
            h[(k + 1, k)] = h_next;

            for i in 0..k {
                let temp = cs[i] * h[(i, k)] + sn[i] * h[(i + 1, k)];
                h[(i + 1, k)] = -sn[i] * h[(i, k)] + cs[i] * h[(i + 1, k)];
                h[(i, k)] = temp;
            }

            let denominator = h[(k, k)].hypot(h_next);
            if denominator == 0.0 {
                cs[k] = 1.0;
                sn[k] = 0.0;
            } else {
                cs[k] = h[(k, k)] / denominator;
                sn[k] = h_next / denominator;
            }
            h[(k, k)] = cs[k] * h[(k, k)] + sn[k] * h_next;
            h[(k + 1, k)] = 0.0;
            g[k + 1] = -sn[k] * g[k];
            g[k] *= cs[k];

            iterations += 1;
            k_used = k + 1;

            let estimated_residual = g[k + 1].abs();
            // An invariant subspace has been found when h_next vanishes
            if estimated_residual <= threshold || h_next == 0.0 || iterations >= settings.max_iterations {
                break;
            }
            if k + 1 < m {
                basis.push(&w / h_next);
            }
        }

        // Back substitution for the upper-triangular least-squares system
        let mut y = DVector::zeros(k_used);
        for i in (0..k_used).rev() {
            let mut sum = g[i];
            for j in (i + 1)..k_used {
                sum -= h[(i, j)] * y[j];
            }
            y[i] = if h[(i, i)] != 0.0 { sum / h[(i, i)] } else { 0.0 };
        }

        // x += P^{-1} V y
        w.fill(0.0);
        for (v_i, y_i) in basis.iter().zip(y.iter()) {
            w.axpy(*y_i, v_i, 1.0);
        }
        preconditioner
            .solve(DVectorViewMut::from(&mut z), DVectorView::from(&w))
            .map_err(|err| SolveError::new(iterations, SolveErrorKind::PreconditionerError(err)))?;
        x.axpy(1.0, &z, 1.0);

        beta = residual(&mut r, DVectorView::from(&x), iterations)?;
    }
}
