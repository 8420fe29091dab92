//! Galerkin time-stepping methods cG(q) and dG(q).
use crate::error::{FemError, Result};
use crate::ode::lagrange::Lagrange;
use galerkin_quadrature::univariate::{lobatto, radau};
use log::debug;
use nalgebra::{DMatrix, DVector};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    /// cG(q): continuous piecewise polynomials of degree q, tested against discontinuous
    /// polynomials of degree q - 1.
    ContinuousGalerkin,
    /// dG(q): discontinuous piecewise polynomials of degree q.
    DiscontinuousGalerkin,
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKind::ContinuousGalerkin => write!(f, "cG"),
            MethodKind::DiscontinuousGalerkin => write!(f, "dG"),
        }
    }
}

/// Quadrature, basis and nodal weights of a Galerkin method on the reference interval `[0, 1]`.
///
/// The solution on an element is represented by `nn` nodal values. For cG(q) these are the
/// values at the Lobatto points `1, ..., q` (the value at point 0 is the end value of the
/// previous element), for dG(q) the values at the `q + 1` reflected Radau points. The last
/// nodal value of both methods sits at the end point `τ = 1`.
///
/// One fixed-point step of the element equations reads
///
/// ```text
///   values[n] = x0 + k Σ_m nweights[n][m] f(t_m),
/// ```
///
/// where `t_m` are the quadrature points mapped to the element.
#[derive(Debug, Clone)]
pub struct Method {
    kind: MethodKind,
    q: usize,
    qpoints: Vec<f64>,
    qweights: Vec<f64>,
    nweights: Vec<Vec<f64>>,
    trial: Lagrange,
    derivatives: Vec<f64>,
}

impl Method {
    pub fn new(kind: MethodKind, q: usize) -> Result<Self> {
        let method = match kind {
            MethodKind::ContinuousGalerkin => Self::continuous(q)?,
            MethodKind::DiscontinuousGalerkin => Self::discontinuous(q)?,
        };
        debug!("Initialized {}({}) with {} quadrature points", kind, q, method.num_quadrature_points());
        Ok(method)
    }

    fn continuous(q: usize) -> Result<Self> {
        if q == 0 {
            return Err(FemError::UnsupportedElement("cG(q) requires q >= 1".to_string()));
        }
        let (weights, points) = lobatto(q + 1);
        let qpoints: Vec<f64> = points.iter().map(|[x]| (x + 1.0) / 2.0).collect();
        let qweights: Vec<f64> = weights.iter().map(|w| 0.5 * w).collect();

        let trial = Lagrange::new(qpoints.clone());
        let test = if q > 1 {
            let (_, points) = lobatto(q);
            Lagrange::new(points.iter().map(|[x]| (x + 1.0) / 2.0).collect())
        } else {
            Lagrange::new(vec![1.0])
        };

        // A_ij = ∫ φ'_{j+1} ψ_i
        let a = DMatrix::from_fn(q, q, |i, j| {
            (0..q + 1)
                .map(|m| qweights[m] * trial.ddx(j + 1, qpoints[m]) * test.eval(i, qpoints[m]))
                .sum::<f64>()
        });
        let nweights = Self::nodal_weights(MethodKind::ContinuousGalerkin, q, a, &test, &qpoints, &qweights)?;
        Ok(Self::from_parts(MethodKind::ContinuousGalerkin, q, qpoints, qweights, nweights, trial))
    }

    fn discontinuous(q: usize) -> Result<Self> {
        let (weights, points) = radau(q + 1);
        // Reflect the Radau points so that the end point of the element is included
        let qpoints: Vec<f64> = (0..=q).map(|i| 1.0 - (points[q - i][0] + 1.0) / 2.0).collect();
        let qweights: Vec<f64> = (0..=q).map(|i| 0.5 * weights[q - i]).collect();

        let trial = Lagrange::new(qpoints.clone());
        let test = trial.clone();

        // A_ij = ∫ φ'_j ψ_i + φ_j(0) ψ_i(0)
        let a = DMatrix::from_fn(q + 1, q + 1, |i, j| {
            let integral: f64 = (0..q + 1)
                .map(|m| qweights[m] * trial.ddx(j, qpoints[m]) * test.eval(i, qpoints[m]))
                .sum();
            integral + trial.eval(j, 0.0) * test.eval(i, 0.0)
        });
        let nweights = Self::nodal_weights(MethodKind::DiscontinuousGalerkin, q, a, &test, &qpoints, &qweights)?;
        Ok(Self::from_parts(MethodKind::DiscontinuousGalerkin, q, qpoints, qweights, nweights, trial))
    }

    /// Solves `A w = ψ(t_m)` for every quadrature point and scales by the quadrature weight.
    fn nodal_weights(
        kind: MethodKind,
        q: usize,
        a: DMatrix<f64>,
        test: &Lagrange,
        qpoints: &[f64],
        qweights: &[f64],
    ) -> Result<Vec<Vec<f64>>> {
        let nn = a.nrows();
        let lu = a.lu();
        let mut nweights = vec![vec![0.0; qpoints.len()]; nn];
        for (m, (&t_m, &w_m)) in qpoints.iter().zip(qweights).enumerate() {
            let b = DVector::from_fn(nn, |i, _| test.eval(i, t_m));
            let w = lu
                .solve(&b)
                .ok_or_else(|| FemError::UnsupportedElement(format!("singular weight system for {}({})", kind, q)))?;
            for n in 0..nn {
                nweights[n][m] = w_m * w[n];
            }
        }
        Ok(nweights)
    }

    fn from_parts(
        kind: MethodKind,
        q: usize,
        qpoints: Vec<f64>,
        qweights: Vec<f64>,
        nweights: Vec<Vec<f64>>,
        trial: Lagrange,
    ) -> Self {
        let derivatives = (0..trial.size()).map(|i| trial.ddx(i, 1.0)).collect();
        Self {
            kind,
            q,
            qpoints,
            qweights,
            nweights,
            trial,
            derivatives,
        }
    }

    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// The polynomial degree q.
    pub fn degree(&self) -> usize {
        self.q
    }

    /// Order of convergence at the end points of the elements.
    pub fn order(&self) -> usize {
        match self.kind {
            MethodKind::ContinuousGalerkin => 2 * self.q,
            MethodKind::DiscontinuousGalerkin => 2 * self.q + 1,
        }
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.qpoints.len()
    }

    pub fn num_nodal_values(&self) -> usize {
        self.nweights.len()
    }

    pub fn quadrature_point(&self, m: usize) -> f64 {
        self.qpoints[m]
    }

    pub fn quadrature_weight(&self, m: usize) -> f64 {
        self.qweights[m]
    }

    pub fn nodal_weight(&self, n: usize, m: usize) -> f64 {
        self.nweights[n][m]
    }

    /// Reference time of the `n`-th nodal value.
    pub fn nodal_point(&self, n: usize) -> f64 {
        match self.kind {
            MethodKind::ContinuousGalerkin => self.qpoints[n + 1],
            MethodKind::DiscontinuousGalerkin => self.qpoints[n],
        }
    }

    /// Coefficient of the `n`-th nodal value in the solution at reference time `tau`.
    pub fn nodal_basis(&self, n: usize, tau: f64) -> f64 {
        match self.kind {
            MethodKind::ContinuousGalerkin => self.trial.eval(n + 1, tau),
            MethodKind::DiscontinuousGalerkin => self.trial.eval(n, tau),
        }
    }

    /// Computes new nodal values from the start value and the right-hand side at the quadrature
    /// points.
    pub fn update(&self, x0: f64, f: &[f64], k: f64, values: &mut [f64]) {
        for (value, weights) in values.iter_mut().zip(&self.nweights) {
            let sum: f64 = weights.iter().zip(f).map(|(w, f)| w * f).sum();
            *value = x0 + k * sum;
        }
    }

    /// Evaluates the solution at reference time `tau`. dG ignores `x0`.
    pub fn ueval(&self, x0: f64, values: &[f64], tau: f64) -> f64 {
        match self.kind {
            MethodKind::ContinuousGalerkin => {
                let sum: f64 = values
                    .iter()
                    .enumerate()
                    .map(|(n, v)| v * self.trial.eval(n + 1, tau))
                    .sum();
                x0 * self.trial.eval(0, tau) + sum
            }
            MethodKind::DiscontinuousGalerkin => values
                .iter()
                .enumerate()
                .map(|(n, v)| v * self.trial.eval(n, tau))
                .sum(),
        }
    }

    /// The residual `dU/dt - f` at the end point of an element of length `k`.
    pub fn residual(&self, x0: f64, values: &[f64], f: f64, k: f64) -> f64 {
        let sum: f64 = match self.kind {
            MethodKind::ContinuousGalerkin => {
                x0 * self.derivatives[0]
                    + values
                        .iter()
                        .zip(&self.derivatives[1..])
                        .map(|(v, d)| v * d)
                        .sum::<f64>()
            }
            MethodKind::DiscontinuousGalerkin => values.iter().zip(&self.derivatives).map(|(v, d)| v * d).sum(),
        };
        sum / k - f
    }

    /// The new time step for a residual `r`, given the tolerance and previous step `k0`.
    pub fn timestep(&self, r: f64, tol: f64, k0: f64, kmax: f64) -> f64 {
        if r.abs() < f64::EPSILON {
            return kmax;
        }
        let q = self.q as f64;
        let exponent = match self.kind {
            MethodKind::ContinuousGalerkin => 1.0 / (2.0 * q),
            MethodKind::DiscontinuousGalerkin => 1.0 / (2.0 * q + 1.0),
        };
        (tol * k0.powf(q) / r.abs()).powf(exponent)
    }

    /// Error estimate for an element of length `k` with end-point residual `r`.
    pub fn error(&self, k: f64, r: f64) -> f64 {
        let p = match self.kind {
            MethodKind::ContinuousGalerkin => self.q,
            MethodKind::DiscontinuousGalerkin => self.q + 1,
        };
        k.powi(p as i32) * r.abs()
    }
}

/// Methods keyed by kind and degree, built on first use.
#[derive(Debug, Default)]
pub struct MethodCache {
    methods: Mutex<FxHashMap<(MethodKind, usize), Arc<Method>>>,
}

impl MethodCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: MethodKind, q: usize) -> Result<Arc<Method>> {
        let mut methods = self.methods.lock();
        if let Some(method) = methods.get(&(kind, q)) {
            return Ok(Arc::clone(method));
        }
        let method = Arc::new(Method::new(kind, q)?);
        methods.insert((kind, q), Arc::clone(&method));
        Ok(method)
    }

    pub fn len(&self) -> usize {
        self.methods.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
