use crate::ode::timeslab::TimeSlab;
use crate::ode::Ode;
use galerkin_sparse::{DiagonalPreconditioner, LinearOperator};
use nalgebra::{DVector, DVectorView, DVectorViewMut};
use std::error::Error;

/// A derivative `df_i/du_j` frozen at a quadrature point, together with the element of
/// component `j` that covers the point.
#[derive(Debug, Copy, Clone, PartialEq)]
struct Coupling {
    dfdu: f64,
    element: usize,
    tau: f64,
}

/// The Jacobian `J = I - dG/dx` of the slab equations `x = G(x)`, applied matrix-free.
///
/// The derivatives of the right-hand side are evaluated once in [`update`](Self::update) and
/// reused for every product until the next update. Couplings to the slab start are dropped
/// since the initial state is not an unknown.
#[derive(Debug)]
pub(crate) struct SlabJacobian<'a> {
    slab: &'a TimeSlab,
    // Couplings of quadrature point m of element e are couplings[offsets[e * nq + m]..offsets[e * nq + m + 1]]
    offsets: Vec<usize>,
    couplings: Vec<Coupling>,
    preconditioner: DiagonalPreconditioner,
}

impl<'a> SlabJacobian<'a> {
    pub fn new(slab: &'a TimeSlab) -> Self {
        let n = slab.nodal_values().len();
        Self {
            slab,
            offsets: vec![0],
            couplings: Vec::new(),
            preconditioner: DiagonalPreconditioner::from_diagonal(DVector::repeat(n, 1.0)),
        }
    }

    /// Freezes the derivatives of `f` at the nodal values `x`.
    pub fn update<O>(&mut self, ode: &O, x: &[f64])
    where
        O: ?Sized + Ode,
    {
        let slab = self.slab;
        let method = slab.method();
        let nn = method.num_nodal_values();
        let nq = method.num_quadrature_points();
        let dependencies = slab.dependencies();

        self.offsets.clear();
        self.couplings.clear();
        self.offsets.push(0);

        let mut diagonal = DVector::repeat(x.len(), 1.0);
        let mut state = slab.initial_state().to_vec();
        for (e, element) in slab.elements().iter().enumerate() {
            let i = element.component;
            let k = element.length();
            for m in 0..nq {
                let t = slab.quadrature_time(element, m);
                for j in dependencies.get(i) {
                    state[j] = slab.interpolate(x, j, t);
                }
                for j in dependencies.get(i) {
                    let Some(covering) = slab.element_at(j, t) else {
                        continue;
                    };
                    let dfdu = ode.dfdu(&state, t, i, j);
                    let tau = slab.elements()[covering].tau(t);
                    if covering == e {
                        for n in 0..nn {
                            diagonal[element.offset + n] -=
                                k * method.nodal_weight(n, m) * dfdu * method.nodal_basis(n, tau);
                        }
                    }
                    self.couplings.push(Coupling {
                        dfdu,
                        element: covering,
                        tau,
                    });
                }
                self.offsets.push(self.couplings.len());
            }
        }

        diagonal.apply(|d| {
            if *d == 0.0 {
                *d = 1.0
            }
        });
        self.preconditioner = DiagonalPreconditioner::from_diagonal(diagonal);
    }

    /// Jacobi preconditioner built from the exact diagonal of the Jacobian.
    pub fn preconditioner(&self) -> &DiagonalPreconditioner {
        &self.preconditioner
    }
}

impl LinearOperator for SlabJacobian<'_> {
    fn apply(&self, mut y: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        let slab = self.slab;
        let method = slab.method();
        let nn = method.num_nodal_values();
        let nq = method.num_quadrature_points();
        let elements = slab.elements();
        let v = x.as_slice();
        let dx0 = |e: usize| slab.x0_dof(e).map_or(0.0, |dof| v[dof]);

        let mut sums = vec![0.0; nq];
        for (e, element) in elements.iter().enumerate() {
            for (m, sum) in sums.iter_mut().enumerate() {
                let range = self.offsets[e * nq + m]..self.offsets[e * nq + m + 1];
                *sum = self.couplings[range]
                    .iter()
                    .map(|coupling| {
                        let covering = &elements[coupling.element];
                        let values = &v[covering.offset..covering.offset + nn];
                        coupling.dfdu * method.ueval(dx0(coupling.element), values, coupling.tau)
                    })
                    .sum();
            }

            let k = element.length();
            let x0 = dx0(e);
            for n in 0..nn {
                let integral: f64 = sums
                    .iter()
                    .enumerate()
                    .map(|(m, sum)| method.nodal_weight(n, m) * sum)
                    .sum();
                let dof = element.offset + n;
                y[dof] = v[dof] - x0 - k * integral;
            }
        }
        Ok(())
    }
}
