use crate::ode::Ode;
use galerkin_optimize::calculus::approximate_jacobian_fd;
use itertools::Either;
use log::info;
use nalgebra::DVector;

/// Which components of the solution each component of the right-hand side depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependencies {
    size: usize,
    // None means that every component depends on every other
    sparsity: Option<Vec<Vec<usize>>>,
}

impl Dependencies {
    pub fn dense(size: usize) -> Self {
        Self { size, sparsity: None }
    }

    /// No dependencies at all, to be filled in with [`set`](Self::set).
    pub fn sparse(size: usize) -> Self {
        Self {
            size,
            sparsity: Some(vec![Vec::new(); size]),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_sparse(&self) -> bool {
        self.sparsity.is_some()
    }

    /// Records that component `i` depends on component `j`.
    ///
    /// A dense structure becomes sparse on the first call, starting from no dependencies.
    pub fn set(&mut self, i: usize, j: usize) {
        assert!(i < self.size && j < self.size, "dependency ({}, {}) out of bounds", i, j);
        let size = self.size;
        let rows = self.sparsity.get_or_insert_with(|| vec![Vec::new(); size]);
        if let Err(position) = rows[i].binary_search(&j) {
            rows[i].insert(position, j);
        }
    }

    /// The components that component `i` depends on, in increasing order.
    pub fn get(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        match &self.sparsity {
            None => Either::Left(0..self.size),
            Some(rows) => Either::Right(rows[i].iter().copied()),
        }
    }

    pub fn num_dependencies(&self, i: usize) -> usize {
        match &self.sparsity {
            None => self.size,
            Some(rows) => rows[i].len(),
        }
    }

    /// The reverse dependencies: `j` depends on `i` in the result iff `i` depends on `j` here.
    pub fn transpose(&self) -> Self {
        match &self.sparsity {
            None => self.clone(),
            Some(rows) => {
                let mut transposed = vec![Vec::new(); self.size];
                for (i, row) in rows.iter().enumerate() {
                    for &j in row {
                        transposed[j].push(i);
                    }
                }
                Self {
                    size: self.size,
                    sparsity: Some(transposed),
                }
            }
        }
    }

    /// Detects the dependencies of the right-hand side at `(u, t)` by perturbing every component.
    ///
    /// A dependency that happens to have a vanishing derivative at `(u, t)` is missed, so the
    /// state should be generic.
    pub fn detect<O>(ode: &O, u: &[f64], t: f64) -> Self
    where
        O: ?Sized + Ode,
    {
        let n = ode.size();
        assert_eq!(u.len(), n, "state must match the size of the system");
        let scale = u.iter().fold(1.0f64, |m, u_i| m.max(u_i.abs()));
        let h = f64::EPSILON.sqrt() * scale;
        let mut x = DVector::from_column_slice(u);
        let jacobian = approximate_jacobian_fd(
            n,
            |x, mut y| ode.f(x.as_slice(), t, y.as_mut_slice()),
            &mut x,
            h,
        );

        let mut dependencies = Self::sparse(n);
        for i in 0..n {
            for j in 0..n {
                if jacobian[(i, j)] != 0.0 {
                    dependencies.set(i, j);
                }
            }
        }
        let nnz: usize = (0..n).map(|i| dependencies.num_dependencies(i)).sum();
        info!(
            "Detected {} dependencies for {} components ({:.1}% dense)",
            nnz,
            n,
            100.0 * nnz as f64 / (n * n).max(1) as f64
        );
        dependencies
    }
}
