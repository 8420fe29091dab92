use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};
use nalgebra_sparse::CsrMatrix;
use std::error::Error;
use std::fmt;

/// A linear operator `y = A x` that is only known through its action.
pub trait LinearOperator {
    fn apply(&self, y: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), Box<dyn Error>>;
}

impl<'a, A> LinearOperator for &'a A
where
    A: ?Sized + LinearOperator,
{
    fn apply(&self, y: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        <A as LinearOperator>::apply(self, y, x)
    }
}

impl LinearOperator for DMatrix<f64> {
    fn apply(&self, mut y: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        y.gemv(1.0, self, &x, 0.0);
        Ok(())
    }
}

impl LinearOperator for CsrMatrix<f64> {
    fn apply(&self, mut y: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        assert_eq!(self.ncols(), x.len(), "operator and input vector dimensions must agree");
        assert_eq!(self.nrows(), y.len(), "operator and output vector dimensions must agree");
        for (i, row) in self.row_iter().enumerate() {
            y[i] = row
                .col_indices()
                .iter()
                .zip(row.values())
                .map(|(&j, a_ij)| a_ij * x[j])
                .sum();
        }
        Ok(())
    }
}

/// Approximate inverse of an operator, `x ~= A^{-1} b`.
pub trait Preconditioner {
    fn solve(&self, x: DVectorViewMut<f64>, b: DVectorView<f64>) -> Result<(), Box<dyn Error>>;
}

impl<'a, P> Preconditioner for &'a P
where
    P: ?Sized + Preconditioner,
{
    fn solve(&self, x: DVectorViewMut<f64>, b: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        <P as Preconditioner>::solve(self, x, b)
    }
}

pub struct IdentityOperator;

impl LinearOperator for IdentityOperator {
    fn apply(&self, mut y: DVectorViewMut<f64>, x: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        y.copy_from(&x);
        Ok(())
    }
}

impl Preconditioner for IdentityOperator {
    fn solve(&self, mut x: DVectorViewMut<f64>, b: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        x.copy_from(&b);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZeroDiagonalEntry {
    pub index: usize,
}

impl fmt::Display for ZeroDiagonalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "diagonal entry {} of the preconditioned operator is zero", self.index)
    }
}

impl Error for ZeroDiagonalEntry {}

/// Jacobi preconditioner `x_i = b_i / d_i`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagonalPreconditioner {
    diagonal: DVector<f64>,
}

impl DiagonalPreconditioner {
    pub fn from_diagonal(diagonal: DVector<f64>) -> Self {
        Self { diagonal }
    }

    /// Extracts the diagonal of a CSR matrix. Entries missing from the pattern count as zero.
    pub fn from_csr(matrix: &CsrMatrix<f64>) -> Self {
        let diagonal = DVector::from_fn(matrix.nrows(), |i, _| {
            matrix.get_entry(i, i).map(|entry| entry.into_value()).unwrap_or(0.0)
        });
        Self { diagonal }
    }

    pub fn diagonal(&self) -> &DVector<f64> {
        &self.diagonal
    }

    pub fn diagonal_mut(&mut self) -> &mut DVector<f64> {
        &mut self.diagonal
    }
}

impl Preconditioner for DiagonalPreconditioner {
    fn solve(&self, mut x: DVectorViewMut<f64>, b: DVectorView<f64>) -> Result<(), Box<dyn Error>> {
        assert_eq!(x.len(), self.diagonal.len());
        for (i, &d_i) in self.diagonal.iter().enumerate() {
            if d_i == 0.0 {
                return Err(Box::new(ZeroDiagonalEntry { index: i }));
            }
            x[i] = b[i] / d_i;
        }
        Ok(())
    }
}
