//! Generic global tensors filled by assembly.
//!
//! Local blocks are passed as flat slices in row-major order over the local indices, i.e. for a
//! rank-2 block with local row indices `rows` and local column indices `cols`, entry `(i, j)` is
//! stored at `block[i * cols.len() + j]`.
use itertools::izip;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;

/// Shape information used to (re-)initialize a tensor before assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TensorLayout {
    Scalar,
    Vector { len: usize },
    Matrix { pattern: SparsityPattern },
}

impl TensorLayout {
    pub fn rank(&self) -> usize {
        match self {
            TensorLayout::Scalar => 0,
            TensorLayout::Vector { .. } => 1,
            TensorLayout::Matrix { .. } => 2,
        }
    }

    pub fn dims(&self) -> Vec<usize> {
        match self {
            TensorLayout::Scalar => Vec::new(),
            TensorLayout::Vector { len } => vec![*len],
            TensorLayout::Matrix { pattern } => vec![pattern.major_dim(), pattern.minor_dim()],
        }
    }
}

pub trait GenericTensor {
    fn rank(&self) -> usize;

    /// Global dimension along each of the `rank()` axes.
    fn dims(&self) -> Vec<usize>;

    /// Resizes the tensor to the layout and zeroes all entries.
    ///
    /// # Panics
    ///
    /// Panics if the rank of the layout differs from the rank of the tensor.
    fn init(&mut self, layout: &TensorLayout);

    fn zero(&mut self);

    /// Adds a local block to the entries given by one index slice per axis.
    fn add(&mut self, block: &[f64], indices: &[&[usize]]);

    /// Finalizes deferred accumulation. Must be called after all `add` calls and before any read.
    fn apply(&mut self) {}
}

pub trait GenericVector: GenericTensor {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, i: usize) -> f64;

    fn set(&mut self, i: usize, value: f64);
}

pub trait GenericMatrix: GenericTensor {
    fn nrows(&self) -> usize;

    fn ncols(&self) -> usize;

    /// Returns the entry `(i, j)`, zero if it is not stored.
    fn get(&self, i: usize, j: usize) -> f64;

    /// Sets the entry `(i, j)`.
    ///
    /// # Panics
    ///
    /// Sparse matrices panic if the entry is not part of the sparsity pattern.
    fn set(&mut self, i: usize, j: usize, value: f64);

    /// Zeroes the given rows, optionally putting a one on the diagonal.
    fn zero_rows(&mut self, rows: &[usize], unit_diagonal: bool);

    /// Replaces the given rows by the corresponding rows of the identity matrix.
    fn ident_rows(&mut self, rows: &[usize]) {
        self.zero_rows(rows, true);
    }

    /// Moves the columns `j` with `columns[j] = Some(g_j)` to the right-hand side.
    ///
    /// Accumulates `lifted[i] += A_ij g_j` for every row and zeroes those columns.
    fn eliminate_columns(&mut self, columns: &[Option<f64>], lifted: &mut [f64]);

    /// y = A x
    fn mult(&self, x: &DVector<f64>, y: &mut DVector<f64>);
}

fn check_rank(layout: &TensorLayout, rank: usize) {
    assert_eq!(
        layout.rank(),
        rank,
        "cannot initialize a rank {} tensor with a rank {} layout",
        rank,
        layout.rank()
    );
}

/// A rank-0 tensor, i.e. the value of an assembled functional.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Scalar {
    value: f64,
}

impl Scalar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl GenericTensor for Scalar {
    fn rank(&self) -> usize {
        0
    }

    fn dims(&self) -> Vec<usize> {
        Vec::new()
    }

    fn init(&mut self, layout: &TensorLayout) {
        check_rank(layout, 0);
        self.value = 0.0;
    }

    fn zero(&mut self) {
        self.value = 0.0;
    }

    fn add(&mut self, block: &[f64], indices: &[&[usize]]) {
        assert!(indices.is_empty(), "a scalar takes no indices");
        self.value += block[0];
    }
}

impl GenericTensor for DVector<f64> {
    fn rank(&self) -> usize {
        1
    }

    fn dims(&self) -> Vec<usize> {
        vec![self.nrows()]
    }

    fn init(&mut self, layout: &TensorLayout) {
        check_rank(layout, 1);
        let dims = layout.dims();
        *self = DVector::zeros(dims[0]);
    }

    fn zero(&mut self) {
        self.fill(0.0);
    }

    fn add(&mut self, block: &[f64], indices: &[&[usize]]) {
        let &[rows] = indices else {
            panic!("a vector takes exactly one index slice")
        };
        assert_eq!(block.len(), rows.len(), "block size must match the number of indices");
        for (&i, &value) in rows.iter().zip(block) {
            self[i] += value;
        }
    }
}

impl GenericVector for DVector<f64> {
    fn len(&self) -> usize {
        self.nrows()
    }

    fn get(&self, i: usize) -> f64 {
        self[i]
    }

    fn set(&mut self, i: usize, value: f64) {
        self[i] = value;
    }
}

fn split_matrix_indices<'a>(block: &[f64], indices: &[&'a [usize]]) -> (&'a [usize], &'a [usize]) {
    let &[rows, cols] = indices else {
        panic!("a matrix takes exactly two index slices")
    };
    assert_eq!(
        block.len(),
        rows.len() * cols.len(),
        "block size must match the number of indices"
    );
    (rows, cols)
}

impl GenericTensor for DMatrix<f64> {
    fn rank(&self) -> usize {
        2
    }

    fn dims(&self) -> Vec<usize> {
        vec![self.nrows(), self.ncols()]
    }

    fn init(&mut self, layout: &TensorLayout) {
        check_rank(layout, 2);
        let dims = layout.dims();
        *self = DMatrix::zeros(dims[0], dims[1]);
    }

    fn zero(&mut self) {
        self.fill(0.0);
    }

    fn add(&mut self, block: &[f64], indices: &[&[usize]]) {
        let (rows, cols) = split_matrix_indices(block, indices);
        for (local_row, &i) in rows.iter().enumerate() {
            let block_row = &block[local_row * cols.len()..(local_row + 1) * cols.len()];
            for (&j, &value) in cols.iter().zip(block_row) {
                self[(i, j)] += value;
            }
        }
    }
}

impl GenericMatrix for DMatrix<f64> {
    fn nrows(&self) -> usize {
        self.shape().0
    }

    fn ncols(&self) -> usize {
        self.shape().1
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self[(i, j)]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        self[(i, j)] = value;
    }

    fn zero_rows(&mut self, rows: &[usize], unit_diagonal: bool) {
        for &i in rows {
            self.row_mut(i).fill(0.0);
            if unit_diagonal {
                self[(i, i)] = 1.0;
            }
        }
    }

    fn eliminate_columns(&mut self, columns: &[Option<f64>], lifted: &mut [f64]) {
        assert_eq!(columns.len(), self.shape().1);
        assert_eq!(lifted.len(), self.shape().0);
        for (j, g_j) in columns.iter().enumerate() {
            if let Some(g_j) = g_j {
                let mut column = self.column_mut(j);
                for (l_i, a_ij) in lifted.iter_mut().zip(column.iter_mut()) {
                    *l_i += *a_ij * g_j;
                    *a_ij = 0.0;
                }
            }
        }
    }

    fn mult(&self, x: &DVector<f64>, y: &mut DVector<f64>) {
        y.gemv(1.0, self, x, 0.0);
    }
}

impl GenericTensor for CsrMatrix<f64> {
    fn rank(&self) -> usize {
        2
    }

    fn dims(&self) -> Vec<usize> {
        vec![self.nrows(), self.ncols()]
    }

    fn init(&mut self, layout: &TensorLayout) {
        let TensorLayout::Matrix { pattern } = layout else {
            panic!("a sparse matrix can only be initialized from a sparsity pattern")
        };
        let values = vec![0.0; pattern.nnz()];
        *self = CsrMatrix::try_from_pattern_and_values(pattern.clone(), values)
            .expect("values have the same length as the pattern");
    }

    fn zero(&mut self) {
        self.values_mut().fill(0.0);
    }

    fn add(&mut self, block: &[f64], indices: &[&[usize]]) {
        let (rows, cols) = split_matrix_indices(block, indices);
        for (local_row, &i) in rows.iter().enumerate() {
            let block_row = &block[local_row * cols.len()..(local_row + 1) * cols.len()];
            let mut csr_row = self.row_mut(i);
            let (csr_cols, csr_values) = csr_row.cols_and_values_mut();
            for (&j, &value) in cols.iter().zip(block_row) {
                let idx = csr_cols
                    .binary_search(&j)
                    .unwrap_or_else(|_| panic!("entry ({}, {}) is outside the sparsity pattern", i, j));
                csr_values[idx] += value;
            }
        }
    }
}

impl GenericMatrix for CsrMatrix<f64> {
    fn nrows(&self) -> usize {
        CsrMatrix::nrows(self)
    }

    fn ncols(&self) -> usize {
        CsrMatrix::ncols(self)
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        let row = self.row(i);
        match row.col_indices().binary_search(&j) {
            Ok(idx) => row.values()[idx],
            Err(_) => 0.0,
        }
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        let mut row = self.row_mut(i);
        let (cols, values) = row.cols_and_values_mut();
        let idx = cols
            .binary_search(&j)
            .unwrap_or_else(|_| panic!("entry ({}, {}) is outside the sparsity pattern", i, j));
        values[idx] = value;
    }

    fn zero_rows(&mut self, rows: &[usize], unit_diagonal: bool) {
        for &i in rows {
            let mut row = self.row_mut(i);
            let (cols, values) = row.cols_and_values_mut();
            let mut found_diagonal = false;
            for (&j, v) in izip!(cols.iter(), values.iter_mut()) {
                *v = if unit_diagonal && i == j { 1.0 } else { 0.0 };
                found_diagonal |= i == j;
            }
            assert!(
                found_diagonal || !unit_diagonal,
                "diagonal entry ({}, {}) is outside the sparsity pattern",
                i,
                i
            );
        }
    }

    fn eliminate_columns(&mut self, columns: &[Option<f64>], lifted: &mut [f64]) {
        assert_eq!(columns.len(), CsrMatrix::ncols(self));
        assert_eq!(lifted.len(), CsrMatrix::nrows(self));
        for (mut row, l_i) in self.row_iter_mut().zip(lifted.iter_mut()) {
            let (cols, values) = row.cols_and_values_mut();
            for (&j, a_ij) in izip!(cols.iter(), values.iter_mut()) {
                if let Some(g_j) = columns[j] {
                    *l_i += *a_ij * g_j;
                    *a_ij = 0.0;
                }
            }
        }
    }

    fn mult(&self, x: &DVector<f64>, y: &mut DVector<f64>) {
        assert_eq!(x.len(), CsrMatrix::ncols(self));
        assert_eq!(y.len(), CsrMatrix::nrows(self));
        for (y_i, row) in y.iter_mut().zip(self.row_iter()) {
            *y_i = izip!(row.col_indices(), row.values())
                .map(|(&j, a_ij)| a_ij * x[j])
                .sum();
        }
    }
}
