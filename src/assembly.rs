//! Assembly of forms into global tensors.
//!
//! The [`Assembler`] loops over cells and facets in index order, evaluates the local kernels
//! of a [`Form`] and scatters the local blocks into any
//! [`GenericTensor`](galerkin_sparse::GenericTensor). The free functions
//! in this module are shorthands that assemble into fresh tensors with a throwaway assembler.
use crate::error::Result;
use crate::form::Form;
use crate::mesh::Mesh;
use galerkin_sparse::{CsrMatrix, Scalar};
use nalgebra::DVector;

mod boundary;
mod global;
mod pattern;

pub use boundary::{BoundaryCondition, BoundarySelection, DirichletBc};
pub use global::{Assembler, SubDomains};
pub use pattern::build_sparsity_pattern;

/// Assembles a bilinear form into a new CSR matrix.
pub fn assemble_matrix<F>(form: &F, mesh: &Mesh) -> Result<CsrMatrix<f64>>
where
    F: ?Sized + Form,
{
    let mut matrix = CsrMatrix::zeros(0, 0);
    Assembler::new().assemble(&mut matrix, form, mesh)?;
    Ok(matrix)
}

/// Assembles a linear form into a new vector.
pub fn assemble_vector<F>(form: &F, mesh: &Mesh) -> Result<DVector<f64>>
where
    F: ?Sized + Form,
{
    let mut vector = DVector::zeros(0);
    Assembler::new().assemble(&mut vector, form, mesh)?;
    Ok(vector)
}

/// Assembles a functional.
pub fn assemble_scalar<F>(form: &F, mesh: &Mesh) -> Result<f64>
where
    F: ?Sized + Form,
{
    let mut scalar = Scalar::new();
    Assembler::new().assemble(&mut scalar, form, mesh)?;
    Ok(scalar.value())
}

/// Assembles a linear system `A x = b` with Dirichlet conditions applied symmetrically.
///
/// See [`Assembler::assemble_system`].
pub fn assemble_system<A, L>(
    bilinear_form: &A,
    linear_form: &L,
    mesh: &Mesh,
    bcs: &[&DirichletBc],
) -> Result<(CsrMatrix<f64>, DVector<f64>)>
where
    A: ?Sized + Form,
    L: ?Sized + Form,
{
    let mut matrix = CsrMatrix::zeros(0, 0);
    let mut vector = DVector::zeros(0);
    Assembler::new().assemble_system(&mut matrix, &mut vector, bilinear_form, linear_form, mesh, bcs)?;
    Ok((matrix, vector))
}
