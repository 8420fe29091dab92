//! Sparse and dense linear algebra used by the `galerkin` kernel.
//!
//! The assembler only talks to the tensor traits in [`tensor`], so that the same assembly loop
//! fills a CSR matrix, a dense matrix, a vector or a scalar. The Krylov solver in [`gmres`] only
//! talks to the operator traits in [`operator`].

pub mod gmres;
pub mod operator;
pub mod tensor;

pub use gmres::{gmres, GmresOutput, GmresSettings, SolveError, SolveErrorKind};
pub use operator::{DiagonalPreconditioner, IdentityOperator, LinearOperator, Preconditioner};
pub use tensor::{GenericMatrix, GenericTensor, GenericVector, Scalar, TensorLayout};

pub use nalgebra_sparse::pattern::SparsityPattern;
pub use nalgebra_sparse::CsrMatrix;
