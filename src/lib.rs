//! Finite element assembly on simplex meshes and multi-adaptive Galerkin time stepping.
//!
//! The finite element kernel is organized around a few concepts:
//!
//! - [`Mesh`](mesh::Mesh): simplicial meshes with full topological connectivity.
//! - [`DofMap`](dofmap::DofMap): the mapping from local to global degrees of freedom.
//! - [`Form`](form::Form): the local element kernels of a variational form.
//! - [`Assembler`](assembly::Assembler): assembles forms into any
//!   [`GenericTensor`](galerkin_sparse::GenericTensor).
//!
//! The [`ode`] module integrates systems of ODEs with cG(q) and dG(q) methods, using individual
//! time steps for every component.
pub mod assembly;
pub mod cell;
pub mod dofmap;
pub mod element;
pub mod error;
pub mod form;
pub mod geometry;
pub mod mesh;
pub mod ode;

pub mod optimize {
    pub use galerkin_optimize::*;
}

pub mod quadrature {
    pub use galerkin_quadrature::*;
}

pub mod sparse {
    pub use galerkin_sparse::*;
}

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

pub use error::{FemError, Result};
