//! Variational forms and their local element kernels.
//!
//! A [`Form`] of rank `r` is a multilinear map over `r` function spaces (test space first). The
//! assembler only needs to know the elements of those spaces and how to compute the local
//! element tensor on a cell or facet. The built-in forms in this module cover the usual
//! mass/stiffness/load terms; anything else is provided by implementing the trait.
use crate::element::LagrangeElement;
use crate::geometry::CellGeometry;

mod boundary;
mod functional;
mod jump;
mod mass;
mod source;
mod stiffness;
mod tabulation;

pub use boundary::{BoundaryMassForm, BoundarySourceForm};
pub use functional::IntegralFunctional;
pub use jump::JumpPenaltyForm;
pub use mass::MassForm;
pub use source::SourceForm;
pub use stiffness::LaplaceForm;
pub(crate) use tabulation::Tabulation;

/// A form with local element kernels.
///
/// Every kernel receives a block that has been zeroed by the caller and must *add* its
/// contribution. Blocks are stored row-major over the local dofs of the arguments: for a
/// bilinear form, entry `(i, j)` of a cell block lives at `block[i * n + j]` where `n` is the
/// local dimension of the trial element. Interior facet blocks are laid out the same way over the
/// macro element formed by concatenating the dofs of both cells.
pub trait Form {
    fn rank(&self) -> usize;

    /// Human-readable description of the form, used for logging.
    fn signature(&self) -> String;

    /// The element of each argument, test space first. Empty for functionals.
    fn elements(&self) -> &[LagrangeElement];

    fn has_cell_integral(&self) -> bool {
        true
    }

    fn has_exterior_facet_integral(&self) -> bool {
        false
    }

    fn has_interior_facet_integral(&self) -> bool {
        false
    }

    fn tabulate_cell(&self, _block: &mut [f64], _cell: &CellGeometry) -> eyre::Result<()> {
        Ok(())
    }

    fn tabulate_exterior_facet(&self, _block: &mut [f64], _cell: &CellGeometry, _facet: usize) -> eyre::Result<()> {
        Ok(())
    }

    fn tabulate_interior_facet(
        &self,
        _block: &mut [f64],
        _cell0: &CellGeometry,
        _cell1: &CellGeometry,
        _facet0: usize,
        _facet1: usize,
    ) -> eyre::Result<()> {
        Ok(())
    }
}

impl<F> Form for &F
where
    F: ?Sized + Form,
{
    fn rank(&self) -> usize {
        F::rank(self)
    }

    fn signature(&self) -> String {
        F::signature(self)
    }

    fn elements(&self) -> &[LagrangeElement] {
        F::elements(self)
    }

    fn has_cell_integral(&self) -> bool {
        F::has_cell_integral(self)
    }

    fn has_exterior_facet_integral(&self) -> bool {
        F::has_exterior_facet_integral(self)
    }

    fn has_interior_facet_integral(&self) -> bool {
        F::has_interior_facet_integral(self)
    }

    fn tabulate_cell(&self, block: &mut [f64], cell: &CellGeometry) -> eyre::Result<()> {
        F::tabulate_cell(self, block, cell)
    }

    fn tabulate_exterior_facet(&self, block: &mut [f64], cell: &CellGeometry, facet: usize) -> eyre::Result<()> {
        F::tabulate_exterior_facet(self, block, cell, facet)
    }

    fn tabulate_interior_facet(
        &self,
        block: &mut [f64],
        cell0: &CellGeometry,
        cell1: &CellGeometry,
        facet0: usize,
        facet1: usize,
    ) -> eyre::Result<()> {
        F::tabulate_interior_facet(self, block, cell0, cell1, facet0, facet1)
    }
}
