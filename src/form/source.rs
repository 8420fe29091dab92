use crate::element::LagrangeElement;
use crate::error::Result;
use crate::form::{Form, Tabulation};
use crate::geometry::CellGeometry;
use eyre::eyre;
use std::fmt;

/// The linear form `∫ f v dx` for a source `f(x)`, applied to every component of `v`.
pub struct SourceForm {
    elements: [LagrangeElement; 1],
    source: Box<dyn Fn(&[f64]) -> f64>,
    tabulation: Tabulation,
}

impl fmt::Debug for SourceForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceForm")
            .field("element", &self.elements[0])
            .finish_non_exhaustive()
    }
}

impl SourceForm {
    pub fn new(element: LagrangeElement, source: impl Fn(&[f64]) -> f64 + 'static) -> Result<Self> {
        // Two extra orders for the (generally non-polynomial) source
        let tabulation = Tabulation::cell(&element, element.degree() + 2)?;
        Ok(Self {
            elements: [element],
            source: Box::new(source),
            tabulation,
        })
    }
}

impl Form for SourceForm {
    fn rank(&self) -> usize {
        1
    }

    fn signature(&self) -> String {
        format!("SourceForm({})", self.elements[0].signature())
    }

    fn elements(&self) -> &[LagrangeElement] {
        &self.elements
    }

    fn tabulate_cell(&self, block: &mut [f64], cell: &CellGeometry) -> eyre::Result<()> {
        let element = &self.elements[0];
        let ns = element.scalar_dimension();
        let tabulation = &self.tabulation;
        for ((weight, xi), phi) in tabulation.weights.iter().zip(&tabulation.points).zip(&tabulation.values) {
            let x = cell.push_forward(xi);
            let f = (self.source)(x.as_slice());
            if !f.is_finite() {
                return Err(eyre!("source is not finite at {:?} in cell {}", x.as_slice(), cell.index()));
            }
            let w = weight * cell.determinant() * f;
            for c in 0..element.block_size() {
                for i in 0..ns {
                    block[c * ns + i] += w * phi[i];
                }
            }
        }
        Ok(())
    }
}
