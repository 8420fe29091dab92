use crate::element::LagrangeElement;
use crate::error::Result;
use crate::form::{Form, Tabulation};
use crate::geometry::CellGeometry;

/// The bilinear form `∫ κ ∇u : ∇v dx` with constant conductivity `κ`.
#[derive(Debug, Clone)]
pub struct LaplaceForm {
    elements: [LagrangeElement; 2],
    conductivity: f64,
    tabulation: Tabulation,
}

impl LaplaceForm {
    pub fn new(element: LagrangeElement) -> Result<Self> {
        Self::with_conductivity(element, 1.0)
    }

    pub fn with_conductivity(element: LagrangeElement, conductivity: f64) -> Result<Self> {
        let degree = 2 * element.degree().saturating_sub(1);
        let tabulation = Tabulation::cell(&element, degree)?;
        Ok(Self {
            elements: [element, element],
            conductivity,
            tabulation,
        })
    }
}

impl Form for LaplaceForm {
    fn rank(&self) -> usize {
        2
    }

    fn signature(&self) -> String {
        format!(
            "LaplaceForm({}, conductivity = {})",
            self.elements[0].signature(),
            self.conductivity
        )
    }

    fn elements(&self) -> &[LagrangeElement] {
        &self.elements
    }

    fn tabulate_cell(&self, block: &mut [f64], cell: &CellGeometry) -> eyre::Result<()> {
        let element = &self.elements[0];
        let ns = element.scalar_dimension();
        let n = element.space_dimension();
        let scale = self.conductivity * cell.determinant();
        for (weight, reference_gradients) in self.tabulation.weights.iter().zip(&self.tabulation.gradients) {
            let w = weight * scale;
            let gradients = cell.transform_gradients(reference_gradients);
            let products = &gradients * gradients.transpose();
            for c in 0..element.block_size() {
                for i in 0..ns {
                    for j in 0..ns {
                        block[(c * ns + i) * n + c * ns + j] += w * products[(i, j)];
                    }
                }
            }
        }
        Ok(())
    }
}
