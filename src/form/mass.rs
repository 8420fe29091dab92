use crate::element::LagrangeElement;
use crate::error::Result;
use crate::form::{Form, Tabulation};
use crate::geometry::CellGeometry;

/// The bilinear form `∫ ρ u · v dx` with constant density `ρ`.
#[derive(Debug, Clone)]
pub struct MassForm {
    elements: [LagrangeElement; 2],
    density: f64,
    tabulation: Tabulation,
}

impl MassForm {
    pub fn new(element: LagrangeElement) -> Result<Self> {
        Self::with_density(element, 1.0)
    }

    pub fn with_density(element: LagrangeElement, density: f64) -> Result<Self> {
        let tabulation = Tabulation::cell(&element, 2 * element.degree())?;
        Ok(Self {
            elements: [element, element],
            density,
            tabulation,
        })
    }
}

impl Form for MassForm {
    fn rank(&self) -> usize {
        2
    }

    fn signature(&self) -> String {
        format!("MassForm({}, density = {})", self.elements[0].signature(), self.density)
    }

    fn elements(&self) -> &[LagrangeElement] {
        &self.elements
    }

    fn tabulate_cell(&self, block: &mut [f64], cell: &CellGeometry) -> eyre::Result<()> {
        let element = &self.elements[0];
        let ns = element.scalar_dimension();
        let n = element.space_dimension();
        let scale = self.density * cell.determinant();
        for (weight, phi) in self.tabulation.weights.iter().zip(&self.tabulation.values) {
            let w = weight * scale;
            for c in 0..element.block_size() {
                for i in 0..ns {
                    let row = &mut block[(c * ns + i) * n..(c * ns + i + 1) * n];
                    for j in 0..ns {
                        row[c * ns + j] += w * phi[i] * phi[j];
                    }
                }
            }
        }
        Ok(())
    }
}
