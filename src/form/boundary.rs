use crate::element::LagrangeElement;
use crate::error::Result;
use crate::form::{Form, Tabulation};
use crate::geometry::CellGeometry;
use eyre::eyre;
use std::fmt;

/// The bilinear form `∫_∂Ω α u · v ds` over the exterior facets, with constant `α`.
#[derive(Debug, Clone)]
pub struct BoundaryMassForm {
    elements: [LagrangeElement; 2],
    coefficient: f64,
    facet_tabulations: Vec<Tabulation>,
}

impl BoundaryMassForm {
    pub fn new(element: LagrangeElement, coefficient: f64) -> Result<Self> {
        let facet_tabulations = Tabulation::facets(&element, 2 * element.degree())?;
        Ok(Self {
            elements: [element, element],
            coefficient,
            facet_tabulations,
        })
    }
}

impl Form for BoundaryMassForm {
    fn rank(&self) -> usize {
        2
    }

    fn signature(&self) -> String {
        format!(
            "BoundaryMassForm({}, coefficient = {})",
            self.elements[0].signature(),
            self.coefficient
        )
    }

    fn elements(&self) -> &[LagrangeElement] {
        &self.elements
    }

    fn has_cell_integral(&self) -> bool {
        false
    }

    fn has_exterior_facet_integral(&self) -> bool {
        true
    }

    fn tabulate_exterior_facet(&self, block: &mut [f64], cell: &CellGeometry, facet: usize) -> eyre::Result<()> {
        let element = &self.elements[0];
        let ns = element.scalar_dimension();
        let n = element.space_dimension();
        let tabulation = &self.facet_tabulations[facet];
        let scale = self.coefficient * cell.facet_scale(facet);
        for (weight, phi) in tabulation.weights.iter().zip(&tabulation.values) {
            let w = weight * scale;
            for c in 0..element.block_size() {
                for i in 0..ns {
                    for j in 0..ns {
                        block[(c * ns + i) * n + c * ns + j] += w * phi[i] * phi[j];
                    }
                }
            }
        }
        Ok(())
    }
}

/// The linear form `∫_∂Ω g v ds` over the exterior facets for a boundary source `g(x)`.
pub struct BoundarySourceForm {
    elements: [LagrangeElement; 1],
    source: Box<dyn Fn(&[f64]) -> f64>,
    facet_tabulations: Vec<Tabulation>,
}

impl fmt::Debug for BoundarySourceForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundarySourceForm")
            .field("element", &self.elements[0])
            .finish_non_exhaustive()
    }
}

impl BoundarySourceForm {
    pub fn new(element: LagrangeElement, source: impl Fn(&[f64]) -> f64 + 'static) -> Result<Self> {
        let facet_tabulations = Tabulation::facets(&element, element.degree() + 2)?;
        Ok(Self {
            elements: [element],
            source: Box::new(source),
            facet_tabulations,
        })
    }
}

impl Form for BoundarySourceForm {
    fn rank(&self) -> usize {
        1
    }

    fn signature(&self) -> String {
        format!("BoundarySourceForm({})", self.elements[0].signature())
    }

    fn elements(&self) -> &[LagrangeElement] {
        &self.elements
    }

    fn has_cell_integral(&self) -> bool {
        false
    }

    fn has_exterior_facet_integral(&self) -> bool {
        true
    }

    fn tabulate_exterior_facet(&self, block: &mut [f64], cell: &CellGeometry, facet: usize) -> eyre::Result<()> {
        let element = &self.elements[0];
        let ns = element.scalar_dimension();
        let tabulation = &self.facet_tabulations[facet];
        let scale = cell.facet_scale(facet);
        for ((weight, xi), phi) in tabulation.weights.iter().zip(&tabulation.points).zip(&tabulation.values) {
            let x = cell.push_forward(xi);
            let g = (self.source)(x.as_slice());
            if !g.is_finite() {
                return Err(eyre!("boundary source is not finite at {:?}", x.as_slice()));
            }
            let w = weight * scale * g;
            for c in 0..element.block_size() {
                for i in 0..ns {
                    block[c * ns + i] += w * phi[i];
                }
            }
        }
        Ok(())
    }
}
