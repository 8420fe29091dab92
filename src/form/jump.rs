use crate::element::LagrangeElement;
use crate::error::Result;
use crate::form::{Form, Tabulation};
use crate::geometry::CellGeometry;

/// The interior-facet penalty `∫_F γ [u] · [v] dS` with `[u] = u|_0 - u|_1`.
///
/// Quadrature points are laid out on the facet as seen from the first cell and pulled back into
/// the second cell, so the two sides never need to agree on the facet's vertex order.
#[derive(Debug, Clone)]
pub struct JumpPenaltyForm {
    elements: [LagrangeElement; 2],
    penalty: f64,
    facet_tabulations: Vec<Tabulation>,
}

impl JumpPenaltyForm {
    pub fn new(element: LagrangeElement, penalty: f64) -> Result<Self> {
        let facet_tabulations = Tabulation::facets(&element, 2 * element.degree())?;
        Ok(Self {
            elements: [element, element],
            penalty,
            facet_tabulations,
        })
    }
}

impl Form for JumpPenaltyForm {
    fn rank(&self) -> usize {
        2
    }

    fn signature(&self) -> String {
        format!("JumpPenaltyForm({}, penalty = {})", self.elements[0].signature(), self.penalty)
    }

    fn elements(&self) -> &[LagrangeElement] {
        &self.elements
    }

    fn has_cell_integral(&self) -> bool {
        false
    }

    fn has_interior_facet_integral(&self) -> bool {
        true
    }

    fn tabulate_interior_facet(
        &self,
        block: &mut [f64],
        cell0: &CellGeometry,
        cell1: &CellGeometry,
        facet0: usize,
        _facet1: usize,
    ) -> eyre::Result<()> {
        let element = &self.elements[0];
        let ns = element.scalar_dimension();
        let n = element.space_dimension();
        let macro_dim = 2 * n;
        let tabulation = &self.facet_tabulations[facet0];
        let scale = self.penalty * cell0.facet_scale(facet0);

        let mut jump = vec![0.0; 2 * ns];
        for ((weight, xi0), phi0) in tabulation.weights.iter().zip(&tabulation.points).zip(&tabulation.values) {
            let x = cell0.push_forward(xi0);
            let xi1 = cell1.pull_back(x.as_slice());
            let phi1 = element.evaluate_basis(xi1.as_slice(), 0);
            for i in 0..ns {
                jump[i] = phi0[i];
                jump[ns + i] = -phi1[(i, 0)];
            }

            let w = weight * scale;
            for c in 0..element.block_size() {
                // Macro index of scalar function `a` (side a / ns, basis a % ns) of component c
                let index = |a: usize| (a / ns) * n + c * ns + a % ns;
                for a in 0..2 * ns {
                    for b in 0..2 * ns {
                        block[index(a) * macro_dim + index(b)] += w * jump[a] * jump[b];
                    }
                }
            }
        }
        Ok(())
    }
}
