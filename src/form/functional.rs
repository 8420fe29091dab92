use crate::cell::CellType;
use crate::element::LagrangeElement;
use crate::error::Result;
use crate::form::{Form, Tabulation};
use crate::geometry::CellGeometry;
use eyre::eyre;
use std::fmt;

/// The functional `∫ f dx`, integrated with a rule exact for polynomials of the given degree.
pub struct IntegralFunctional {
    integrand: Box<dyn Fn(&[f64]) -> f64>,
    degree: usize,
    tabulation: Tabulation,
}

impl fmt::Debug for IntegralFunctional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegralFunctional")
            .field("degree", &self.degree)
            .finish_non_exhaustive()
    }
}

impl IntegralFunctional {
    pub fn new(cell_type: CellType, degree: usize, integrand: impl Fn(&[f64]) -> f64 + 'static) -> Result<Self> {
        Ok(Self {
            integrand: Box::new(integrand),
            degree,
            tabulation: Tabulation::quadrature(cell_type, degree)?,
        })
    }

    /// The measure of the domain.
    pub fn volume(cell_type: CellType) -> Result<Self> {
        Self::new(cell_type, 0, |_| 1.0)
    }
}

impl Form for IntegralFunctional {
    fn rank(&self) -> usize {
        0
    }

    fn signature(&self) -> String {
        format!("IntegralFunctional(degree = {})", self.degree)
    }

    fn elements(&self) -> &[LagrangeElement] {
        &[]
    }

    fn tabulate_cell(&self, block: &mut [f64], cell: &CellGeometry) -> eyre::Result<()> {
        for (weight, xi) in self.tabulation.weights.iter().zip(&self.tabulation.points) {
            let x = cell.push_forward(xi);
            let f = (self.integrand)(x.as_slice());
            if !f.is_finite() {
                return Err(eyre!("integrand is not finite at {:?}", x.as_slice()));
            }
            block[0] += weight * cell.determinant() * f;
        }
        Ok(())
    }
}
