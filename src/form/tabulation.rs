use crate::cell::CellType;
use crate::element::LagrangeElement;
use crate::error::Result;
use galerkin_quadrature::simplex::simplex_rule_for_degree;
use nalgebra::{DMatrix, DVector};

/// A reference quadrature rule together with the scalar basis tabulated at its points.
///
/// Facet tabulations carry the weights of the reference *facet* and points mapped into the
/// reference *cell*, so that the basis can be evaluated directly.
#[derive(Debug, Clone)]
pub(crate) struct Tabulation {
    pub weights: Vec<f64>,
    pub points: Vec<Vec<f64>>,
    pub values: Vec<DVector<f64>>,
    pub gradients: Vec<DMatrix<f64>>,
}

impl Tabulation {
    /// Points and weights on the reference cell, without a basis.
    pub fn quadrature(cell_type: CellType, degree: usize) -> Result<Self> {
        let rule = simplex_rule_for_degree(cell_type.dim(), degree)?;
        Ok(Self {
            weights: rule.weights().to_vec(),
            points: rule.points().map(<[f64]>::to_vec).collect(),
            values: Vec::new(),
            gradients: Vec::new(),
        })
    }

    pub fn cell(element: &LagrangeElement, degree: usize) -> Result<Self> {
        let mut tabulation = Self::quadrature(element.cell_type(), degree)?;
        tabulation.tabulate_basis(element);
        Ok(tabulation)
    }

    pub fn facet(element: &LagrangeElement, facet: usize, degree: usize) -> Result<Self> {
        let cell_type = element.cell_type();
        let rule = simplex_rule_for_degree(cell_type.dim() - 1, degree)?;
        let mut tabulation = Self {
            weights: rule.weights().to_vec(),
            points: rule
                .points()
                .map(|s| cell_type.facet_reference_point(facet, s))
                .collect(),
            values: Vec::new(),
            gradients: Vec::new(),
        };
        tabulation.tabulate_basis(element);
        Ok(tabulation)
    }

    /// One tabulation per local facet of the element's cell.
    pub fn facets(element: &LagrangeElement, degree: usize) -> Result<Vec<Self>> {
        (0..element.cell_type().num_facets())
            .map(|facet| Self::facet(element, facet, degree))
            .collect()
    }

    fn tabulate_basis(&mut self, element: &LagrangeElement) {
        self.values = self
            .points
            .iter()
            .map(|xi| element.evaluate_basis(xi, 0).column(0).into_owned())
            .collect();
        self.gradients = self
            .points
            .iter()
            .map(|xi| element.evaluate_basis(xi, 1))
            .collect();
    }

    pub fn num_points(&self) -> usize {
        self.weights.len()
    }
}
