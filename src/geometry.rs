//! Affine geometry of a single mesh cell.
use crate::cell::CellType;
use crate::error::{FemError, Result};
use crate::mesh::{pseudo_determinant, Mesh};
use nalgebra::{DMatrix, DVector};

/// The affine map `x = x0 + J ξ` from the reference cell to a physical cell.
///
/// `J` is `gdim x tdim`. For cells embedded in a higher-dimensional space (manifolds) the
/// determinant is the pseudo-determinant `sqrt(det(J^T J))` and `J^{-T}` is the transpose of the
/// pseudo-inverse, `J (J^T J)^{-1}`.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGeometry {
    cell_type: CellType,
    index: usize,
    geometric_dim: usize,
    vertices: Vec<f64>,
    jacobian: DMatrix<f64>,
    determinant: f64,
    jacobian_inverse_transpose: DMatrix<f64>,
}

impl CellGeometry {
    /// Geometry of cell `cell` of the mesh.
    pub fn new(mesh: &Mesh, cell: usize) -> Result<Self> {
        let mut vertices = Vec::with_capacity(mesh.cell_type().num_vertices() * mesh.geometric_dim());
        for &v in mesh.cell_vertices(cell) {
            vertices.extend_from_slice(mesh.coordinates(v));
        }
        Self::from_vertices(mesh.cell_type(), cell, mesh.geometric_dim(), vertices)
    }

    /// Geometry of a cell given by its vertex coordinates, stored vertex by vertex.
    pub fn from_vertices(cell_type: CellType, index: usize, geometric_dim: usize, vertices: Vec<f64>) -> Result<Self> {
        let tdim = cell_type.dim();
        assert_eq!(vertices.len(), geometric_dim * cell_type.num_vertices());
        let x = |v: usize, i: usize| vertices[geometric_dim * v + i];
        let jacobian = DMatrix::from_fn(geometric_dim, tdim, |i, j| x(j + 1, i) - x(0, i));
        let determinant = pseudo_determinant(&jacobian);
        let degenerate = || FemError::consistency(format!("cell {} is degenerate", index));
        if !(determinant > 0.0) || !determinant.is_finite() {
            return Err(degenerate());
        }
        let metric_inverse = (jacobian.transpose() * &jacobian)
            .try_inverse()
            .ok_or_else(degenerate)?;
        let jacobian_inverse_transpose = &jacobian * metric_inverse;
        Ok(Self {
            cell_type,
            index,
            geometric_dim,
            vertices,
            jacobian,
            determinant,
            jacobian_inverse_transpose,
        })
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    /// Index of the cell in its mesh.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn geometric_dim(&self) -> usize {
        self.geometric_dim
    }

    pub fn topological_dim(&self) -> usize {
        self.cell_type.dim()
    }

    pub fn vertex(&self, local_vertex: usize) -> &[f64] {
        let d = self.geometric_dim;
        &self.vertices[d * local_vertex..d * (local_vertex + 1)]
    }

    pub fn jacobian(&self) -> &DMatrix<f64> {
        &self.jacobian
    }

    /// `|det J|`, or the pseudo-determinant for manifolds.
    pub fn determinant(&self) -> f64 {
        self.determinant
    }

    pub fn jacobian_inverse_transpose(&self) -> &DMatrix<f64> {
        &self.jacobian_inverse_transpose
    }

    pub fn volume(&self) -> f64 {
        self.determinant * self.cell_type.reference_volume()
    }

    /// Maps a reference point to physical coordinates.
    pub fn push_forward(&self, xi: &[f64]) -> DVector<f64> {
        let xi = DVector::from_column_slice(xi);
        DVector::from_column_slice(self.vertex(0)) + &self.jacobian * xi
    }

    /// Maps a physical point back to reference coordinates (the least-squares inverse of
    /// [`push_forward`](Self::push_forward) for manifolds).
    pub fn pull_back(&self, x: &[f64]) -> DVector<f64> {
        let dx = DVector::from_column_slice(x) - DVector::from_column_slice(self.vertex(0));
        self.jacobian_inverse_transpose.tr_mul(&dx)
    }

    /// Transforms reference gradients (one row per function, `tdim` columns) to physical
    /// gradients (one row per function, `gdim` columns).
    pub fn transform_gradients(&self, reference_gradients: &DMatrix<f64>) -> DMatrix<f64> {
        reference_gradients * self.jacobian_inverse_transpose.transpose()
    }

    /// Scaling from the reference facet to the physical facet (one for point facets).
    pub fn facet_scale(&self, facet: usize) -> f64 {
        let facet_vertices = self.cell_type.facet_vertices(facet);
        let origin = self.vertex(facet_vertices[0]);
        let tangents = DMatrix::from_fn(self.geometric_dim, facet_vertices.len() - 1, |i, j| {
            self.vertex(facet_vertices[j + 1])[i] - origin[i]
        });
        pseudo_determinant(&tangents)
    }

    pub fn facet_measure(&self, facet: usize) -> f64 {
        let facet_dim = self.topological_dim() - 1;
        self.facet_scale(facet) * galerkin_quadrature::simplex::reference_measure(facet_dim)
    }

    /// Outward unit normal of a local facet, lying in the tangent space of the cell.
    pub fn facet_normal(&self, facet: usize) -> DVector<f64> {
        let facet_vertices = self.cell_type.facet_vertices(facet);
        let opposite = (0..self.cell_type.num_vertices())
            .find(|v| !facet_vertices.contains(v))
            .expect("a facet never contains all vertices of its cell");
        let origin = DVector::from_column_slice(self.vertex(facet_vertices[0]));
        let mut normal = &origin - DVector::from_column_slice(self.vertex(opposite));
        if facet_vertices.len() > 1 {
            let tangents = DMatrix::from_fn(self.geometric_dim, facet_vertices.len() - 1, |i, j| {
                self.vertex(facet_vertices[j + 1])[i] - origin[i]
            });
            let metric = tangents.transpose() * &tangents;
            if let Some(metric_inverse) = metric.try_inverse() {
                let projection = &tangents * (metric_inverse * tangents.tr_mul(&normal));
                normal -= projection;
            }
        }
        let norm = normal.norm();
        normal / norm
    }
}
