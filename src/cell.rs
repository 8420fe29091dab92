//! Reference simplices and their lookup tables.
//!
//! Local numbering follows the UFC convention: for triangles and tetrahedra, facet `i` is the
//! facet opposite local vertex `i`, and local edges are numbered so that edge `i` of a triangle is
//! opposite vertex `i` as well. Edges of a tetrahedron are ordered
//! `(2, 3), (1, 3), (1, 2), (0, 3), (0, 2), (0, 1)`.
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    Interval,
    Triangle,
    Tetrahedron,
}

const INTERVAL_VERTICES: &[&[usize]] = &[&[0], &[1]];
const INTERVAL_CELLS: &[&[usize]] = &[&[0, 1]];

const TRIANGLE_VERTICES: &[&[usize]] = &[&[0], &[1], &[2]];
const TRIANGLE_EDGES: &[&[usize]] = &[&[1, 2], &[0, 2], &[0, 1]];
const TRIANGLE_CELLS: &[&[usize]] = &[&[0, 1, 2]];

const TETRAHEDRON_VERTICES: &[&[usize]] = &[&[0], &[1], &[2], &[3]];
const TETRAHEDRON_EDGES: &[&[usize]] = &[&[2, 3], &[1, 3], &[1, 2], &[0, 3], &[0, 2], &[0, 1]];
const TETRAHEDRON_FACES: &[&[usize]] = &[&[1, 2, 3], &[0, 2, 3], &[0, 1, 3], &[0, 1, 2]];
const TETRAHEDRON_CELLS: &[&[usize]] = &[&[0, 1, 2, 3]];

const INTERVAL_REFERENCE: &[&[f64]] = &[&[0.0], &[1.0]];
const TRIANGLE_REFERENCE: &[&[f64]] = &[&[0.0, 0.0], &[1.0, 0.0], &[0.0, 1.0]];
const TETRAHEDRON_REFERENCE: &[&[f64]] = &[
    &[0.0, 0.0, 0.0],
    &[1.0, 0.0, 0.0],
    &[0.0, 1.0, 0.0],
    &[0.0, 0.0, 1.0],
];

// Children of uniform refinement, in terms of the parent's vertices (0..nv) followed by the
// midpoints of its edges (nv + local edge index).
const INTERVAL_CHILDREN: &[&[usize]] = &[&[0, 2], &[2, 1]];
const TRIANGLE_CHILDREN: &[&[usize]] = &[&[0, 5, 4], &[5, 1, 3], &[4, 3, 2], &[3, 4, 5]];
// Bey's refinement: four corner tetrahedra, and the inner octahedron split along the diagonal
// between the midpoints of edges (0, 2) and (1, 3).
const TETRAHEDRON_CHILDREN: &[&[usize]] = &[
    &[0, 9, 8, 7],
    &[9, 1, 6, 5],
    &[8, 6, 2, 4],
    &[7, 5, 4, 3],
    &[8, 5, 9, 7],
    &[8, 5, 7, 4],
    &[8, 5, 4, 6],
    &[8, 5, 6, 9],
];

impl CellType {
    /// The simplex of the given topological dimension, if any.
    pub fn from_dim(dim: usize) -> Option<Self> {
        match dim {
            1 => Some(CellType::Interval),
            2 => Some(CellType::Triangle),
            3 => Some(CellType::Tetrahedron),
            _ => None,
        }
    }

    pub fn dim(&self) -> usize {
        match self {
            CellType::Interval => 1,
            CellType::Triangle => 2,
            CellType::Tetrahedron => 3,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.dim() + 1
    }

    /// Number of local entities of dimension `dim`, i.e. `binomial(dim() + 1, dim + 1)`.
    pub fn num_entities(&self, dim: usize) -> usize {
        self.entity_vertices(dim).len()
    }

    /// Local vertices of every local entity of dimension `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `dim` exceeds the dimension of the cell.
    pub fn entity_vertices(&self, dim: usize) -> &'static [&'static [usize]] {
        match (self, dim) {
            (CellType::Interval, 0) => INTERVAL_VERTICES,
            (CellType::Interval, 1) => INTERVAL_CELLS,
            (CellType::Triangle, 0) => TRIANGLE_VERTICES,
            (CellType::Triangle, 1) => TRIANGLE_EDGES,
            (CellType::Triangle, 2) => TRIANGLE_CELLS,
            (CellType::Tetrahedron, 0) => TETRAHEDRON_VERTICES,
            (CellType::Tetrahedron, 1) => TETRAHEDRON_EDGES,
            (CellType::Tetrahedron, 2) => TETRAHEDRON_FACES,
            (CellType::Tetrahedron, 3) => TETRAHEDRON_CELLS,
            _ => panic!("{:?} has no entities of dimension {}", self, dim),
        }
    }

    /// Local vertices of local facet `facet`.
    pub fn facet_vertices(&self, facet: usize) -> &'static [usize] {
        self.entity_vertices(self.dim() - 1)[facet]
    }

    pub fn num_facets(&self) -> usize {
        self.num_entities(self.dim() - 1)
    }

    /// The cell type of the facets, `None` for the point facets of an interval.
    pub fn facet_type(&self) -> Option<CellType> {
        CellType::from_dim(self.dim() - 1)
    }

    pub fn reference_vertices(&self) -> &'static [&'static [f64]] {
        match self {
            CellType::Interval => INTERVAL_REFERENCE,
            CellType::Triangle => TRIANGLE_REFERENCE,
            CellType::Tetrahedron => TETRAHEDRON_REFERENCE,
        }
    }

    /// Volume of the reference cell, `1 / dim!`.
    pub fn reference_volume(&self) -> f64 {
        galerkin_quadrature::simplex::reference_measure(self.dim())
    }

    /// Children of uniform refinement. Indices below `num_vertices()` refer to the parent's
    /// vertices, index `num_vertices() + e` to the midpoint of local edge `e`.
    pub fn refinement_children(&self) -> &'static [&'static [usize]] {
        match self {
            CellType::Interval => INTERVAL_CHILDREN,
            CellType::Triangle => TRIANGLE_CHILDREN,
            CellType::Tetrahedron => TETRAHEDRON_CHILDREN,
        }
    }

    /// Maps a point `s` of the reference facet simplex to reference coordinates of the cell,
    /// through the vertices of local facet `facet`.
    pub fn facet_reference_point(&self, facet: usize, s: &[f64]) -> Vec<f64> {
        let reference = self.reference_vertices();
        let facet_vertices = self.facet_vertices(facet);
        let origin = reference[facet_vertices[0]];
        let mut xi = origin.to_vec();
        for (k, s_k) in s.iter().enumerate() {
            let corner = reference[facet_vertices[k + 1]];
            for (xi_i, (c_i, o_i)) in xi.iter_mut().zip(corner.iter().zip(origin)) {
                *xi_i += s_k * (c_i - o_i);
            }
        }
        xi
    }

    pub fn name(&self) -> &'static str {
        match self {
            CellType::Interval => "interval",
            CellType::Triangle => "triangle",
            CellType::Tetrahedron => "tetrahedron",
        }
    }
}
