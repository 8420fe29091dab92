//! Lagrange finite elements on simplices.
//!
//! Basis functions are written in terms of the barycentric coordinates
//! `λ_0 = 1 - Σ ξ_k`, `λ_{k+1} = ξ_k` of the reference cell, which makes derivatives of any order
//! simple to evaluate exactly.
use crate::cell::CellType;
use crate::error::{FemError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Placement of degrees of freedom on the entities of a cell.
///
/// `entity_dofs[d]` is the number of (scalar) dofs attached to each entity of dimension `d`.
/// Local dofs are numbered entity by entity, in increasing dimension and local entity order;
/// block (vector-valued) layouts repeat the scalar numbering once per component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DofLayout {
    pub cell_type: CellType,
    pub entity_dofs: Vec<usize>,
    pub block_size: usize,
}

/// Position of a local dof: the entity it is attached to and its index within that entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LocalDof {
    pub dim: usize,
    pub local_entity: usize,
    pub k: usize,
    pub component: usize,
}

impl DofLayout {
    pub fn new(cell_type: CellType, entity_dofs: Vec<usize>, block_size: usize) -> Self {
        assert_eq!(entity_dofs.len(), cell_type.dim() + 1, "need a dof count for every entity dimension");
        assert!(block_size > 0, "block size must be positive");
        Self {
            cell_type,
            entity_dofs,
            block_size,
        }
    }

    /// Number of local dofs of one component.
    pub fn scalar_dimension(&self) -> usize {
        self.entity_dofs
            .iter()
            .enumerate()
            .map(|(d, n)| n * self.cell_type.num_entities(d))
            .sum()
    }

    /// Number of local dofs.
    pub fn local_dimension(&self) -> usize {
        self.block_size * self.scalar_dimension()
    }

    /// Entity and intra-entity position of every local dof, in local order.
    pub fn local_dofs(&self) -> Vec<LocalDof> {
        let mut dofs = Vec::with_capacity(self.local_dimension());
        for component in 0..self.block_size {
            for (dim, &n) in self.entity_dofs.iter().enumerate() {
                for local_entity in 0..self.cell_type.num_entities(dim) {
                    for k in 0..n {
                        dofs.push(LocalDof {
                            dim,
                            local_entity,
                            k,
                            component,
                        });
                    }
                }
            }
        }
        dofs
    }

    /// Local dofs attached to the closure of a local facet (its vertices, edges, ...).
    pub fn facet_dofs(&self, facet: usize) -> Vec<usize> {
        let facet_vertices = self.cell_type.facet_vertices(facet);
        self.local_dofs()
            .iter()
            .enumerate()
            .filter(|(_, dof)| {
                dof.dim < self.cell_type.dim()
                    && self.cell_type.entity_vertices(dof.dim)[dof.local_entity]
                        .iter()
                        .all(|v| facet_vertices.contains(v))
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Canonical name of the layout, used as cache key.
    pub fn signature(&self) -> String {
        format!(
            "DofLayout({}, {:?}, block_size = {})",
            self.cell_type.name(),
            self.entity_dofs,
            self.block_size
        )
    }
}

/// Continuous (degree >= 1) or discontinuous (degree 0) Lagrange element, optionally repeated
/// over `block_size` components.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LagrangeElement {
    cell_type: CellType,
    degree: usize,
    block_size: usize,
}

impl LagrangeElement {
    pub fn new(cell_type: CellType, degree: usize) -> Result<Self> {
        Self::vector(cell_type, degree, 1)
    }

    /// A vector-valued element with `block_size` components.
    pub fn vector(cell_type: CellType, degree: usize, block_size: usize) -> Result<Self> {
        if degree > 2 {
            return Err(FemError::UnsupportedElement(format!(
                "Lagrange elements of degree {} are not available",
                degree
            )));
        }
        if block_size == 0 {
            return Err(FemError::UnsupportedElement(
                "an element needs at least one component".to_string(),
            ));
        }
        Ok(Self {
            cell_type,
            degree,
            block_size,
        })
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of scalar dofs per entity of dimension `dim`.
    pub fn entity_dofs(&self, dim: usize) -> usize {
        let tdim = self.cell_type.dim();
        match (self.degree, dim) {
            (0, d) if d == tdim => 1,
            (1, 0) => 1,
            (2, 0) | (2, 1) => 1,
            _ => 0,
        }
    }

    pub fn dof_layout(&self) -> DofLayout {
        let entity_dofs = (0..=self.cell_type.dim()).map(|d| self.entity_dofs(d)).collect();
        DofLayout::new(self.cell_type, entity_dofs, self.block_size)
    }

    /// Number of scalar basis functions.
    pub fn scalar_dimension(&self) -> usize {
        self.dof_layout().scalar_dimension()
    }

    /// Number of local dofs, including all components.
    pub fn space_dimension(&self) -> usize {
        self.block_size * self.scalar_dimension()
    }

    pub fn signature(&self) -> String {
        if self.block_size == 1 {
            format!("Lagrange({}, {})", self.cell_type.name(), self.degree)
        } else {
            format!(
                "VectorLagrange({}, {}, {})",
                self.cell_type.name(),
                self.degree,
                self.block_size
            )
        }
    }

    /// Reference coordinates of the scalar dofs, one row per dof.
    ///
    /// Vertex dofs sit on the vertices, edge dofs on the edge midpoints, and the single dof of a
    /// degree 0 element on the cell centroid.
    pub fn reference_dof_coordinates(&self) -> DMatrix<f64> {
        let tdim = self.cell_type.dim();
        let reference = self.cell_type.reference_vertices();
        let layout = self.dof_layout();
        let scalar_dofs: Vec<_> = layout.local_dofs().into_iter().filter(|d| d.component == 0).collect();
        let mut coordinates = DMatrix::zeros(scalar_dofs.len(), tdim);
        for (row, dof) in scalar_dofs.iter().enumerate() {
            let vertices = self.cell_type.entity_vertices(dof.dim)[dof.local_entity];
            for &v in vertices {
                for i in 0..tdim {
                    coordinates[(row, i)] += reference[v][i] / vertices.len() as f64;
                }
            }
        }
        coordinates
    }

    /// Evaluates the derivatives of order `n` of every scalar basis function at a reference
    /// point.
    ///
    /// The result has one row per basis function and `tdim^n` columns, one per derivative
    /// multi-index `(k_1, ..., k_n)` in row-major order. `n = 0` yields the values. Derivatives
    /// of order higher than the degree vanish.
    pub fn evaluate_basis(&self, xi: &[f64], n: usize) -> DMatrix<f64> {
        let tdim = self.cell_type.dim();
        assert_eq!(xi.len(), tdim, "reference point must have one coordinate per dimension");
        let num_columns = tdim.pow(n as u32);
        let mut result = DMatrix::zeros(self.scalar_dimension(), num_columns);

        let lambda = barycentric(xi);
        // dλ_a / dξ_k
        let dlambda = |a: usize, k: usize| -> f64 {
            if a == 0 {
                -1.0
            } else if a == k + 1 {
                1.0
            } else {
                0.0
            }
        };
        let multi_index = |column: usize| -> Vec<usize> {
            let mut index = vec![0; n];
            let mut c = column;
            for slot in index.iter_mut().rev() {
                *slot = c % tdim;
                c /= tdim;
            }
            index
        };

        match self.degree {
            0 => {
                if n == 0 {
                    result[(0, 0)] = 1.0;
                }
            }
            1 => {
                for a in 0..=tdim {
                    for column in 0..num_columns {
                        let index = multi_index(column);
                        result[(a, column)] = match n {
                            0 => lambda[a],
                            1 => dlambda(a, index[0]),
                            _ => 0.0,
                        };
                    }
                }
            }
            2 => {
                // Vertex functions λ_a (2 λ_a - 1), then edge functions 4 λ_a λ_b
                for a in 0..=tdim {
                    for column in 0..num_columns {
                        let index = multi_index(column);
                        result[(a, column)] = match n {
                            0 => lambda[a] * (2.0 * lambda[a] - 1.0),
                            1 => (4.0 * lambda[a] - 1.0) * dlambda(a, index[0]),
                            2 => 4.0 * dlambda(a, index[0]) * dlambda(a, index[1]),
                            _ => 0.0,
                        };
                    }
                }
                for (e, edge) in self.cell_type.entity_vertices(1).iter().enumerate() {
                    let (a, b) = (edge[0], edge[1]);
                    for column in 0..num_columns {
                        let index = multi_index(column);
                        result[(tdim + 1 + e, column)] = match n {
                            0 => 4.0 * lambda[a] * lambda[b],
                            1 => 4.0 * (dlambda(a, index[0]) * lambda[b] + lambda[a] * dlambda(b, index[0])),
                            2 => {
                                4.0 * (dlambda(a, index[0]) * dlambda(b, index[1])
                                    + dlambda(a, index[1]) * dlambda(b, index[0]))
                            }
                            _ => 0.0,
                        };
                    }
                }
            }
            _ => unreachable!("element degree is checked on construction"),
        }
        result
    }
}

fn barycentric(xi: &[f64]) -> Vec<f64> {
    let mut lambda = Vec::with_capacity(xi.len() + 1);
    lambda.push(1.0 - xi.iter().sum::<f64>());
    lambda.extend_from_slice(xi);
    lambda
}
