//! Simplicial meshes with full derived connectivity.
use crate::cell::CellType;
use crate::error::{FemError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

mod editor;
mod function;
pub mod procedural;
pub mod refinement;
mod topology;

pub use editor::MeshEditor;
pub use function::MeshFunction;
pub use topology::{Connectivity, MeshTopology};

static NEXT_MESH_ID: AtomicUsize = AtomicUsize::new(0);

fn next_mesh_id() -> usize {
    NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed)
}

/// A conforming simplicial mesh: vertex coordinates plus the topology derived from the cells.
///
/// The topology is immutable once the mesh is built. Coordinates may be moved in place through
/// [`coordinates_mut`](Self::coordinates_mut), which is all that mesh motion needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MeshData", into = "MeshData")]
pub struct Mesh {
    id: usize,
    geometric_dim: usize,
    coordinates: Vec<f64>,
    topology: MeshTopology,
}

/// The serialized form of a mesh. The topology is rebuilt (and validated) on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MeshData {
    cell_type: CellType,
    geometric_dim: usize,
    coordinates: Vec<f64>,
    cells: Vec<usize>,
}

impl From<Mesh> for MeshData {
    fn from(mesh: Mesh) -> Self {
        let nv = mesh.cell_type().num_vertices();
        let mut cells = Vec::with_capacity(nv * mesh.num_cells());
        for cell in mesh.topology.connectivity(mesh.topological_dim(), 0).iter() {
            cells.extend_from_slice(cell);
        }
        Self {
            cell_type: mesh.cell_type(),
            geometric_dim: mesh.geometric_dim,
            coordinates: mesh.coordinates,
            cells,
        }
    }
}

impl TryFrom<MeshData> for Mesh {
    type Error = FemError;

    fn try_from(data: MeshData) -> Result<Self> {
        Mesh::from_vertices_and_cells(data.cell_type, data.geometric_dim, data.coordinates, data.cells)
    }
}

impl PartialEq for Mesh {
    /// Meshes compare equal when geometry and topology agree, regardless of their identity.
    fn eq(&self, other: &Self) -> bool {
        self.geometric_dim == other.geometric_dim
            && self.coordinates == other.coordinates
            && self.topology == other.topology
    }
}

impl Mesh {
    /// Builds a mesh from flat coordinate and cell → vertex arrays.
    ///
    /// This is a shorthand for feeding every vertex and cell through a [`MeshEditor`] and
    /// performs the same validation.
    pub fn from_vertices_and_cells(
        cell_type: CellType,
        geometric_dim: usize,
        coordinates: Vec<f64>,
        cells: Vec<usize>,
    ) -> Result<Self> {
        if geometric_dim == 0 || coordinates.len() % geometric_dim != 0 {
            return Err(FemError::consistency(format!(
                "{} coordinates cannot be split into vertices of dimension {}",
                coordinates.len(),
                geometric_dim
            )));
        }
        let nv = cell_type.num_vertices();
        if cells.len() % nv != 0 {
            return Err(FemError::consistency(format!(
                "{} cell vertex indices cannot be split into cells of {} vertices",
                cells.len(),
                nv
            )));
        }
        let mut editor = MeshEditor::open(cell_type, geometric_dim)?;
        editor.init_vertices(coordinates.len() / geometric_dim);
        editor.init_cells(cells.len() / nv);
        for (i, x) in coordinates.chunks_exact(geometric_dim).enumerate() {
            editor.add_vertex(i, x)?;
        }
        for (i, cell) in cells.chunks_exact(nv).enumerate() {
            editor.add_cell(i, cell)?;
        }
        editor.close()
    }

    /// Assembles a mesh from already validated parts.
    fn from_parts(geometric_dim: usize, coordinates: Vec<f64>, topology: MeshTopology) -> Self {
        Self {
            id: next_mesh_id(),
            geometric_dim,
            coordinates,
            topology,
        }
    }

    /// Identifier of the topology of this mesh.
    ///
    /// Clones share the identifier of the original, since they share its topology. Refinement
    /// and deserialization produce meshes with fresh identifiers.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn cell_type(&self) -> CellType {
        self.topology.cell_type()
    }

    pub fn topological_dim(&self) -> usize {
        self.topology.dim()
    }

    pub fn geometric_dim(&self) -> usize {
        self.geometric_dim
    }

    pub fn topology(&self) -> &MeshTopology {
        &self.topology
    }

    pub fn num_entities(&self, dim: usize) -> usize {
        self.topology.num_entities(dim)
    }

    pub fn num_vertices(&self) -> usize {
        self.num_entities(0)
    }

    pub fn num_cells(&self) -> usize {
        self.num_entities(self.topological_dim())
    }

    pub fn num_facets(&self) -> usize {
        self.num_entities(self.topological_dim() - 1)
    }

    /// Incidence table from entities of dimension `from` to entities of dimension `to`.
    pub fn connectivity(&self, from: usize, to: usize) -> &Connectivity {
        self.topology.connectivity(from, to)
    }

    pub fn coordinates(&self, vertex: usize) -> &[f64] {
        let d = self.geometric_dim;
        &self.coordinates[d * vertex..d * (vertex + 1)]
    }

    /// All vertex coordinates, stored contiguously vertex by vertex.
    pub fn all_coordinates(&self) -> &[f64] {
        &self.coordinates
    }

    /// Mutable access to all vertex coordinates. The topology is unaffected.
    pub fn coordinates_mut(&mut self) -> &mut [f64] {
        &mut self.coordinates
    }

    pub fn vertex_coordinates_mut(&mut self, vertex: usize) -> &mut [f64] {
        let d = self.geometric_dim;
        &mut self.coordinates[d * vertex..d * (vertex + 1)]
    }

    /// Vertices of the given cell, in the order the cell was created with.
    pub fn cell_vertices(&self, cell: usize) -> &[usize] {
        self.connectivity(self.topological_dim(), 0).get(cell)
    }

    /// The position of the facet in the cell's local facet list.
    ///
    /// # Panics
    ///
    /// Panics if the facet is not a facet of the cell.
    pub fn local_facet_index(&self, cell: usize, facet: usize) -> usize {
        let tdim = self.topological_dim();
        self.connectivity(tdim, tdim - 1)
            .get(cell)
            .iter()
            .position(|&f| f == facet)
            .unwrap_or_else(|| panic!("facet {} is not a facet of cell {}", facet, cell))
    }

    /// Facets with exactly one incident cell, in increasing order.
    pub fn exterior_facets(&self) -> Vec<usize> {
        let tdim = self.topological_dim();
        self.connectivity(tdim - 1, tdim)
            .iter()
            .enumerate()
            .filter(|(_, cells)| cells.len() == 1)
            .map(|(f, _)| f)
            .collect()
    }

    /// Facets shared by two cells, in increasing order.
    pub fn interior_facets(&self) -> Vec<usize> {
        let tdim = self.topological_dim();
        self.connectivity(tdim - 1, tdim)
            .iter()
            .enumerate()
            .filter(|(_, cells)| cells.len() == 2)
            .map(|(f, _)| f)
            .collect()
    }

    /// Vertices lying on an exterior facet, in increasing order.
    pub fn boundary_vertices(&self) -> Vec<usize> {
        let facet_vertices = self.connectivity(self.topological_dim() - 1, 0);
        let mut vertices: Vec<usize> = self
            .exterior_facets()
            .into_iter()
            .flat_map(|f| facet_vertices.get(f).iter().copied())
            .collect();
        vertices.sort_unstable();
        vertices.dedup();
        vertices
    }

    /// Arithmetic mean of the vertices of an entity.
    pub fn entity_midpoint(&self, dim: usize, entity: usize) -> Vec<f64> {
        let vertices = self.connectivity(dim, 0).get(entity);
        let mut midpoint = vec![0.0; self.geometric_dim];
        for &v in vertices {
            for (m, x) in midpoint.iter_mut().zip(self.coordinates(v)) {
                *m += x;
            }
        }
        let n = vertices.len() as f64;
        midpoint.iter_mut().for_each(|m| *m /= n);
        midpoint
    }

    pub fn cell_midpoint(&self, cell: usize) -> Vec<f64> {
        self.entity_midpoint(self.topological_dim(), cell)
    }

    /// Measure (length, area, volume) of an entity of dimension >= 1.
    pub fn entity_volume(&self, dim: usize, entity: usize) -> f64 {
        let vertices = self.connectivity(dim, 0).get(entity);
        let jacobian = self.simplex_jacobian(vertices);
        pseudo_determinant(&jacobian) * galerkin_quadrature::simplex::reference_measure(dim)
    }

    pub fn cell_volume(&self, cell: usize) -> f64 {
        self.entity_volume(self.topological_dim(), cell)
    }

    /// Length of the longest edge of the cell.
    pub fn cell_diameter(&self, cell: usize) -> f64 {
        let vertices = self.cell_vertices(cell);
        let mut diameter: f64 = 0.0;
        for (i, &a) in vertices.iter().enumerate() {
            for &b in &vertices[i + 1..] {
                let distance = self
                    .coordinates(a)
                    .iter()
                    .zip(self.coordinates(b))
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f64>()
                    .sqrt();
                diameter = diameter.max(distance);
            }
        }
        diameter
    }

    /// Smallest cell diameter.
    pub fn hmin(&self) -> f64 {
        (0..self.num_cells())
            .map(|c| self.cell_diameter(c))
            .fold(f64::INFINITY, f64::min)
    }

    /// Largest cell diameter.
    pub fn hmax(&self) -> f64 {
        (0..self.num_cells())
            .map(|c| self.cell_diameter(c))
            .fold(0.0, f64::max)
    }

    /// The `gdim x (n - 1)` matrix of edge vectors `x_i - x_0` of a simplex.
    pub(crate) fn simplex_jacobian(&self, vertices: &[usize]) -> DMatrix<f64> {
        let x0 = self.coordinates(vertices[0]);
        DMatrix::from_fn(self.geometric_dim, vertices.len() - 1, |i, j| {
            self.coordinates(vertices[j + 1])[i] - x0[i]
        })
    }

    /// Uniform refinement, see [`refinement::refine_uniformly`].
    pub fn refine(&self) -> Result<Mesh> {
        refinement::refine_uniformly(self)
    }
}

/// `sqrt(det(J^T J))`, which equals `|det J|` for square `J`. Points have unit measure.
pub(crate) fn pseudo_determinant(jacobian: &DMatrix<f64>) -> f64 {
    if jacobian.ncols() == 0 {
        1.0
    } else if jacobian.is_square() {
        jacobian.determinant().abs()
    } else {
        (jacobian.transpose() * jacobian).determinant().max(0.0).sqrt()
    }
}
