use crate::cell::CellType;
use crate::error::{FemError, Result};
use crate::mesh::{Mesh, MeshTopology};
use log::debug;

/// Append-only construction of a [`Mesh`].
///
/// The number of vertices and cells is declared up front, every vertex and cell is then added
/// exactly once by index, and [`close`](Self::close) validates the input and derives the full
/// topology.
///
/// ```
/// # use galerkin::cell::CellType;
/// # use galerkin::mesh::MeshEditor;
/// let mut editor = MeshEditor::open(CellType::Triangle, 2).unwrap();
/// editor.init_vertices(3);
/// editor.init_cells(1);
/// editor.add_vertex(0, &[0.0, 0.0]).unwrap();
/// editor.add_vertex(1, &[1.0, 0.0]).unwrap();
/// editor.add_vertex(2, &[0.0, 1.0]).unwrap();
/// editor.add_cell(0, &[0, 1, 2]).unwrap();
/// let mesh = editor.close().unwrap();
/// assert_eq!(mesh.num_entities(1), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MeshEditor {
    cell_type: CellType,
    geometric_dim: usize,
    coordinates: Vec<f64>,
    cells: Vec<usize>,
    vertex_added: Vec<bool>,
    cell_added: Vec<bool>,
}

impl MeshEditor {
    pub fn open(cell_type: CellType, geometric_dim: usize) -> Result<Self> {
        if geometric_dim < cell_type.dim() || geometric_dim > 3 {
            return Err(FemError::consistency(format!(
                "a {} mesh cannot be embedded in {} dimensions",
                cell_type.name(),
                geometric_dim
            )));
        }
        Ok(Self {
            cell_type,
            geometric_dim,
            coordinates: Vec::new(),
            cells: Vec::new(),
            vertex_added: Vec::new(),
            cell_added: Vec::new(),
        })
    }

    /// Declares the total number of vertices.
    pub fn init_vertices(&mut self, num_vertices: usize) {
        self.coordinates = vec![0.0; num_vertices * self.geometric_dim];
        self.vertex_added = vec![false; num_vertices];
    }

    /// Declares the total number of cells.
    pub fn init_cells(&mut self, num_cells: usize) {
        self.cells = vec![0; num_cells * self.cell_type.num_vertices()];
        self.cell_added = vec![false; num_cells];
    }

    pub fn add_vertex(&mut self, index: usize, coordinates: &[f64]) -> Result<()> {
        if index >= self.vertex_added.len() {
            return Err(FemError::consistency(format!(
                "vertex index {} is out of range (mesh has {} vertices)",
                index,
                self.vertex_added.len()
            )));
        }
        if coordinates.len() != self.geometric_dim {
            return Err(FemError::consistency(format!(
                "vertex {} has {} coordinates, expected {}",
                index,
                coordinates.len(),
                self.geometric_dim
            )));
        }
        if self.vertex_added[index] {
            return Err(FemError::consistency(format!("vertex {} was added twice", index)));
        }
        let d = self.geometric_dim;
        self.coordinates[d * index..d * (index + 1)].copy_from_slice(coordinates);
        self.vertex_added[index] = true;
        Ok(())
    }

    pub fn add_cell(&mut self, index: usize, vertices: &[usize]) -> Result<()> {
        let nv = self.cell_type.num_vertices();
        if index >= self.cell_added.len() {
            return Err(FemError::consistency(format!(
                "cell index {} is out of range (mesh has {} cells)",
                index,
                self.cell_added.len()
            )));
        }
        if vertices.len() != nv {
            return Err(FemError::consistency(format!(
                "cell {} has {} vertices, a {} has {}",
                index,
                vertices.len(),
                self.cell_type.name(),
                nv
            )));
        }
        if let Some(&v) = vertices.iter().find(|&&v| v >= self.vertex_added.len()) {
            return Err(FemError::consistency(format!(
                "cell {} refers to vertex {}, but the mesh has {} vertices",
                index,
                v,
                self.vertex_added.len()
            )));
        }
        for (i, v) in vertices.iter().enumerate() {
            if vertices[i + 1..].contains(v) {
                return Err(FemError::consistency(format!("cell {} repeats vertex {}", index, v)));
            }
        }
        if self.cell_added[index] {
            return Err(FemError::consistency(format!("cell {} was added twice", index)));
        }
        self.cells[nv * index..nv * (index + 1)].copy_from_slice(vertices);
        self.cell_added[index] = true;
        Ok(())
    }

    /// Validates the mesh and computes all derived entities and connectivity.
    pub fn close(self) -> Result<Mesh> {
        let missing_vertices = self.vertex_added.iter().filter(|added| !**added).count();
        if missing_vertices > 0 {
            return Err(FemError::consistency(format!(
                "{} of {} declared vertices were never added",
                missing_vertices,
                self.vertex_added.len()
            )));
        }
        let missing_cells = self.cell_added.iter().filter(|added| !**added).count();
        if missing_cells > 0 {
            return Err(FemError::consistency(format!(
                "{} of {} declared cells were never added",
                missing_cells,
                self.cell_added.len()
            )));
        }

        let topology = MeshTopology::build(self.cell_type, self.vertex_added.len(), &self.cells);
        debug!(
            "Closed {} mesh with {} vertices and {} cells",
            self.cell_type.name(),
            topology.num_entities(0),
            topology.num_entities(self.cell_type.dim())
        );
        Ok(Mesh::from_parts(self.geometric_dim, self.coordinates, topology))
    }
}
