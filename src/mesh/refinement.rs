//! Uniform mesh refinement.
//!
//! Every edge is bisected and every cell is replaced by its children according to
//! [`CellType::refinement_children`](crate::cell::CellType::refinement_children): intervals split
//! into 2, triangles into 4 and tetrahedra into 8 cells.
use crate::error::Result;
use crate::mesh::Mesh;
use log::debug;

/// Refines every cell of the mesh once.
///
/// The vertices of the input mesh keep their indices. The midpoint of global edge `e` becomes
/// vertex `num_vertices + e`. The refined mesh is built through the mesh editor, so all
/// topological invariants are checked again.
pub fn refine_uniformly(mesh: &Mesh) -> Result<Mesh> {
    let tdim = mesh.topological_dim();
    let gdim = mesh.geometric_dim();
    let cell_type = mesh.cell_type();
    let num_vertices = mesh.num_vertices();
    let num_edges = mesh.num_entities(1);

    let mut coordinates = Vec::with_capacity(gdim * (num_vertices + num_edges));
    coordinates.extend_from_slice(mesh.all_coordinates());
    for edge in 0..num_edges {
        coordinates.extend(mesh.entity_midpoint(1, edge));
    }

    let children = cell_type.refinement_children();
    let mut cells = Vec::with_capacity(children.len() * cell_type.num_vertices() * mesh.num_cells());
    let mut local_to_global = Vec::with_capacity(cell_type.num_vertices() + cell_type.num_entities(1));
    for cell in 0..mesh.num_cells() {
        local_to_global.clear();
        local_to_global.extend_from_slice(mesh.cell_vertices(cell));
        if tdim == 1 {
            local_to_global.push(num_vertices + cell);
        } else {
            let edges = mesh.connectivity(tdim, 1).get(cell);
            local_to_global.extend(edges.iter().map(|e| num_vertices + e));
        }
        for child in children {
            cells.extend(child.iter().map(|&local| local_to_global[local]));
        }
    }

    debug!(
        "Refined {} mesh from {} to {} cells",
        cell_type.name(),
        mesh.num_cells(),
        children.len() * mesh.num_cells()
    );
    Mesh::from_vertices_and_cells(cell_type, gdim, coordinates, cells)
}
