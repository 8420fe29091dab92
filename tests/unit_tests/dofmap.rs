use galerkin::cell::CellType;
use galerkin::dofmap::{DofMap, DofMapCache};
use galerkin::element::{DofLayout, LagrangeElement};
use galerkin::error::FemError;
use galerkin::mesh::procedural::{unit_cube, unit_square};
use galerkin::mesh::Mesh;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

fn dofmap(mesh: &Mesh, degree: usize, block_size: usize) -> DofMap {
    let element = LagrangeElement::vector(mesh.cell_type(), degree, block_size).unwrap();
    DofMap::build(&element.dof_layout(), mesh).unwrap()
}

#[test]
fn global_dimensions() {
    let mesh = unit_square(3, 3);
    assert_eq!(dofmap(&mesh, 0, 1).global_dimension(), mesh.num_cells());
    assert_eq!(dofmap(&mesh, 1, 1).global_dimension(), mesh.num_vertices());
    assert_eq!(
        dofmap(&mesh, 2, 1).global_dimension(),
        mesh.num_vertices() + mesh.num_entities(1)
    );
    assert_eq!(dofmap(&mesh, 1, 2).global_dimension(), 2 * mesh.num_vertices());
    assert_eq!(dofmap(&mesh, 2, 1).local_dimension(), 6);
}

#[test]
fn every_global_dof_is_used() {
    let mesh = unit_cube(2, 1, 1);
    for degree in 0..=2 {
        let dofmap = dofmap(&mesh, degree, 3);
        let used: BTreeSet<usize> = (0..mesh.num_cells())
            .flat_map(|cell| dofmap.tabulate_dofs(cell).to_vec())
            .collect();
        assert_eq!(used.len(), dofmap.global_dimension());
        assert_eq!(used.iter().next_back().copied(), Some(dofmap.global_dimension() - 1));
    }
}

#[test]
fn vertex_dof_coordinates_match_the_vertices() {
    let mesh = unit_square(2, 2);
    let dofmap = dofmap(&mesh, 1, 1);
    for cell in 0..mesh.num_cells() {
        let coordinates = dofmap.tabulate_coordinates(cell, &mesh);
        for (local, &dof) in dofmap.tabulate_dofs(cell).iter().enumerate() {
            // P1 dofs are numbered like the vertices
            assert_eq!(coordinates.row(local).iter().copied().collect::<Vec<_>>(), mesh.coordinates(dof));
        }
    }
}

#[test]
fn cache_returns_the_same_dof_map() {
    let mesh = unit_square(2, 2);
    let element = LagrangeElement::new(CellType::Triangle, 2).unwrap();
    let cache = DofMapCache::new();
    let first = cache
        .get_or_build(&element.signature(), &element.dof_layout(), &mesh)
        .unwrap();
    let second = cache
        .get_or_build(&element.signature(), &element.dof_layout(), &mesh.clone())
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // A refined mesh is a different mesh
    let refined = mesh.refine().unwrap();
    let third = cache
        .get_or_build(&element.signature(), &element.dof_layout(), &refined)
        .unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(cache.len(), 2);
}

#[test]
fn failed_build_poisons_the_cache_entry() {
    let mesh = unit_cube(1, 1, 1);
    let layout = DofLayout::new(CellType::Tetrahedron, vec![0, 0, 3, 0], 1);
    let cache = DofMapCache::new();
    let result = cache.get_or_build("face bubbles", &layout, &mesh);
    assert!(matches!(result, Err(FemError::UnsupportedElement(_))));
    assert_eq!(cache.len(), 1);
    let result = cache.get_or_build("face bubbles", &layout, &mesh);
    assert!(matches!(result, Err(FemError::UnsupportedElement(_))));
}

#[test]
fn mismatched_cell_type_is_unsupported() {
    let mesh = unit_square(1, 1);
    let element = LagrangeElement::new(CellType::Tetrahedron, 1).unwrap();
    let result = DofMap::build(&element.dof_layout(), &mesh);
    assert!(matches!(result, Err(FemError::UnsupportedElement(_))));
}

/// Global dofs on the closure of a facet, as seen from one of its cells.
fn facet_dofs(mesh: &Mesh, dofmap: &DofMap, cell: usize, facet: usize) -> BTreeSet<usize> {
    let local_facet = mesh.local_facet_index(cell, facet);
    let dofs = dofmap.tabulate_dofs(cell);
    dofmap
        .tabulate_facet_dofs(local_facet)
        .into_iter()
        .map(|local| dofs[local])
        .collect()
}

fn assert_conforming(mesh: &Mesh, dofmap: &DofMap) -> Result<(), TestCaseError> {
    let tdim = mesh.topological_dim();
    let facet_cells = mesh.connectivity(tdim - 1, tdim);
    for facet in mesh.interior_facets() {
        let cells = facet_cells.get(facet);
        let (a, b) = (cells[0], cells[1]);
        prop_assert_eq!(facet_dofs(mesh, dofmap, a, facet), facet_dofs(mesh, dofmap, b, facet));
        prop_assert_eq!(facet_dofs(mesh, dofmap, b, facet), facet_dofs(mesh, dofmap, a, facet));
    }
    Ok(())
}

proptest! {
    #[test]
    fn triangle_dof_maps_are_conforming(nx in 1usize..6, ny in 1usize..6, degree in 1usize..=2, block_size in 1usize..=2) {
        let mesh = unit_square(nx, ny);
        assert_conforming(&mesh, &dofmap(&mesh, degree, block_size))?;
    }

    #[test]
    fn tetrahedron_dof_maps_are_conforming(nx in 1usize..3, ny in 1usize..3, nz in 1usize..3, degree in 1usize..=2) {
        let mesh = unit_cube(nx, ny, nz);
        assert_conforming(&mesh, &dofmap(&mesh, degree, 1))?;
    }
}
