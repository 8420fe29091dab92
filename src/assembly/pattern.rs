use crate::assembly::SubDomains;
use crate::dofmap::DofMap;
use crate::error::{FemError, Result};
use crate::form::Form;
use crate::mesh::Mesh;
use galerkin_sparse::SparsityPattern;
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Computes the sparsity pattern of a bilinear form by a dry run over the mesh.
///
/// Every entry that assembly of the form over the same sub-domains can write is part of the
/// pattern. Square patterns always contain the full diagonal, so that boundary conditions can
/// put identity rows into the matrix.
pub fn build_sparsity_pattern<F>(
    form: &F,
    dofmaps: &[Arc<DofMap>],
    mesh: &Mesh,
    subdomains: &SubDomains,
) -> Result<SparsityPattern>
where
    F: ?Sized + Form,
{
    let [test, trial] = dofmaps else {
        return Err(FemError::dimension_mismatch(
            format!("number of dof maps for the pattern of {}", form.signature()),
            2,
            dofmaps.len(),
        ));
    };
    subdomains.check(mesh)?;

    // Each matrix entry is stored exactly once, at the cost of some speed
    let mut matrix_entries = BTreeSet::new();
    let mut insert_block = |rows: &[usize], cols: &[usize]| {
        for &i in rows {
            for &j in cols {
                matrix_entries.insert((i, j));
            }
        }
    };

    if form.has_cell_integral() {
        for cell in subdomains.cells(mesh) {
            insert_block(test.tabulate_dofs(cell), trial.tabulate_dofs(cell));
        }
    }
    if form.has_exterior_facet_integral() {
        for (cell, _) in subdomains.exterior_facets(mesh) {
            insert_block(test.tabulate_dofs(cell), trial.tabulate_dofs(cell));
        }
    }
    if form.has_interior_facet_integral() {
        for [(cell0, _), (cell1, _)] in subdomains.interior_facets(mesh) {
            let rows = [test.tabulate_dofs(cell0), test.tabulate_dofs(cell1)].concat();
            let cols = [trial.tabulate_dofs(cell0), trial.tabulate_dofs(cell1)].concat();
            insert_block(&rows, &cols);
        }
    }

    let num_rows = test.global_dimension();
    let num_cols = trial.global_dimension();
    if num_rows == num_cols {
        matrix_entries.extend((0..num_rows).map(|i| (i, i)));
    }

    let mut offsets = Vec::with_capacity(num_rows + 1);
    let mut column_indices = Vec::with_capacity(matrix_entries.len());
    offsets.push(0);
    for (i, j) in matrix_entries {
        // A while loop handles consecutive empty rows
        while i + 1 > offsets.len() {
            offsets.push(column_indices.len());
        }
        column_indices.push(j);
    }
    while offsets.len() < num_rows + 1 {
        offsets.push(column_indices.len());
    }

    debug!(
        "Built {}x{} sparsity pattern with {} entries for {}",
        num_rows,
        num_cols,
        column_indices.len(),
        form.signature()
    );
    SparsityPattern::try_from_offsets_and_indices(num_rows, num_cols, offsets, column_indices)
        .map_err(|err| FemError::consistency(format!("invalid sparsity pattern: {}", err)))
}
