use crate::assembly::boundary::DirichletBc;
use crate::assembly::pattern::build_sparsity_pattern;
use crate::dofmap::{DofMap, DofMapCache};
use crate::error::{FemError, Result};
use crate::form::Form;
use crate::geometry::CellGeometry;
use crate::mesh::{Mesh, MeshFunction};
use galerkin_sparse::{GenericMatrix, GenericTensor, GenericVector, TensorLayout};
use log::debug;
use std::cell::RefCell;
use std::sync::Arc;

/// Restricts integration to marked cells and facets.
///
/// Each restriction is a marker function together with the marker value to integrate over.
/// Without a restriction, every entity of the corresponding kind is included.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubDomains<'a> {
    pub cells: Option<(&'a MeshFunction<usize>, usize)>,
    pub exterior_facets: Option<(&'a MeshFunction<usize>, usize)>,
    pub interior_facets: Option<(&'a MeshFunction<usize>, usize)>,
}

fn check_markers(markers: Option<(&MeshFunction<usize>, usize)>, mesh: &Mesh, dim: usize) -> Result<()> {
    if let Some((markers, _)) = markers {
        if markers.dim() != dim {
            return Err(FemError::dimension_mismatch("marker entity dimension", dim, markers.dim()));
        }
        if markers.len() != mesh.num_entities(dim) {
            return Err(FemError::dimension_mismatch(
                "number of marker values",
                mesh.num_entities(dim),
                markers.len(),
            ));
        }
    }
    Ok(())
}

fn is_marked(markers: Option<(&MeshFunction<usize>, usize)>, entity: usize) -> bool {
    markers.map_or(true, |(markers, value)| *markers.get(entity) == value)
}

impl<'a> SubDomains<'a> {
    pub(crate) fn check(&self, mesh: &Mesh) -> Result<()> {
        let tdim = mesh.topological_dim();
        check_markers(self.cells, mesh, tdim)?;
        check_markers(self.exterior_facets, mesh, tdim - 1)?;
        check_markers(self.interior_facets, mesh, tdim - 1)
    }

    /// Cells to integrate over, in increasing order.
    pub(crate) fn cells(&self, mesh: &Mesh) -> Vec<usize> {
        (0..mesh.num_cells())
            .filter(|&cell| is_marked(self.cells, cell))
            .collect()
    }

    /// Exterior facets to integrate over as `(cell, local facet)` pairs, in increasing facet order.
    pub(crate) fn exterior_facets(&self, mesh: &Mesh) -> Vec<(usize, usize)> {
        let tdim = mesh.topological_dim();
        let facet_cells = mesh.connectivity(tdim - 1, tdim);
        mesh.exterior_facets()
            .into_iter()
            .filter(|&facet| is_marked(self.exterior_facets, facet))
            .map(|facet| {
                let cell = facet_cells.get(facet)[0];
                (cell, mesh.local_facet_index(cell, facet))
            })
            .collect()
    }

    /// Interior facets to integrate over as `[(cell0, local facet0), (cell1, local facet1)]`
    /// with `cell0 < cell1`, in increasing facet order.
    pub(crate) fn interior_facets(&self, mesh: &Mesh) -> Vec<[(usize, usize); 2]> {
        let tdim = mesh.topological_dim();
        let facet_cells = mesh.connectivity(tdim - 1, tdim);
        mesh.interior_facets()
            .into_iter()
            .filter(|&facet| is_marked(self.interior_facets, facet))
            .map(|facet| {
                let cells = facet_cells.get(facet);
                let (cell0, cell1) = (cells[0].min(cells[1]), cells[0].max(cells[1]));
                [
                    (cell0, mesh.local_facet_index(cell0, facet)),
                    (cell1, mesh.local_facet_index(cell1, facet)),
                ]
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
struct AssemblerWorkspace {
    block: Vec<f64>,
    indices: Vec<Vec<usize>>,
}

impl AssemblerWorkspace {
    /// Resets the block to `len` zeros.
    fn zeroed_block(&mut self, len: usize) -> &mut [f64] {
        self.block.clear();
        self.block.resize(len, 0.0);
        &mut self.block
    }
}

/// Assembles forms into global tensors.
///
/// The assembler owns (a shared handle to) a [`DofMapCache`], so that dof maps are built once
/// per element and mesh no matter how many forms are assembled.
#[derive(Debug, Default)]
pub struct Assembler {
    cache: Arc<DofMapCache>,
    // Buffers that prevent unnecessary allocations when assembling many forms
    workspace: RefCell<AssemblerWorkspace>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: Arc<DofMapCache>) -> Self {
        Self {
            cache,
            workspace: RefCell::default(),
        }
    }

    pub fn cache(&self) -> &Arc<DofMapCache> {
        &self.cache
    }

    /// The dof map of every argument of the form, test space first.
    pub fn dofmaps<F>(&self, form: &F, mesh: &Mesh) -> Result<Vec<Arc<DofMap>>>
    where
        F: ?Sized + Form,
    {
        let elements = form.elements();
        if elements.len() != form.rank() {
            return Err(FemError::dimension_mismatch(
                format!("number of arguments of {}", form.signature()),
                form.rank(),
                elements.len(),
            ));
        }
        elements
            .iter()
            .map(|element| {
                let dofmap = self
                    .cache
                    .get_or_build(&element.signature(), &element.dof_layout(), mesh)?;
                if element.space_dimension() != dofmap.local_dimension() {
                    return Err(FemError::dimension_mismatch(
                        format!("local dimension of {}", element.signature()),
                        dofmap.local_dimension(),
                        element.space_dimension(),
                    ));
                }
                Ok(dofmap)
            })
            .collect()
    }

    /// The layout the tensor of the form is initialized with.
    pub fn layout<F>(&self, form: &F, mesh: &Mesh, subdomains: &SubDomains) -> Result<TensorLayout>
    where
        F: ?Sized + Form,
    {
        let dofmaps = self.dofmaps(form, mesh)?;
        layout_for(form, &dofmaps, mesh, subdomains)
    }

    /// Initializes the tensor to the shape of the form and assembles the form into it.
    pub fn assemble<T, F>(&self, tensor: &mut T, form: &F, mesh: &Mesh) -> Result<()>
    where
        T: ?Sized + GenericTensor,
        F: ?Sized + Form,
    {
        self.assemble_with_subdomains(tensor, form, mesh, &SubDomains::default())
    }

    pub fn assemble_with_subdomains<T, F>(
        &self,
        tensor: &mut T,
        form: &F,
        mesh: &Mesh,
        subdomains: &SubDomains,
    ) -> Result<()>
    where
        T: ?Sized + GenericTensor,
        F: ?Sized + Form,
    {
        check_rank(tensor, form)?;
        let dofmaps = self.dofmaps(form, mesh)?;
        let layout = layout_for(form, &dofmaps, mesh, subdomains)?;
        tensor.init(&layout);
        self.assemble_with_dofmaps(tensor, form, mesh, &dofmaps, subdomains)
    }

    /// Adds the form to a tensor that already has the right shape, without zeroing it first.
    ///
    /// # Panics
    ///
    /// Sparse matrices panic if an entry falls outside their sparsity pattern.
    pub fn assemble_into<T, F>(&self, tensor: &mut T, form: &F, mesh: &Mesh, subdomains: &SubDomains) -> Result<()>
    where
        T: ?Sized + GenericTensor,
        F: ?Sized + Form,
    {
        check_rank(tensor, form)?;
        let dofmaps = self.dofmaps(form, mesh)?;
        self.assemble_with_dofmaps(tensor, form, mesh, &dofmaps, subdomains)
    }

    fn assemble_with_dofmaps<T, F>(
        &self,
        tensor: &mut T,
        form: &F,
        mesh: &Mesh,
        dofmaps: &[Arc<DofMap>],
        subdomains: &SubDomains,
    ) -> Result<()>
    where
        T: ?Sized + GenericTensor,
        F: ?Sized + Form,
    {
        subdomains.check(mesh)?;
        for (axis, (dofmap, dim)) in dofmaps.iter().zip(tensor.dims()).enumerate() {
            if dofmap.global_dimension() != dim {
                return Err(FemError::dimension_mismatch(
                    format!("tensor dimension {} of {}", axis, form.signature()),
                    dofmap.global_dimension(),
                    dim,
                ));
            }
        }

        let ws = &mut *self.workspace.borrow_mut();
        ws.indices.resize_with(dofmaps.len(), Vec::new);
        let block_len: usize = dofmaps.iter().map(|dofmap| dofmap.local_dimension()).product();

        if form.has_cell_integral() {
            let cells = subdomains.cells(mesh);
            debug!("Assembling cell integrals of {} over {} cells", form.signature(), cells.len());
            for cell in cells {
                let geometry = CellGeometry::new(mesh, cell)?;
                let block = ws.zeroed_block(block_len);
                form.tabulate_cell(block, &geometry)
                    .map_err(FemError::FormEvaluation)?;
                for (indices, dofmap) in ws.indices.iter_mut().zip(dofmaps) {
                    indices.clear();
                    indices.extend_from_slice(dofmap.tabulate_dofs(cell));
                }
                scatter(tensor, &ws.block, &ws.indices);
            }
        }

        if form.has_exterior_facet_integral() {
            let facets = subdomains.exterior_facets(mesh);
            debug!(
                "Assembling exterior facet integrals of {} over {} facets",
                form.signature(),
                facets.len()
            );
            for (cell, local_facet) in facets {
                let geometry = CellGeometry::new(mesh, cell)?;
                let block = ws.zeroed_block(block_len);
                form.tabulate_exterior_facet(block, &geometry, local_facet)
                    .map_err(FemError::FormEvaluation)?;
                for (indices, dofmap) in ws.indices.iter_mut().zip(dofmaps) {
                    indices.clear();
                    indices.extend_from_slice(dofmap.tabulate_dofs(cell));
                }
                scatter(tensor, &ws.block, &ws.indices);
            }
        }

        if form.has_interior_facet_integral() {
            let facets = subdomains.interior_facets(mesh);
            debug!(
                "Assembling interior facet integrals of {} over {} facets",
                form.signature(),
                facets.len()
            );
            let macro_block_len = block_len << dofmaps.len();
            for [(cell0, facet0), (cell1, facet1)] in facets {
                let geometry0 = CellGeometry::new(mesh, cell0)?;
                let geometry1 = CellGeometry::new(mesh, cell1)?;
                let block = ws.zeroed_block(macro_block_len);
                form.tabulate_interior_facet(block, &geometry0, &geometry1, facet0, facet1)
                    .map_err(FemError::FormEvaluation)?;
                for (indices, dofmap) in ws.indices.iter_mut().zip(dofmaps) {
                    indices.clear();
                    indices.extend_from_slice(dofmap.tabulate_dofs(cell0));
                    indices.extend_from_slice(dofmap.tabulate_dofs(cell1));
                }
                scatter(tensor, &ws.block, &ws.indices);
            }
        }

        tensor.apply();
        Ok(())
    }

    /// Assembles a bilinear and a linear form and applies Dirichlet conditions symmetrically.
    ///
    /// Constrained columns are eliminated into the right-hand side before the constrained rows
    /// are replaced by identity rows, so a symmetric bilinear form yields a symmetric matrix.
    pub fn assemble_system<M, V, A, L>(
        &self,
        matrix: &mut M,
        vector: &mut V,
        bilinear_form: &A,
        linear_form: &L,
        mesh: &Mesh,
        bcs: &[&DirichletBc],
    ) -> Result<()>
    where
        M: ?Sized + GenericMatrix,
        V: ?Sized + GenericVector,
        A: ?Sized + Form,
        L: ?Sized + Form,
    {
        self.assemble(matrix, bilinear_form, mesh)?;
        self.assemble(vector, linear_form, mesh)?;
        let dofmaps = self.dofmaps(bilinear_form, mesh)?;
        let (test_dofmap, trial_dofmap) = (&dofmaps[0], &dofmaps[1]);
        if vector.len() != matrix.nrows() {
            return Err(FemError::dimension_mismatch(
                "right-hand side length",
                matrix.nrows(),
                vector.len(),
            ));
        }

        let mut columns = vec![None; matrix.ncols()];
        let mut rows = Vec::new();
        for bc in bcs {
            for (dof, value) in bc.boundary_values(trial_dofmap, mesh)? {
                columns[dof] = Some(value);
            }
            rows.extend(bc.boundary_values(test_dofmap, mesh)?);
        }
        let mut lifted = vec![0.0; matrix.nrows()];
        matrix.eliminate_columns(&columns, &mut lifted);
        for (i, lifted_i) in lifted.into_iter().enumerate() {
            vector.set(i, vector.get(i) - lifted_i);
        }

        let row_indices: Vec<usize> = rows.iter().map(|&(dof, _)| dof).collect();
        matrix.ident_rows(&row_indices);
        for (dof, value) in rows {
            vector.set(dof, value);
        }
        debug!(
            "Applied {} Dirichlet conditions to {} rows of {}",
            bcs.len(),
            row_indices.len(),
            bilinear_form.signature()
        );
        Ok(())
    }
}

fn check_rank<T, F>(tensor: &T, form: &F) -> Result<()>
where
    T: ?Sized + GenericTensor,
    F: ?Sized + Form,
{
    if tensor.rank() != form.rank() {
        return Err(FemError::dimension_mismatch(
            format!("tensor rank for {}", form.signature()),
            form.rank(),
            tensor.rank(),
        ));
    }
    Ok(())
}

fn layout_for<F>(form: &F, dofmaps: &[Arc<DofMap>], mesh: &Mesh, subdomains: &SubDomains) -> Result<TensorLayout>
where
    F: ?Sized + Form,
{
    match dofmaps {
        [] => Ok(TensorLayout::Scalar),
        [dofmap] => Ok(TensorLayout::Vector {
            len: dofmap.global_dimension(),
        }),
        [_, _] => Ok(TensorLayout::Matrix {
            pattern: build_sparsity_pattern(form, dofmaps, mesh, subdomains)?,
        }),
        _ => Err(FemError::UnsupportedElement(format!(
            "cannot assemble forms of rank {}",
            dofmaps.len()
        ))),
    }
}

fn scatter<T>(tensor: &mut T, block: &[f64], indices: &[Vec<usize>])
where
    T: ?Sized + GenericTensor,
{
    match indices {
        [] => tensor.add(block, &[]),
        [rows] => tensor.add(block, &[rows]),
        [rows, cols] => tensor.add(block, &[rows, cols]),
        _ => unreachable!("forms of rank > 2 are rejected before assembly"),
    }
}
