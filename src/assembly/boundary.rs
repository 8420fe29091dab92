use crate::dofmap::DofMap;
use crate::error::{FemError, Result};
use crate::mesh::{Mesh, MeshFunction};
use galerkin_sparse::{GenericMatrix, GenericVector};
use std::collections::BTreeMap;
use std::fmt;

/// Which dofs a Dirichlet condition constrains.
pub enum BoundarySelection {
    /// Dofs on the closure of facets whose marker equals `value`.
    Topological { markers: MeshFunction<usize>, value: usize },
    /// Dofs on the closure of all exterior facets.
    OnBoundary,
    /// Dofs whose coordinates satisfy the predicate.
    Pointwise(Box<dyn Fn(&[f64]) -> bool>),
}

impl fmt::Debug for BoundarySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topological { value, .. } => f.debug_struct("Topological").field("value", value).finish(),
            Self::OnBoundary => write!(f, "OnBoundary"),
            Self::Pointwise(_) => write!(f, "Pointwise"),
        }
    }
}

/// A boundary condition that modifies an assembled linear system.
pub trait BoundaryCondition {
    fn apply(&self, matrix: &mut dyn GenericMatrix, vector: &mut dyn GenericVector, dofmap: &DofMap, mesh: &Mesh)
        -> Result<()>;
}

/// The condition `u(x) = g(x)` on a part of the boundary.
///
/// For vector-valued spaces, the condition applies to every component unless restricted to a
/// single one with [`DirichletBc::with_component`].
pub struct DirichletBc {
    value: Box<dyn Fn(&[f64]) -> f64>,
    selection: BoundarySelection,
    component: Option<usize>,
}

impl fmt::Debug for DirichletBc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirichletBc")
            .field("selection", &self.selection)
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}

impl DirichletBc {
    pub fn new(value: impl Fn(&[f64]) -> f64 + 'static, selection: BoundarySelection) -> Self {
        Self {
            value: Box::new(value),
            selection,
            component: None,
        }
    }

    /// The homogeneous condition `u = 0`.
    pub fn homogeneous(selection: BoundarySelection) -> Self {
        Self::new(|_| 0.0, selection)
    }

    pub fn with_component(self, component: usize) -> Self {
        Self {
            component: Some(component),
            ..self
        }
    }

    pub fn selection(&self) -> &BoundarySelection {
        &self.selection
    }

    /// Constrained global dofs and their prescribed values.
    pub fn boundary_values(&self, dofmap: &DofMap, mesh: &Mesh) -> Result<BTreeMap<usize, f64>> {
        let layout = dofmap.layout();
        if let Some(component) = self.component {
            if component >= layout.block_size {
                return Err(FemError::dimension_mismatch(
                    "number of components",
                    component + 1,
                    layout.block_size,
                ));
            }
        }
        let scalar_dimension = layout.scalar_dimension();
        let selects_component = |local_dof: usize| {
            self.component
                .map_or(true, |component| local_dof / scalar_dimension == component)
        };

        let mut values = BTreeMap::new();
        let mut insert = |cell: usize, local_dofs: &mut dyn Iterator<Item = usize>| -> Result<()> {
            let dofs = dofmap.tabulate_dofs(cell);
            let coordinates = dofmap.tabulate_coordinates(cell, mesh);
            for local_dof in local_dofs.filter(|&local_dof| selects_component(local_dof)) {
                let x: Vec<f64> = coordinates.row(local_dof).iter().copied().collect();
                let g = (self.value)(x.as_slice());
                if !g.is_finite() {
                    return Err(FemError::consistency(format!("boundary value at {:?} is not finite", x)));
                }
                values.insert(dofs[local_dof], g);
            }
            Ok(())
        };

        let tdim = mesh.topological_dim();
        match &self.selection {
            BoundarySelection::Topological { markers, value } => {
                if markers.dim() != tdim - 1 {
                    return Err(FemError::dimension_mismatch("marker entity dimension", tdim - 1, markers.dim()));
                }
                if markers.len() != mesh.num_facets() {
                    return Err(FemError::dimension_mismatch(
                        "number of marker values",
                        mesh.num_facets(),
                        markers.len(),
                    ));
                }
                let facet_cells = mesh.connectivity(tdim - 1, tdim);
                for facet in (0..mesh.num_facets()).filter(|&f| markers.get(f) == value) {
                    let cell = facet_cells.get(facet)[0];
                    let local_facet = mesh.local_facet_index(cell, facet);
                    insert(cell, &mut dofmap.tabulate_facet_dofs(local_facet).into_iter())?;
                }
            }
            BoundarySelection::OnBoundary => {
                let facet_cells = mesh.connectivity(tdim - 1, tdim);
                for facet in mesh.exterior_facets() {
                    let cell = facet_cells.get(facet)[0];
                    let local_facet = mesh.local_facet_index(cell, facet);
                    insert(cell, &mut dofmap.tabulate_facet_dofs(local_facet).into_iter())?;
                }
            }
            BoundarySelection::Pointwise(predicate) => {
                for cell in 0..mesh.num_cells() {
                    let coordinates = dofmap.tabulate_coordinates(cell, mesh);
                    let mut selected = (0..dofmap.local_dimension()).filter(|&local_dof| {
                        let x: Vec<f64> = coordinates.row(local_dof).iter().copied().collect();
                        predicate(x.as_slice())
                    });
                    insert(cell, &mut selected)?;
                }
            }
        }
        Ok(values)
    }
}

impl BoundaryCondition for DirichletBc {
    /// Replaces the constrained rows by identity rows and sets `b_i = g(x_i)`.
    fn apply(
        &self,
        matrix: &mut dyn GenericMatrix,
        vector: &mut dyn GenericVector,
        dofmap: &DofMap,
        mesh: &Mesh,
    ) -> Result<()> {
        if matrix.nrows() != vector.len() {
            return Err(FemError::dimension_mismatch("right-hand side length", matrix.nrows(), vector.len()));
        }
        if dofmap.global_dimension() != matrix.nrows() {
            return Err(FemError::dimension_mismatch(
                "global dimension of the constrained space",
                matrix.nrows(),
                dofmap.global_dimension(),
            ));
        }
        let values = self.boundary_values(dofmap, mesh)?;
        let rows: Vec<usize> = values.keys().copied().collect();
        matrix.ident_rows(&rows);
        for (dof, value) in values {
            vector.set(dof, value);
        }
        Ok(())
    }
}
