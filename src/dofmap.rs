//! Global numbering of degrees of freedom.
use crate::element::DofLayout;
use crate::error::{FemError, Result};
use crate::mesh::Mesh;
use log::debug;
use nalgebra::DMatrix;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Maps the local dofs of every cell to global dofs.
///
/// Dofs are owned by mesh entities. With `n_d` dofs on every entity of dimension `d`, the `k`-th
/// dof of entity `e` gets the global index `offset_d + n_d * e + k` with
/// `offset_d = Σ_{d' < d} n_{d'} * num_entities(d')`. Block layouts repeat this numbering per
/// component, offset by the scalar global dimension.
///
/// The position `k` of a dof within an edge is taken relative to the edge's vertices in
/// increasing global order, so that both cells sharing the edge agree on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DofMap {
    layout: DofLayout,
    local_dimension: usize,
    global_dimension: usize,
    cell_dofs: Vec<usize>,
}

impl DofMap {
    pub fn build(layout: &DofLayout, mesh: &Mesh) -> Result<Self> {
        let tdim = mesh.topological_dim();
        if layout.cell_type != mesh.cell_type() {
            return Err(FemError::UnsupportedElement(format!(
                "element is defined on a {} but the mesh consists of {}s",
                layout.cell_type.name(),
                mesh.cell_type().name()
            )));
        }
        for (d, &n) in layout.entity_dofs.iter().enumerate() {
            if d >= 2 && d < tdim && n > 1 {
                return Err(FemError::UnsupportedElement(format!(
                    "{} dofs on an entity of dimension {} cannot be numbered consistently",
                    n, d
                )));
            }
        }

        let mut entity_offsets = Vec::with_capacity(tdim + 1);
        let mut scalar_global_dimension = 0;
        for (d, &n) in layout.entity_dofs.iter().enumerate() {
            entity_offsets.push(scalar_global_dimension);
            scalar_global_dimension += n * mesh.num_entities(d);
        }

        let local_dofs = layout.local_dofs();
        let local_dimension = local_dofs.len();
        let mut cell_dofs = Vec::with_capacity(local_dimension * mesh.num_cells());
        for cell in 0..mesh.num_cells() {
            let cell_vertices = mesh.cell_vertices(cell);
            for dof in &local_dofs {
                let n = layout.entity_dofs[dof.dim];
                let entity = if dof.dim == 0 {
                    cell_vertices[dof.local_entity]
                } else if dof.dim == tdim {
                    cell
                } else {
                    mesh.connectivity(tdim, dof.dim).get(cell)[dof.local_entity]
                };
                let k = if dof.dim == 1 && dof.dim < tdim {
                    let edge = layout.cell_type.entity_vertices(1)[dof.local_entity];
                    canonical_edge_position(dof.k, n, cell_vertices[edge[0]], cell_vertices[edge[1]])
                } else {
                    dof.k
                };
                let scalar_dof = entity_offsets[dof.dim] + n * entity + k;
                cell_dofs.push(dof.component * scalar_global_dimension + scalar_dof);
            }
        }

        Ok(Self {
            layout: layout.clone(),
            local_dimension,
            global_dimension: layout.block_size * scalar_global_dimension,
            cell_dofs,
        })
    }

    pub fn layout(&self) -> &DofLayout {
        &self.layout
    }

    pub fn global_dimension(&self) -> usize {
        self.global_dimension
    }

    pub fn local_dimension(&self) -> usize {
        self.local_dimension
    }

    pub fn num_cells(&self) -> usize {
        self.cell_dofs.len() / self.local_dimension.max(1)
    }

    /// Global dofs of a cell, in local dof order.
    pub fn tabulate_dofs(&self, cell: usize) -> &[usize] {
        let n = self.local_dimension;
        &self.cell_dofs[n * cell..n * (cell + 1)]
    }

    /// Local dofs on the closure of a local facet.
    pub fn tabulate_facet_dofs(&self, local_facet: usize) -> Vec<usize> {
        self.layout.facet_dofs(local_facet)
    }

    /// Physical coordinates of the local dofs of a cell, one row per local dof.
    ///
    /// Dofs on an edge are spread uniformly between its end points, in the same canonical order
    /// as their numbering. Any other dof sits on the midpoint of its entity.
    pub fn tabulate_coordinates(&self, cell: usize, mesh: &Mesh) -> DMatrix<f64> {
        let gdim = mesh.geometric_dim();
        let tdim = mesh.topological_dim();
        let cell_vertices = mesh.cell_vertices(cell);
        let local_dofs = self.layout.local_dofs();
        let mut coordinates = DMatrix::zeros(local_dofs.len(), gdim);
        for (row, dof) in local_dofs.iter().enumerate() {
            let n = self.layout.entity_dofs[dof.dim];
            let vertices = self.layout.cell_type.entity_vertices(dof.dim)[dof.local_entity];
            if dof.dim == 1 && n > 1 {
                let (mut a, mut b) = (cell_vertices[vertices[0]], cell_vertices[vertices[1]]);
                if a > b {
                    std::mem::swap(&mut a, &mut b);
                }
                let k = if tdim > 1 {
                    canonical_edge_position(dof.k, n, cell_vertices[vertices[0]], cell_vertices[vertices[1]])
                } else {
                    dof.k
                };
                let s = (k + 1) as f64 / (n + 1) as f64;
                for i in 0..gdim {
                    let (x_a, x_b) = (mesh.coordinates(a)[i], mesh.coordinates(b)[i]);
                    coordinates[(row, i)] = x_a + s * (x_b - x_a);
                }
            } else {
                for &v in vertices {
                    for i in 0..gdim {
                        coordinates[(row, i)] += mesh.coordinates(cell_vertices[v])[i] / vertices.len() as f64;
                    }
                }
            }
        }
        coordinates
    }
}

/// Position of the `k`-th of `n` dofs on an edge seen from a cell whose local edge runs from
/// global vertex `a` to global vertex `b`.
fn canonical_edge_position(k: usize, n: usize, a: usize, b: usize) -> usize {
    if a < b {
        k
    } else {
        n - 1 - k
    }
}

#[derive(Debug, Clone)]
enum CacheEntry {
    Built(Arc<DofMap>),
    Poisoned(String),
}

impl CacheEntry {
    fn to_result(&self) -> Result<Arc<DofMap>> {
        match self {
            CacheEntry::Built(dofmap) => Ok(Arc::clone(dofmap)),
            CacheEntry::Poisoned(message) => Err(FemError::UnsupportedElement(message.clone())),
        }
    }
}

/// Dof maps keyed by element signature and mesh.
///
/// Lookups of existing entries only take a shared read lock. Building an entry is serialized,
/// so that no dof map is ever built twice. A build that fails with
/// [`FemError::UnsupportedElement`] poisons its entry: later lookups return the same error
/// without attempting to build again.
#[derive(Debug, Default)]
pub struct DofMapCache {
    entries: RwLock<FxHashMap<(String, usize), CacheEntry>>,
    build_lock: Mutex<()>,
}

impl DofMapCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(&self, signature: &str, layout: &DofLayout, mesh: &Mesh) -> Result<Arc<DofMap>> {
        let key = (signature.to_string(), mesh.id());
        if let Some(entry) = self.entries.read().get(&key) {
            return entry.to_result();
        }

        let _guard = self.build_lock.lock();
        // Another caller may have built the entry while we were waiting
        if let Some(entry) = self.entries.read().get(&key) {
            return entry.to_result();
        }
        let entry = match DofMap::build(layout, mesh) {
            Ok(dofmap) => {
                debug!(
                    "Built dof map for {} with {} global dofs on mesh {}",
                    signature,
                    dofmap.global_dimension(),
                    mesh.id()
                );
                CacheEntry::Built(Arc::new(dofmap))
            }
            Err(FemError::UnsupportedElement(message)) => CacheEntry::Poisoned(message),
            Err(err) => return Err(err),
        };
        let result = entry.to_result();
        self.entries.write().insert(key, entry);
        result
    }

    /// Number of cached (built or poisoned) entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
