//! Derived entities and connectivity tables of a simplicial mesh.
use crate::cell::CellType;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// An entity → entity incidence table stored in compressed (offsets + indices) form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Connectivity {
    offsets: Vec<usize>,
    indices: Vec<usize>,
}

impl Connectivity {
    fn new() -> Self {
        Self {
            offsets: vec![0],
            indices: Vec::new(),
        }
    }

    fn push(&mut self, entities: impl IntoIterator<Item = usize>) {
        self.indices.extend(entities);
        self.offsets.push(self.indices.len());
    }

    /// Number of source entities.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The entities incident to source entity `i`.
    pub fn get(&self, i: usize) -> &[usize] {
        &self.indices[self.offsets[i]..self.offsets[i + 1]]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.offsets.windows(2).map(move |w| &self.indices[w[0]..w[1]])
    }

    /// Total number of stored incidences.
    pub fn num_incidences(&self) -> usize {
        self.indices.len()
    }

    /// The table `j -> { i : j in self.get(i) }` with `num_targets` target entities.
    ///
    /// Incidence lists of the transpose are sorted in increasing order.
    fn transpose(&self, num_targets: usize) -> Connectivity {
        let mut counts = vec![0; num_targets + 1];
        for &j in &self.indices {
            counts[j + 1] += 1;
        }
        for j in 0..num_targets {
            counts[j + 1] += counts[j];
        }
        let offsets = counts.clone();
        let mut indices = vec![0; self.indices.len()];
        let mut next = counts;
        for (i, entities) in self.iter().enumerate() {
            for &j in entities {
                indices[next[j]] = i;
                next[j] += 1;
            }
        }
        Connectivity { offsets, indices }
    }
}

/// Sorted vertex tuple used to identify an entity. Unused slots hold `usize::MAX`.
type EntityKey = [usize; 4];

fn entity_key(vertices: impl IntoIterator<Item = usize>) -> EntityKey {
    let mut key = [usize::MAX; 4];
    let mut n = 0;
    for v in vertices {
        key[n] = v;
        n += 1;
    }
    key[..n].sort_unstable();
    key
}

/// All entities of a mesh and the full set of connectivity tables between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshTopology {
    cell_type: CellType,
    num_entities: Vec<usize>,
    // connectivity[d0][d1]
    connectivity: Vec<Vec<Connectivity>>,
}

impl MeshTopology {
    /// Derives every entity and every connectivity table from the cell → vertex table.
    ///
    /// Derived entities are numbered in first-seen order while sweeping the cells in index order
    /// and their local entities in local order. The vertices of a derived entity are stored in
    /// increasing global order; cells keep the vertex order they were created with.
    pub(crate) fn build(cell_type: CellType, num_vertices: usize, cell_vertices: &[usize]) -> Self {
        let tdim = cell_type.dim();
        let nv = cell_type.num_vertices();
        let num_cells = cell_vertices.len() / nv;

        let mut entity_vertices: Vec<Connectivity> = Vec::with_capacity(tdim + 1);
        let mut cell_entities: Vec<Connectivity> = Vec::with_capacity(tdim + 1);
        let mut lookup: Vec<FxHashMap<EntityKey, usize>> = Vec::with_capacity(tdim + 1);

        // Vertices
        let mut vertices = Connectivity::new();
        for v in 0..num_vertices {
            vertices.push([v]);
        }
        let mut cells_to_vertices = Connectivity::new();
        for cell in cell_vertices.chunks_exact(nv) {
            cells_to_vertices.push(cell.iter().copied());
        }
        entity_vertices.push(vertices);
        cell_entities.push(cells_to_vertices.clone());
        lookup.push(FxHashMap::default());

        // Edges, faces
        for d in 1..tdim {
            let mut map = FxHashMap::default();
            let mut to_vertices = Connectivity::new();
            let mut from_cells = Connectivity::new();
            for cell in cell_vertices.chunks_exact(nv) {
                let mut local = Vec::with_capacity(cell_type.num_entities(d));
                for local_vertices in cell_type.entity_vertices(d) {
                    let key = entity_key(local_vertices.iter().map(|&lv| cell[lv]));
                    let next_index = map.len();
                    let index = *map.entry(key).or_insert_with(|| {
                        to_vertices.push(key[..=d].iter().copied());
                        next_index
                    });
                    local.push(index);
                }
                from_cells.push(local);
            }
            entity_vertices.push(to_vertices);
            cell_entities.push(from_cells);
            lookup.push(map);
        }

        // Cells
        let mut cells_to_cells = Connectivity::new();
        for c in 0..num_cells {
            cells_to_cells.push([c]);
        }
        entity_vertices.push(cells_to_vertices);
        cell_entities.push(cells_to_cells);

        let num_entities: Vec<usize> = entity_vertices.iter().map(Connectivity::len).collect();

        // connectivity[d0][d1] for d0 > d1 of non-cell entities is found by looking up the
        // sub-entities of each entity, seen as a simplex of its own
        let mut connectivity: Vec<Vec<Connectivity>> = (0..=tdim)
            .map(|_| (0..=tdim).map(|_| Connectivity::default()).collect())
            .collect();

        for d0 in 0..=tdim {
            for d1 in 0..d0 {
                connectivity[d0][d1] = if d0 == tdim {
                    cell_entities[d1].clone()
                } else if d1 == 0 {
                    entity_vertices[d0].clone()
                } else {
                    let simplex = CellType::from_dim(d0).expect("entities of dimension > 0 are simplices");
                    let mut table = Connectivity::new();
                    for vertices in entity_vertices[d0].iter() {
                        let subs = simplex.entity_vertices(d1).iter().map(|local_vertices| {
                            let key = entity_key(local_vertices.iter().map(|&lv| vertices[lv]));
                            lookup[d1][&key]
                        });
                        table.push(subs.collect::<Vec<_>>());
                    }
                    table
                };
            }
        }

        for d0 in 0..=tdim {
            for d1 in (d0 + 1)..=tdim {
                connectivity[d0][d1] = connectivity[d1][d0].transpose(num_entities[d0]);
            }
        }

        // d -> d: vertices are neighbors when they share an edge, other entities when they
        // share a vertex
        for d in 0..=tdim {
            let mut table = Connectivity::new();
            let (down, up) = if d == 0 {
                (&connectivity[1][0], &connectivity[0][1])
            } else {
                (&connectivity[d][0], &connectivity[0][d])
            };
            for i in 0..num_entities[d] {
                let neighbors: BTreeSet<usize> = if d == 0 {
                    up.get(i)
                        .iter()
                        .flat_map(|&e| down.get(e).iter().copied())
                        .filter(|&j| j != i)
                        .collect()
                } else {
                    down.get(i)
                        .iter()
                        .flat_map(|&v| up.get(v).iter().copied())
                        .filter(|&j| j != i)
                        .collect()
                };
                table.push(neighbors);
            }
            connectivity[d][d] = table;
        }

        Self {
            cell_type,
            num_entities,
            connectivity,
        }
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn dim(&self) -> usize {
        self.cell_type.dim()
    }

    pub fn num_entities(&self, dim: usize) -> usize {
        self.num_entities[dim]
    }

    /// Incidence table from entities of dimension `from` to entities of dimension `to`.
    pub fn connectivity(&self, from: usize, to: usize) -> &Connectivity {
        &self.connectivity[from][to]
    }
}
