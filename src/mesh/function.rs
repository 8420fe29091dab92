use crate::mesh::Mesh;
use serde::{Deserialize, Serialize};

/// A value per mesh entity of a fixed dimension.
///
/// Typically used with `T = usize` to mark sub-domains and boundary parts that integrals and
/// boundary conditions are restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshFunction<T> {
    dim: usize,
    values: Vec<T>,
}

impl<T: Clone> MeshFunction<T> {
    /// A function on the entities of dimension `dim` with every value set to `value`.
    pub fn new(mesh: &Mesh, dim: usize, value: T) -> Self {
        Self {
            dim,
            values: vec![value; mesh.num_entities(dim)],
        }
    }

    /// Sets `value` on every entity whose midpoint satisfies the predicate.
    pub fn mark(&mut self, mesh: &Mesh, predicate: impl Fn(&[f64]) -> bool, value: T) {
        for (entity, v) in self.values.iter_mut().enumerate() {
            if predicate(&mesh.entity_midpoint(self.dim, entity)) {
                *v = value.clone();
            }
        }
    }
}

impl<T> MeshFunction<T> {
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, entity: usize) -> &T {
        &self.values[entity]
    }

    pub fn set(&mut self, entity: usize, value: T) {
        self.values[entity] = value;
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }
}
