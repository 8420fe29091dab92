use ordered_float::OrderedFloat;
use std::cmp::Reverse;

/// An ordering of the components that groups components with similar time steps.
///
/// The components `indices[..offset]` have already been assigned to enclosing sub-slabs. Each
/// call to [`update`](Self::update) sorts the remaining components by time step and moves the
/// next group to the front of the remaining range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    indices: Vec<usize>,
}

impl Partition {
    pub fn new(size: usize) -> Self {
        Self {
            indices: (0..size).collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.indices.len()
    }

    /// The component at position `pos` in the current ordering.
    pub fn index(&self, pos: usize) -> usize {
        self.indices[pos]
    }

    /// Groups the components from position `offset` on.
    ///
    /// The components are sorted by decreasing time step (ties broken by index). The group
    /// consists of every component whose step is at least `threshold` times the largest
    /// remaining step, or of all remaining components when `multi_adaptive` is false. Returns the
    /// end position of the group and its common time step, the smallest step in the group.
    ///
    /// # Panics
    ///
    /// Panics if no components remain.
    pub fn update(&mut self, offset: usize, steps: &[f64], threshold: f64, multi_adaptive: bool) -> (usize, f64) {
        assert!(offset < self.indices.len(), "no components left to partition");
        let remaining = &mut self.indices[offset..];
        remaining.sort_by_key(|&i| (Reverse(OrderedFloat(steps[i])), i));

        let end = if multi_adaptive {
            let pivot = threshold * steps[remaining[0]];
            offset + remaining.partition_point(|&i| steps[i] >= pivot)
        } else {
            self.indices.len()
        };
        (end, steps[self.indices[end - 1]])
    }
}
