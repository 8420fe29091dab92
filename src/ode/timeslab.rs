use crate::error::{FemError, Result};
use crate::ode::adaptivity::MultiAdaptivity;
use crate::ode::method::Method;
use crate::ode::partition::Partition;
use crate::ode::{Dependencies, Ode, OdeSettings};
use log::debug;
use nalgebra::DVector;
use std::sync::Arc;

/// A node of the time slab tree. Sub-slabs are stored in an arena and refer to each other by
/// index.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SubSlab {
    pub a: f64,
    pub b: f64,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// One component's polynomial on one time interval.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Element {
    pub component: usize,
    pub subslab: usize,
    pub a: f64,
    pub b: f64,
    /// The element of the same component that ends where this one starts, if inside the slab.
    pub previous: Option<usize>,
    /// Position of the first nodal value in the slab's vector of unknowns.
    pub offset: usize,
}

impl Element {
    pub fn length(&self) -> f64 {
        self.b - self.a
    }

    /// Reference time of `t` in `[a, b]`, exactly 1 at the end point.
    pub fn tau(&self, t: f64) -> f64 {
        if t >= self.b {
            1.0
        } else {
            (t - self.a) / (self.b - self.a)
        }
    }
}

/// Lifecycle of a time slab.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SlabState {
    Building,
    /// The slab is built and its nodal values are being solved for.
    Iterating,
    /// The nonlinear solver converged. The nodal values are final.
    Accepted,
    /// The nonlinear solver failed. The nodal values are meaningless.
    Rejected,
}

/// A multi-adaptive time slab: every component is divided into its own elements between the
/// common start and end times of the slab.
///
/// The slab is built recursively. The components with the largest time steps form a sub-slab
/// that spans (almost) the whole interval with one element each; the remaining components tile
/// the same interval with nested sub-slabs of their own. The unknowns of the slab are the nodal
/// values of all elements, solved for simultaneously.
///
/// The solution at a time `t` is taken from the element with `a < t <= b` (left-continuous), so
/// the slab start time always refers to the initial state.
#[derive(Debug, Clone)]
pub struct TimeSlab {
    method: Arc<Method>,
    dependencies: Dependencies,
    partition: Partition,
    partitioning_threshold: f64,
    interval_threshold: f64,
    multi_adaptive: bool,

    state: SlabState,
    a: f64,
    b: f64,
    u0: Vec<f64>,
    subslabs: Vec<SubSlab>,
    elements: Vec<Element>,
    // Elements of each component, in time order
    component_elements: Vec<Vec<usize>>,
    x: DVector<f64>,
}

impl TimeSlab {
    pub fn new(method: Arc<Method>, u0: Vec<f64>, dependencies: Dependencies, settings: &OdeSettings) -> Self {
        let size = u0.len();
        assert_eq!(dependencies.size(), size, "dependencies must match the size of the system");
        Self {
            method,
            dependencies,
            partition: Partition::new(size),
            partitioning_threshold: settings.partitioning_threshold,
            interval_threshold: settings.interval_threshold,
            multi_adaptive: settings.multi_adaptive,
            state: SlabState::Building,
            a: 0.0,
            b: 0.0,
            u0,
            subslabs: Vec::new(),
            elements: Vec::new(),
            component_elements: vec![Vec::new(); size],
            x: DVector::zeros(0),
        }
    }

    /// Builds the slab from `a` towards `b` with the current time steps and returns its end time.
    ///
    /// The nodal values are initialized to the initial state of their component.
    pub fn build(&mut self, a: f64, b: f64, adaptivity: &MultiAdaptivity) -> Result<f64> {
        if !(a < b) {
            return Err(FemError::consistency(format!(
                "cannot build a time slab on the empty interval [{}, {}]",
                a, b
            )));
        }
        let steps = adaptivity.timesteps();
        if let Some((i, k)) = steps
            .iter()
            .enumerate()
            .find(|(_, k)| !(k.is_finite() && **k > 0.0))
        {
            return Err(FemError::consistency(format!(
                "time step {} of component {} is not positive",
                k, i
            )));
        }

        self.state = SlabState::Building;
        self.subslabs.clear();
        self.elements.clear();
        self.component_elements.iter_mut().for_each(Vec::clear);
        self.a = a;
        self.b = self.create(a, b, 0, None, &steps)?;

        let nn = self.method.num_nodal_values();
        let mut x = DVector::zeros(nn * self.elements.len());
        for element in &self.elements {
            x.rows_mut(element.offset, nn).fill(self.u0[element.component]);
        }
        self.x = x;
        self.state = SlabState::Iterating;

        debug!(
            "Built time slab [{:.6}, {:.6}] with {} elements in {} sub-slabs (depth {})",
            self.a,
            self.b,
            self.elements.len(),
            self.subslabs.len(),
            self.depth()
        );
        Ok(self.b)
    }

    fn create(&mut self, a: f64, b: f64, offset: usize, parent: Option<usize>, steps: &[f64]) -> Result<f64> {
        let (end, k) = self
            .partition
            .update(offset, steps, self.partitioning_threshold, self.multi_adaptive);
        // Only shorten the interval if a significant part would be left over
        let b = if k < self.interval_threshold * (b - a) { a + k } else { b };
        if !(b > a) {
            return Err(FemError::consistency(format!(
                "time step {} vanishes at t = {} in floating point",
                k, a
            )));
        }

        let id = self.subslabs.len();
        self.subslabs.push(SubSlab {
            a,
            b,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.subslabs[parent].children.push(id);
        }

        let nn = self.method.num_nodal_values();
        for pos in offset..end {
            let component = self.partition.index(pos);
            let index = self.elements.len();
            self.elements.push(Element {
                component,
                subslab: id,
                a,
                b,
                previous: self.component_elements[component].last().copied(),
                offset: nn * index,
            });
            self.component_elements[component].push(index);
        }

        if end < self.size() {
            let mut t = a;
            while t < b {
                t = self.create(t, b, end, Some(id), steps)?;
            }
        }
        Ok(b)
    }

    pub fn size(&self) -> usize {
        self.u0.len()
    }

    pub fn state(&self) -> SlabState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: SlabState) {
        self.state = state;
    }

    pub fn start_time(&self) -> f64 {
        self.a
    }

    pub fn end_time(&self) -> f64 {
        self.b
    }

    pub fn method(&self) -> &Arc<Method> {
        &self.method
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    pub fn initial_state(&self) -> &[f64] {
        &self.u0
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn num_elements_of(&self, i: usize) -> usize {
        self.component_elements[i].len()
    }

    pub fn num_subslabs(&self) -> usize {
        self.subslabs.len()
    }

    /// Nesting depth of the sub-slab tree, 1 for a slab without nested sub-slabs.
    pub fn depth(&self) -> usize {
        (0..self.subslabs.len())
            .map(|mut id| {
                let mut depth = 1;
                while let Some(parent) = self.subslabs[id].parent {
                    id = parent;
                    depth += 1;
                }
                depth
            })
            .max()
            .unwrap_or(0)
    }

    pub fn nodal_values(&self) -> &DVector<f64> {
        &self.x
    }

    pub(crate) fn set_nodal_values(&mut self, x: DVector<f64>) {
        assert_eq!(x.len(), self.x.len(), "nodal values must match the slab");
        self.x = x;
    }

    pub(crate) fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub(crate) fn subslabs(&self) -> &[SubSlab] {
        &self.subslabs
    }

    /// Index of the end value of the previous element, which is the start value of `element`.
    pub(crate) fn x0_dof(&self, element: usize) -> Option<usize> {
        let nn = self.method.num_nodal_values();
        self.elements[element]
            .previous
            .map(|previous| self.elements[previous].offset + nn - 1)
    }

    pub(crate) fn x0(&self, x: &[f64], element: usize) -> f64 {
        self.x0_dof(element)
            .map_or(self.u0[self.elements[element].component], |dof| x[dof])
    }

    /// Time of the `m`-th quadrature point of an element, exact at the end points.
    pub(crate) fn quadrature_time(&self, element: &Element, m: usize) -> f64 {
        let tau = self.method.quadrature_point(m);
        if tau == 1.0 {
            element.b
        } else {
            element.a + tau * element.length()
        }
    }

    /// The element of component `i` covering `t`, or `None` at (or before) the slab start.
    pub(crate) fn element_at(&self, i: usize, t: f64) -> Option<usize> {
        if t <= self.a {
            return None;
        }
        let elements = &self.component_elements[i];
        let pos = elements.partition_point(|&e| self.elements[e].b < t);
        elements.get(pos.min(elements.len() - 1)).copied()
    }

    /// Value of component `j` at time `t` for the nodal values `x`.
    pub(crate) fn interpolate(&self, x: &[f64], j: usize, t: f64) -> f64 {
        match self.element_at(j, t) {
            None => self.u0[j],
            Some(e) => {
                let element = &self.elements[e];
                let nn = self.method.num_nodal_values();
                let values = &x[element.offset..element.offset + nn];
                self.method.ueval(self.x0(x, e), values, element.tau(t))
            }
        }
    }

    /// One fixed-point step of the element equations: `y = G(x)`.
    pub(crate) fn feval<O>(&self, ode: &O, x: &[f64], y: &mut [f64])
    where
        O: ?Sized + Ode,
    {
        let nn = self.method.num_nodal_values();
        let nq = self.method.num_quadrature_points();
        let mut state = self.u0.clone();
        let mut f = vec![0.0; nq];
        for (e, element) in self.elements.iter().enumerate() {
            let i = element.component;
            for (m, f_m) in f.iter_mut().enumerate() {
                let t = self.quadrature_time(element, m);
                for j in self.dependencies.get(i) {
                    state[j] = self.interpolate(x, j, t);
                }
                *f_m = ode.f_component(&state, t, i);
            }
            let values = &mut y[element.offset..element.offset + nn];
            self.method.update(self.x0(x, e), &f, element.length(), values);
        }
    }

    /// The solution of component `i` at time `t`.
    pub fn usample(&self, i: usize, t: f64) -> f64 {
        self.interpolate(self.x.as_slice(), i, t)
    }

    /// The time step of component `i` at time `t`.
    pub fn ksample(&self, i: usize, t: f64) -> f64 {
        let e = self
            .element_at(i, t)
            .unwrap_or(self.component_elements[i][0]);
        self.elements[e].length()
    }

    /// The end-point residual of the element of component `i` covering time `t`.
    pub fn rsample<O>(&self, ode: &O, i: usize, t: f64) -> f64
    where
        O: ?Sized + Ode,
    {
        let e = self
            .element_at(i, t)
            .unwrap_or(self.component_elements[i][0]);
        let element = &self.elements[e];
        let x = self.x.as_slice();
        let mut state = self.u0.clone();
        for j in self.dependencies.get(i) {
            state[j] = self.interpolate(x, j, element.b);
        }
        let f = ode.f_component(&state, element.b, i);
        let nn = self.method.num_nodal_values();
        let values = &x[element.offset..element.offset + nn];
        self.method.residual(self.x0(x, e), values, f, element.length())
    }

    /// Length of the last element of component `i`.
    pub fn last_element_length(&self, i: usize) -> f64 {
        let e = *self.component_elements[i]
            .last()
            .expect("every component has at least one element in a built slab");
        self.elements[e].length()
    }

    /// The solution at the end of the slab.
    pub fn end_state(&self) -> Vec<f64> {
        let nn = self.method.num_nodal_values();
        self.component_elements
            .iter()
            .map(|elements| match elements.last() {
                Some(&e) => self.x[self.elements[e].offset + nn - 1],
                None => f64::NAN,
            })
            .collect()
    }

    /// Makes the end state the initial state of the next slab.
    pub fn shift(&mut self) {
        self.u0 = self.end_state();
    }
}
