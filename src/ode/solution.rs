use serde::{Deserialize, Serialize};

/// Counters collected while stepping through the time interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OdeStatistics {
    pub num_slabs: usize,
    pub num_elements: usize,
    pub elements_per_component: Vec<usize>,
    /// Total number of nonlinear iterations over all slabs.
    pub num_iterations: usize,
    /// Number of elements a mono-adaptive method with the smallest step of every slab would need.
    pub num_mono_elements: usize,
}

impl OdeStatistics {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            elements_per_component: vec![0; size],
            ..Self::default()
        }
    }

    /// Ratio of the mono-adaptive element count to the multi-adaptive one.
    pub fn efficiency_index(&self) -> f64 {
        if self.num_elements == 0 {
            1.0
        } else {
            self.num_mono_elements as f64 / self.num_elements as f64
        }
    }
}

/// Samples of the solution of an ODE, in increasing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdeSolution {
    times: Vec<f64>,
    // Row-major, one row of `size` values per sample
    values: Vec<f64>,
    size: usize,
    statistics: OdeStatistics,
}

impl OdeSolution {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            times: Vec::new(),
            values: Vec::new(),
            size,
            statistics: OdeStatistics::new(size),
        }
    }

    pub(crate) fn push(&mut self, t: f64, u: &[f64]) {
        assert_eq!(u.len(), self.size);
        if self.times.last().map_or(false, |&last| t <= last) {
            return;
        }
        self.times.push(t);
        self.values.extend_from_slice(u);
    }

    pub(crate) fn statistics_mut(&mut self) -> &mut OdeStatistics {
        &mut self.statistics
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn num_samples(&self) -> usize {
        self.times.len()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// The state at the `s`-th sample.
    pub fn sample(&self, s: usize) -> &[f64] {
        &self.values[s * self.size..(s + 1) * self.size]
    }

    /// Component `i` at every sample.
    pub fn component(&self, i: usize) -> Vec<f64> {
        self.values.iter().skip(i).step_by(self.size).copied().collect()
    }

    /// The time and state of the last sample.
    pub fn last(&self) -> Option<(f64, &[f64])> {
        let s = self.times.len().checked_sub(1)?;
        Some((self.times[s], self.sample(s)))
    }

    /// Evaluates the solution at `t` by linear interpolation between samples, holding the first
    /// and last sample constant outside of the sampled interval.
    ///
    /// # Panics
    ///
    /// Panics if there are no samples or `u` does not match the size of the system.
    pub fn eval(&self, t: f64, u: &mut [f64]) {
        assert_eq!(u.len(), self.size, "output must match the size of the system");
        let n = self.times.len();
        assert!(n > 0, "cannot evaluate a solution without samples");
        let s = self.times.partition_point(|&t_s| t_s < t);
        if s == 0 {
            u.copy_from_slice(self.sample(0));
        } else if s == n {
            u.copy_from_slice(self.sample(n - 1));
        } else {
            let (t0, t1) = (self.times[s - 1], self.times[s]);
            let w = (t - t0) / (t1 - t0);
            for (u_i, (a, b)) in u.iter_mut().zip(self.sample(s - 1).iter().zip(self.sample(s))) {
                *u_i = (1.0 - w) * a + w * b;
            }
        }
    }

    pub fn statistics(&self) -> &OdeStatistics {
        &self.statistics
    }
}
