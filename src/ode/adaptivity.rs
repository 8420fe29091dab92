use crate::ode::method::Method;
use crate::ode::timeslab::TimeSlab;
use crate::ode::{Ode, OdeSettings};
use log::debug;

/// Time step control for a single component.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Regulator {
    k: f64,
}

impl Regulator {
    pub fn new(k: f64) -> Self {
        Self { k }
    }

    pub fn timestep(&self) -> f64 {
        self.k
    }

    /// Proposes the step `k_new`. Unless the step is fixed, the new step is the harmonic mean
    /// of the previous and the proposed step, which damps oscillations in the step sequence.
    pub fn update(&mut self, k_new: f64, kmax: f64, fixed: bool) {
        if fixed {
            return;
        }
        let k0 = self.k;
        self.k = (2.0 * k0 * k_new / (k0 + k_new)).min(kmax);
    }

    /// Overrides the step, for user-provided time steps.
    pub fn set(&mut self, k: f64) {
        self.k = k;
    }
}

/// Time step selection for every component of a multi-adaptive system.
#[derive(Debug, Clone)]
pub struct MultiAdaptivity {
    regulators: Vec<Regulator>,
    tolerance: f64,
    kmax: f64,
    safety_factor: f64,
    fixed: bool,
    // Largest error estimate of the last slab
    error: f64,
}

impl MultiAdaptivity {
    pub fn new(size: usize, settings: &OdeSettings) -> Self {
        let k0 = settings.initial_time_step.min(settings.maximum_time_step);
        Self {
            regulators: vec![Regulator::new(k0); size],
            tolerance: settings.tolerance,
            kmax: settings.maximum_time_step,
            safety_factor: settings.safety_factor,
            fixed: settings.fixed_time_step,
            error: 0.0,
        }
    }

    pub fn timestep(&self, i: usize) -> f64 {
        self.regulators[i].timestep()
    }

    /// The current step of every component.
    pub fn timesteps(&self) -> Vec<f64> {
        self.regulators.iter().map(Regulator::timestep).collect()
    }

    /// Overrides the step of component `i`.
    pub fn set_timestep(&mut self, i: usize, k: f64) {
        self.regulators[i].set(k);
    }

    pub fn regulator(&self, i: usize) -> &Regulator {
        &self.regulators[i]
    }

    /// Largest error estimate of the last slab passed to [`update`](Self::update).
    pub fn error_estimate(&self) -> f64 {
        self.error
    }

    /// Chooses new steps from the end-point residuals of a solved slab.
    pub fn update<O>(&mut self, slab: &TimeSlab, method: &Method, ode: &O)
    where
        O: ?Sized + Ode,
    {
        let t = slab.end_time();
        let tolerance = self.safety_factor * self.tolerance;
        self.error = 0.0;
        for (i, regulator) in self.regulators.iter_mut().enumerate() {
            let k0 = slab.last_element_length(i);
            let r = slab.rsample(ode, i, t);
            self.error = self.error.max(method.error(k0, r));
            if self.fixed {
                let k = ode.timestep(t, i, regulator.timestep());
                regulator.set(k);
            } else {
                let k_new = method.timestep(r, tolerance, k0, self.kmax);
                regulator.update(k_new, self.kmax, false);
            }
        }
        debug!(
            "Updated time steps at t = {:.6}: error estimate {:.3e}, steps in [{:.3e}, {:.3e}]",
            t,
            self.error,
            self.regulators.iter().map(Regulator::timestep).fold(f64::INFINITY, f64::min),
            self.regulators.iter().map(Regulator::timestep).fold(0.0, f64::max),
        );
    }
}
