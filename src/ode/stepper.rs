use crate::error::{FemError, Result};
use crate::ode::adaptivity::MultiAdaptivity;
use crate::ode::method::{Method, MethodCache};
use crate::ode::solution::OdeSolution;
use crate::ode::solver::solve_slab;
use crate::ode::timeslab::TimeSlab;
use crate::ode::{Dependencies, Ode, OdeSettings};
use log::info;
use std::sync::Arc;

/// Integrates an ODE over a time interval with multi-adaptive cG(q) or dG(q) time slabs.
#[derive(Debug)]
pub struct TimeStepper<'a, O: ?Sized> {
    ode: &'a mut O,
    settings: OdeSettings,
    method: Arc<Method>,
}

impl<'a, O> TimeStepper<'a, O>
where
    O: ?Sized + Ode,
{
    pub fn new(ode: &'a mut O, settings: OdeSettings, methods: &MethodCache) -> Result<Self> {
        if ode.size() == 0 {
            return Err(FemError::consistency("cannot integrate an ODE without components"));
        }
        let positive = [
            ("tolerance", settings.tolerance),
            ("discrete tolerance", settings.effective_discrete_tolerance()),
            ("initial time step", settings.initial_time_step),
            ("maximum time step", settings.maximum_time_step),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(FemError::consistency(format!("{} must be positive, got {}", name, value)));
            }
        }
        let method = methods.get(settings.method, settings.order)?;
        Ok(Self { ode, settings, method })
    }

    pub fn settings(&self) -> &OdeSettings {
        &self.settings
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Solves the ODE from `t0` to its own [`end_time`](Ode::end_time).
    pub fn solve_from(&mut self, t0: f64) -> Result<OdeSolution> {
        let t1 = self.ode.end_time();
        self.solve(t0, t1)
    }

    /// Solves the ODE from `t0` to `t1`, or until [`Ode::update`] asks to stop.
    ///
    /// The solution is sampled at every slab end point and at `number_of_samples` uniformly
    /// spaced times.
    pub fn solve(&mut self, t0: f64, t1: f64) -> Result<OdeSolution> {
        if !(t0 < t1) {
            return Err(FemError::consistency(format!(
                "cannot solve on the empty interval [{}, {}]",
                t0, t1
            )));
        }
        let n = self.ode.size();
        let mut u0 = vec![0.0; n];
        self.ode.initial_value(&mut u0);

        let dependencies = if self.settings.detect_dependencies {
            Dependencies::detect(&*self.ode, &u0, t0)
        } else {
            self.ode.dependencies()
        };
        if dependencies.size() != n {
            return Err(FemError::dimension_mismatch("ODE dependencies", n, dependencies.size()));
        }

        let mut solution = OdeSolution::new(n);
        solution.push(t0, &u0);
        let mut adaptivity = MultiAdaptivity::new(n, &self.settings);
        let mut slab = TimeSlab::new(Arc::clone(&self.method), u0, dependencies, &self.settings);

        let samples = self.settings.number_of_samples;
        let sample_time = |s: usize| t0 + (t1 - t0) * s as f64 / samples as f64;
        let mut next_sample = 1;
        let snap = f64::EPSILON * (t1 - t0);

        let mut t = t0;
        while t < t1 {
            let mut end = slab.build(t, t1, &adaptivity)?;
            let result = solve_slab(&mut slab, &*self.ode, &self.settings)?;
            adaptivity.update(&slab, &self.method, &*self.ode);

            let statistics = solution.statistics_mut();
            statistics.num_slabs += 1;
            statistics.num_elements += slab.num_elements();
            statistics.num_iterations += result.iterations;
            let mut max_elements = 0;
            for i in 0..n {
                let elements = slab.num_elements_of(i);
                statistics.elements_per_component[i] += elements;
                max_elements = max_elements.max(elements);
            }
            statistics.num_mono_elements += n * max_elements;

            if t1 - end < snap {
                end = t1;
            }
            let mut u = vec![0.0; n];
            while next_sample <= samples && sample_time(next_sample) < end {
                let ts = sample_time(next_sample);
                for (i, u_i) in u.iter_mut().enumerate() {
                    *u_i = slab.usample(i, ts);
                }
                solution.push(ts, &u);
                next_sample += 1;
            }
            let u_end = slab.end_state();
            solution.push(end, &u_end);
            slab.shift();
            t = end;

            if !self.ode.update(&u_end, t, t >= t1) {
                info!("Stopped by the ODE at t = {:.6}", t);
                break;
            }
        }

        let statistics = solution.statistics();
        info!(
            "Solved ODE of size {} on [{}, {}] with {}({}): {} slabs, {} elements, {} iterations",
            n,
            t0,
            t,
            self.method.kind(),
            self.method.degree(),
            statistics.num_slabs,
            statistics.num_elements,
            statistics.num_iterations
        );
        info!("Multi-adaptive efficiency index: {:.3}", statistics.efficiency_index());
        Ok(solution)
    }
}
