//! Trust-region minimization with a quadratic model built from the
//! objective's Hessian.

use ndarray::{Array1, Array2};

use crate::convergence::{ConvergenceMonitor, ConvergenceOptions, IterationBudget};
use crate::error::{ConfigError, OptimizeError};
use crate::linalg::{all_finite, norm};
use crate::objective::{Objective, value_and_gradient};
use crate::report::{EvalCounts, OptimizationReport, Status};
use crate::subproblem::{self, SearchMethod};

/// Settings for [`TrustRegion`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrustRegionOptions {
    /// Subproblem solver (default: [`SearchMethod::Dogleg`]).
    pub method: SearchMethod,
    /// Radius at the start of every run (default: 1.0).
    pub initial_radius: f64,
    pub radius_min: f64,
    pub radius_max: f64,
    /// A step is accepted when `ρ > accept_ratio` (default: 0.1).
    pub accept_ratio: f64,
    /// `ρ` below this shrinks the radius (default: 0.25).
    pub shrink_ratio: f64,
    /// `ρ` above this grows the radius after a boundary step (default: 0.75).
    pub grow_ratio: f64,
    pub shrink_factor: f64,
    pub grow_factor: f64,
    /// A step counts as a boundary step when `‖p‖ ≥ boundary_fraction·Δ` (default: 0.99).
    pub boundary_fraction: f64,
    pub convergence: ConvergenceOptions,
}

impl Default for TrustRegionOptions {
    fn default() -> Self {
        Self {
            method: SearchMethod::default(),
            initial_radius: 1.0,
            radius_min: 1e-12,
            radius_max: 1e6,
            accept_ratio: 0.1,
            shrink_ratio: 0.25,
            grow_ratio: 0.75,
            shrink_factor: 0.5,
            grow_factor: 2.0,
            boundary_fraction: 0.99,
            convergence: ConvergenceOptions::default(),
        }
    }
}

impl TrustRegionOptions {
    pub fn with_method(mut self, method: SearchMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_initial_radius(mut self, radius: f64) -> Self {
        self.initial_radius = radius;
        self
    }

    /// Sets the clamp applied to the radius after every update.
    pub fn with_radius_bounds(mut self, min: f64, max: f64) -> Self {
        self.radius_min = min;
        self.radius_max = max;
        self
    }

    /// Sets the acceptance, shrink and grow thresholds on `ρ`.
    pub fn with_ratios(mut self, accept: f64, shrink: f64, grow: f64) -> Self {
        self.accept_ratio = accept;
        self.shrink_ratio = shrink;
        self.grow_ratio = grow;
        self
    }

    pub fn with_factors(mut self, shrink: f64, grow: f64) -> Self {
        self.shrink_factor = shrink;
        self.grow_factor = grow;
        self
    }

    /// Sets the gradient-norm convergence tolerance (default: 1e-6).
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.convergence.gradient_tolerance = tolerance;
        self
    }

    /// See [`ConvergenceOptions::with_stagnation`].
    pub fn with_stagnation(mut self, tolerance: f64, window: usize) -> Self {
        self.convergence = self.convergence.with_stagnation(tolerance, window);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.convergence.validate()?;
        let (min, initial, max) = (self.radius_min, self.initial_radius, self.radius_max);
        let bounds_ok = [min, initial, max].iter().all(|r| r.is_finite())
            && 0.0 < min
            && min <= initial
            && initial <= max;
        if !bounds_ok {
            return Err(ConfigError::InvalidRadiusBounds { min, initial, max });
        }
        if !(self.accept_ratio >= 0.0 && self.accept_ratio < self.shrink_ratio) {
            return Err(ConfigError::InvalidRatio {
                name: "accept_ratio",
                value: self.accept_ratio,
            });
        }
        if !(self.shrink_ratio < self.grow_ratio) {
            return Err(ConfigError::InvalidRatio {
                name: "shrink_ratio",
                value: self.shrink_ratio,
            });
        }
        if !(self.grow_ratio < 1.0) {
            return Err(ConfigError::InvalidRatio {
                name: "grow_ratio",
                value: self.grow_ratio,
            });
        }
        if !(self.boundary_fraction > 0.0 && self.boundary_fraction <= 1.0) {
            return Err(ConfigError::InvalidRatio {
                name: "boundary_fraction",
                value: self.boundary_fraction,
            });
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor < 1.0) {
            return Err(ConfigError::InvalidFactor {
                name: "shrink_factor",
                value: self.shrink_factor,
            });
        }
        if !(self.grow_factor > 1.0 && self.grow_factor.is_finite()) {
            return Err(ConfigError::InvalidFactor {
                name: "grow_factor",
                value: self.grow_factor,
            });
        }
        Ok(())
    }
}

/// Trust-region minimizer bound to an objective.
///
/// Uses [`Objective::hessian`] for the model. Objectives that keep the
/// default zero Hessian get first-order behaviour: every subproblem reduces
/// to the Cauchy point along `-g`. The model is rebuilt at the start and
/// after every accepted step, and each rebuild counts towards
/// [`OptimizationReport::hessian_evals`] whether or not the oracle overrides
/// the default.
pub struct TrustRegion<O> {
    oracle: O,
    options: TrustRegionOptions,
    radius: f64,
}

impl<O: Objective> TrustRegion<O> {
    /// Binds `oracle` with default options and the given subproblem solver.
    pub fn new(oracle: O, method: SearchMethod) -> Result<Self, ConfigError> {
        Self::init(oracle, TrustRegionOptions::default().with_method(method))
    }

    pub fn init(oracle: O, options: TrustRegionOptions) -> Result<Self, ConfigError> {
        if oracle.dimension() == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        options.validate()?;
        Ok(Self {
            oracle,
            options,
            radius: options.initial_radius,
        })
    }

    pub fn options(&self) -> &TrustRegionOptions {
        &self.options
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Current radius: the initial radius before a run, the final one after.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Minimizes from `iterate`, overwriting it with every accepted point.
    ///
    /// `max_iterations < 0` runs without a cap. Rejected steps count as
    /// iterations. The radius restarts from `initial_radius` on each call.
    pub fn optimize(
        &mut self,
        max_iterations: i64,
        iterate: &mut Array1<f64>,
    ) -> Result<OptimizationReport, OptimizeError> {
        let n = self.oracle.dimension();
        if iterate.len() != n {
            return Err(OptimizeError::DimensionMismatch {
                expected: n,
                found: iterate.len(),
            });
        }
        let opts = self.options;
        self.radius = opts.initial_radius;
        let mut monitor =
            ConvergenceMonitor::new(opts.convergence, IterationBudget::from(max_iterations));
        let mut counts = EvalCounts::default();

        let mut x_k = iterate.clone();
        counts.func += 1;
        counts.grad += 1;
        let (mut f_k, mut g_k) = value_and_gradient(&self.oracle, &x_k)?;
        if !f_k.is_finite() || !all_finite(&g_k) {
            log::warn!("[TR] Non-finite value or gradient at the starting point.");
            return Err(OptimizeError::NonFinite { iteration: 0 });
        }
        let mut g_norm = norm(&g_k);
        let mut h_k = self.model_hessian(&x_k, &mut counts);

        let mut k = 0usize;
        loop {
            if monitor.gradient_converged(g_norm) {
                log::info!(
                    "[TR] Converged: iters={}, f={:.6e}, ||g||={:.3e}, radius={:.3e}, fe={}, ge={}, he={}",
                    k,
                    f_k,
                    g_norm,
                    self.radius,
                    counts.func,
                    counts.grad,
                    counts.hessian
                );
                return Ok(counts.report(Status::Converged, f_k, g_norm, k));
            }
            if monitor.budget_exhausted(k) {
                log::warn!(
                    "[TR] Max iterations reached: iters={}, f={:.6e}, ||g||={:.3e}, radius={:.3e}",
                    k,
                    f_k,
                    g_norm,
                    self.radius
                );
                return Ok(counts.report(Status::IterationLimitReached, f_k, g_norm, k));
            }

            let sub = subproblem::solve(opts.method, &g_k, &h_k, self.radius);
            let x_trial = &x_k + &sub.step;
            counts.func += 1;
            counts.grad += 1;
            let (f_trial, g_trial) = value_and_gradient(&self.oracle, &x_trial)?;
            k += 1;

            let trial_ok = f_trial.is_finite() && all_finite(&g_trial);
            let rho = if trial_ok
                && sub.predicted_decrease.is_finite()
                && sub.predicted_decrease > 0.0
            {
                (f_k - f_trial) / sub.predicted_decrease
            } else {
                f64::NEG_INFINITY
            };

            let at_floor = self.radius <= opts.radius_min;
            let step_norm = norm(&sub.step);
            if rho < opts.shrink_ratio {
                self.radius = (opts.shrink_factor * self.radius).max(opts.radius_min);
            } else if rho > opts.grow_ratio
                && (sub.hits_boundary || step_norm >= opts.boundary_fraction * self.radius)
            {
                self.radius = (opts.grow_factor * self.radius).min(opts.radius_max);
            }

            if rho > opts.accept_ratio {
                let f_prev = f_k;
                x_k = x_trial;
                f_k = f_trial;
                g_k = g_trial;
                g_norm = norm(&g_k);
                iterate.assign(&x_k);
                h_k = self.model_hessian(&x_k, &mut counts);

                let flat = monitor.record_accepted(f_prev, f_k);
                if flat && !monitor.gradient_converged(g_norm) {
                    log::warn!(
                        "[TR] Stagnated: objective flat for the stagnation window; iters={}, f={:.6e}, ||g||={:.3e}",
                        k,
                        f_k,
                        g_norm
                    );
                    return Ok(counts.report(Status::Stagnated, f_k, g_norm, k));
                }
            } else {
                log::debug!(
                    "[TR] Step rejected at iter {} ({}): rho={:.3e}, |p|={:.3e}, radius now {:.3e}",
                    k,
                    sub.method_used,
                    rho,
                    step_norm,
                    self.radius
                );
                if at_floor {
                    log::warn!(
                        "[TR] Stagnated: step rejected at the minimum radius {:.3e}; iters={}, f={:.6e}, ||g||={:.3e}",
                        opts.radius_min,
                        k,
                        f_k,
                        g_norm
                    );
                    return Ok(counts.report(Status::Stagnated, f_k, g_norm, k));
                }
            }
        }
    }

    // A non-finite or misshapen Hessian degrades the model to first order.
    // Every rebuild counts as a Hessian request, the default zero Hessian included.
    fn model_hessian(&self, x: &Array1<f64>, counts: &mut EvalCounts) -> Array2<f64> {
        counts.hessian += 1;
        let n = x.len();
        let h = self.oracle.hessian(x);
        if h.dim() != (n, n) {
            log::warn!(
                "[TR] Hessian has shape {:?}, expected ({}, {}); using a first-order model for this iterate.",
                h.dim(),
                n,
                n
            );
            Array2::zeros((n, n))
        } else if h.iter().all(|v| v.is_finite()) {
            h
        } else {
            log::debug!("[TR] Non-finite Hessian; using a first-order model for this iterate.");
            Array2::zeros((n, n))
        }
    }
}
