//! Stopping rules shared by both optimizers.

use crate::error::ConfigError;

/// Hard cap on outer iterations.
///
/// Built from the signed count accepted by `optimize`: any negative value
/// means no cap (run until another terminal state), zero or more is a hard
/// ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationBudget {
    Limited(usize),
    Unlimited,
}

impl From<i64> for IterationBudget {
    fn from(max_iterations: i64) -> Self {
        if max_iterations < 0 {
            IterationBudget::Unlimited
        } else {
            IterationBudget::Limited(max_iterations as usize)
        }
    }
}

/// Tolerances for convergence and stagnation detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceOptions {
    /// Converged once `||g|| <= gradient_tolerance` (default: 1e-6).
    pub gradient_tolerance: f64,
    /// Relative objective change `|Δf| / (1 + |f|)` treated as "no change"
    /// (default: 1e-12).
    pub stagnation_tolerance: f64,
    /// Consecutive accepted iterations without change before stopping (default: 10).
    pub stagnation_window: usize,
}

impl Default for ConvergenceOptions {
    fn default() -> Self {
        Self {
            gradient_tolerance: 1e-6,
            stagnation_tolerance: 1e-12,
            stagnation_window: 10,
        }
    }
}

impl ConvergenceOptions {
    pub fn with_gradient_tolerance(mut self, tolerance: f64) -> Self {
        self.gradient_tolerance = tolerance;
        self
    }

    /// Stops after `window` consecutive accepted iterations whose relative
    /// objective change is at most `tolerance`.
    pub fn with_stagnation(mut self, tolerance: f64, window: usize) -> Self {
        self.stagnation_tolerance = tolerance;
        self.stagnation_window = window;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !self.gradient_tolerance.is_finite() || self.gradient_tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance {
                name: "gradient_tolerance",
                value: self.gradient_tolerance,
            });
        }
        if !self.stagnation_tolerance.is_finite() || self.stagnation_tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance {
                name: "stagnation_tolerance",
                value: self.stagnation_tolerance,
            });
        }
        if self.stagnation_window == 0 {
            return Err(ConfigError::InvalidStagnationWindow);
        }
        Ok(())
    }
}

/// Per-run bookkeeping for the stopping rules.
#[derive(Debug, Clone)]
pub(crate) struct ConvergenceMonitor {
    options: ConvergenceOptions,
    budget: IterationBudget,
    flat_streak: usize,
}

impl ConvergenceMonitor {
    pub(crate) fn new(options: ConvergenceOptions, budget: IterationBudget) -> Self {
        Self {
            options,
            budget,
            flat_streak: 0,
        }
    }

    #[inline]
    pub(crate) fn gradient_converged(&self, gradient_norm: f64) -> bool {
        gradient_norm <= self.options.gradient_tolerance
    }

    /// Records an accepted step from `f_old` to `f_new`; true once the
    /// objective has been flat for the whole stagnation window.
    pub(crate) fn record_accepted(&mut self, f_old: f64, f_new: f64) -> bool {
        let rel_change = (f_old - f_new).abs() / (1.0 + f_old.abs());
        if rel_change <= self.options.stagnation_tolerance {
            self.flat_streak += 1;
        } else {
            self.flat_streak = 0;
        }
        self.flat_streak >= self.options.stagnation_window
    }

    #[inline]
    pub(crate) fn budget_exhausted(&self, iterations: usize) -> bool {
        match self.budget {
            IterationBudget::Limited(max) => iterations >= max,
            IterationBudget::Unlimited => false,
        }
    }
}
