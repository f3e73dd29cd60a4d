//! Limited-memory BFGS.
//!
//! The inverse Hessian is never formed. A bounded FIFO of correction pairs
//! `(s, y)` (step and gradient change) stands in for it, and the two-loop
//! recursion applies the implied inverse-Hessian approximation to the
//! gradient in `O(m·n)` time. Each search direction is handed to a Strong
//! Wolfe line search.

use std::collections::VecDeque;

use ndarray::Array1;

use crate::convergence::{ConvergenceMonitor, ConvergenceOptions, IterationBudget};
use crate::error::{ConfigError, OptimizeError};
use crate::line_search::{LineSearchError, LineSearchOptions, search_with_fallback};
use crate::linalg::{all_finite, norm};
use crate::objective::{Objective, value_and_gradient};
use crate::report::{EvalCounts, OptimizationReport, Status};

// Relative curvature floor for admitting a pair: s·y > CURVATURE_EPS·|s|·|y|.
const CURVATURE_EPS: f64 = 1e-12;

/// Settings for [`Lbfgs`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LbfgsOptions {
    /// Number of correction pairs kept (default: 10). Zero gives steepest descent.
    pub memory: usize,
    pub convergence: ConvergenceOptions,
    pub line_search: LineSearchOptions,
}

impl Default for LbfgsOptions {
    fn default() -> Self {
        Self {
            memory: 10,
            convergence: ConvergenceOptions::default(),
            line_search: LineSearchOptions::default(),
        }
    }
}

impl LbfgsOptions {
    pub fn with_memory(mut self, memory: usize) -> Self {
        self.memory = memory;
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

    pub fn with_line_search(mut self, line_search: LineSearchOptions) -> Self {
        self.line_search = line_search;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.convergence.validate()?;
        self.line_search.validate()
    }
}

/// A stored step/gradient-difference pair with its curvature `s·y > 0`.
#[derive(Debug, Clone)]
pub struct CorrectionPair {
    s: Array1<f64>,
    y: Array1<f64>,
    sy: f64,
}

impl CorrectionPair {
    /// Step `x_{k+1} - x_k`.
    pub fn s(&self) -> &Array1<f64> {
        &self.s
    }
    /// Gradient change `g_{k+1} - g_k`.
    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }
    /// `s·y`, always positive.
    pub fn curvature(&self) -> f64 {
        self.sy
    }
}

// Bounded FIFO of correction pairs (internal only)
#[derive(Debug, Clone)]
struct CorrectionHistory {
    pairs: VecDeque<CorrectionPair>,
    capacity: usize,
}

impl CorrectionHistory {
    fn new(capacity: usize) -> Self {
        Self {
            pairs: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn clear(&mut self) {
        self.pairs.clear();
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }

    fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Offers a pair; returns whether it was stored. Pairs failing the
    /// curvature condition are dropped, and the oldest pair is evicted when full.
    fn push(&mut self, s: Array1<f64>, y: Array1<f64>) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let sy = s.dot(&y);
        let floor = CURVATURE_EPS * norm(&s) * norm(&y);
        if !sy.is_finite() || sy <= floor {
            return false;
        }
        if self.pairs.len() == self.capacity {
            self.pairs.pop_front();
        }
        self.pairs.push_back(CorrectionPair { s, y, sy });
        true
    }

    /// Two-loop recursion: returns `-H·g` for the implicit inverse-Hessian
    /// approximation `H`, scaled initially by `s·y / y·y` of the newest pair.
    fn direction(&self, g: &Array1<f64>) -> Array1<f64> {
        let mut q = g.clone();
        let mut alphas = Vec::with_capacity(self.pairs.len());
        for pair in self.pairs.iter().rev() {
            let a = pair.s.dot(&q) / pair.sy;
            q.scaled_add(-a, &pair.y);
            alphas.push(a);
        }
        if let Some(newest) = self.pairs.back() {
            let gamma = newest.sy / newest.y.dot(&newest.y);
            q *= gamma;
        }
        for (pair, a) in self.pairs.iter().zip(alphas.iter().rev()) {
            let b = pair.y.dot(&q) / pair.sy;
            q.scaled_add(a - b, &pair.s);
        }
        q.mapv_inplace(|v| -v);
        q
    }
}

/// L-BFGS minimizer bound to an objective.
///
/// ```
/// use ndarray::{array, Array1};
/// use wolfe_lbfgs_tr::{FnObjective, Lbfgs, Status};
///
/// let rosenbrock = FnObjective::new(2, |x: &Array1<f64>| {
///     let f = (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2);
///     let g = array![
///         -2.0 * (1.0 - x[0]) - 400.0 * (x[1] - x[0].powi(2)) * x[0],
///         200.0 * (x[1] - x[0].powi(2)),
///     ];
///     (f, g)
/// });
/// let mut x = array![-1.2, 1.0];
/// let mut optimizer = Lbfgs::new(rosenbrock, 5).unwrap();
/// let report = optimizer.optimize(-1, &mut x).unwrap();
/// assert_eq!(report.status, Status::Converged);
/// assert!((x[0] - 1.0).abs() < 1e-4 && (x[1] - 1.0).abs() < 1e-4);
/// ```
pub struct Lbfgs<O> {
    oracle: O,
    options: LbfgsOptions,
    history: CorrectionHistory,
}

impl<O: Objective> Lbfgs<O> {
    /// Binds `oracle` with default options and `memory` correction pairs.
    pub fn new(oracle: O, memory: usize) -> Result<Self, ConfigError> {
        Self::init(oracle, LbfgsOptions::default().with_memory(memory))
    }

    /// Binds `oracle`, validating `options` and the objective's dimension.
    pub fn init(oracle: O, options: LbfgsOptions) -> Result<Self, ConfigError> {
        if oracle.dimension() == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        options.validate()?;
        Ok(Self {
            oracle,
            options,
            history: CorrectionHistory::new(options.memory),
        })
    }

    pub fn options(&self) -> &LbfgsOptions {
        &self.options
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Number of correction pairs currently stored.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Stored correction pairs, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &CorrectionPair> {
        self.history.pairs.iter()
    }

    /// Minimizes from `iterate`, overwriting it with every accepted point.
    ///
    /// `max_iterations < 0` runs without a cap until another terminal state.
    /// The history is cleared at the start of each call, so repeated calls
    /// are independent runs.
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
        self.history.clear();
        let mut monitor =
            ConvergenceMonitor::new(self.options.convergence, IterationBudget::from(max_iterations));
        let mut counts = EvalCounts::default();

        let mut x_k = iterate.clone();
        counts.func += 1;
        counts.grad += 1;
        let (mut f_k, mut g_k) = value_and_gradient(&self.oracle, &x_k)?;
        if !f_k.is_finite() || !all_finite(&g_k) {
            log::warn!("[L-BFGS] Non-finite value or gradient at the starting point.");
            return Err(OptimizeError::NonFinite { iteration: 0 });
        }
        let mut g_norm = norm(&g_k);

        let mut k = 0usize;
        loop {
            if monitor.gradient_converged(g_norm) {
                let report = counts.report(Status::Converged, f_k, g_norm, k);
                log::info!(
                    "[L-BFGS] Converged by gradient: iters={}, f={:.6e}, ||g||={:.3e}, fe={}, ge={}",
                    k,
                    f_k,
                    g_norm,
                    counts.func,
                    counts.grad
                );
                return Ok(report);
            }
            if monitor.budget_exhausted(k) {
                log::warn!(
                    "[L-BFGS] Max iterations reached: iters={}, f={:.6e}, ||g||={:.3e}, fe={}, ge={}",
                    k,
                    f_k,
                    g_norm,
                    counts.func,
                    counts.grad
                );
                return Ok(counts.report(Status::IterationLimitReached, f_k, g_norm, k));
            }

            let mut d_k = self.history.direction(&g_k);
            let slope = g_k.dot(&d_k);
            if !slope.is_finite() || slope >= 0.0 || !all_finite(&d_k) {
                log::warn!(
                    "[L-BFGS] Non-descent direction (gᵀd = {:.2e}); resetting to -g and clearing history.",
                    slope
                );
                self.history.clear();
                d_k = g_k.mapv(|v| -v);
            }
            // Without curvature information the raw gradient has no natural
            // scale, so the first trial moves a unit distance at most.
            let alpha0 = if self.history.is_empty() {
                (1.0 / g_norm).min(1.0)
            } else {
                1.0
            };

            let step = match search_with_fallback(
                &self.options.line_search,
                &self.oracle,
                &x_k,
                f_k,
                &g_k,
                &d_k,
                alpha0,
                &mut counts,
            ) {
                Ok(step) => step,
                Err(failure) => {
                    if let LineSearchError::GradientLength { expected, found } = failure.error {
                        log::warn!(
                            "[L-BFGS] Oracle returned a gradient of length {} (expected {}).",
                            found,
                            expected
                        );
                        return Err(OptimizeError::DimensionMismatch { expected, found });
                    }
                    if let Some(best) = failure.best {
                        iterate.assign(&best.x);
                        f_k = best.f;
                        g_norm = norm(&best.g);
                        k += 1;
                    }
                    log::warn!(
                        "[L-BFGS] Line search failed ({}): iters={}, f={:.6e}, ||g||={:.3e}, fe={}, ge={}",
                        failure.error,
                        k,
                        f_k,
                        g_norm,
                        counts.func,
                        counts.grad
                    );
                    return Ok(counts.report(Status::LineSearchFailed, f_k, g_norm, k));
                }
            };

            let s_k = &step.x - &x_k;
            let y_k = &step.g - &g_k;
            let sy = s_k.dot(&y_k);
            if !self.history.push(s_k, y_k) && self.options.memory > 0 {
                log::debug!(
                    "[L-BFGS] Curvature pair rejected at iter {} (s·y = {:.3e}).",
                    k,
                    sy
                );
            }

            k += 1;
            log::debug!(
                "[L-BFGS] iter {}: alpha={:.3e}, f={:.6e} -> {:.6e}, pairs={}",
                k,
                step.alpha,
                f_k,
                step.f,
                self.history.len()
            );
            let f_prev = f_k;
            x_k = step.x;
            f_k = step.f;
            g_k = step.g;
            g_norm = norm(&g_k);
            iterate.assign(&x_k);

            let flat = monitor.record_accepted(f_prev, f_k);
            if flat && !monitor.gradient_converged(g_norm) {
                log::warn!(
                    "[L-BFGS] Stagnated: objective flat for the stagnation window; iters={}, f={:.6e}, ||g||={:.3e}",
                    k,
                    f_k,
                    g_norm
                );
                return Ok(counts.report(Status::Stagnated, f_k, g_norm, k));
            }
        }
    }
}
