//! Step-length selection along a descent direction.
//!
//! The primary search enforces the Strong Wolfe conditions following the
//! structure of Algorithms 3.5 and 3.6 in Nocedal & Wright: expand the trial
//! step until a bracket is found, then zoom into it with safeguarded cubic
//! interpolation. A plain Armijo backtracking search serves as the fallback.

use std::fmt;

use ndarray::Array1;

use crate::error::ConfigError;
use crate::linalg::{all_finite, norm};
use crate::objective::Objective;
use crate::report::EvalCounts;

/// Line search settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearchOptions {
    /// Sufficient decrease (Armijo) constant (default: 1e-4).
    pub c1: f64,
    /// Curvature constant for the strong Wolfe condition (default: 0.9).
    pub c2: f64,
    /// Trial points allowed while bracketing (default: 20).
    pub max_attempts: usize,
    /// Trial points allowed inside zoom (default: 20).
    pub max_zoom_attempts: usize,
    /// Expansion of the trial step while bracketing (default: 2.0).
    pub growth_factor: f64,
    /// Contraction used by the backtracking fallback (default: 0.5).
    pub backtrack_factor: f64,
    /// Trial points allowed in the backtracking fallback (default: 50).
    pub max_backtracks: usize,
}

impl Default for LineSearchOptions {
    fn default() -> Self {
        Self {
            c1: 1e-4, // Standard value for sufficient decrease
            c2: 0.9,  // Standard value for curvature condition
            max_attempts: 20,
            max_zoom_attempts: 20,
            growth_factor: 2.0,
            backtrack_factor: 0.5,
            max_backtracks: 50,
        }
    }
}

impl LineSearchOptions {
    /// Sets the Wolfe constants; they must satisfy `0 < c1 < c2 < 1`.
    pub fn with_wolfe_constants(mut self, c1: f64, c2: f64) -> Self {
        self.c1 = c1;
        self.c2 = c2;
        self
    }

    /// Sets the bracketing and zoom trial budgets.
    pub fn with_max_attempts(mut self, bracketing: usize, zoom: usize) -> Self {
        self.max_attempts = bracketing;
        self.max_zoom_attempts = zoom;
        self
    }

    /// Sets the expansion applied to the trial step while bracketing; it
    /// must be finite and greater than one.
    pub fn with_growth_factor(mut self, factor: f64) -> Self {
        self.growth_factor = factor;
        self
    }

    pub fn with_backtracking(mut self, factor: f64, max_backtracks: usize) -> Self {
        self.backtrack_factor = factor;
        self.max_backtracks = max_backtracks;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(self.c1 > 0.0 && self.c1 < self.c2 && self.c2 < 1.0) {
            return Err(ConfigError::InvalidLineSearch {
                reason: "Wolfe constants must satisfy 0 < c1 < c2 < 1",
            });
        }
        if self.max_attempts == 0 || self.max_zoom_attempts == 0 || self.max_backtracks == 0 {
            return Err(ConfigError::InvalidLineSearch {
                reason: "trial budgets must be at least one",
            });
        }
        if !(self.growth_factor > 1.0 && self.growth_factor.is_finite()) {
            return Err(ConfigError::InvalidLineSearch {
                reason: "growth factor must be finite and greater than one",
            });
        }
        if !(self.backtrack_factor > 0.0 && self.backtrack_factor < 1.0) {
            return Err(ConfigError::InvalidLineSearch {
                reason: "backtracking factor must lie strictly between zero and one",
            });
        }
        Ok(())
    }
}

/// A trial point along the search direction.
#[derive(Debug, Clone)]
pub(crate) struct Probe {
    pub alpha: f64,
    pub x: Array1<f64>,
    pub f: f64,
    pub g: Array1<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineSearchError {
    NotDescent,
    MaxAttempts(usize),
    StepSizeTooSmall,
    /// The oracle returned a gradient of the wrong length at a trial point.
    GradientLength { expected: usize, found: usize },
}

impl fmt::Display for LineSearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineSearchError::NotDescent => f.write_str("direction is not a descent direction"),
            LineSearchError::MaxAttempts(n) => write!(f, "no acceptable step after {n} trial points"),
            LineSearchError::StepSizeTooSmall => f.write_str("step size fell below machine precision"),
            LineSearchError::GradientLength { expected, found } => {
                write!(f, "gradient has {found} components, expected {expected}")
            }
        }
    }
}

/// A failed search, with the best strictly improving probe it saw.
#[derive(Debug)]
pub(crate) struct LineSearchFailure {
    pub error: LineSearchError,
    pub best: Option<Probe>,
}

pub(crate) type LsResult = Result<Probe, LineSearchFailure>;

// Best-seen tracker; only points strictly below the starting value count.
struct ProbeBest {
    f0: f64,
    best: Option<Probe>,
}

impl ProbeBest {
    fn new(f0: f64) -> Self {
        Self { f0, best: None }
    }

    fn consider(&mut self, alpha: f64, x: &Array1<f64>, f: f64, g: &Array1<f64>) {
        if !f.is_finite() || !all_finite(g) {
            return;
        }
        let bar = self.best.as_ref().map_or(self.f0, |b| b.f);
        if f < bar {
            self.best = Some(Probe {
                alpha,
                x: x.clone(),
                f,
                g: g.clone(),
            });
        }
    }

    fn fail(self, error: LineSearchError) -> LineSearchFailure {
        LineSearchFailure {
            error,
            best: self.best,
        }
    }
}

// One end of a zoom bracket. `slope` is NaN when the derivative is unknown.
#[derive(Debug, Clone, Copy)]
struct Endpoint {
    alpha: f64,
    f: f64,
    slope: f64,
}

fn evaluate_at<O: Objective>(
    oracle: &O,
    x: &Array1<f64>,
    d: &Array1<f64>,
    alpha: f64,
    counts: &mut EvalCounts,
) -> Result<(Array1<f64>, f64, Array1<f64>), LineSearchError> {
    let x_new = x + &(d * alpha);
    let (f_new, g_new) = oracle.evaluate_with_gradient(&x_new);
    counts.func += 1;
    counts.grad += 1;
    if g_new.len() != x.len() {
        return Err(LineSearchError::GradientLength {
            expected: x.len(),
            found: g_new.len(),
        });
    }
    Ok((x_new, f_new, g_new))
}

// Smallest meaningful move along `d` from `x`.
#[inline]
fn step_floor(x: &Array1<f64>, d_norm: f64) -> f64 {
    (1e-16 * (1.0 + norm(x))) / d_norm.max(f64::MIN_POSITIVE)
}

/// Finds a step satisfying the Strong Wolfe conditions, starting from `alpha0`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn strong_wolfe<O: Objective>(
    options: &LineSearchOptions,
    oracle: &O,
    x: &Array1<f64>,
    f: f64,
    g: &Array1<f64>,
    d: &Array1<f64>,
    alpha0: f64,
    counts: &mut EvalCounts,
) -> LsResult {
    let slope0 = g.dot(d);
    let mut best = ProbeBest::new(f);
    // Written this way so that a NaN slope is also rejected.
    if !(slope0 < 0.0) {
        log::warn!(
            "[Wolfe] Non-descent direction detected (gᵀd = {:.2e} >= 0).",
            slope0
        );
        return Err(best.fail(LineSearchError::NotDescent));
    }
    let alpha_min = step_floor(x, norm(d));

    let mut prev = Endpoint {
        alpha: 0.0,
        f,
        slope: slope0,
    };
    let mut alpha = alpha0;
    for _ in 0..options.max_attempts {
        let (x_i, f_i, g_i) = match evaluate_at(oracle, x, d, alpha, counts) {
            Ok(trial) => trial,
            Err(error) => return Err(best.fail(error)),
        };

        if !f_i.is_finite() || !all_finite(&g_i) {
            // Overshot into an unusable region: pull back toward the last good step.
            alpha = if prev.alpha == 0.0 {
                0.5 * alpha
            } else {
                0.5 * (prev.alpha + alpha)
            };
            if alpha <= alpha_min {
                return Err(best.fail(LineSearchError::StepSizeTooSmall));
            }
            continue;
        }
        best.consider(alpha, &x_i, f_i, &g_i);

        let slope_i = g_i.dot(d);
        let current = Endpoint {
            alpha,
            f: f_i,
            slope: slope_i,
        };
        let armijo_violated = f_i > f + options.c1 * alpha * slope0;
        if armijo_violated || (prev.alpha > 0.0 && f_i >= prev.f) {
            return zoom(
                options, oracle, x, f, d, slope0, prev, current, alpha_min, best, counts,
            );
        }
        if slope_i.abs() <= -options.c2 * slope0 {
            return Ok(Probe {
                alpha,
                x: x_i,
                f: f_i,
                g: g_i,
            });
        }
        if slope_i >= 0.0 {
            return zoom(
                options, oracle, x, f, d, slope0, current, prev, alpha_min, best, counts,
            );
        }

        // The step is too short: expand.
        prev = current;
        alpha *= options.growth_factor;
    }

    log::debug!(
        "[Wolfe] No bracket found after {} trial points.",
        options.max_attempts
    );
    Err(best.fail(LineSearchError::MaxAttempts(options.max_attempts)))
}

// Safeguarded cubic interpolation between the two bracket ends, bisection
// whenever the cubic is unusable.
fn interpolate(lo: &Endpoint, hi: &Endpoint) -> f64 {
    let left = lo.alpha.min(hi.alpha);
    let right = lo.alpha.max(hi.alpha);
    let mid = 0.5 * (left + right);
    let width = right - left;
    if !lo.f.is_finite() || !hi.f.is_finite() || !lo.slope.is_finite() || !hi.slope.is_finite() {
        return mid;
    }
    let (a, b) = (lo.alpha, hi.alpha);
    let d1 = lo.slope + hi.slope - 3.0 * (lo.f - hi.f) / (a - b);
    let d2_sq = d1 * d1 - lo.slope * hi.slope;
    if !(d2_sq >= 0.0) || !d2_sq.is_finite() {
        return mid;
    }
    let d2 = (b - a).signum() * d2_sq.sqrt();
    let trial = b - (b - a) * (hi.slope + d2 - d1) / (hi.slope - lo.slope + 2.0 * d2);
    // Stay clear of the ends so the bracket keeps shrinking.
    let margin = 0.1 * width;
    if !trial.is_finite() || trial < left + margin || trial > right - margin {
        mid
    } else {
        trial
    }
}

/// Refines a bracket known to contain a Strong Wolfe point (Nocedal & Wright, Alg. 3.6).
///
/// `lo` is the end with the lower objective value satisfying sufficient decrease.
#[allow(clippy::too_many_arguments)]
fn zoom<O: Objective>(
    options: &LineSearchOptions,
    oracle: &O,
    x: &Array1<f64>,
    f: f64,
    d: &Array1<f64>,
    slope0: f64,
    mut lo: Endpoint,
    mut hi: Endpoint,
    alpha_min: f64,
    mut best: ProbeBest,
    counts: &mut EvalCounts,
) -> LsResult {
    for _ in 0..options.max_zoom_attempts {
        if (hi.alpha - lo.alpha).abs() <= alpha_min {
            return Err(best.fail(LineSearchError::StepSizeTooSmall));
        }
        let alpha_j = interpolate(&lo, &hi);
        let (x_j, f_j, g_j) = match evaluate_at(oracle, x, d, alpha_j, counts) {
            Ok(trial) => trial,
            Err(error) => return Err(best.fail(error)),
        };

        if !f_j.is_finite() || !all_finite(&g_j) {
            hi = Endpoint {
                alpha: alpha_j,
                f: f64::INFINITY,
                slope: f64::NAN,
            };
            continue;
        }
        best.consider(alpha_j, &x_j, f_j, &g_j);

        let slope_j = g_j.dot(d);
        let current = Endpoint {
            alpha: alpha_j,
            f: f_j,
            slope: slope_j,
        };
        if f_j > f + options.c1 * alpha_j * slope0 || f_j >= lo.f {
            hi = current;
        } else {
            if slope_j.abs() <= -options.c2 * slope0 {
                return Ok(Probe {
                    alpha: alpha_j,
                    x: x_j,
                    f: f_j,
                    g: g_j,
                });
            }
            if slope_j * (hi.alpha - lo.alpha) >= 0.0 {
                hi = lo;
            }
            lo = current;
        }
    }
    log::debug!(
        "[Wolfe] Zoom exhausted {} trial points; bracket [{:.3e}, {:.3e}].",
        options.max_zoom_attempts,
        lo.alpha.min(hi.alpha),
        lo.alpha.max(hi.alpha)
    );
    Err(best.fail(LineSearchError::MaxAttempts(options.max_zoom_attempts)))
}

/// A simple backtracking line search that satisfies the Armijo (sufficient decrease) condition.
#[allow(clippy::too_many_arguments)]
pub(crate) fn backtracking<O: Objective>(
    options: &LineSearchOptions,
    oracle: &O,
    x: &Array1<f64>,
    f: f64,
    g: &Array1<f64>,
    d: &Array1<f64>,
    alpha0: f64,
    counts: &mut EvalCounts,
) -> LsResult {
    let slope0 = g.dot(d);
    let mut best = ProbeBest::new(f);
    // A backtracking search is only valid on a descent direction.
    if !(slope0 < 0.0) {
        log::warn!(
            "[Backtracking] Search started with a non-descent direction (gᵀd = {:.2e}).",
            slope0
        );
        return Err(best.fail(LineSearchError::NotDescent));
    }
    let alpha_min = step_floor(x, norm(d));

    let mut alpha = alpha0;
    for _ in 0..options.max_backtracks {
        let (x_new, f_new, g_new) = match evaluate_at(oracle, x, d, alpha, counts) {
            Ok(trial) => trial,
            Err(error) => return Err(best.fail(error)),
        };
        if f_new.is_finite() && all_finite(&g_new) {
            if f_new <= f + options.c1 * alpha * slope0 {
                return Ok(Probe {
                    alpha,
                    x: x_new,
                    f: f_new,
                    g: g_new,
                });
            }
            best.consider(alpha, &x_new, f_new, &g_new);
        }
        alpha *= options.backtrack_factor;
        if alpha <= alpha_min {
            return Err(best.fail(LineSearchError::StepSizeTooSmall));
        }
    }
    Err(best.fail(LineSearchError::MaxAttempts(options.max_backtracks)))
}

/// Strong Wolfe search, retried once with backtracking from the same initial
/// step when it fails. On double failure the better of the two best probes is
/// kept.
#[allow(clippy::too_many_arguments)]
pub(crate) fn search_with_fallback<O: Objective>(
    options: &LineSearchOptions,
    oracle: &O,
    x: &Array1<f64>,
    f: f64,
    g: &Array1<f64>,
    d: &Array1<f64>,
    alpha0: f64,
    counts: &mut EvalCounts,
) -> LsResult {
    let first = match strong_wolfe(options, oracle, x, f, g, d, alpha0, counts) {
        Ok(probe) => return Ok(probe),
        Err(failure) => failure,
    };
    if matches!(
        first.error,
        LineSearchError::NotDescent | LineSearchError::GradientLength { .. }
    ) {
        return Err(first);
    }
    log::debug!(
        "[Wolfe] Search failed ({}); falling back to backtracking.",
        first.error
    );
    match backtracking(options, oracle, x, f, g, d, alpha0, counts) {
        Ok(probe) => Ok(probe),
        Err(second) => {
            let best = match (first.best, second.best) {
                (Some(a), Some(b)) => Some(if b.f < a.f { b } else { a }),
                (a, b) => a.or(b),
            };
            Err(LineSearchFailure {
                error: second.error,
                best,
            })
        }
    }
}
