//! Trust-region subproblem solvers.
//!
//! Each solver approximately minimizes the local model
//! `m(p) = gᵀp + ½pᵀHp` subject to `‖p‖ ≤ Δ`. Dogleg and Exact need more
//! structure from `H` than Cauchy does; when they cannot produce a step with
//! positive predicted decrease they hand over to the Cauchy point, which
//! always can as long as `g ≠ 0`.

use std::fmt;

use ndarray::{Array1, Array2};

use crate::linalg::{
    chol_decompose, chol_solve, forward_solve, gershgorin_lower_bound, model_decrease, norm,
    shifted,
};

// Secular equation iteration cap and relative boundary tolerance.
const MAX_SECULAR_ITERS: usize = 100;
const SECULAR_TOL: f64 = 1e-6;

/// Subproblem strategy for [`TrustRegion`](crate::TrustRegion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SearchMethod {
    /// Model minimizer along the steepest-descent direction, clipped to the ball.
    Cauchy,
    /// Dogleg path between the Cauchy point and the Newton step. Needs a
    /// positive definite Hessian.
    #[default]
    Dogleg,
    /// Nearly exact solution of the constrained model via the secular equation.
    Exact,
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SearchMethod::Cauchy => "cauchy",
            SearchMethod::Dogleg => "dogleg",
            SearchMethod::Exact => "exact",
        };
        f.write_str(text)
    }
}

/// A step proposed by a subproblem solver.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SubproblemStep {
    pub step: Array1<f64>,
    /// `-m(p)`; positive unless `g = 0`.
    pub predicted_decrease: f64,
    pub hits_boundary: bool,
    /// The solver that produced the step, which differs from the one asked
    /// for after a Cauchy fallback.
    pub method_used: SearchMethod,
}

/// Solves the subproblem with `method`, falling back to the Cauchy point when
/// the requested solver gives up.
pub(crate) fn solve(
    method: SearchMethod,
    g: &Array1<f64>,
    h: &Array2<f64>,
    radius: f64,
) -> SubproblemStep {
    let attempt = match method {
        SearchMethod::Cauchy => None,
        SearchMethod::Dogleg => dogleg(g, h, radius),
        SearchMethod::Exact => exact(g, h, radius),
    };
    match attempt {
        Some(step) => step,
        None => {
            if method != SearchMethod::Cauchy {
                log::debug!(
                    "[Subproblem] {} solver gave up at radius {:.3e}; using the Cauchy point.",
                    method,
                    radius
                );
            }
            cauchy(g, h, radius)
        }
    }
}

/// Minimizer of the model along `-g` inside the ball.
pub(crate) fn cauchy(g: &Array1<f64>, h: &Array2<f64>, radius: f64) -> SubproblemStep {
    let g_norm = norm(g);
    if g_norm == 0.0 || !g_norm.is_finite() {
        return SubproblemStep {
            step: Array1::zeros(g.len()),
            predicted_decrease: 0.0,
            hits_boundary: false,
            method_used: SearchMethod::Cauchy,
        };
    }
    let g_h_g = g.dot(&h.dot(g));
    let tau = if g_h_g.is_finite() && g_h_g > 0.0 {
        (g_norm.powi(3) / (radius * g_h_g)).min(1.0)
    } else {
        1.0
    };
    let step = g * (-tau * radius / g_norm);
    let predicted_decrease = if g_h_g.is_finite() {
        model_decrease(g, h, &step)
    } else {
        // Linear model only.
        -g.dot(&step)
    };
    SubproblemStep {
        step,
        predicted_decrease,
        hits_boundary: tau >= 1.0,
        method_used: SearchMethod::Cauchy,
    }
}

/// Accepts `step` only if the model actually decreases along it.
fn finish(
    g: &Array1<f64>,
    h: &Array2<f64>,
    step: Array1<f64>,
    hits_boundary: bool,
    method_used: SearchMethod,
) -> Option<SubproblemStep> {
    let predicted_decrease = model_decrease(g, h, &step);
    if !predicted_decrease.is_finite() || predicted_decrease <= 0.0 {
        return None;
    }
    Some(SubproblemStep {
        step,
        predicted_decrease,
        hits_boundary,
        method_used,
    })
}

fn dogleg(g: &Array1<f64>, h: &Array2<f64>, radius: f64) -> Option<SubproblemStep> {
    let l = chol_decompose(h)?;
    let p_newton = -chol_solve(&l, g);
    if norm(&p_newton) <= radius {
        return finish(g, h, p_newton, false, SearchMethod::Dogleg);
    }

    let g_norm2 = g.dot(g);
    let g_h_g = g.dot(&h.dot(g));
    let p_cauchy = g * (-g_norm2 / g_h_g);
    if norm(&p_cauchy) >= radius {
        let p = g * (-radius / g_norm2.sqrt());
        return finish(g, h, p, true, SearchMethod::Dogleg);
    }

    // ‖p_c + t (p_n - p_c)‖ = Δ for t in (0, 1); c < 0 so the larger root is it.
    let leg = &p_newton - &p_cauchy;
    let a = leg.dot(&leg);
    let b = 2.0 * p_cauchy.dot(&leg);
    let c = p_cauchy.dot(&p_cauchy) - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if !disc.is_finite() || disc < 0.0 || a <= 0.0 {
        return None;
    }
    let t = ((-b + disc.sqrt()) / (2.0 * a)).clamp(0.0, 1.0);
    let mut p = p_cauchy;
    p.scaled_add(t, &leg);
    finish(g, h, p, true, SearchMethod::Dogleg)
}

/// Interior Newton step when `H` is positive definite and the step fits,
/// otherwise `p(λ) = -(H + λI)⁻¹g` on the boundary, with `λ` found by
/// Newton's method on `1/Δ - 1/‖p(λ)‖ = 0`, bracketed and bisected when a
/// Newton update leaves the bracket.
fn exact(g: &Array1<f64>, h: &Array2<f64>, radius: f64) -> Option<SubproblemStep> {
    if let Some(l) = chol_decompose(h) {
        let p = -chol_solve(&l, g);
        if norm(&p) <= radius {
            return finish(g, h, p, false, SearchMethod::Exact);
        }
    }

    let g_norm = norm(g);
    let h_norm = h
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|v| v.abs()).sum::<f64>())
        .fold(0.0, f64::max);
    // (H + λI) ⪰ (λ - ‖H‖)I, so at `hi` the step is already inside the ball.
    // Failed factorizations raise `lo`; the Gershgorin shift is only a start.
    let mut lo = 0.0;
    let mut hi = g_norm / radius + h_norm;
    let mut lambda = (-gershgorin_lower_bound(h)).max(0.0);
    if !lambda.is_finite() || !hi.is_finite() {
        return None;
    }

    for _ in 0..MAX_SECULAR_ITERS {
        let Some(l) = chol_decompose(&shifted(h, lambda)) else {
            lo = lambda;
            lambda = 0.5 * (lo + hi);
            continue;
        };
        let p = -chol_solve(&l, g);
        let p_norm = norm(&p);
        if (p_norm - radius).abs() <= SECULAR_TOL * radius {
            return finish(g, h, p, true, SearchMethod::Exact);
        }
        if p_norm > radius {
            lo = lambda;
        } else {
            hi = lambda;
        }
        let w = forward_solve(&l, &p);
        let w_norm2 = w.dot(&w);
        let mut next = lambda + (p_norm * p_norm / w_norm2) * (p_norm - radius) / radius;
        if !next.is_finite() || next <= lo || next >= hi {
            next = 0.5 * (lo + hi);
        }
        if next == lambda {
            break;
        }
        lambda = next;
    }
    None
}
