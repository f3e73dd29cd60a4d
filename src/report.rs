use std::fmt;

/// How an optimization run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Status {
    /// The gradient norm dropped to the tolerance.
    Converged,
    /// The iteration budget ran out first. The iterate is the last accepted point.
    IterationLimitReached,
    /// No acceptable step length was found along the search direction.
    /// The iterate is the best point seen.
    LineSearchFailed,
    /// The objective stopped changing (or the trust radius bottomed out)
    /// without the gradient reaching the tolerance: a flat region, not
    /// necessarily an optimum.
    Stagnated,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::Converged => "converged",
            Status::IterationLimitReached => "iteration limit reached",
            Status::LineSearchFailed => "line search failed",
            Status::Stagnated => "stagnated",
        };
        f.write_str(text)
    }
}

/// Summary of a finished run. The final point itself is the caller's iterate.
///
/// Note that for non-convex functions, convergence to a local minimum is not guaranteed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizationReport {
    pub status: Status,
    /// Objective value at the final iterate.
    pub final_value: f64,
    /// Gradient norm at the final iterate.
    pub final_gradient_norm: f64,
    /// Outer iterations performed (trust-region rejections count as iterations).
    pub iterations: usize,
    pub func_evals: usize,
    pub grad_evals: usize,
    /// Hessian requests made to build the trust-region model, one per model
    /// rebuild, counted even when the oracle keeps the default zero Hessian.
    /// Always zero for L-BFGS.
    pub hessian_evals: usize,
}

impl OptimizationReport {
    pub fn is_converged(&self) -> bool {
        self.status == Status::Converged
    }
}

impl fmt::Display for OptimizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} iterations: f={:.6e}, ||g||={:.3e}, fe={}, ge={}, he={}",
            self.status,
            self.iterations,
            self.final_value,
            self.final_gradient_norm,
            self.func_evals,
            self.grad_evals,
            self.hessian_evals
        )
    }
}

/// Running evaluation counters threaded through a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct EvalCounts {
    pub func: usize,
    pub grad: usize,
    pub hessian: usize,
}

impl EvalCounts {
    pub(crate) fn report(
        &self,
        status: Status,
        final_value: f64,
        final_gradient_norm: f64,
        iterations: usize,
    ) -> OptimizationReport {
        OptimizationReport {
            status,
            final_value,
            final_gradient_norm,
            iterations,
            func_evals: self.func,
            grad_evals: self.grad,
            hessian_evals: self.hessian,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EvalCounts, Status};

    #[test]
    fn report_display_names_status_and_counts() {
        let counts = EvalCounts {
            func: 12,
            grad: 12,
            hessian: 0,
        };
        let report = counts.report(Status::Stagnated, 0.25, 1e-3, 7);
        assert!(!report.is_converged());
        let text = report.to_string();
        assert!(text.starts_with("stagnated after 7 iterations"), "{text}");
        assert!(text.contains("fe=12"), "{text}");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn report_serializes_with_snake_case_status() {
        let report = EvalCounts::default().report(Status::IterationLimitReached, 1.0, 2.0, 3);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "iteration_limit_reached");
        assert_eq!(json["iterations"], 3);
    }
}
