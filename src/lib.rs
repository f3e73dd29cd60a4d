//! Unconstrained minimization of smooth functions.
//!
//! Two optimizers share one objective contract ([`Objective`]):
//!
//! - [`Lbfgs`]: limited-memory BFGS. A bounded history of correction pairs
//!   gives an implicit inverse-Hessian approximation; steps come from a
//!   Strong Wolfe line search (Nocedal & Wright, Alg. 3.5/3.6) with an Armijo
//!   backtracking fallback.
//! - [`TrustRegion`]: minimizes a quadratic model built from the objective's
//!   Hessian inside a ball whose radius adapts to how well the model predicted
//!   the actual decrease. The subproblem is solved by [`SearchMethod::Cauchy`],
//!   [`SearchMethod::Dogleg`] or [`SearchMethod::Exact`].
//!
//! [`Optimizer`] selects between them at runtime from an [`OptimizerConfig`].
//!
//! Both optimizers write every accepted point into the caller's iterate and
//! return an [`OptimizationReport`] whose [`Status`] says how the run ended.
//! Problems in the setup are reported as [`ConfigError`] by `init`; the only
//! hard failures of `optimize` are [`OptimizeError`]s.
//!
//! ## Defaults (key settings)
//! - Convergence: `‖g‖ ≤ 1e-6`; stagnation after 10 accepted iterations with
//!   relative change `≤ 1e-12`.
//! - Line search: `c1 = 1e-4`, `c2 = 0.9`, 20 bracketing and 20 zoom trials.
//! - L-BFGS: 10 correction pairs.
//! - Trust region: Δ₀ = 1, Δ ∈ [1e-12, 1e6], accept at ρ > 0.1, shrink by 0.5
//!   below 0.25, double above 0.75 on the boundary.
//!
//! # Example
//!
//! Minimize the Rosenbrock function with L-BFGS.
//!
//! ```
//! use ndarray::{array, Array1};
//! use wolfe_lbfgs_tr::{FnObjective, Lbfgs, LbfgsOptions, Status};
//!
//! let rosenbrock = FnObjective::new(2, |x: &Array1<f64>| {
//!     let a = 1.0;
//!     let b = 100.0;
//!     let f = (a - x[0]).powi(2) + b * (x[1] - x[0].powi(2)).powi(2);
//!     let g = array![
//!         -2.0 * (a - x[0]) - 4.0 * b * (x[1] - x[0].powi(2)) * x[0],
//!         2.0 * b * (x[1] - x[0].powi(2)),
//!     ];
//!     (f, g)
//! });
//!
//! let options = LbfgsOptions::default().with_memory(5).with_tolerance(1e-6);
//! let mut optimizer = Lbfgs::init(rosenbrock, options).expect("valid configuration");
//!
//! let mut x = array![-1.2, 1.0];
//! let report = optimizer.optimize(100, &mut x).expect("finite objective");
//!
//! println!("{report}");
//! assert_eq!(report.status, Status::Converged);
//! // The known minimum is at [1.0, 1.0].
//! assert!((x[0] - 1.0).abs() < 1e-5);
//! assert!((x[1] - 1.0).abs() < 1e-5);
//! ```
#![cfg_attr(feature = "bench", feature(test))]

mod convergence;
mod error;
mod lbfgs;
mod line_search;
mod linalg;
mod objective;
mod optimizer;
mod report;
mod subproblem;
mod trust_region;

#[cfg(all(test, feature = "bench"))]
mod benchmark;
#[cfg(test)]
mod test_functions;

pub use convergence::{ConvergenceOptions, IterationBudget};
pub use error::{ConfigError, OptimizeError};
pub use lbfgs::{CorrectionPair, Lbfgs, LbfgsOptions};
pub use line_search::LineSearchOptions;
pub use objective::{FnObjective, Objective};
pub use optimizer::{Optimizer, OptimizerConfig};
pub use report::{OptimizationReport, Status};
pub use subproblem::SearchMethod;
pub use trust_region::{TrustRegion, TrustRegionOptions};
