//! Runtime selection between the two optimizers.

use ndarray::Array1;

use crate::error::{ConfigError, OptimizeError};
use crate::lbfgs::{Lbfgs, LbfgsOptions};
use crate::objective::Objective;
use crate::report::OptimizationReport;
use crate::trust_region::{TrustRegion, TrustRegionOptions};

/// Which optimizer to build, with that optimizer's own settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizerConfig {
    Lbfgs(LbfgsOptions),
    TrustRegion(TrustRegionOptions),
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Lbfgs(LbfgsOptions::default())
    }
}

impl From<LbfgsOptions> for OptimizerConfig {
    fn from(options: LbfgsOptions) -> Self {
        OptimizerConfig::Lbfgs(options)
    }
}

impl From<TrustRegionOptions> for OptimizerConfig {
    fn from(options: TrustRegionOptions) -> Self {
        OptimizerConfig::TrustRegion(options)
    }
}

/// An initialized optimizer of either kind.
///
/// ```
/// use ndarray::{array, Array1};
/// use wolfe_lbfgs_tr::{FnObjective, Optimizer, OptimizerConfig, SearchMethod, TrustRegionOptions};
///
/// let bowl = FnObjective::new(2, |x: &Array1<f64>| (x.dot(x), 2.0 * x))
///     .with_hessian(|x: &Array1<f64>| ndarray::Array2::<f64>::eye(x.len()) * 2.0);
/// let config = OptimizerConfig::TrustRegion(
///     TrustRegionOptions::default().with_method(SearchMethod::Exact),
/// );
/// let mut optimizer = Optimizer::init(bowl, config).unwrap();
/// let mut x = array![3.0, -4.0];
/// let report = optimizer.optimize(50, &mut x).unwrap();
/// assert!(report.is_converged());
/// ```
pub enum Optimizer<O> {
    Lbfgs(Lbfgs<O>),
    TrustRegion(TrustRegion<O>),
}

impl<O: Objective> Optimizer<O> {
    pub fn init(oracle: O, config: OptimizerConfig) -> Result<Self, ConfigError> {
        match config {
            OptimizerConfig::Lbfgs(options) => Lbfgs::init(oracle, options).map(Optimizer::Lbfgs),
            OptimizerConfig::TrustRegion(options) => {
                TrustRegion::init(oracle, options).map(Optimizer::TrustRegion)
            }
        }
    }

    /// See [`Lbfgs::optimize`] and [`TrustRegion::optimize`].
    pub fn optimize(
        &mut self,
        max_iterations: i64,
        iterate: &mut Array1<f64>,
    ) -> Result<OptimizationReport, OptimizeError> {
        match self {
            Optimizer::Lbfgs(inner) => inner.optimize(max_iterations, iterate),
            Optimizer::TrustRegion(inner) => inner.optimize(max_iterations, iterate),
        }
    }

    pub fn oracle(&self) -> &O {
        match self {
            Optimizer::Lbfgs(inner) => inner.oracle(),
            Optimizer::TrustRegion(inner) => inner.oracle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Optimizer, OptimizerConfig};
    use crate::error::ConfigError;
    use crate::lbfgs::LbfgsOptions;
    use crate::report::Status;
    use crate::subproblem::SearchMethod;
    use crate::test_functions::Rosenbrock;
    use crate::trust_region::TrustRegionOptions;
    use ndarray::array;
    use spectral::prelude::*;

    #[test]
    fn both_variants_solve_rosenbrock() {
        let configs = [
            OptimizerConfig::default(),
            OptimizerConfig::from(LbfgsOptions::default().with_memory(7)),
            OptimizerConfig::from(TrustRegionOptions::default().with_method(SearchMethod::Dogleg)),
            OptimizerConfig::TrustRegion(TrustRegionOptions::default().with_method(SearchMethod::Exact)),
        ];
        for config in configs {
            let mut optimizer = Optimizer::init(Rosenbrock, config).unwrap();
            let mut x = array![-1.2, 1.0];
            let report = optimizer.optimize(-1, &mut x).unwrap();
            assert_eq!(report.status, Status::Converged, "{config:?}");
            assert_that!(&x[0]).is_close_to(1.0, 1e-4);
            assert_that!(&x[1]).is_close_to(1.0, 1e-4);
        }
    }

    #[test]
    fn init_validates_only_the_selected_variant() {
        let bad_tr = TrustRegionOptions::default().with_initial_radius(-1.0);
        assert!(matches!(
            Optimizer::init(Rosenbrock, OptimizerConfig::TrustRegion(bad_tr)),
            Err(ConfigError::InvalidRadiusBounds { .. })
        ));
        let bad_lbfgs = LbfgsOptions::default().with_stagnation(1e-12, 0);
        assert!(matches!(
            Optimizer::init(Rosenbrock, OptimizerConfig::Lbfgs(bad_lbfgs)),
            Err(ConfigError::InvalidStagnationWindow)
        ));
        let optimizer = Optimizer::init(Rosenbrock, OptimizerConfig::default()).unwrap();
        assert!(matches!(optimizer, Optimizer::Lbfgs(_)));
    }
}
