// Benchmark objectives with analytic derivatives, used across the test suites.

use ndarray::{Array1, Array2, array};

use crate::objective::Objective;

/// Separable quadratic `f(x) = Σ wᵢ (xᵢ - cᵢ)²`, minimized at `c`.
pub(crate) struct Quadratic {
    weights: Array1<f64>,
    center: Array1<f64>,
}

impl Quadratic {
    pub(crate) fn new(weights: Array1<f64>) -> Self {
        let center = Array1::zeros(weights.len());
        Self { weights, center }
    }

    pub(crate) fn centered(weights: Array1<f64>, center: Array1<f64>) -> Self {
        Self { weights, center }
    }

    pub(crate) fn minimizer(&self) -> &Array1<f64> {
        &self.center
    }
}

impl Objective for Quadratic {
    fn dimension(&self) -> usize {
        self.weights.len()
    }
    fn evaluate(&self, x: &Array1<f64>) -> f64 {
        let r = x - &self.center;
        (&self.weights * &r * &r).sum()
    }
    fn gradient(&self, x: &Array1<f64>) -> Array1<f64> {
        let r = x - &self.center;
        2.0 * &self.weights * &r
    }
    fn hessian(&self, _x: &Array1<f64>) -> Array2<f64> {
        Array2::from_diag(&(2.0 * &self.weights))
    }
}

/// `f(x) = 100(x0² - x1)² + (x0 - 1)²`, minimized at `(1, 1)`.
pub(crate) struct Rosenbrock;

impl Objective for Rosenbrock {
    fn dimension(&self) -> usize {
        2
    }
    fn evaluate(&self, x: &Array1<f64>) -> f64 {
        100.0 * (x[0] * x[0] - x[1]).powi(2) + (x[0] - 1.0).powi(2)
    }
    fn gradient(&self, x: &Array1<f64>) -> Array1<f64> {
        array![
            400.0 * x[0] * (x[0] * x[0] - x[1]) + 2.0 * (x[0] - 1.0),
            -200.0 * (x[0] * x[0] - x[1]),
        ]
    }
    fn hessian(&self, x: &Array1<f64>) -> Array2<f64> {
        array![
            [1200.0 * x[0] * x[0] - 400.0 * x[1] + 2.0, -400.0 * x[0]],
            [-400.0 * x[0], 200.0],
        ]
    }
}

/// Chained Rosenbrock `Σ 100(xᵢ² - xᵢ₊₁)² + (xᵢ - 1)²` in `n` dimensions.
pub(crate) struct ExtendedRosenbrock {
    n: usize,
}

impl ExtendedRosenbrock {
    pub(crate) fn new(n: usize) -> Self {
        Self { n }
    }

    /// Alternating `-1.2, 1.0, -1.2, 1.0, ...`.
    pub(crate) fn starting_point(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.n, |i| if i % 2 == 0 { -1.2 } else { 1.0 })
    }
}

impl Objective for ExtendedRosenbrock {
    fn dimension(&self) -> usize {
        self.n
    }
    fn evaluate(&self, x: &Array1<f64>) -> f64 {
        (0..self.n - 1)
            .map(|i| 100.0 * (x[i] * x[i] - x[i + 1]).powi(2) + (x[i] - 1.0).powi(2))
            .sum()
    }
    fn gradient(&self, x: &Array1<f64>) -> Array1<f64> {
        let n = self.n;
        let mut g = Array1::zeros(n);
        for k in 0..n - 1 {
            g[k] = 400.0 * x[k] * (x[k] * x[k] - x[k + 1]) + 2.0 * (x[k] - 1.0);
            if k > 0 {
                g[k] += 200.0 * (x[k] - x[k - 1] * x[k - 1]);
            }
        }
        g[n - 1] = 200.0 * (x[n - 1] - x[n - 2] * x[n - 2]);
        g
    }
    fn hessian(&self, x: &Array1<f64>) -> Array2<f64> {
        let n = self.n;
        let mut h = Array2::zeros((n, n));
        for k in 0..n - 1 {
            h[[k, k]] += 1200.0 * x[k] * x[k] - 400.0 * x[k + 1] + 2.0;
            h[[k, k + 1]] -= 400.0 * x[k];
            h[[k + 1, k]] -= 400.0 * x[k];
            h[[k + 1, k + 1]] += 200.0;
        }
        h
    }
}

/// The four-dimensional Wood function, minimized at `(1, 1, 1, 1)`.
pub(crate) struct Wood;

impl Wood {
    pub(crate) fn starting_point() -> Array1<f64> {
        array![-3.0, -1.0, -3.0, -1.0]
    }
}

impl Objective for Wood {
    fn dimension(&self) -> usize {
        4
    }
    fn evaluate(&self, x: &Array1<f64>) -> f64 {
        100.0 * (x[0] * x[0] - x[1]).powi(2)
            + (1.0 - x[0]).powi(2)
            + 90.0 * (x[2] * x[2] - x[3]).powi(2)
            + (1.0 - x[2]).powi(2)
            + 10.1 * ((1.0 - x[1]).powi(2) + (1.0 - x[3]).powi(2))
            + 19.8 * (1.0 - x[1]) * (1.0 - x[3])
    }
    fn gradient(&self, x: &Array1<f64>) -> Array1<f64> {
        array![
            400.0 * x[0] * (x[0] * x[0] - x[1]) + 2.0 * (x[0] - 1.0),
            200.0 * (x[1] - x[0] * x[0]) + 20.2 * (x[1] - 1.0) + 19.8 * (x[3] - 1.0),
            360.0 * x[2] * (x[2] * x[2] - x[3]) + 2.0 * (x[2] - 1.0),
            180.0 * (x[3] - x[2] * x[2]) + 20.2 * (x[3] - 1.0) + 19.8 * (x[1] - 1.0),
        ]
    }
    fn hessian(&self, x: &Array1<f64>) -> Array2<f64> {
        array![
            [1200.0 * x[0] * x[0] - 400.0 * x[1] + 2.0, -400.0 * x[0], 0.0, 0.0],
            [-400.0 * x[0], 220.2, 0.0, 19.8],
            [0.0, 0.0, 1080.0 * x[2] * x[2] - 360.0 * x[3] + 2.0, -360.0 * x[2]],
            [0.0, 19.8, -360.0 * x[2], 200.2],
        ]
    }
}

/// Hides an objective's Hessian, so trust-region models see the zero matrix.
pub(crate) struct FirstOrder<O>(pub O);

impl<O: Objective> Objective for FirstOrder<O> {
    fn dimension(&self) -> usize {
        self.0.dimension()
    }
    fn evaluate(&self, x: &Array1<f64>) -> f64 {
        self.0.evaluate(x)
    }
    fn gradient(&self, x: &Array1<f64>) -> Array1<f64> {
        self.0.gradient(x)
    }
}

#[cfg(test)]
mod tests {
    use super::{ExtendedRosenbrock, Rosenbrock, Wood};
    use crate::objective::Objective;
    use ndarray::{Array1, array};
    use spectral::prelude::*;

    // Central differences of the gradient against the analytic Hessian and of
    // the value against the analytic gradient.
    fn check_derivatives<O: Objective>(oracle: &O, x: &Array1<f64>) {
        let h = 1e-6;
        let g = oracle.gradient(x);
        let hess = oracle.hessian(x);
        for i in 0..x.len() {
            let mut xp = x.clone();
            let mut xm = x.clone();
            xp[i] += h;
            xm[i] -= h;
            let fd = (oracle.evaluate(&xp) - oracle.evaluate(&xm)) / (2.0 * h);
            assert_that!(&fd).is_close_to(g[i], 1e-4 * (1.0 + g[i].abs()));
            let gd = (oracle.gradient(&xp) - oracle.gradient(&xm)) / (2.0 * h);
            for j in 0..x.len() {
                assert_that!(&gd[j]).is_close_to(hess[[j, i]], 1e-4 * (1.0 + hess[[j, i]].abs()));
            }
        }
    }

    #[test]
    fn analytic_derivatives_match_finite_differences() {
        check_derivatives(&Rosenbrock, &array![-1.2, 1.0]);
        check_derivatives(&Wood, &array![-3.0, -1.0, -3.0, -1.0]);
        check_derivatives(&Wood, &array![0.3, 0.7, -0.2, 1.1]);
        let ext = ExtendedRosenbrock::new(6);
        check_derivatives(&ext, &ext.starting_point());
    }

    #[test]
    fn benchmark_minima_are_zero() {
        assert_eq!(Rosenbrock.evaluate(&array![1.0, 1.0]), 0.0);
        assert_eq!(Wood.evaluate(&array![1.0, 1.0, 1.0, 1.0]), 0.0);
        let ext = ExtendedRosenbrock::new(8);
        assert_eq!(ext.evaluate(&Array1::ones(8)), 0.0);
        assert_eq!(ext.gradient(&Array1::ones(8)), Array1::<f64>::zeros(8));
    }
}
