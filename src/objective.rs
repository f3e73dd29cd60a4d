//! The oracle contract the optimizers consume.

use ndarray::{Array1, Array2};

use crate::error::OptimizeError;

/// A smooth objective supplying value, gradient and optionally Hessian.
///
/// Implementations must be deterministic: repeated calls at the same point
/// return the same results. The optimizers call these several times per
/// iteration (a line search probes many points) and rely on that.
pub trait Objective {
    /// Number of components of a point.
    fn dimension(&self) -> usize;

    /// Objective value at `x`.
    fn evaluate(&self, x: &Array1<f64>) -> f64;

    /// Gradient at `x`, same length as `x`.
    fn gradient(&self, x: &Array1<f64>) -> Array1<f64>;

    /// Hessian at `x`.
    ///
    /// The default is the zero matrix. Trust-region subproblems built on a zero
    /// Hessian have no curvature to work with and reduce to the Cauchy step,
    /// i.e. first-order behaviour.
    fn hessian(&self, x: &Array1<f64>) -> Array2<f64> {
        let n = x.len();
        Array2::zeros((n, n))
    }

    /// Value and gradient in one call. Override when both share work.
    fn evaluate_with_gradient(&self, x: &Array1<f64>) -> (f64, Array1<f64>) {
        (self.evaluate(x), self.gradient(x))
    }
}

impl<T: Objective + ?Sized> Objective for &T {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }
    fn evaluate(&self, x: &Array1<f64>) -> f64 {
        (**self).evaluate(x)
    }
    fn gradient(&self, x: &Array1<f64>) -> Array1<f64> {
        (**self).gradient(x)
    }
    fn hessian(&self, x: &Array1<f64>) -> Array2<f64> {
        (**self).hessian(x)
    }
    fn evaluate_with_gradient(&self, x: &Array1<f64>) -> (f64, Array1<f64>) {
        (**self).evaluate_with_gradient(x)
    }
}

/// Adapts a closure returning `(value, gradient)` into an [`Objective`].
///
/// ```
/// use ndarray::{array, Array1};
/// use wolfe_lbfgs_tr::{FnObjective, Objective};
///
/// let bowl = FnObjective::new(2, |x: &Array1<f64>| (x.dot(x), 2.0 * x));
/// assert_eq!(bowl.evaluate(&array![1.0, 2.0]), 5.0);
/// ```
pub struct FnObjective<F, H = fn(&Array1<f64>) -> Array2<f64>> {
    dimension: usize,
    value_and_gradient: F,
    hessian: Option<H>,
}

impl<F> FnObjective<F>
where
    F: Fn(&Array1<f64>) -> (f64, Array1<f64>),
{
    /// Wraps `value_and_gradient`; the Hessian defaults to zero.
    pub fn new(dimension: usize, value_and_gradient: F) -> Self {
        Self {
            dimension,
            value_and_gradient,
            hessian: None,
        }
    }

    /// Attaches an analytic Hessian.
    pub fn with_hessian<H>(self, hessian: H) -> FnObjective<F, H>
    where
        H: Fn(&Array1<f64>) -> Array2<f64>,
    {
        FnObjective {
            dimension: self.dimension,
            value_and_gradient: self.value_and_gradient,
            hessian: Some(hessian),
        }
    }
}

impl<F, H> Objective for FnObjective<F, H>
where
    F: Fn(&Array1<f64>) -> (f64, Array1<f64>),
    H: Fn(&Array1<f64>) -> Array2<f64>,
{
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn evaluate(&self, x: &Array1<f64>) -> f64 {
        (self.value_and_gradient)(x).0
    }

    fn gradient(&self, x: &Array1<f64>) -> Array1<f64> {
        (self.value_and_gradient)(x).1
    }

    fn hessian(&self, x: &Array1<f64>) -> Array2<f64> {
        match &self.hessian {
            Some(h) => h(x),
            None => {
                let n = x.len();
                Array2::zeros((n, n))
            }
        }
    }

    fn evaluate_with_gradient(&self, x: &Array1<f64>) -> (f64, Array1<f64>) {
        (self.value_and_gradient)(x)
    }
}

/// Value and gradient at `x`, rejecting a gradient whose length differs
/// from the oracle's dimension.
pub(crate) fn value_and_gradient<O: Objective>(
    oracle: &O,
    x: &Array1<f64>,
) -> Result<(f64, Array1<f64>), OptimizeError> {
    let (f, g) = oracle.evaluate_with_gradient(x);
    let expected = oracle.dimension();
    if g.len() != expected {
        return Err(OptimizeError::DimensionMismatch {
            expected,
            found: g.len(),
        });
    }
    Ok((f, g))
}

#[cfg(test)]
mod tests {
    use super::{FnObjective, Objective, value_and_gradient};
    use crate::error::OptimizeError;
    use ndarray::{Array1, Array2, array};

    #[test]
    fn closure_objective_without_hessian_reports_zero_matrix() {
        let f = FnObjective::new(3, |x: &Array1<f64>| (x.sum(), Array1::ones(x.len())));
        let x = array![1.0, 2.0, 3.0];
        assert_eq!(f.dimension(), 3);
        assert_eq!(f.evaluate(&x), 6.0);
        assert_eq!(f.gradient(&x), array![1.0, 1.0, 1.0]);
        assert_eq!(f.hessian(&x), Array2::<f64>::zeros((3, 3)));
    }

    #[test]
    fn attached_hessian_is_used_through_a_reference() {
        let f = FnObjective::new(2, |x: &Array1<f64>| (x.dot(x), 2.0 * x))
            .with_hessian(|x: &Array1<f64>| Array2::<f64>::eye(x.len()) * 2.0);
        let by_ref = &f;
        let x = array![0.5, -0.5];
        assert_eq!(by_ref.hessian(&x)[[0, 0]], 2.0);
        assert_eq!(by_ref.hessian(&x)[[0, 1]], 0.0);
        let (v, g) = by_ref.evaluate_with_gradient(&x);
        assert_eq!(v, 0.5);
        assert_eq!(g, array![1.0, -1.0]);
    }

    #[test]
    fn gradient_of_the_wrong_length_is_rejected() {
        let short = FnObjective::new(3, |x: &Array1<f64>| (x.sum(), Array1::ones(2)));
        assert_eq!(
            value_and_gradient(&short, &array![1.0, 2.0, 3.0]),
            Err(OptimizeError::DimensionMismatch {
                expected: 3,
                found: 2
            })
        );
        let fine = FnObjective::new(1, |x: &Array1<f64>| (x[0], array![1.0]));
        assert_eq!(value_and_gradient(&fine, &array![4.0]), Ok((4.0, array![1.0])));
    }
}
