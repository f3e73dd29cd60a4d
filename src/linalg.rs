// Small dense helpers shared by the optimizers.

use ndarray::{Array1, Array2};

#[inline]
pub(crate) fn norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

#[inline]
pub(crate) fn all_finite(v: &Array1<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}

/// Lower Cholesky factor `L` with `A = L Lᵀ`, or `None` if `A` is not
/// (numerically) positive definite.
pub(crate) fn chol_decompose(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return None;
    }
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[[i, j]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solves `L Lᵀ x = b` given the factor from [`chol_decompose`].
pub(crate) fn chol_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    // Forward solve: L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * y[k];
        }
        y[i] = sum / l[[i, i]];
    }
    // Backward solve: L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}

/// Forward substitution only: returns `w` with `L w = b`.
pub(crate) fn forward_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut w = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * w[k];
        }
        w[i] = sum / l[[i, i]];
    }
    w
}

/// `A + shift·I`.
pub(crate) fn shifted(a: &Array2<f64>, shift: f64) -> Array2<f64> {
    let mut out = a.clone();
    for i in 0..out.nrows() {
        out[[i, i]] += shift;
    }
    out
}

/// Gershgorin lower bound on the smallest eigenvalue of a symmetric matrix.
pub(crate) fn gershgorin_lower_bound(a: &Array2<f64>) -> f64 {
    let n = a.nrows();
    let mut bound = f64::INFINITY;
    for i in 0..n {
        let mut radius = 0.0;
        for j in 0..n {
            if j != i {
                radius += a[[i, j]].abs();
            }
        }
        bound = bound.min(a[[i, i]] - radius);
    }
    if n == 0 { 0.0 } else { bound }
}

/// Decrease predicted by the model `m(p) = gᵀp + ½pᵀHp`, i.e. `-m(p)`.
#[inline]
pub(crate) fn model_decrease(g: &Array1<f64>, h: &Array2<f64>, p: &Array1<f64>) -> f64 {
    -(g.dot(p) + 0.5 * p.dot(&h.dot(p)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use spectral::prelude::*;

    #[test]
    fn cholesky_solves_spd_system() {
        let a = array![[4.0, 2.0, 0.4], [2.0, 5.0, 1.0], [0.4, 1.0, 3.0]];
        let b = array![1.0, -2.0, 0.5];
        let l = chol_decompose(&a).unwrap();
        let x = chol_solve(&l, &b);
        let residual = a.dot(&x) - &b;
        assert_that!(&norm(&residual)).is_less_than(1e-12);
        let w = forward_solve(&l, &b);
        assert_that!(&norm(&(l.dot(&w) - &b))).is_less_than(1e-12);
    }

    #[test]
    fn cholesky_rejects_indefinite_and_zero_matrices() {
        assert!(chol_decompose(&array![[1.0, 0.0], [0.0, -1.0]]).is_none());
        assert!(chol_decompose(&Array2::<f64>::zeros((2, 2))).is_none());
        assert!(chol_decompose(&array![[1.0, 2.0, 3.0]]).is_none());
    }

    #[test]
    fn gershgorin_bounds_smallest_eigenvalue() {
        let a = array![[2.0, -1.0], [-1.0, 2.0]];
        // Eigenvalues are 1 and 3.
        assert_that!(&gershgorin_lower_bound(&a)).is_less_than_or_equal_to(1.0);
        let shifted_a = shifted(&a, 1.5);
        assert_eq!(shifted_a[[0, 0]], 3.5);
        assert_eq!(shifted_a[[0, 1]], -1.0);
    }

    #[test]
    fn model_decrease_matches_hand_computation() {
        let g = array![1.0, -2.0];
        let h = array![[2.0, 0.0], [0.0, 4.0]];
        let p = array![-0.5, 0.5];
        // g.p = -1.5, p'Hp = 0.5 + 1.0 = 1.5
        assert_that!(&model_decrease(&g, &h, &p)).is_close_to(0.75, 1e-15);
    }
}
