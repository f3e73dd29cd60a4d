extern crate test;

use crate::{FnObjective, Lbfgs, SearchMethod, TrustRegion};
use ndarray::{Array1, Array2};
use test::Bencher;

fn x_fourth(x: &Array1<f64>) -> (f64, Array1<f64>) {
    let f: f64 = x.iter().map(|xx| xx.powi(4)).sum();
    let g: Array1<f64> = x.iter().map(|xx| 4.0 * xx.powi(3)).collect();
    (f, g)
}

#[bench]
fn lbfgs_x_fourth_p_1000(bencher: &mut Bencher) {
    let p = 1_000;
    let x0 = Array1::from_elem(p, 2.0);
    let mut optimizer = Lbfgs::new(FnObjective::new(p, x_fourth), 10).unwrap();
    bencher.iter(|| {
        let mut x = x0.clone();
        let report = optimizer.optimize(-1, &mut x).unwrap();
        assert!(
            report.final_gradient_norm < 1e-5,
            "Expected small gradient norm, got {}",
            report.final_gradient_norm
        );
    })
}

#[bench]
fn trust_region_exact_x_fourth_p_50(bencher: &mut Bencher) {
    let p = 50;
    let x0 = Array1::from_elem(p, 2.0);
    let oracle = FnObjective::new(p, x_fourth)
        .with_hessian(|x: &Array1<f64>| Array2::from_diag(&x.mapv(|xx| 12.0 * xx * xx)));
    let mut optimizer = TrustRegion::new(oracle, SearchMethod::Exact).unwrap();
    bencher.iter(|| {
        let mut x = x0.clone();
        let report = optimizer.optimize(-1, &mut x).unwrap();
        assert!(report.final_gradient_norm < 1e-5);
    })
}
