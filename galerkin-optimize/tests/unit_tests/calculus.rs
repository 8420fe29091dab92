use galerkin_optimize::calculus::*;
use matrixcompare::assert_matrix_eq;
use matrixcompare::assert_scalar_eq;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};

#[test]
fn approximate_jacobian_simple_function() {
    let f = |x: DVectorView<f64>, mut f: DVectorViewMut<f64>| {
        let x1 = x[0];
        let x2 = x[1];
        f[0] = x1 * x2 + 3.0;
        f[1] = x1 * x1 + x2 * x2 + x1 + 5.0;
    };

    let mut x = DVector::from_column_slice(&[3.0, 4.0]);
    let j = approximate_jacobian_fd(2, f, &mut x, 1e-6);

    // J = [   x2           x1 ]
    //     [ 2*x1 + 1     2*x2 ]

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(2, 2,
                                           &[4.0, 3.0,
                                             7.0, 8.0]);

    assert_matrix_eq!(j, expected, comp = abs, tol = 1e-6);
    // x is restored after the perturbations
    assert_eq!(x, DVector::from_column_slice(&[3.0, 4.0]));
}

#[test]
fn scalar_central_difference() {
    let df = approximate_derivative(|x| x.sin(), 0.5, 1e-5);
    assert_scalar_eq!(df, 0.5f64.cos(), comp = abs, tol = 1e-9);
}
