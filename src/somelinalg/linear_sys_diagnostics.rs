use log::warn;
use nalgebra::{DMatrix, DVector};
/// The condition number of a matrix is the ratio of its largest singular value to the smallest one.
/// It measures how strongly errors in the right-hand side (here: the end states of the
/// auxiliary Cauchy problems) are amplified in the solution.
pub fn condition_number(A: &DMatrix<f64>) -> f64 {
    if A.is_empty() {
        return 1.0;
    }
    let singular_values = A.singular_values();
    let max_sigma = singular_values.max();
    let min_sigma = singular_values.min();
    if min_sigma == 0.0 {
        return f64::INFINITY;
    }
    max_sigma / min_sigma
}

pub fn poorly_conditioned(A: &DMatrix<f64>, threshold: f64) -> bool {
    let condition_number = condition_number(A);
    let poorly_conditioned = condition_number > threshold;
    if poorly_conditioned {
        warn!(
            "The system of linear equations is poorly conditioned. Condition number = {:.2e}",
            condition_number
        );
    }
    poorly_conditioned
}

/// max-norm of A*x - b
pub fn residual_norm(A: &DMatrix<f64>, x: &DVector<f64>, b: &DVector<f64>) -> f64 {
    if b.is_empty() {
        return 0.0;
    }
    (A * x - b).amax()
}

/// Checks a solved system: warns when the matrix is poorly conditioned or the residual is
/// large compared to the right-hand side. Returns true when nothing suspicious was found.
pub fn linear_system_diagnostics(
    A: &DMatrix<f64>,
    x: &DVector<f64>,
    b: &DVector<f64>,
    threshold: f64,
) -> bool {
    let conditioned = !poorly_conditioned(A, threshold);
    let residual = residual_norm(A, x, b);
    let scale = b.amax().max(1.0);
    let accurate = residual <= 1e3 * f64::EPSILON * condition_number(A).min(1e12) * scale;
    if !accurate {
        warn!(
            "Residual of the linear system is large: |Ax - b| = {:.3e}",
            residual
        );
    }
    conditioned && accurate
}

/// famous example of ill-conditioned matrix
#[cfg(test)]
fn hilbert_matrix(n: usize) -> DMatrix<f64> {
    let mut A = DMatrix::zeros(n, n);
    for i in 1..n + 1 {
        for j in 1..n + 1 {
            A[(i - 1, j - 1)] = 1.0 / (i as f64 + j as f64 - 1.0);
        }
    }
    A
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::somelinalg::LUsolver::solve_linear_system;
    #[test]
    fn test_poorly_conditioned() {
        let A = DMatrix::from_vec(2, 2, vec![1.0, 1.0, 1.00001, 1.0]);
        let threshold = 1e5;
        assert_eq!(poorly_conditioned(&A, threshold), true);
    }
    #[test]
    fn test_poorly_conditioned_hilbert() {
        let A = hilbert_matrix(6);
        let threshold = 1e5;
        assert_eq!(poorly_conditioned(&A, threshold), true);
    }
    #[test]
    fn test_identity_is_well_conditioned() {
        let A = DMatrix::<f64>::identity(4, 4);
        assert!((condition_number(&A) - 1.0).abs() < 1e-12);
        assert_eq!(poorly_conditioned(&A, 10.0), false);
    }
    #[test]
    fn test_diagnostics_of_solved_system() {
        let A = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let b = DVector::from_vec(vec![1.0, 2.0]);
        let x = solve_linear_system(&A, &b).unwrap();
        assert!(residual_norm(&A, &x, &b) < 1e-14);
        assert!(linear_system_diagnostics(&A, &x, &b, 1e8));
        // a wrong solution is reported
        let wrong = DVector::from_vec(vec![1.0, 1.0]);
        assert_eq!(linear_system_diagnostics(&A, &wrong, &b, 1e8), false);
    }
}
