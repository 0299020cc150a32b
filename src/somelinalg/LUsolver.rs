//! Dense LU decomposition with partial pivoting.
//!
//! The factorisation keeps L and U in one matrix: the strictly lower part holds the
//! multipliers of the unit-lower factor L, the diagonal and the upper part hold U.
//! Row interchanges are recorded in a permutation array, the right-hand side is
//! permuted only when a system is solved.
use crate::numerical::solver_error::SolverError;
use log::debug;
use nalgebra::{DMatrix, DVector};

/// combined L/U factors of a square matrix and the row permutation P, P*A = L*U
#[derive(Debug, Clone)]
pub struct LUDecomposition {
    lu: DMatrix<f64>,
    permutation: Vec<usize>,
    swaps: usize,
}

impl LUDecomposition {
    /// factorises a working copy of `matrix`, the input is left untouched
    pub fn new(matrix: &DMatrix<f64>) -> Result<Self, SolverError> {
        let (n, m) = matrix.shape();
        if n != m {
            return Err(SolverError::dimension("LU decomposition (square matrix)", n, m));
        }
        let mut lu = matrix.clone();
        let mut permutation: Vec<usize> = (0..n).collect();
        let mut swaps = 0;
        for i in 0..n {
            let imax = pivot_row(&lu, i)?;
            if imax != i {
                permutation.swap(i, imax);
                lu.swap_rows(i, imax);
                swaps += 1;
            }
            for ii in i + 1..n {
                lu[(ii, i)] /= lu[(i, i)];
                let factor = lu[(ii, i)];
                for k in i + 1..n {
                    lu[(ii, k)] -= factor * lu[(i, k)];
                }
            }
        }
        debug!("LU decomposition of {}x{} matrix, {} row swaps", n, n, swaps);
        Ok(LUDecomposition {
            lu,
            permutation,
            swaps,
        })
    }

    pub fn size(&self) -> usize {
        self.lu.nrows()
    }

    /// row i of P*A is row permutation[i] of A
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    pub fn factors(&self) -> &DMatrix<f64> {
        &self.lu
    }

    pub fn determinant(&self) -> f64 {
        let sign = if self.swaps % 2 == 0 { 1.0 } else { -1.0 };
        sign * self.lu.diagonal().iter().product::<f64>()
    }

    /// solves A*x = rhs with the stored factors
    pub fn solve(&self, rhs: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        let n = self.size();
        if rhs.len() != n {
            return Err(SolverError::dimension("LU solve (right-hand side)", n, rhs.len()));
        }
        let permuted = permute_rhs(rhs, &self.permutation);
        Ok(self.substitute(permuted))
    }

    // forward substitution with unit-lower L, then back substitution with U
    fn substitute(&self, mut y: DVector<f64>) -> DVector<f64> {
        let n = y.len();
        let lu = &self.lu;
        for i in 0..n {
            let mut sum = 0.0;
            for ii in 0..i {
                sum += lu[(i, ii)] * y[ii];
            }
            y[i] -= sum;
        }
        for i in (0..n).rev() {
            let mut sum = 0.0;
            for ii in i + 1..n {
                sum += lu[(i, ii)] * y[ii];
            }
            y[i] = (y[i] - sum) / lu[(i, i)];
        }
        y
    }
}

/// index of the row with maximal |value| in column `i` among rows i..n
fn pivot_row(elems: &DMatrix<f64>, i: usize) -> Result<usize, SolverError> {
    let mut imax = i;
    let mut max = elems[(i, i)].abs();
    for ii in i + 1..elems.nrows() {
        let abs = elems[(ii, i)].abs();
        if abs > max {
            max = abs;
            imax = ii;
        }
    }
    // NaN pivots fail here too
    if !(max >= f64::EPSILON) {
        return Err(SolverError::SingularMatrix {
            column: i,
            pivot: max,
        });
    }
    Ok(imax)
}

fn permute_rhs(rhs: &DVector<f64>, p: &[usize]) -> DVector<f64> {
    DVector::from_iterator(p.len(), p.iter().map(|&row| rhs[row]))
}

/// Solves the dense linear system matrix*x = rhs by LU decomposition with partial pivoting.
/// # Errors
/// * `DimensionMismatch` - matrix not square or rhs of the wrong length
/// * `SingularMatrix` - a pivot below machine epsilon
pub fn solve_linear_system(
    matrix: &DMatrix<f64>,
    rhs: &DVector<f64>,
) -> Result<DVector<f64>, SolverError> {
    if matrix.nrows() != rhs.len() {
        return Err(SolverError::dimension(
            "linear system (rows vs right-hand side)",
            matrix.nrows(),
            rhs.len(),
        ));
    }
    let lu = LUDecomposition::new(matrix)?;
    lu.solve(rhs)
}

/// determinant through the LU factors; a matrix with a vanishing pivot has determinant 0
pub fn determinant(matrix: &DMatrix<f64>) -> Result<f64, SolverError> {
    match LUDecomposition::new(matrix) {
        Ok(lu) => Ok(lu.determinant()),
        Err(SolverError::SingularMatrix { .. }) => Ok(0.0),
        Err(e) => Err(e),
    }
}
