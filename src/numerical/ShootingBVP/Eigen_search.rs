//! Eigenfrequencies of homogeneous linear BVPs that depend on a frequency parameter κ.
//!
//! With all boundary values zero the superposition system of the linear shooting solver
//! becomes M(κ) c = 0. Nontrivial solutions exist exactly where det M(κ) = 0, so the
//! determinant is the frequency equation: it is scanned for sign changes (sweep points
//! are independent and evaluated in parallel) and every bracket is refined with a
//! secant iteration that falls back to the midpoint whenever it leaves the bracket.
//! The eigenmode is then rebuilt from the null vector of M(κ).
use crate::numerical::ButcherTableau::EmbeddedTableau;
use crate::numerical::EmbeddedRK::AdaptiveSolver;
use crate::numerical::ShootingBVP::Shooting_linear::{
    BoundaryConditions, InhomogeneousTerms, LinearBVP, RIGHT_BOUNDARY,
};
use crate::numerical::equation_system::EquationSystem;
use crate::numerical::solver_error::SolverError;
use crate::somelinalg::LUsolver::determinant;
use log::{debug, error, info};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

/// builds the equation system for one value of the frequency parameter
pub type SystemFactory = Arc<dyn Fn(f64) -> EquationSystem + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub kappa_min: f64,
    pub kappa_max: f64,
    /// number of sweep points, ends included
    pub scan_points: usize,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            kappa_min: 1.0,
            kappa_max: 14.0,
            scan_points: 53,
            tolerance: 1e-8,
            max_iterations: 50,
        }
    }
}

impl SearchConfig {
    pub fn sweep(&self) -> Vec<f64> {
        match self.scan_points {
            0 => Vec::new(),
            1 => vec![self.kappa_min],
            n => {
                let step = (self.kappa_max - self.kappa_min) / (n - 1) as f64;
                (0..n).map(|i| self.kappa_min + step * i as f64).collect()
            }
        }
    }
}

/// eigenmode sampled on a uniform grid between the left boundary and the right end
#[derive(Debug, Clone, PartialEq)]
pub struct Eigenmode {
    pub kappa: f64,
    pub grid: Vec<f64>,
    /// one column per grid point
    pub states: DMatrix<f64>,
    /// state at the left boundary
    pub initial_state: DVector<f64>,
}

impl Eigenmode {
    pub fn component(&self, i: usize) -> Vec<f64> {
        self.states.row(i).iter().copied().collect()
    }
}

#[derive(Clone)]
pub struct EigenProblem {
    factory: SystemFactory,
    pub left: BoundaryConditions,
    pub right: BoundaryConditions,
    pub left_boundary: f64,
    pub epsilon: f64,
    pub tableau: EmbeddedTableau,
}

impl fmt::Debug for EigenProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EigenProblem")
            .field("left", &self.left)
            .field("right", &self.right)
            .field("left_boundary", &self.left_boundary)
            .field("epsilon", &self.epsilon)
            .field("tableau", &self.tableau.name)
            .finish()
    }
}

impl EigenProblem {
    /// Only the masks of `left` and `right` matter, the prescribed values are taken as 0.
    pub fn new(
        factory: SystemFactory,
        left: BoundaryConditions,
        right: BoundaryConditions,
        left_boundary: f64,
        epsilon: f64,
    ) -> Self {
        EigenProblem {
            factory,
            left,
            right,
            left_boundary,
            epsilon,
            tableau: EmbeddedTableau::default(),
        }
    }

    pub fn with_tableau(mut self, tableau: EmbeddedTableau) -> Self {
        self.tableau = tableau;
        self
    }

    pub fn equations(&self, kappa: f64) -> EquationSystem {
        (self.factory)(kappa)
    }

    fn zeroed(conditions: &BoundaryConditions) -> Result<BoundaryConditions, SolverError> {
        let pairs: Vec<(usize, f64)> = conditions
            .constrained_indices()
            .into_iter()
            .map(|i| (i, 0.0))
            .collect();
        BoundaryConditions::from_pairs(conditions.len(), &pairs)
    }

    fn bvp(&self, kappa: f64) -> Result<LinearBVP, SolverError> {
        let equations = self.equations(kappa);
        let n = equations.len();
        Ok(LinearBVP::new(
            equations,
            Self::zeroed(&self.left)?,
            Self::zeroed(&self.right)?,
            InhomogeneousTerms::new(n),
            self.left_boundary,
            self.epsilon,
        )
        .with_tableau(self.tableau.clone()))
    }

    /// M(κ): end values of the homogeneous solutions at the right-condition components
    pub fn superposition_matrix(&self, kappa: f64) -> Result<DMatrix<f64>, SolverError> {
        let bvp = self.bvp(kappa)?;
        let homogeneous = bvp.homogeneous_solutions()?;
        let matrix = bvp.superposition_matrix(&homogeneous);
        if !matrix.is_square() {
            return Err(SolverError::dimension(
                "frequency equation (right conditions vs free left components)",
                matrix.ncols(),
                matrix.nrows(),
            ));
        }
        Ok(matrix)
    }

    /// det M(κ)
    pub fn frequency_determinant(&self, kappa: f64) -> Result<f64, SolverError> {
        let matrix = self.superposition_matrix(kappa)?;
        determinant(&matrix)
    }

    /// Brackets [κ_i, κ_(i+1)] of the sweep on which the determinant changes sign. A sweep
    /// point where the determinant is exactly zero gives a degenerate bracket [κ_i, κ_i].
    pub fn scan_sign_changes(&self, config: &SearchConfig) -> Result<Vec<(f64, f64)>, SolverError> {
        let sweep = config.sweep();
        let values = sweep
            .par_iter()
            .map(|&kappa| self.frequency_determinant(kappa))
            .collect::<Result<Vec<f64>, SolverError>>()?;
        let mut brackets = Vec::new();
        for i in 0..values.len() {
            if values[i] == 0.0 {
                brackets.push((sweep[i], sweep[i]));
            } else if i + 1 < values.len()
                && values[i + 1] != 0.0
                && values[i].signum() != values[i + 1].signum()
            {
                brackets.push((sweep[i], sweep[i + 1]));
            }
        }
        info!(
            "scanned {} points on [{}, {}], {} sign changes",
            sweep.len(),
            config.kappa_min,
            config.kappa_max,
            brackets.len()
        );
        Ok(brackets)
    }

    /// root of the frequency determinant inside [lo, hi]
    pub fn refine_secant(&self, lo: f64, hi: f64, config: &SearchConfig) -> Result<f64, SolverError> {
        refine_secant(|kappa| self.frequency_determinant(kappa), lo, hi, config)
    }

    /// every eigenfrequency inside [kappa_min, kappa_max], ascending
    pub fn find_eigenfrequencies(&self, config: &SearchConfig) -> Result<Vec<f64>, SolverError> {
        let brackets = self.scan_sign_changes(config)?;
        let mut roots = Vec::with_capacity(brackets.len());
        for (lo, hi) in brackets {
            let root = self.refine_secant(lo, hi, config)?;
            info!("eigenfrequency κ = {:.10}", root);
            roots.push(root);
        }
        Ok(roots)
    }

    /// Eigenmode at `kappa` on `points` uniform grid points, scaled so that the largest
    /// magnitude of component `normalize_by` is 1.
    pub fn eigenmode(
        &self,
        kappa: f64,
        points: usize,
        normalize_by: usize,
    ) -> Result<Eigenmode, SolverError> {
        let equations = self.equations(kappa);
        let n = equations.len();
        if normalize_by >= n {
            return Err(SolverError::dimension(
                "eigenmode (normalized component)",
                n,
                normalize_by,
            ));
        }
        let matrix = self.superposition_matrix(kappa)?;
        let coefficients = null_vector(&matrix)?;
        let mut initial_state = DVector::zeros(n);
        for (j, i) in self.left.free_indices().into_iter().enumerate() {
            initial_state[i] = coefficients[j];
        }
        let grid: Vec<f64> = match points {
            0 | 1 => vec![self.left_boundary],
            _ => {
                let step = (RIGHT_BOUNDARY - self.left_boundary) / (points - 1) as f64;
                (0..points)
                    .map(|i| self.left_boundary + step * i as f64)
                    .collect()
            }
        };
        let solver = AdaptiveSolver::new(equations, self.tableau.clone(), self.epsilon);
        let mut states = solver.solve_on_grid(&grid, &initial_state)?;
        let scale = states.row(normalize_by).amax();
        if scale > 0.0 {
            states /= scale;
            initial_state /= scale;
        }
        Ok(Eigenmode {
            kappa,
            grid,
            states,
            initial_state,
        })
    }
}

/// Secant iteration kept inside the sign-change bracket [lo, hi]; an iterate that falls
/// outside the current bracket is replaced by its midpoint.
pub fn refine_secant<F>(f: F, lo: f64, hi: f64, config: &SearchConfig) -> Result<f64, SolverError>
where
    F: Fn(f64) -> Result<f64, SolverError>,
{
    let (mut a, mut b) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let mut fa = f(a)?;
    if fa == 0.0 {
        return Ok(a);
    }
    let fb = f(b)?;
    if fb == 0.0 {
        return Ok(b);
    }
    if fa.signum() == fb.signum() {
        return Err(SolverError::InvalidBracket { lo: a, hi: b });
    }
    debug!(
        "secant refinement on [{}, {}], f = ({:e}, {:e})",
        a, b, fa, fb
    );
    let (mut x0, mut f0) = (a, fa);
    let (mut x1, mut f1) = (b, fb);
    for iteration in 0..config.max_iterations {
        let mut x2 = x1 - f1 * (x1 - x0) / (f1 - f0);
        if !x2.is_finite() || x2 <= a || x2 >= b {
            x2 = 0.5 * (a + b);
        }
        let f2 = f(x2)?;
        debug!("iteration {}: x = {}, f(x) = {:e}", iteration, x2, f2);
        if f2 == 0.0 || (x2 - x1).abs() <= config.tolerance * x2.abs().max(1.0) {
            info!(
                "secant method converged after {} iterations with x = {}",
                iteration + 1,
                x2
            );
            return Ok(x2);
        }
        if f2.signum() == fa.signum() {
            a = x2;
            fa = f2;
        } else {
            b = x2;
        }
        if b - a <= config.tolerance * a.abs().max(1.0) {
            return Ok(0.5 * (a + b));
        }
        x0 = x1;
        f0 = f1;
        x1 = x2;
        f1 = f2;
    }
    error!(
        "secant method did not converge after {} iterations",
        config.max_iterations
    );
    Err(SolverError::MaxIterationsReached {
        iterations: config.max_iterations,
        last: x1,
    })
}

/// Nontrivial solution of M c = 0 for a matrix of rank n - 1: the cofactors of one row,
/// c_j = (-1)^(i+j) det(minor_ij), taking the row with the largest cofactor vector.
pub fn null_vector(matrix: &DMatrix<f64>) -> Result<DVector<f64>, SolverError> {
    let (n, m) = matrix.shape();
    if n != m {
        return Err(SolverError::dimension("null vector (square matrix)", n, m));
    }
    match n {
        0 => return Ok(DVector::zeros(0)),
        1 => return Ok(DVector::from_element(1, 1.0)),
        _ => {}
    }
    let mut best = DVector::zeros(n);
    let mut best_norm = 0.0;
    for i in 0..n {
        let mut cofactors = DVector::zeros(n);
        for j in 0..n {
            let minor = matrix.clone().remove_row(i).remove_column(j);
            let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
            cofactors[j] = sign * determinant(&minor)?;
        }
        let norm = cofactors.norm();
        if norm > best_norm {
            best_norm = norm;
            best = cofactors;
        }
    }
    if best_norm == 0.0 {
        // rank below n - 1: the eigenvalue is multiple
        return Err(SolverError::SingularMatrix {
            column: 0,
            pivot: 0.0,
        });
    }
    Ok(best / best_norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    // y'' = -κ² y with y(0) = y(1) = 0: eigenvalues κ = kπ, modes sin(kπx)
    fn string_problem(epsilon: f64) -> EigenProblem {
        let factory: SystemFactory = Arc::new(|kappa: f64| {
            EquationSystem::new(vec![
                Arc::new(|_x: f64, y: &DVector<f64>| y[1]),
                Arc::new(move |_x: f64, y: &DVector<f64>| -kappa * kappa * y[0]),
            ])
        });
        EigenProblem::new(
            factory,
            BoundaryConditions::new(2).with(0, 0.0).unwrap(),
            BoundaryConditions::new(2).with(0, 0.0).unwrap(),
            0.0,
            epsilon,
        )
    }

    #[test]
    fn test_sweep_points() {
        let config = SearchConfig {
            kappa_min: 1.0,
            kappa_max: 2.0,
            scan_points: 5,
            ..SearchConfig::default()
        };
        assert_eq!(config.sweep(), vec![1.0, 1.25, 1.5, 1.75, 2.0]);
    }

    #[test]
    fn test_frequency_determinant() {
        // the free slope at x = 0 is the only unknown: det = y(1) = sin(κ)/κ
        let problem = string_problem(1e-11);
        for kappa in [0.5, 1.0, 2.5, 4.0] {
            let det = problem.frequency_determinant(kappa).unwrap();
            assert_abs_diff_eq!(det, kappa.sin() / kappa, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_find_eigenfrequencies() {
        let problem = string_problem(1e-11);
        let config = SearchConfig {
            kappa_min: 1.0,
            kappa_max: 7.0,
            scan_points: 25,
            tolerance: 1e-10,
            max_iterations: 50,
        };
        let roots = problem.find_eigenfrequencies(&config).unwrap();
        assert_eq!(roots.len(), 2);
        assert_abs_diff_eq!(roots[0], PI, epsilon = 1e-7);
        assert_abs_diff_eq!(roots[1], 2.0 * PI, epsilon = 1e-7);
    }

    #[test]
    fn test_refine_without_sign_change() {
        let problem = string_problem(1e-8);
        let res = problem.refine_secant(1.0, 2.0, &SearchConfig::default());
        assert_eq!(res, Err(SolverError::InvalidBracket { lo: 1.0, hi: 2.0 }));
    }

    #[test]
    fn test_refine_secant_stays_in_bracket() {
        // plain secant steps on this function overshoot the bracket
        let f = |x: f64| -> Result<f64, SolverError> { Ok((20.0 * (x - 1.0)).atan()) };
        let config = SearchConfig {
            tolerance: 1e-12,
            max_iterations: 200,
            ..SearchConfig::default()
        };
        let root = refine_secant(f, 0.0, 5.0, &config).unwrap();
        assert_abs_diff_eq!(root, 1.0, epsilon = 1e-9);
        let config = SearchConfig {
            max_iterations: 1,
            tolerance: 1e-15,
            ..SearchConfig::default()
        };
        assert!(matches!(
            refine_secant(f, 0.0, 5.0, &config),
            Err(SolverError::MaxIterationsReached { iterations: 1, .. })
        ));
    }

    #[test]
    fn test_null_vector() {
        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let c = null_vector(&singular).unwrap();
        assert!((&singular * &c).amax() < 1e-14);
        assert_abs_diff_eq!(c.norm(), 1.0, epsilon = 1e-14);
        let zero = DMatrix::<f64>::zeros(2, 2);
        assert!(null_vector(&zero).is_err());
        assert_eq!(null_vector(&DMatrix::zeros(1, 1)).unwrap()[0], 1.0);
    }

    #[test]
    fn test_first_eigenmode_is_half_sine() {
        let problem = string_problem(1e-11);
        let mode = problem.eigenmode(PI, 11, 0).unwrap();
        assert_eq!(mode.grid.len(), 11);
        let deflection = mode.component(0);
        for (x, w) in mode.grid.iter().zip(deflection.iter()) {
            assert_abs_diff_eq!(*w, (PI * x).sin(), epsilon = 1e-6);
        }
        assert_abs_diff_eq!(mode.initial_state[1], PI, epsilon = 1e-6);
        assert!(problem.eigenmode(PI, 11, 2).is_err());
    }
}
