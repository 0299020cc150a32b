//! Linear two-point boundary value problems solved by superposition ("linear shooting").
//!
//! For a linear system y' = A(x) y + g(x) with some components fixed at the left end and
//! the rest fixed at the right end, any solution is a particular solution plus a linear
//! combination of homogeneous ones:
//! 1. the particular Cauchy problem starts from the left values (free components are 0)
//!    and is integrated through the forced system;
//! 2. one homogeneous Cauchy problem per free left component starts from the unit vector
//!    of that component and is integrated through the unforced system;
//! 3. the coefficients of the combination solve the small linear system that makes the
//!    combined end state satisfy the right conditions.
//!
//! The right end of the interval is fixed at [`RIGHT_BOUNDARY`], only the left end is a
//! parameter.
use crate::numerical::ButcherTableau::EmbeddedTableau;
use crate::numerical::EmbeddedRK::AdaptiveSolver;
use crate::numerical::equation_system::{EquationSystem, Forcing};
use crate::numerical::solver_error::SolverError;
use crate::somelinalg::LUsolver::solve_linear_system;
use crate::somelinalg::linear_sys_diagnostics::linear_system_diagnostics;
use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use std::fmt;

pub const RIGHT_BOUNDARY: f64 = 1.0;

/// condition number above which the superposition matrix is reported
const CONDITION_THRESHOLD: f64 = 1e12;

/// Boundary values at one end of the interval: a value per component and a mask telling
/// which components are actually prescribed.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryConditions {
    values: Vec<f64>,
    constrained: Vec<bool>,
}

impl BoundaryConditions {
    /// nothing prescribed
    pub fn new(size: usize) -> Self {
        BoundaryConditions {
            values: vec![0.0; size],
            constrained: vec![false; size],
        }
    }

    pub fn from_pairs(size: usize, pairs: &[(usize, f64)]) -> Result<Self, SolverError> {
        let mut conditions = Self::new(size);
        for &(index, value) in pairs {
            conditions.set(index, value)?;
        }
        Ok(conditions)
    }

    pub fn set(&mut self, index: usize, value: f64) -> Result<(), SolverError> {
        if index >= self.len() {
            return Err(SolverError::dimension(
                "boundary condition (component index)",
                self.len(),
                index,
            ));
        }
        self.values[index] = value;
        self.constrained[index] = true;
        Ok(())
    }

    pub fn with(mut self, index: usize, value: f64) -> Result<Self, SolverError> {
        self.set(index, value)?;
        Ok(self)
    }

    pub fn release(&mut self, index: usize) {
        if index < self.len() {
            self.values[index] = 0.0;
            self.constrained[index] = false;
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_constrained(&self, index: usize) -> bool {
        self.constrained.get(index).copied().unwrap_or(false)
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        if self.is_constrained(index) {
            Some(self.values[index])
        } else {
            None
        }
    }

    /// number of prescribed components
    pub fn count(&self) -> usize {
        self.constrained.iter().filter(|c| **c).count()
    }

    pub fn constrained_indices(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.constrained[i]).collect()
    }

    pub fn free_indices(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| !self.constrained[i]).collect()
    }
}

/// Optional forcing term per equation; `None` leaves the equation homogeneous.
#[derive(Clone)]
pub struct InhomogeneousTerms {
    terms: Vec<Option<Forcing>>,
}

impl InhomogeneousTerms {
    pub fn new(size: usize) -> Self {
        InhomogeneousTerms {
            terms: vec![None; size],
        }
    }

    pub fn set(&mut self, index: usize, forcing: Forcing) -> Result<(), SolverError> {
        let size = self.len();
        let Some(slot) = self.terms.get_mut(index) else {
            return Err(SolverError::dimension(
                "inhomogeneous term (equation index)",
                size,
                index,
            ));
        };
        *slot = Some(forcing);
        Ok(())
    }

    pub fn with(mut self, index: usize, forcing: Forcing) -> Result<Self, SolverError> {
        self.set(index, forcing)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_homogeneous(&self) -> bool {
        self.terms.iter().all(Option::is_none)
    }

    /// `equations` with every present forcing term added to its equation
    pub fn apply(&self, equations: &EquationSystem) -> Result<EquationSystem, SolverError> {
        let mut forced = equations.clone();
        for (index, term) in self.terms.iter().enumerate() {
            if let Some(forcing) = term {
                forced = forced.with_forcing(index, forcing.clone())?;
            }
        }
        Ok(forced)
    }
}

impl fmt::Debug for InhomogeneousTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let forced: Vec<usize> = (0..self.len()).filter(|&i| self.terms[i].is_some()).collect();
        write!(f, "InhomogeneousTerms {{ size: {}, forced: {:?} }}", self.len(), forced)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuperpositionSolution {
    /// state at the right boundary
    pub result: DVector<f64>,
    /// weights of the homogeneous solutions
    pub coefficients: DVector<f64>,
    /// state at the left boundary from which a single Cauchy problem reproduces `result`
    pub initial_state: DVector<f64>,
}

#[derive(Debug, Clone)]
pub struct LinearBVP {
    pub equations: EquationSystem,
    pub left: BoundaryConditions,
    pub right: BoundaryConditions,
    pub inhomogeneous: InhomogeneousTerms,
    pub left_boundary: f64,
    pub epsilon: f64,
    pub tableau: EmbeddedTableau,
}

impl LinearBVP {
    pub fn new(
        equations: EquationSystem,
        left: BoundaryConditions,
        right: BoundaryConditions,
        inhomogeneous: InhomogeneousTerms,
        left_boundary: f64,
        epsilon: f64,
    ) -> Self {
        LinearBVP {
            equations,
            left,
            right,
            inhomogeneous,
            left_boundary,
            epsilon,
            tableau: EmbeddedTableau::default(),
        }
    }

    pub fn with_tableau(mut self, tableau: EmbeddedTableau) -> Self {
        self.tableau = tableau;
        self
    }

    fn check_sizes(&self) -> Result<(), SolverError> {
        let n = self.equations.len();
        for (context, size) in [
            ("linear BVP (left conditions)", self.left.len()),
            ("linear BVP (right conditions)", self.right.len()),
            ("linear BVP (inhomogeneous terms)", self.inhomogeneous.len()),
        ] {
            if size != n {
                return Err(SolverError::dimension(context, n, size));
            }
        }
        Ok(())
    }

    /// left values on prescribed components, zero elsewhere
    pub fn particular_initial(&self) -> DVector<f64> {
        DVector::from_fn(self.equations.len(), |i, _| {
            self.left.value(i).unwrap_or(0.0)
        })
    }

    /// one unit vector per free left component, in component order
    pub fn homogeneous_initials(&self) -> Vec<DVector<f64>> {
        let n = self.equations.len();
        self.left
            .free_indices()
            .into_iter()
            .map(|i| {
                let mut e = DVector::zeros(n);
                e[i] = 1.0;
                e
            })
            .collect()
    }

    /// particular initial vector first, then the homogeneous ones
    pub fn initial_conditions(&self) -> Vec<DVector<f64>> {
        let mut conditions = vec![self.particular_initial()];
        conditions.extend(self.homogeneous_initials());
        conditions
    }

    fn integrator(&self, equations: EquationSystem) -> AdaptiveSolver {
        AdaptiveSolver::new(equations, self.tableau.clone(), self.epsilon)
    }

    /// end state of the particular Cauchy problem (forced system)
    pub fn particular_solution(&self) -> Result<DVector<f64>, SolverError> {
        self.check_sizes()?;
        let forced = self.inhomogeneous.apply(&self.equations)?;
        self.integrator(forced)
            .solve(self.left_boundary, RIGHT_BOUNDARY, &self.particular_initial())
    }

    /// end states of the homogeneous Cauchy problems
    pub fn homogeneous_solutions(&self) -> Result<Vec<DVector<f64>>, SolverError> {
        self.check_sizes()?;
        let solver = self.integrator(self.equations.clone());
        self.homogeneous_initials()
            .iter()
            .map(|initial| solver.solve(self.left_boundary, RIGHT_BOUNDARY, initial))
            .collect()
    }

    /// all Cauchy solutions, particular first
    pub fn cauchy_solutions(&self) -> Result<Vec<DVector<f64>>, SolverError> {
        let mut solutions = vec![self.particular_solution()?];
        solutions.extend(self.homogeneous_solutions()?);
        Ok(solutions)
    }

    /// Row per right condition (in component order), column per homogeneous solution:
    /// the value of that solution at the prescribed component.
    pub fn superposition_matrix(&self, homogeneous: &[DVector<f64>]) -> DMatrix<f64> {
        let rows = self.right.constrained_indices();
        DMatrix::from_fn(rows.len(), homogeneous.len(), |r, j| homogeneous[j][rows[r]])
    }

    /// target minus particular end value, per right condition
    pub fn superposition_rhs(&self, particular: &DVector<f64>) -> DVector<f64> {
        let rows = self.right.constrained_indices();
        DVector::from_fn(rows.len(), |r, _| {
            self.right.value(rows[r]).unwrap_or(0.0) - particular[rows[r]]
        })
    }

    /// state at the right boundary satisfying all boundary conditions
    pub fn solve(&self) -> Result<DVector<f64>, SolverError> {
        self.solve_full().map(|solution| solution.result)
    }

    pub fn solve_full(&self) -> Result<SuperpositionSolution, SolverError> {
        let free = self.left.free_indices();
        info!(
            "linear BVP on [{}, {}]: {} equations, {} left and {} right conditions",
            self.left_boundary,
            RIGHT_BOUNDARY,
            self.equations.len(),
            self.left.count(),
            self.right.count()
        );
        if free.len() != self.right.count() {
            warn!(
                "{} free left components but {} right conditions: the problem is not exactly determined",
                free.len(),
                self.right.count()
            );
        }
        let mut homogeneous = self.cauchy_solutions()?;
        let particular = homogeneous.remove(0);
        let matrix = self.superposition_matrix(&homogeneous);
        let rhs = self.superposition_rhs(&particular);
        let coefficients = solve_linear_system(&matrix, &rhs)?;
        if !matrix.is_empty() {
            linear_system_diagnostics(&matrix, &coefficients, &rhs, CONDITION_THRESHOLD);
        }

        let mut result = particular;
        let mut initial_state = self.particular_initial();
        for (j, solution) in homogeneous.iter().enumerate() {
            result.axpy(coefficients[j], solution, 1.0);
            initial_state[free[j]] += coefficients[j];
        }
        info!("linear BVP solved, state at the right boundary: {:?}", result.as_slice());
        Ok(SuperpositionSolution {
            result,
            coefficients,
            initial_state,
        })
    }
}

/// Solves the linear BVP with the default tableau and returns the state at the right
/// boundary.
pub fn solve_bvp(
    equations: &EquationSystem,
    left: &BoundaryConditions,
    right: &BoundaryConditions,
    inhomogeneous: &InhomogeneousTerms,
    left_boundary: f64,
    epsilon: f64,
) -> Result<DVector<f64>, SolverError> {
    LinearBVP::new(
        equations.clone(),
        left.clone(),
        right.clone(),
        inhomogeneous.clone(),
        left_boundary,
        epsilon,
    )
    .solve()
}
