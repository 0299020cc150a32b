use std::fmt;

/// Error types shared by the LU solver, the adaptive integrator, the shooting
/// solver and the eigenfrequency search.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// sizes of vectors/matrices passed together do not agree
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },
    /// pivot smaller than machine epsilon found in `column`
    SingularMatrix { column: usize, pivot: f64 },
    /// non-finite value produced while evaluating equation `component` at `x`
    NumericDivergence { x: f64, component: usize },
    /// integration interval runs backwards
    InvalidInterval { a: f64, b: f64 },
    /// step was halved until it no longer moves the independent variable
    StepSizeUnderflow { x: f64, h: f64 },
    /// root search interval without a sign change
    InvalidBracket { lo: f64, hi: f64 },
    MaxIterationsReached { iterations: usize, last: f64 },
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SolverError::DimensionMismatch {
                context,
                expected,
                found,
            } => write!(
                f,
                "Dimension mismatch in {}: expected {}, found {}",
                context, expected, found
            ),
            SolverError::SingularMatrix { column, pivot } => write!(
                f,
                "Matrix is singular: pivot {:e} in column {}",
                pivot, column
            ),
            SolverError::NumericDivergence { x, component } => write!(
                f,
                "Non-finite value in equation {} at x = {}",
                component, x
            ),
            SolverError::InvalidInterval { a, b } => {
                write!(f, "Invalid integration interval: b = {} < a = {}", b, a)
            }
            SolverError::StepSizeUnderflow { x, h } => {
                write!(f, "Step size underflow at x = {}: h = {:e}", x, h)
            }
            SolverError::InvalidBracket { lo, hi } => {
                write!(f, "No sign change in the interval [{}, {}]", lo, hi)
            }
            SolverError::MaxIterationsReached { iterations, last } => write!(
                f,
                "Maximum iterations reached ({}), last approximation {}",
                iterations, last
            ),
        }
    }
}

impl std::error::Error for SolverError {}

impl SolverError {
    pub fn dimension(context: &str, expected: usize, found: usize) -> Self {
        SolverError::DimensionMismatch {
            context: context.to_string(),
            expected,
            found,
        }
    }
}
