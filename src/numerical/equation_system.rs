//! Right-hand side of a first-order ODE system y' = f(x, y) stored as an ordered list of
//! scalar functions, one per state component.
//!
//! Equations are reference counted so that derived systems (for example the same system
//! with forcing terms added) share the original closures instead of copying them. All
//! closures must be `Send + Sync`, which lets independent solves run on separate threads.
use crate::numerical::solver_error::SolverError;
use nalgebra::DVector;
use std::fmt;
use std::sync::Arc;

/// derivative of one state component: (x, full state) -> value
pub type Equation = Arc<dyn Fn(f64, &DVector<f64>) -> f64 + Send + Sync>;
/// forcing term that depends on the independent variable only
pub type Forcing = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

#[derive(Clone)]
pub struct EquationSystem {
    equations: Vec<Equation>,
}

impl EquationSystem {
    pub fn new(equations: Vec<Equation>) -> Self {
        EquationSystem { equations }
    }

    /// ```rust, ignore
    /// // y'' = -y written as y0' = y1, y1' = -y0
    /// let system = EquationSystem::from_fns(vec![
    ///     Box::new(|_x, y: &DVector<f64>| y[1]),
    ///     Box::new(|_x, y: &DVector<f64>| -y[0]),
    /// ]);
    /// ```
    pub fn from_fns(equations: Vec<Box<dyn Fn(f64, &DVector<f64>) -> f64 + Send + Sync>>) -> Self {
        EquationSystem {
            equations: equations.into_iter().map(Equation::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.equations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equations.is_empty()
    }

    /// evaluates the full right-hand side; fails on a state of the wrong size and on
    /// non-finite derivatives
    pub fn evaluate(&self, x: f64, y: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        if y.len() != self.len() {
            return Err(SolverError::dimension(
                "equation system (state length)",
                self.len(),
                y.len(),
            ));
        }
        let mut dydx = DVector::zeros(self.len());
        for (component, f) in self.equations.iter().enumerate() {
            let value = f(x, y);
            if !value.is_finite() {
                return Err(SolverError::NumericDivergence { x, component });
            }
            dydx[component] = value;
        }
        Ok(dydx)
    }

    /// new system with `forcing(x)` added to equation `index`
    pub fn with_forcing(&self, index: usize, forcing: Forcing) -> Result<Self, SolverError> {
        let Some(base) = self.equations.get(index).cloned() else {
            return Err(SolverError::dimension(
                "forcing term (equation index)",
                self.len(),
                index,
            ));
        };
        let mut equations = self.equations.clone();
        equations[index] = Arc::new(move |x: f64, y: &DVector<f64>| base(x, y) + forcing(x));
        Ok(EquationSystem { equations })
    }
}

impl fmt::Debug for EquationSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EquationSystem {{ {} equations }}", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oscillator() -> EquationSystem {
        EquationSystem::new(vec![
            Arc::new(|_x: f64, y: &DVector<f64>| y[1]),
            Arc::new(|_x: f64, y: &DVector<f64>| -y[0]),
        ])
    }

    #[test]
    fn test_evaluate() {
        let system = oscillator();
        assert_eq!(system.len(), 2);
        let y = DVector::from_vec(vec![1.0, 2.0]);
        let dydx = system.evaluate(0.0, &y).unwrap();
        assert_eq!(dydx, DVector::from_vec(vec![2.0, -1.0]));
    }

    #[test]
    fn test_evaluate_wrong_length() {
        let system = oscillator();
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            system.evaluate(0.0, &y),
            Err(SolverError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_evaluate_singular_point() {
        let system = EquationSystem::from_fns(vec![Box::new(|x: f64, y: &DVector<f64>| y[0] / x)]);
        let y = DVector::from_vec(vec![1.0]);
        assert_eq!(
            system.evaluate(0.0, &y),
            Err(SolverError::NumericDivergence {
                x: 0.0,
                component: 0
            })
        );
    }

    #[test]
    fn test_with_forcing_leaves_original_untouched() {
        let system = oscillator();
        let forced = system.with_forcing(1, Arc::new(|x: f64| 2.0 * x)).unwrap();
        let y = DVector::from_vec(vec![1.0, 0.0]);
        assert_eq!(forced.evaluate(3.0, &y).unwrap()[1], -1.0 + 6.0);
        assert_eq!(system.evaluate(3.0, &y).unwrap()[1], -1.0);
        assert!(system.with_forcing(5, Arc::new(|_x: f64| 1.0)).is_err());
    }
}
