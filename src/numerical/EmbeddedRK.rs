//! Adaptive explicit Runge-Kutta integrator driven by an embedded pair.
//!
//! Step control: the first trial step spans the whole interval. A step whose local
//! error estimate |u - û| exceeds the tolerance is halved and recomputed from the same
//! point, an accepted step advances the state with the propagated estimate u. The step
//! is never enlarged again, it is only shortened to land exactly on the right end.
//!
//! The tolerance never goes below the rounding level of the state,
//! `ROUNDING_LEVEL · f64::EPSILON · max(|y|, |u|)`: below it |u - û| is rounding noise
//! that halving cannot reduce. A step shorter than `MIN_STEP_ULPS` ulps of the interval
//! ends the integration with `StepSizeUnderflow`.
use crate::numerical::ButcherTableau::EmbeddedTableau;
use crate::numerical::equation_system::EquationSystem;
use crate::numerical::solver_error::SolverError;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};

/// rounding level of |u - û| in units of f64::EPSILON · |y|
const ROUNDING_LEVEL: f64 = 64.0;
/// shortest admissible step in units of f64::EPSILON · max(|x|, |b|, 1)
const MIN_STEP_ULPS: f64 = 16.0;

/// both solution estimates of one trial step
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedStep {
    /// propagated estimate
    pub u: DVector<f64>,
    /// companion estimate, only used for the error estimate
    pub u_hat: DVector<f64>,
}

impl EmbeddedStep {
    /// Euclidean norm of u - û
    pub fn residual(&self) -> f64 {
        (&self.u - &self.u_hat).norm()
    }

    /// `epsilon`, raised to the rounding level of the states involved in the step
    pub fn tolerance(&self, y: &DVector<f64>, epsilon: f64) -> f64 {
        let scale = y.norm().max(self.u.norm());
        epsilon.max(ROUNDING_LEVEL * f64::EPSILON * scale)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    /// evaluations of the full right-hand side
    pub function_evaluations: usize,
    /// shortest accepted step, not counting the final step that lands on the right end
    /// (unless it is the only one)
    pub smallest_step: f64,
}

impl Default for IntegrationStats {
    fn default() -> Self {
        IntegrationStats {
            accepted_steps: 0,
            rejected_steps: 0,
            function_evaluations: 0,
            smallest_step: f64::INFINITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdaptiveSolver {
    pub equations: EquationSystem,
    pub tableau: EmbeddedTableau,
    pub epsilon: f64,
}

impl AdaptiveSolver {
    pub fn new(equations: EquationSystem, tableau: EmbeddedTableau, epsilon: f64) -> Self {
        AdaptiveSolver {
            equations,
            tableau,
            epsilon,
        }
    }

    /// One trial step of length h from (x, y):
    /// k_0 = h f(x, y), k_i = h f(x + c_i h, y + Σ_j a_ij k_j),
    /// u = y + Σ b_i k_i, û = y + Σ b̂_i k_i
    pub fn embedded_step(
        &self,
        x: f64,
        y: &DVector<f64>,
        h: f64,
    ) -> Result<EmbeddedStep, SolverError> {
        let t = &self.tableau;
        let mut k: Vec<DVector<f64>> = Vec::with_capacity(t.stages);
        for i in 0..t.stages {
            let mut y_stage = y.clone();
            for (j, k_j) in k.iter().enumerate() {
                let a_ij = t.a[(i, j)];
                if a_ij != 0.0 {
                    y_stage.axpy(a_ij, k_j, 1.0);
                }
            }
            let dydx = self.equations.evaluate(x + t.c[i] * h, &y_stage)?;
            k.push(dydx * h);
        }
        let mut u = y.clone();
        let mut u_hat = y.clone();
        for (i, k_i) in k.iter().enumerate() {
            u.axpy(t.b[i], k_i, 1.0);
            u_hat.axpy(t.b_hat[i], k_i, 1.0);
        }
        // overflow in the combination itself is not seen by evaluate()
        if let Some(component) = u
            .iter()
            .chain(u_hat.iter())
            .position(|v| !v.is_finite())
        {
            return Err(SolverError::NumericDivergence {
                x,
                component: component % y.len(),
            });
        }
        Ok(EmbeddedStep { u, u_hat })
    }

    /// state at `b` starting from `initial` at `a`
    pub fn solve(&self, a: f64, b: f64, initial: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        self.solve_with_stats(a, b, initial).map(|(y, _)| y)
    }

    pub fn solve_with_stats(
        &self,
        a: f64,
        b: f64,
        initial: &DVector<f64>,
    ) -> Result<(DVector<f64>, IntegrationStats), SolverError> {
        if !(a.is_finite() && b.is_finite()) || b < a {
            return Err(SolverError::InvalidInterval { a, b });
        }
        if initial.len() != self.equations.len() {
            return Err(SolverError::dimension(
                "adaptive solver (initial state)",
                self.equations.len(),
                initial.len(),
            ));
        }
        let mut stats = IntegrationStats::default();
        let mut x = a;
        let mut y = initial.clone();
        let mut h = b - a;
        let min_step = MIN_STEP_ULPS * f64::EPSILON * a.abs().max(b.abs()).max(1.0);
        let mut landing_step = h;
        while x < b && (b - x).abs() > f64::EPSILON {
            h = h.min(b - x);
            let mut step = self.embedded_step(x, &y, h)?;
            stats.function_evaluations += self.tableau.stages;
            while step.residual() > step.tolerance(&y, self.epsilon) {
                h /= 2.0;
                stats.rejected_steps += 1;
                if h < min_step {
                    warn!(
                        "step size underflow at x = {}: h = {:e}, |y| = {:e}",
                        x,
                        h,
                        y.norm()
                    );
                    return Err(SolverError::StepSizeUnderflow { x, h });
                }
                step = self.embedded_step(x, &y, h)?;
                stats.function_evaluations += self.tableau.stages;
            }
            x += h;
            y = step.u;
            stats.accepted_steps += 1;
            // the last step only covers what is left of the interval
            if x < b && (b - x).abs() > f64::EPSILON {
                stats.smallest_step = stats.smallest_step.min(h);
            } else {
                landing_step = h;
            }
        }
        if stats.accepted_steps == 1 {
            stats.smallest_step = landing_step;
        }
        debug!(
            "{} on [{}, {}]: {} steps accepted, {} halvings, smallest step {:e}",
            self.tableau.name, a, b, stats.accepted_steps, stats.rejected_steps, stats.smallest_step
        );
        Ok((y, stats))
    }

    /// States at every point of a non-decreasing grid, one column per point. The first
    /// column is `initial` itself.
    pub fn solve_on_grid(
        &self,
        grid: &[f64],
        initial: &DVector<f64>,
    ) -> Result<DMatrix<f64>, SolverError> {
        let n = self.equations.len();
        if initial.len() != n {
            return Err(SolverError::dimension(
                "adaptive solver (initial state)",
                n,
                initial.len(),
            ));
        }
        let mut states = DMatrix::zeros(n, grid.len());
        let mut y = initial.clone();
        let mut total = IntegrationStats::default();
        for (col, &x) in grid.iter().enumerate() {
            if col > 0 {
                let (next, stats) = self.solve_with_stats(grid[col - 1], x, &y)?;
                y = next;
                total.accepted_steps += stats.accepted_steps;
                total.rejected_steps += stats.rejected_steps;
                total.function_evaluations += stats.function_evaluations;
                total.smallest_step = total.smallest_step.min(stats.smallest_step);
            }
            states.set_column(col, &y);
        }
        info!(
            "integrated over {} grid points: {} steps, {} function evaluations",
            grid.len(),
            total.accepted_steps,
            total.function_evaluations
        );
        Ok(states)
    }
}

/// Integrates `equations` from `a` to `b` with the given tableau and tolerance.
pub fn integrate(
    equations: &EquationSystem,
    tableau: &EmbeddedTableau,
    epsilon: f64,
    a: f64,
    b: f64,
    initial: &DVector<f64>,
) -> Result<DVector<f64>, SolverError> {
    AdaptiveSolver::new(equations.clone(), tableau.clone(), epsilon).solve(a, b, initial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::ButcherTableau::TableauKind;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;
    use std::sync::Arc;

    fn exponential(lambda: f64) -> EquationSystem {
        EquationSystem::new(vec![Arc::new(move |_x: f64, y: &DVector<f64>| lambda * y[0])])
    }

    fn oscillator() -> EquationSystem {
        EquationSystem::new(vec![
            Arc::new(|_x: f64, y: &DVector<f64>| y[1]),
            Arc::new(|_x: f64, y: &DVector<f64>| -y[0]),
        ])
    }

    #[test]
    fn test_exponential_growth_and_decay() {
        let y0 = DVector::from_vec(vec![1.0]);
        for kind in TableauKind::ALL {
            let tolerances: &[f64] = if kind == TableauKind::Heun {
                &[1e-4, 1e-6]
            } else {
                &[1e-6, 1e-8, 1e-10]
            };
            for &lambda in &[1e-3, 1e-1, 0.5, -1.3, -3.0, 10.0, -50.0] {
                for &length in &[1e-3, 0.3, 1.0, 2.0] {
                    // low order pairs need millions of steps for e^20 to an absolute tolerance
                    let low_order = matches!(kind, TableauKind::Heun | TableauKind::BogackiShampine);
                    if low_order && lambda * length > 10.0 {
                        continue;
                    }
                    for &eps in tolerances {
                        let y = integrate(
                            &exponential(lambda),
                            &EmbeddedTableau::new(kind),
                            eps,
                            0.0,
                            length,
                            &y0,
                        )
                        .unwrap();
                        let exact = (lambda * length).exp();
                        assert!(
                            (y[0] - exact).abs() <= 2.0 * eps * exact.max(1.0),
                            "{} lambda = {} length = {} eps = {}: {} vs {}",
                            kind.name(),
                            lambda,
                            length,
                            eps,
                            y[0],
                            exact
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_fast_growth_stops_at_rounding_level() {
        // |y| reaches e^20, where |u - û| cannot get below 1e-8 by halving
        let solver = AdaptiveSolver::new(exponential(10.0), EmbeddedTableau::rkf78(), 1e-8);
        let y0 = DVector::from_vec(vec![1.0]);
        let (y, stats) = solver.solve_with_stats(0.0, 2.0, &y0).unwrap();
        let exact = 20.0_f64.exp();
        assert!(((y[0] - exact) / exact).abs() < 1e-8);
        assert!(stats.accepted_steps < 1000, "{} steps", stats.accepted_steps);
        assert!(stats.smallest_step > 1e-3);
    }

    #[test]
    fn test_step_size_underflow_at_a_jump() {
        let jump = EquationSystem::from_fns(vec![Box::new(|x: f64, _y: &DVector<f64>| {
            if x < 0.5 { 0.0 } else { 1e20 }
        })]);
        let y0 = DVector::from_vec(vec![0.0]);
        for kind in TableauKind::ALL {
            let solver = AdaptiveSolver::new(jump.clone(), EmbeddedTableau::new(kind), 1e-8);
            match solver.solve(0.0, 1.0, &y0) {
                Err(SolverError::StepSizeUnderflow { x, h }) => {
                    assert!(x < 0.5 && x > 0.5 - 1e-12, "{}: x = {}", kind.name(), x);
                    assert!(h < 1e-14);
                }
                other => panic!("{}: expected step size underflow, got {:?}", kind.name(), other),
            }
        }
    }

    #[test]
    fn test_smaller_tolerance_smaller_error() {
        let y0 = DVector::from_vec(vec![1.0]);
        let exact = 3.0_f64.exp();
        let error = |eps: f64| {
            let solver = AdaptiveSolver::new(exponential(1.5), EmbeddedTableau::rkf78(), eps);
            (solver.solve(0.0, 2.0, &y0).unwrap()[0] - exact).abs()
        };
        assert!(error(1e-10) < error(1e-4));
    }

    #[test]
    fn test_harmonic_oscillator_full_period() {
        let y0 = DVector::from_vec(vec![0.0, 1.0]);
        for kind in TableauKind::ALL {
            let (eps, bound) = if kind == TableauKind::Heun {
                (1e-6, 1e-5)
            } else {
                (1e-8, 1e-6)
            };
            let solver = AdaptiveSolver::new(oscillator(), EmbeddedTableau::new(kind), eps);
            let (y, stats) = solver.solve_with_stats(0.0, 2.0 * PI, &y0).unwrap();
            assert_abs_diff_eq!(y[0], 0.0, epsilon = bound);
            assert_abs_diff_eq!(y[1], 1.0, epsilon = bound);
            assert!(stats.accepted_steps > 1);
            assert!(stats.rejected_steps > 0);
            // the final step is shortened to whatever rounding left of the period
            assert!(stats.smallest_step > 1e-4, "{}: {:e}", kind.name(), stats.smallest_step);
            assert_eq!(
                stats.function_evaluations,
                (stats.accepted_steps + stats.rejected_steps) * solver.tableau.stages
            );
        }
    }

    #[test]
    fn test_empty_interval_returns_initial_state() {
        let solver = AdaptiveSolver::new(oscillator(), EmbeddedTableau::default(), 1e-8);
        let y0 = DVector::from_vec(vec![0.3, -0.7]);
        let (y, stats) = solver.solve_with_stats(1.5, 1.5, &y0).unwrap();
        assert_eq!(y, y0);
        assert_eq!(stats.accepted_steps, 0);
    }

    #[test]
    fn test_backward_interval_rejected() {
        let solver = AdaptiveSolver::new(oscillator(), EmbeddedTableau::default(), 1e-8);
        let y0 = DVector::from_vec(vec![0.0, 1.0]);
        assert_eq!(
            solver.solve(1.0, 0.0, &y0),
            Err(SolverError::InvalidInterval { a: 1.0, b: 0.0 })
        );
    }

    #[test]
    fn test_initial_state_of_wrong_size() {
        let solver = AdaptiveSolver::new(oscillator(), EmbeddedTableau::default(), 1e-8);
        let y0 = DVector::from_vec(vec![0.0]);
        assert!(matches!(
            solver.solve(0.0, 1.0, &y0),
            Err(SolverError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_singular_point_at_left_end() {
        // y' = y / x is undefined at x = 0
        let equations =
            EquationSystem::from_fns(vec![Box::new(|x: f64, y: &DVector<f64>| y[0] / x)]);
        let solver = AdaptiveSolver::new(equations, EmbeddedTableau::default(), 1e-8);
        let y0 = DVector::from_vec(vec![1.0]);
        assert!(matches!(
            solver.solve(0.0, 1.0, &y0),
            Err(SolverError::NumericDivergence { component: 0, .. })
        ));
    }

    #[test]
    fn test_embedded_step_of_linear_problem() {
        // for y' = 1 every consistent pair is exact
        let equations = EquationSystem::from_fns(vec![Box::new(|_x: f64, _y: &DVector<f64>| 1.0)]);
        let solver = AdaptiveSolver::new(equations, EmbeddedTableau::cash_karp(), 1e-8);
        let step = solver
            .embedded_step(0.0, &DVector::from_vec(vec![2.0]), 0.5)
            .unwrap();
        assert_abs_diff_eq!(step.u[0], 2.5, epsilon = 1e-14);
        assert_abs_diff_eq!(step.u_hat[0], 2.5, epsilon = 1e-14);
        assert!(step.residual() < 1e-14);
    }

    #[test]
    fn test_solve_on_grid() {
        let solver = AdaptiveSolver::new(oscillator(), EmbeddedTableau::default(), 1e-10);
        let grid: Vec<f64> = (0..=10).map(|i| i as f64 * 0.1).collect();
        let y0 = DVector::from_vec(vec![0.0, 1.0]);
        let states = solver.solve_on_grid(&grid, &y0).unwrap();
        assert_eq!(states.shape(), (2, 11));
        for (col, &x) in grid.iter().enumerate() {
            assert_abs_diff_eq!(states[(0, col)], x.sin(), epsilon = 1e-8);
            assert_abs_diff_eq!(states[(1, col)], x.cos(), epsilon = 1e-8);
        }
        // a grid running backwards is an invalid interval
        assert!(solver.solve_on_grid(&[0.0, 0.5, 0.2], &y0).is_err());
    }
}
