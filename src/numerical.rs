//! numerical engine: embedded Runge-Kutta integration and linear shooting
/// errors shared by all solvers of the crate
pub mod solver_error;
/// Butcher tableaux of embedded pairs: Heun, Bogacki-Shampine, Cash-Karp, Fehlberg,
/// Dormand-Prince and the 13-stage 8(7) pair used by default
pub mod ButcherTableau;
/// right-hand sides of ODE systems as lists of closures
pub mod equation_system;
/// adaptive step-halving integrator
///```rust, ignore
/// let solver = AdaptiveSolver::new(equations, EmbeddedTableau::rkf78(), 1e-8);
/// let (y_end, stats) = solver.solve_with_stats(0.0, 1.0, &y0)?;
/// println!("{} steps, {} halvings", stats.accepted_steps, stats.rejected_steps);
///```
pub mod EmbeddedRK;

pub mod ShootingBVP;
