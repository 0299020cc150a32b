#![allow(non_snake_case)]
use std::sync::Arc;

use crate::numerical::ButcherTableau::{EmbeddedTableau, TableauKind};
use crate::numerical::EmbeddedRK::AdaptiveSolver;
use crate::numerical::ShootingBVP::Eigen_search::SearchConfig;
use crate::numerical::ShootingBVP::Plate_equations::{PlateEdge, PlateParameters};
use crate::numerical::ShootingBVP::Shooting_linear::{
    BoundaryConditions, InhomogeneousTerms, LinearBVP, solve_bvp,
};
use crate::numerical::ShootingBVP::plate_task::{DEFAULT_TASK, PlateReport, PlateTask};
use crate::numerical::equation_system::{Equation, EquationSystem, Forcing};
use crate::numerical::solver_error::SolverError;

use log::error;
use nalgebra::DVector;

/// y0' = y1, y1' = -y0
fn oscillator() -> EquationSystem {
    EquationSystem::new(vec![
        Arc::new(|_x: f64, y: &DVector<f64>| y[1]),
        Arc::new(|_x: f64, y: &DVector<f64>| -y[0]),
    ])
}

pub fn bvp_examples(example: usize) {
    let result = match example {
        0 => integrator_example(),
        1 => sine_bvp_example(),
        2 => inhomogeneous_bvp_example(),
        3 => fourth_order_bvp_example(),
        4 => plate_search_example(),
        5 => plate_task_example(),
        _ => {
            println!("no example with number {}", example);
            Ok(())
        }
    };
    if let Err(e) = result {
        error!("example {} failed: {}", example, e);
    }
}

// IVP y'' = -y over one full period with every bundled pair
fn integrator_example() -> Result<(), SolverError> {
    let y0 = DVector::from_vec(vec![1.0, 0.0]);
    let period = 2.0 * std::f64::consts::PI;
    for kind in TableauKind::ALL {
        let solver = AdaptiveSolver::new(oscillator(), EmbeddedTableau::new(kind), 1e-8);
        let (y_end, stats) = solver.solve_with_stats(0.0, period, &y0)?;
        println!(
            "{:>18}: y(2π) = [{:.3e}, {:.3e}], error {:.3e}, {} steps, {} halvings, {} evaluations",
            kind.name(),
            y_end[0],
            y_end[1],
            (&y_end - &y0).norm(),
            stats.accepted_steps,
            stats.rejected_steps,
            stats.function_evaluations
        );
    }
    Ok(())
}

// y'' = -y, y(0) = 0, y(1) = 1
fn sine_bvp_example() -> Result<(), SolverError> {
    let left = BoundaryConditions::new(2).with(0, 0.0)?;
    let right = BoundaryConditions::new(2).with(0, 1.0)?;
    let bvp = LinearBVP::new(
        oscillator(),
        left,
        right,
        InhomogeneousTerms::new(2),
        0.0,
        1e-10,
    );
    let solution = bvp.solve_full()?;
    let exact = 1.0_f64.cos() / 1.0_f64.sin();
    println!("y(1) = {:?}", solution.result.as_slice());
    println!("y'(1) = {}, exact {}", solution.result[1], exact);
    println!("y'(0) = {}, exact {}", solution.initial_state[1], 1.0 / 1.0_f64.sin());
    Ok(())
}

// y'' = -y + x, y(0) = 0, y(1) = 1
fn inhomogeneous_bvp_example() -> Result<(), SolverError> {
    let left = BoundaryConditions::new(2).with(0, 0.0)?;
    let right = BoundaryConditions::new(2).with(0, 1.0)?;
    let load: Forcing = Arc::new(|x: f64| x);
    let forcing = InhomogeneousTerms::new(2).with(1, load)?;
    let y1 = solve_bvp(&oscillator(), &left, &right, &forcing, 0.0, 1e-10)?;
    let exact = 1.0 - 1.0_f64.cos() / 1.0_f64.sin();
    println!("y'(1) = {}, exact {}", y1[1], exact);
    Ok(())
}

// y'''' = 0 as a chain of first derivatives, y(0) = y'(0) = 0, y(1) = 1, y'(1) = 3
fn fourth_order_bvp_example() -> Result<(), SolverError> {
    let chain = |i: usize| -> Equation { Arc::new(move |_x: f64, y: &DVector<f64>| y[i + 1]) };
    let equations = EquationSystem::new(vec![
        chain(0),
        chain(1),
        chain(2),
        Arc::new(|_x: f64, _y: &DVector<f64>| 0.0),
    ]);
    let left = BoundaryConditions::from_pairs(4, &[(0, 0.0), (1, 0.0)])?;
    let right = BoundaryConditions::from_pairs(4, &[(0, 1.0), (1, 3.0)])?;
    for kind in TableauKind::ALL {
        let bvp = LinearBVP::new(
            equations.clone(),
            left.clone(),
            right.clone(),
            InhomogeneousTerms::new(4),
            0.0,
            1e-9,
        )
        .with_tableau(EmbeddedTableau::new(kind));
        let solution = bvp.solve_full()?;
        println!(
            "{:>18}: y(1) = {:?}, coefficients {:?}",
            kind.name(),
            solution.result.as_slice(),
            solution.coefficients.as_slice()
        );
    }
    Ok(())
}

// first three frequencies of a clamped-free annular plate
fn plate_search_example() -> Result<(), SolverError> {
    let problem = PlateParameters::default().eigen_problem(PlateEdge::Clamped, PlateEdge::Free, 1e-8)?;
    let config = SearchConfig::default();
    for (lo, hi) in problem.scan_sign_changes(&config)? {
        let kappa = problem.refine_secant(lo, hi, &config)?;
        let mode = problem.eigenmode(kappa, 11, 0)?;
        println!(
            "κ in [{:.3}, {:.3}] -> {:.8}, deflection {:?}",
            lo,
            hi,
            kappa,
            mode.component(0)
        );
    }
    Ok(())
}

fn plate_task_example() -> Result<(), SolverError> {
    let task: PlateTask = match DEFAULT_TASK.parse() {
        Ok(task) => task,
        Err(e) => {
            println!("invalid task: {}", e);
            return Ok(());
        }
    };
    let report: PlateReport = task.run()?;
    println!("{}", report.table());
    Ok(())
}
