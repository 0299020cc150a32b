use RustedPlateModes::numerical::ButcherTableau::{EmbeddedTableau, TableauKind};
use RustedPlateModes::numerical::EmbeddedRK::AdaptiveSolver;
use RustedPlateModes::numerical::ShootingBVP::Plate_equations::{PlateEdge, PlateParameters};
use RustedPlateModes::numerical::ShootingBVP::Shooting_linear::{
    BoundaryConditions, InhomogeneousTerms, solve_bvp,
};
use RustedPlateModes::numerical::equation_system::EquationSystem;
use criterion::{Criterion, criterion_group, criterion_main};
use nalgebra::DVector;
use std::hint::black_box;
use std::sync::Arc;

fn oscillator() -> EquationSystem {
    EquationSystem::new(vec![
        Arc::new(|_x: f64, y: &DVector<f64>| y[1]),
        Arc::new(|_x: f64, y: &DVector<f64>| -y[0]),
    ])
}

fn bench_integrator(c: &mut Criterion) {
    let mut group = c.benchmark_group("oscillator over one period");
    let y0 = DVector::from_vec(vec![1.0, 0.0]);
    for kind in TableauKind::ALL {
        let solver = AdaptiveSolver::new(oscillator(), EmbeddedTableau::new(kind), 1e-8);
        group.bench_function(kind.name(), |b| {
            b.iter(|| solver.solve(0.0, black_box(2.0 * std::f64::consts::PI), &y0))
        });
    }
    group.finish();
}

fn bench_linear_bvp(c: &mut Criterion) {
    let equations = oscillator();
    let left = BoundaryConditions::from_pairs(2, &[(0, 0.0)]).unwrap();
    let right = BoundaryConditions::from_pairs(2, &[(0, 1.0)]).unwrap();
    let forcing = InhomogeneousTerms::new(2);
    c.bench_function("linear BVP y'' = -y", |b| {
        b.iter(|| solve_bvp(&equations, &left, &right, &forcing, 0.0, black_box(1e-10)))
    });
}

fn bench_plate_determinant(c: &mut Criterion) {
    let problem = PlateParameters::default()
        .eigen_problem(PlateEdge::Clamped, PlateEdge::Clamped, 1e-8)
        .unwrap();
    c.bench_function("plate frequency determinant", |b| {
        b.iter(|| problem.frequency_determinant(black_box(5.0)))
    });
}

criterion_group!(
    benches,
    bench_integrator,
    bench_linear_bvp,
    bench_plate_determinant
);
criterion_main!(benches);
