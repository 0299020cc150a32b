//! Linear shooting for two-point boundary value problems and the eigenfrequency search
//! built on it.
/// superposition solver for linear BVPs: particular plus homogeneous Cauchy problems
/// ```rust, ignore
/// // y'' = -y, y(0) = 0, y(1) = 1
/// let equations = EquationSystem::new(vec![
///     Arc::new(|_x: f64, y: &DVector<f64>| y[1]),
///     Arc::new(|_x: f64, y: &DVector<f64>| -y[0]),
/// ]);
/// let left = BoundaryConditions::new(2).with(0, 0.0)?;
/// let right = BoundaryConditions::new(2).with(0, 1.0)?;
/// let y1 = solve_bvp(&equations, &left, &right, &InhomogeneousTerms::new(2), 0.0, 1e-10)?;
/// // y1 = [1.0, cos(1)/sin(1)]
/// ```
pub mod Shooting_linear;
/// frequency determinant, sign-change scan, secant refinement and eigenmodes
pub mod Eigen_search;
/// axisymmetric annular plate: equations and edge conditions
pub mod Plate_equations;
/// plate runs configured by task documents
pub mod plate_task;
