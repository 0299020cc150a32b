//! Axisymmetric vibration of an annular elastic plate, written as a first-order system in
//! the dimensionless radius x ∈ [inner_radius, 1]:
//!
//! * y0 - deflection
//! * y1 - slope (y0' = -y1)
//! * y2 - bending moment
//! * y3 - shear force: radial equilibrium of the ring element plus the inertia of the
//!   plate, y3' = -y3/x - κ⁴ y0
//!
//! n is the circumferential harmonic, ν the Poisson ratio. With κ = 0 the system is the
//! static unloaded one. The shear equation keeps only the axisymmetric equilibrium term,
//! the twisting-moment coupling of n > 0 is not modelled. The coefficients contain 1/x,
//! so the inner radius must stay positive.
use crate::numerical::ShootingBVP::Eigen_search::{EigenProblem, SystemFactory};
use crate::numerical::ShootingBVP::Shooting_linear::BoundaryConditions;
use crate::numerical::equation_system::EquationSystem;
use crate::numerical::solver_error::SolverError;
use nalgebra::DVector;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const PLATE_COMPONENTS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct PlateParameters {
    pub poisson_ratio: f64,
    pub harmonic: u32,
    pub inner_radius: f64,
}

impl Default for PlateParameters {
    fn default() -> Self {
        PlateParameters {
            poisson_ratio: 0.3,
            harmonic: 0,
            inner_radius: 0.1,
        }
    }
}

/// Equations of the plate for frequency parameter `kappa`. Every call builds a new
/// independent system; nothing is shared between different κ.
pub fn plate_equations(params: &PlateParameters, kappa: f64) -> EquationSystem {
    let nu = params.poisson_ratio;
    let n2 = (params.harmonic as f64).powi(2);
    let inertia = kappa.powi(4);
    EquationSystem::new(vec![
        Arc::new(|_x: f64, y: &DVector<f64>| -y[1]),
        Arc::new(move |x: f64, y: &DVector<f64>| -nu * (n2 / x / x * y[0] + y[1] / x) + y[2]),
        Arc::new(move |x: f64, y: &DVector<f64>| {
            -1.0 / x
                * ((2.0 - nu * nu) * n2 / x / x * y[0]
                    + (1.0 - nu * nu + n2) / x * y[1]
                    + (1.0 - nu) * y[2])
                + y[3]
        }),
        Arc::new(move |x: f64, y: &DVector<f64>| -y[3] / x - inertia * y[0]),
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateEdge {
    Clamped,
    SimplySupported,
    Free,
}

impl PlateEdge {
    /// components that vanish on this kind of edge
    pub fn components(&self) -> [usize; 2] {
        match self {
            PlateEdge::Clamped => [0, 1],
            PlateEdge::SimplySupported => [0, 2],
            PlateEdge::Free => [2, 3],
        }
    }

    pub fn boundary_conditions(&self) -> Result<BoundaryConditions, SolverError> {
        let pairs = self.components().map(|i| (i, 0.0));
        BoundaryConditions::from_pairs(PLATE_COMPONENTS, &pairs)
    }
}

impl FromStr for PlateEdge {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clamped" => Ok(PlateEdge::Clamped),
            "simply_supported" | "simply-supported" | "supported" => Ok(PlateEdge::SimplySupported),
            "free" => Ok(PlateEdge::Free),
            other => Err(format!("unknown plate edge '{}'", other)),
        }
    }
}

impl fmt::Display for PlateEdge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PlateEdge::Clamped => "clamped",
            PlateEdge::SimplySupported => "simply_supported",
            PlateEdge::Free => "free",
        };
        write!(f, "{}", name)
    }
}

impl PlateParameters {
    /// frequency problem of the annular plate with the given edge types
    pub fn eigen_problem(
        &self,
        inner_edge: PlateEdge,
        outer_edge: PlateEdge,
        epsilon: f64,
    ) -> Result<EigenProblem, SolverError> {
        if !(self.inner_radius > 0.0 && self.inner_radius < 1.0) {
            return Err(SolverError::InvalidInterval {
                a: self.inner_radius,
                b: 1.0,
            });
        }
        let params = self.clone();
        let factory: SystemFactory = Arc::new(move |kappa: f64| plate_equations(&params, kappa));
        Ok(EigenProblem::new(
            factory,
            inner_edge.boundary_conditions()?,
            outer_edge.boundary_conditions()?,
            self.inner_radius,
            epsilon,
        ))
    }
}
