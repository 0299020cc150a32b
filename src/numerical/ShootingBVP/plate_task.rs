//! Plate run configured by a task document:
//!
//! ```text
//! plate
//!   poisson_ratio: 0.3
//!   harmonic: 0
//!   inner_radius: 0.1
//!   inner_edge: clamped
//!   outer_edge: free
//! search
//!   kappa_min: 1.0
//!   kappa_max: 14.0
//!   scan_points: 53
//!   tolerance: 1e-8
//!   max_iterations: 50
//!   mode_points: 21
//! solver
//!   epsilon: 1e-8
//!   tableau: rkf78
//!   loglevel: info
//!   log_to_file: false
//! ```
//! Every key is optional, missing keys keep their defaults.
use crate::Utils::task_parser::TaskDocument;
use crate::numerical::ButcherTableau::{EmbeddedTableau, TableauKind};
use crate::numerical::ShootingBVP::Eigen_search::{EigenProblem, Eigenmode, SearchConfig};
use crate::numerical::ShootingBVP::Plate_equations::{PlateEdge, PlateParameters};
use crate::numerical::solver_error::SolverError;
use log::info;
use std::path::Path;
use std::str::FromStr;
use tabled::settings::Style;
use tabled::{Table, Tabled};

pub const DEFAULT_TASK: &str = "plate
  poisson_ratio: 0.3
  harmonic: 0
  inner_radius: 0.1
  inner_edge: clamped
  outer_edge: clamped
search
  kappa_min: 1.0
  kappa_max: 14.0
  scan_points: 53
  tolerance: 1e-8
  max_iterations: 50
  mode_points: 21
solver
  epsilon: 1e-8
  tableau: rkf78
  loglevel: info
";

const KNOWN_KEYS: &[(&str, &[&str])] = &[
    (
        "plate",
        &[
            "poisson_ratio",
            "harmonic",
            "inner_radius",
            "inner_edge",
            "outer_edge",
        ],
    ),
    (
        "search",
        &[
            "kappa_min",
            "kappa_max",
            "scan_points",
            "tolerance",
            "max_iterations",
            "mode_points",
        ],
    ),
    ("solver", &["epsilon", "tableau", "loglevel", "log_to_file"]),
];

#[derive(Debug, Clone, PartialEq)]
pub struct SolverSettings {
    pub epsilon: f64,
    pub tableau: TableauKind,
    pub loglevel: String,
    pub log_to_file: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            epsilon: 1e-8,
            tableau: TableauKind::Rkf78,
            loglevel: "info".to_string(),
            log_to_file: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlateTask {
    pub plate: PlateParameters,
    pub inner_edge: PlateEdge,
    pub outer_edge: PlateEdge,
    pub search: SearchConfig,
    pub mode_points: usize,
    pub solver: SolverSettings,
}

impl Default for PlateTask {
    fn default() -> Self {
        PlateTask {
            plate: PlateParameters::default(),
            inner_edge: PlateEdge::Clamped,
            outer_edge: PlateEdge::Clamped,
            search: SearchConfig::default(),
            mode_points: 21,
            solver: SolverSettings::default(),
        }
    }
}

/// eigenfrequencies found by a plate run and their modes
#[derive(Debug, Clone)]
pub struct PlateReport {
    pub frequencies: Vec<f64>,
    pub modes: Vec<Eigenmode>,
}

#[derive(Tabled)]
struct FrequencyRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "κ")]
    kappa: String,
    #[tabled(rename = "max |w| at x")]
    peak_at: String,
    #[tabled(rename = "nodal circles")]
    nodes: usize,
}

impl PlateReport {
    /// sign changes of the deflection strictly inside the annulus
    pub fn nodal_circles(mode: &Eigenmode) -> usize {
        let deflection = mode.component(0);
        let inner: Vec<f64> = deflection
            .iter()
            .copied()
            .filter(|w| w.abs() > 1e-6)
            .collect();
        inner.windows(2).filter(|w| w[0] * w[1] < 0.0).count()
    }

    pub fn table(&self) -> String {
        let rows: Vec<FrequencyRow> = self
            .modes
            .iter()
            .enumerate()
            .map(|(i, mode)| {
                let deflection = mode.component(0);
                let peak = deflection
                    .iter()
                    .enumerate()
                    .fold((0, 0.0_f64), |(k, m), (j, w)| {
                        if w.abs() > m { (j, w.abs()) } else { (k, m) }
                    })
                    .0;
                FrequencyRow {
                    index: i + 1,
                    kappa: format!("{:.8}", mode.kappa),
                    peak_at: format!("{:.3}", mode.grid.get(peak).copied().unwrap_or(f64::NAN)),
                    nodes: Self::nodal_circles(mode),
                }
            })
            .collect();
        let mut table = Table::new(&rows);
        table.with(Style::modern_rounded());
        table.to_string()
    }
}

fn non_negative(section: &str, key: &str, value: i64) -> Result<usize, String> {
    usize::try_from(value).map_err(|_| format!("{}.{} must not be negative, found {}", section, key, value))
}

impl PlateTask {
    pub fn from_document(doc: &TaskDocument) -> Result<Self, String> {
        doc.check_keys(KNOWN_KEYS)?;
        let mut task = PlateTask::default();

        if let Some(nu) = doc.float("plate", "poisson_ratio")? {
            task.plate.poisson_ratio = nu;
        }
        if let Some(n) = doc.integer("plate", "harmonic")? {
            task.plate.harmonic = u32::try_from(n)
                .map_err(|_| format!("plate.harmonic must be a non-negative integer, found {}", n))?;
        }
        if let Some(r) = doc.float("plate", "inner_radius")? {
            task.plate.inner_radius = r;
        }
        if let Some(edge) = doc.string("plate", "inner_edge") {
            task.inner_edge = edge.parse()?;
        }
        if let Some(edge) = doc.string("plate", "outer_edge") {
            task.outer_edge = edge.parse()?;
        }

        if let Some(v) = doc.float("search", "kappa_min")? {
            task.search.kappa_min = v;
        }
        if let Some(v) = doc.float("search", "kappa_max")? {
            task.search.kappa_max = v;
        }
        if let Some(v) = doc.integer("search", "scan_points")? {
            task.search.scan_points = non_negative("search", "scan_points", v)?;
        }
        if let Some(v) = doc.float("search", "tolerance")? {
            task.search.tolerance = v;
        }
        if let Some(v) = doc.integer("search", "max_iterations")? {
            task.search.max_iterations = non_negative("search", "max_iterations", v)?;
        }
        if let Some(v) = doc.integer("search", "mode_points")? {
            task.mode_points = non_negative("search", "mode_points", v)?;
        }

        if let Some(v) = doc.float("solver", "epsilon")? {
            task.solver.epsilon = v;
        }
        if let Some(name) = doc.string("solver", "tableau") {
            task.solver.tableau = TableauKind::from_name(&name)
                .ok_or_else(|| format!("unknown tableau '{}'", name))?;
        }
        if let Some(level) = doc.string("solver", "loglevel") {
            task.solver.loglevel = level;
        }
        if let Some(flag) = doc.boolean("solver", "log_to_file")? {
            task.solver.log_to_file = flag;
        }
        task.validate()?;
        Ok(task)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        Self::from_document(&TaskDocument::from_file(path)?)
    }

    pub fn validate(&self) -> Result<(), String> {
        let p = &self.plate;
        if !(p.inner_radius > 0.0 && p.inner_radius < 1.0) {
            return Err(format!(
                "plate.inner_radius must lie in (0, 1), found {}",
                p.inner_radius
            ));
        }
        if !(p.poisson_ratio > -1.0 && p.poisson_ratio <= 0.5) {
            return Err(format!(
                "plate.poisson_ratio must lie in (-1, 0.5], found {}",
                p.poisson_ratio
            ));
        }
        let s = &self.search;
        if !(s.kappa_min < s.kappa_max) {
            return Err(format!(
                "search.kappa_min ({}) must be below search.kappa_max ({})",
                s.kappa_min, s.kappa_max
            ));
        }
        if s.scan_points < 2 {
            return Err("search.scan_points must be at least 2".to_string());
        }
        if !(s.tolerance > 0.0) || !(self.solver.epsilon > 0.0) {
            return Err("search.tolerance and solver.epsilon must be positive".to_string());
        }
        Ok(())
    }

    pub fn eigen_problem(&self) -> Result<EigenProblem, SolverError> {
        Ok(self
            .plate
            .eigen_problem(self.inner_edge, self.outer_edge, self.solver.epsilon)?
            .with_tableau(EmbeddedTableau::new(self.solver.tableau)))
    }

    /// scans the frequency range and rebuilds the mode of every eigenfrequency found
    pub fn run(&self) -> Result<PlateReport, SolverError> {
        info!(
            "plate run: ν = {}, n = {}, inner radius {}, edges {} / {}",
            self.plate.poisson_ratio,
            self.plate.harmonic,
            self.plate.inner_radius,
            self.inner_edge,
            self.outer_edge
        );
        let problem = self.eigen_problem()?;
        let frequencies = problem.find_eigenfrequencies(&self.search)?;
        let modes = frequencies
            .iter()
            .map(|&kappa| problem.eigenmode(kappa, self.mode_points, 0))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PlateReport { frequencies, modes })
    }
}

impl FromStr for PlateTask {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_document(&TaskDocument::parse(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_task_text_matches_defaults() {
        let task: PlateTask = DEFAULT_TASK.parse().unwrap();
        assert_eq!(task, PlateTask::default());
    }

    #[test]
    fn test_partial_task() {
        let task: PlateTask = "plate harmonic: 2 outer_edge: free\nsolver tableau: dopri"
            .parse()
            .unwrap();
        assert_eq!(task.plate.harmonic, 2);
        assert_eq!(task.outer_edge, PlateEdge::Free);
        assert_eq!(task.inner_edge, PlateEdge::Clamped);
        assert_eq!(task.solver.tableau, TableauKind::DormandPrince);
        assert_eq!(task.search, SearchConfig::default());
    }

    #[test]
    fn test_invalid_tasks() {
        assert!("plate harmonic: -1".parse::<PlateTask>().is_err());
        assert!("plate inner_radius: 0".parse::<PlateTask>().is_err());
        assert!("plate inner_edge: glued".parse::<PlateTask>().is_err());
        assert!("search kappa_min: 5 kappa_max: 2".parse::<PlateTask>().is_err());
        assert!("solver tableau: euler".parse::<PlateTask>().is_err());
        assert!("solver precision: 1e-3".parse::<PlateTask>().is_err());
    }

    #[test]
    fn test_task_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# simply supported annulus").unwrap();
        writeln!(file, "plate").unwrap();
        writeln!(file, "  inner_edge: simply_supported").unwrap();
        writeln!(file, "  outer_edge: simply_supported").unwrap();
        writeln!(file, "search").unwrap();
        writeln!(file, "  kappa_min: 6").unwrap();
        writeln!(file, "  kappa_max: 7.5").unwrap();
        writeln!(file, "  scan_points: 7").unwrap();
        writeln!(file, "  mode_points: 11").unwrap();
        writeln!(file, "solver").unwrap();
        writeln!(file, "  log_to_file: true").unwrap();
        let task = PlateTask::from_file(file.path()).unwrap();
        assert_eq!(task.inner_edge, PlateEdge::SimplySupported);
        assert_eq!(task.search.kappa_min, 6.0);
        assert!(task.solver.log_to_file);

        let report = task.run().unwrap();
        assert_eq!(report.frequencies.len(), 1);
        assert!(report.frequencies[0] > 6.5 && report.frequencies[0] < 6.75);
        assert_eq!(report.modes[0].grid.len(), 11);
        // the first simply supported mode of this annulus swings through zero once
        assert_eq!(PlateReport::nodal_circles(&report.modes[0]), 1);
        let table = report.table();
        assert!(table.contains("nodal circles"));
        assert!(table.contains(&format!("{:.8}", report.frequencies[0])));
    }
}
