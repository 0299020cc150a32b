//! Butcher tableaux of explicit embedded Runge-Kutta pairs.
//!
//! Every table is written in the compact row layout:
//! * stage rows `[c_i, a_i0, a_i1, ..., a_i(i-1)]` for stages 1..s-1 (stage 0 has c_0 = 0
//!   and no coefficients, so it is not written),
//! * one row `[0, b_0, ..., b_(s-1)]` with the weights of the propagated solution,
//! * one row `[0, b̂_0, ..., b̂_(s-1)]` with the weights of the companion solution that is
//!   used only for the local error estimate.
//!
//! For all the bundled pairs the propagated row is the one of higher order.
use crate::numerical::solver_error::SolverError;
use nalgebra::{DMatrix, DVector};

/// Heun 2(1)
pub const HEUN: &[&[f64]] = &[&[1.0, 1.0], &[0.0, 0.5, 0.5], &[0.0, 1.0, 0.0]];

/// Bogacki-Shampine 3(2)
pub const BOGACKI_SHAMPINE: &[&[f64]] = &[
    &[0.5, 0.5],
    &[0.75, 0.0, 0.75],
    &[1.0, 2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0],
    &[0.0, 2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0, 0.0],
    &[0.0, 7.0 / 24.0, 0.25, 1.0 / 3.0, 0.125],
];

/// Cash-Karp 5(4)
pub const CASH_KARP: &[&[f64]] = &[
    &[0.2, 0.2],
    &[0.3, 3.0 / 40.0, 9.0 / 40.0],
    &[0.6, 0.3, -0.9, 1.2],
    &[1.0, -11.0 / 54.0, 2.5, -70.0 / 27.0, 35.0 / 27.0],
    &[
        0.875,
        1631.0 / 55296.0,
        175.0 / 512.0,
        575.0 / 13824.0,
        44275.0 / 110592.0,
        253.0 / 4096.0,
    ],
    &[
        0.0,
        37.0 / 378.0,
        0.0,
        250.0 / 621.0,
        125.0 / 594.0,
        0.0,
        512.0 / 1771.0,
    ],
    &[
        0.0,
        2825.0 / 27648.0,
        0.0,
        18575.0 / 48384.0,
        13525.0 / 55296.0,
        277.0 / 14336.0,
        0.25,
    ],
];

/// Runge-Kutta-Fehlberg 4(5), the 5th order row is propagated
pub const RUNGE_KUTTA_FEHLBERG: &[&[f64]] = &[
    &[0.25, 0.25],
    &[0.375, 0.09375, 0.28125],
    &[12.0 / 13.0, 1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0],
    &[1.0, 439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0],
    &[
        0.5,
        -8.0 / 27.0,
        2.0,
        -3544.0 / 2565.0,
        1859.0 / 4104.0,
        -11.0 / 40.0,
    ],
    &[
        0.0,
        16.0 / 135.0,
        0.0,
        6656.0 / 12825.0,
        28561.0 / 56430.0,
        -9.0 / 50.0,
        2.0 / 55.0,
    ],
    &[
        0.0,
        25.0 / 216.0,
        0.0,
        1408.0 / 2565.0,
        2197.0 / 4104.0,
        -0.2,
        0.0,
    ],
];

/// Dormand-Prince 5(4)
pub const DORMAND_PRINCE: &[&[f64]] = &[
    &[0.2, 0.2],
    &[0.3, 0.075, 0.225],
    &[0.8, 44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
    &[
        8.0 / 9.0,
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
    ],
    &[
        1.0,
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
    ],
    &[
        1.0,
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
    &[
        0.0,
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
        0.0,
    ],
    &[
        0.0,
        5179.0 / 57600.0,
        0.0,
        7571.0 / 16695.0,
        393.0 / 640.0,
        -92097.0 / 339200.0,
        187.0 / 2100.0,
        0.025,
    ],
];

/// Prince-Dormand 8(7), 13 stages
pub const RKF78: &[&[f64]] = &[
    &[1.0 / 18.0, 1.0 / 18.0],
    &[1.0 / 12.0, 1.0 / 48.0, 1.0 / 16.0],
    &[0.125, 0.03125, 0.0, 0.09375],
    &[0.3125, 0.3125, 0.0, -1.171875, 1.171875],
    &[0.375, 0.0375, 0.0, 0.0, 0.1875, 0.15],
    &[
        0.1475,
        29443841.0 / 614563906.0,
        0.0,
        0.0,
        77736538.0 / 692538347.0,
        -28693883.0 / 1125000000.0,
        23124283.0 / 1800000000.0,
    ],
    &[
        93.0 / 200.0,
        16016141.0 / 946692911.0,
        0.0,
        0.0,
        61564180.0 / 158732637.0,
        22789713.0 / 633445777.0,
        545815736.0 / 2771057229.0,
        -180193667.0 / 1043307555.0,
    ],
    &[
        5490023248.0 / 9719169821.0,
        39632708.0 / 573591083.0,
        0.0,
        0.0,
        -433636366.0 / 683701615.0,
        -421739975.0 / 2616292301.0,
        100302831.0 / 723423059.0,
        790204164.0 / 839813087.0,
        800635310.0 / 3783071287.0,
    ],
    &[
        13.0 / 20.0,
        246121993.0 / 1340847787.0,
        0.0,
        0.0,
        -37695042795.0 / 15268766246.0,
        -309121744.0 / 1061227803.0,
        -12992083.0 / 490766935.0,
        6005943493.0 / 2108947869.0,
        393006217.0 / 1396673457.0,
        123872331.0 / 1001029789.0,
    ],
    &[
        1201146811.0 / 1299019798.0,
        -1028468189.0 / 846180014.0,
        0.0,
        0.0,
        8478235783.0 / 508512852.0,
        1311729495.0 / 1432422823.0,
        -10304129995.0 / 1701304382.0,
        -48777925059.0 / 3047939560.0,
        15336726248.0 / 1032824649.0,
        -45442868181.0 / 3398467696.0,
        3065993473.0 / 597172653.0,
    ],
    &[
        1.0,
        185892177.0 / 718116043.0,
        0.0,
        0.0,
        -3185094517.0 / 667107341.0,
        -477755414.0 / 1098053517.0,
        -703635378.0 / 230739211.0,
        5731566787.0 / 1027545527.0,
        5232866602.0 / 850066563.0,
        -4093664535.0 / 808688257.0,
        3962137247.0 / 1805957418.0,
        65686358.0 / 487910083.0,
    ],
    &[
        1.0,
        403863854.0 / 491063109.0,
        0.0,
        0.0,
        -5068492393.0 / 434740067.0,
        -411421997.0 / 543043805.0,
        652783627.0 / 914296604.0,
        11173962825.0 / 925320556.0,
        -13158990841.0 / 6184727034.0,
        3936647629.0 / 1978049680.0,
        -160528059.0 / 685178525.0,
        248638103.0 / 1413531060.0,
        0.0,
    ],
    &[
        0.0,
        14005451.0 / 335480064.0,
        0.0,
        0.0,
        0.0,
        0.0,
        -59238493.0 / 1068277825.0,
        181606767.0 / 758867731.0,
        561292985.0 / 797845732.0,
        -1041891430.0 / 1371343529.0,
        760417239.0 / 1151165299.0,
        118820643.0 / 751138087.0,
        -528747749.0 / 2220607170.0,
        0.25,
    ],
    &[
        0.0,
        13451932.0 / 455176623.0,
        0.0,
        0.0,
        0.0,
        0.0,
        -808719846.0 / 976000145.0,
        1757004468.0 / 5645159321.0,
        656045339.0 / 265891186.0,
        -3867574721.0 / 1518517206.0,
        465885868.0 / 322736535.0,
        53011238.0 / 667516719.0,
        2.0 / 45.0,
        0.0,
    ],
];

/// names of the bundled pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableauKind {
    Heun,
    BogackiShampine,
    CashKarp,
    RungeKuttaFehlberg,
    DormandPrince,
    Rkf78,
}

impl TableauKind {
    pub const ALL: [TableauKind; 6] = [
        TableauKind::Heun,
        TableauKind::BogackiShampine,
        TableauKind::CashKarp,
        TableauKind::RungeKuttaFehlberg,
        TableauKind::DormandPrince,
        TableauKind::Rkf78,
    ];

    /// accepts the names used in task files, case insensitive
    pub fn from_name(name: &str) -> Option<TableauKind> {
        match name.to_lowercase().as_str() {
            "heun" => Some(TableauKind::Heun),
            "bogacki_shampine" | "bs23" => Some(TableauKind::BogackiShampine),
            "cash_karp" | "ck45" => Some(TableauKind::CashKarp),
            "rkf45" | "runge_kutta_fehlberg" => Some(TableauKind::RungeKuttaFehlberg),
            "dopri" | "dormand_prince" => Some(TableauKind::DormandPrince),
            "rkf78" => Some(TableauKind::Rkf78),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TableauKind::Heun => "heun",
            TableauKind::BogackiShampine => "bogacki_shampine",
            TableauKind::CashKarp => "cash_karp",
            TableauKind::RungeKuttaFehlberg => "rkf45",
            TableauKind::DormandPrince => "dormand_prince",
            TableauKind::Rkf78 => "rkf78",
        }
    }

    fn rows(&self) -> &'static [&'static [f64]] {
        match self {
            TableauKind::Heun => HEUN,
            TableauKind::BogackiShampine => BOGACKI_SHAMPINE,
            TableauKind::CashKarp => CASH_KARP,
            TableauKind::RungeKuttaFehlberg => RUNGE_KUTTA_FEHLBERG,
            TableauKind::DormandPrince => DORMAND_PRINCE,
            TableauKind::Rkf78 => RKF78,
        }
    }
}

/// Coefficients of an explicit embedded Runge-Kutta pair
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedTableau {
    pub name: String,
    pub c: DVector<f64>,     // nodes
    pub a: DMatrix<f64>,     // strictly lower triangular stage matrix
    pub b: DVector<f64>,     // weights of the propagated solution u
    pub b_hat: DVector<f64>, // weights of the companion solution û (error estimate only)
    pub stages: usize,
}

impl EmbeddedTableau {
    pub fn new(kind: TableauKind) -> Self {
        // the bundled rows are checked in the tests below
        Self::from_compact(kind.name(), kind.rows())
            .unwrap_or_else(|e| unreachable!("bundled tableau {} is malformed: {}", kind.name(), e))
    }

    pub fn heun() -> Self {
        Self::new(TableauKind::Heun)
    }
    pub fn bogacki_shampine() -> Self {
        Self::new(TableauKind::BogackiShampine)
    }
    pub fn cash_karp() -> Self {
        Self::new(TableauKind::CashKarp)
    }
    pub fn runge_kutta_fehlberg() -> Self {
        Self::new(TableauKind::RungeKuttaFehlberg)
    }
    pub fn dormand_prince() -> Self {
        Self::new(TableauKind::DormandPrince)
    }
    pub fn rkf78() -> Self {
        Self::new(TableauKind::Rkf78)
    }

    /// Builds a tableau from the compact row layout described in the module docs.
    pub fn from_compact(name: &str, rows: &[&[f64]]) -> Result<Self, SolverError> {
        if rows.len() < 2 {
            return Err(SolverError::dimension(
                "tableau rows (at least two weight rows)",
                2,
                rows.len(),
            ));
        }
        let stages = rows.len() - 1;
        let mut c = DVector::zeros(stages);
        let mut a = DMatrix::zeros(stages, stages);
        for (i, row) in rows[..stages - 1].iter().enumerate() {
            // row i describes stage i + 1 and holds c plus i + 1 coefficients
            if row.len() != i + 2 {
                return Err(SolverError::dimension(
                    &format!("tableau {} stage row {}", name, i + 1),
                    i + 2,
                    row.len(),
                ));
            }
            c[i + 1] = row[0];
            for (j, &coef) in row[1..].iter().enumerate() {
                a[(i + 1, j)] = coef;
            }
        }
        let weights = |row: &[f64], which: &str| -> Result<DVector<f64>, SolverError> {
            if row.len() != stages + 1 {
                return Err(SolverError::dimension(
                    &format!("tableau {} {} weights", name, which),
                    stages + 1,
                    row.len(),
                ));
            }
            Ok(DVector::from_column_slice(&row[1..]))
        };
        let b = weights(rows[stages - 1], "propagated")?;
        let b_hat = weights(rows[stages], "companion")?;
        Ok(EmbeddedTableau {
            name: name.to_string(),
            c,
            a,
            b,
            b_hat,
            stages,
        })
    }
}

impl Default for EmbeddedTableau {
    fn default() -> Self {
        Self::rkf78()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bundled_tableaux_are_consistent() {
        for kind in TableauKind::ALL {
            let t = EmbeddedTableau::new(kind);
            assert_abs_diff_eq!(t.b.sum(), 1.0, epsilon = 1e-10);
            assert_abs_diff_eq!(t.b_hat.sum(), 1.0, epsilon = 1e-10);
            assert_eq!(t.c[0], 0.0);
            for i in 0..t.stages {
                let row_sum: f64 = t.a.row(i).sum();
                assert_abs_diff_eq!(t.c[i], row_sum, epsilon = 1e-8);
                for j in i..t.stages {
                    assert_eq!(t.a[(i, j)], 0.0, "{} is not explicit", t.name);
                }
            }
        }
    }

    #[test]
    fn test_stage_counts() {
        assert_eq!(EmbeddedTableau::heun().stages, 2);
        assert_eq!(EmbeddedTableau::bogacki_shampine().stages, 4);
        assert_eq!(EmbeddedTableau::cash_karp().stages, 6);
        assert_eq!(EmbeddedTableau::runge_kutta_fehlberg().stages, 6);
        assert_eq!(EmbeddedTableau::dormand_prince().stages, 7);
        assert_eq!(EmbeddedTableau::rkf78().stages, 13);
        assert_eq!(EmbeddedTableau::default(), EmbeddedTableau::rkf78());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(TableauKind::from_name("RKF78"), Some(TableauKind::Rkf78));
        assert_eq!(TableauKind::from_name("dopri"), Some(TableauKind::DormandPrince));
        assert_eq!(TableauKind::from_name("euler"), None);
        for kind in TableauKind::ALL {
            assert_eq!(TableauKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_malformed_rows_rejected() {
        let bad_stage: &[&[f64]] = &[&[1.0, 1.0, 0.0], &[0.0, 0.5, 0.5], &[0.0, 1.0, 0.0]];
        assert!(EmbeddedTableau::from_compact("bad", bad_stage).is_err());
        let bad_weights: &[&[f64]] = &[&[1.0, 1.0], &[0.0, 0.5, 0.5], &[0.0, 1.0]];
        assert!(EmbeddedTableau::from_compact("bad", bad_weights).is_err());
        let too_short: &[&[f64]] = &[&[0.0, 1.0]];
        assert!(EmbeddedTableau::from_compact("bad", too_short).is_err());
    }
}
