use serde::{Deserialize, Serialize};

use crate::state::MomentStats;

/// How a row's capacity-proportional placement odds are biased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Weighting {
    /// Plain capacity-proportional odds.
    Uniform,
    /// Correction driven by the sum of squared column degrees.
    #[default]
    SecondMoment,
    /// Capacity- and rank-dependent correction from third and fourth order
    /// column moments and the row-side `r (r - 1)` cumulant.
    ExtendedMoment,
}

impl Weighting {
    /// Stable lowercase name used in reports and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Weighting::Uniform => "uniform",
            Weighting::SecondMoment => "second-moment",
            Weighting::ExtendedMoment => "extended-moment",
        }
    }

    /// Derives the per-column coefficients. `stats` must already exclude the
    /// current column and `remaining_columns` counts the columns after it.
    pub fn for_column(
        self,
        stats: &MomentStats,
        rows: usize,
        remaining_columns: usize,
    ) -> ColumnWeights {
        match self {
            Weighting::Uniform => ColumnWeights::Proportional {
                weight: 0.0,
                mean_capacity: stats.count as f64 / rows as f64,
            },
            Weighting::SecondMoment => ColumnWeights::Proportional {
                weight: second_moment_weight(stats, rows, remaining_columns),
                mean_capacity: stats.count as f64 / rows as f64,
            },
            Weighting::ExtendedMoment => ColumnWeights::Extended(ExtendedTerms::new(stats)),
        }
    }
}

/// Coefficients of one column under a [`Weighting`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnWeights {
    /// `val * exp(weight * (1 - 2 (val - mean_capacity)))` against
    /// `n + 1 - val`.
    Proportional {
        /// Scalar correction; zero disables it.
        weight: f64,
        /// Mean remaining capacity per row.
        mean_capacity: f64,
    },
    /// Exponent built from [`ExtendedTerms`].
    Extended(ExtendedTerms),
}

impl ColumnWeights {
    /// Inclusion and exclusion weights `(p, q)` for a row with capacity `val`
    /// before the generating-table correction.
    pub fn odds(&self, val: usize, remaining_columns: usize, rcount2c: i64) -> (f64, f64) {
        match *self {
            ColumnWeights::Proportional {
                weight,
                mean_capacity,
            } => {
                let v = val as f64;
                let p1 = v * (weight * (1.0 - 2.0 * (v - mean_capacity))).exp();
                let p = p1 / (remaining_columns as f64 + 1.0 - v + p1);
                (p, 1.0 - p)
            }
            ColumnWeights::Extended(terms) => {
                let v = val as f64;
                let shared = (rcount2c - val as i64 + 1) as f64;
                let exponent = (2.0 * terms.d2
                    + 3.0 * terms.d3 * (v - 2.0)
                    + 4.0 * terms.d22 * shared)
                    * (v - 1.0);
                let q = 1.0 / (1.0 + v * exponent.exp());
                (1.0 - q, q)
            }
        }
    }
}

/// Scalars of the extended-moment policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtendedTerms {
    /// First-order column dependence `ccount2c / count^2`. Reported only.
    pub d: f64,
    /// Second-order term.
    pub d2: f64,
    /// Third-order term.
    pub d3: f64,
    /// Mixed fourth-order term.
    pub d22: f64,
}

impl ExtendedTerms {
    /// Every denominator carries `f64::EPSILON` so empty remainders give zero
    /// terms instead of NaN.
    pub fn new(stats: &MomentStats) -> Self {
        let eps = f64::EPSILON;
        let count = stats.count as f64;
        let c2 = stats.ccount2c as f64;
        let c3 = stats.ccount3c as f64;
        let pow = |k: f64| count.powf(k);

        let d = c2 / (pow(2.0) + eps);
        let d2 = c2 / (2.0 * pow(2.0) + eps)
            + c2 / (2.0 * pow(3.0) + eps)
            + c2.powf(2.0) / (4.0 * pow(4.0) + eps);
        let d3 = -c3 / (3.0 * pow(3.0) + eps) + c2.powf(2.0) / (2.0 * pow(4.0) + eps);
        let d22 = c2 / (4.0 * pow(4.0) + eps) + c3 / (2.0 * pow(4.0) + eps)
            - c2.powf(2.0) / (2.0 * pow(5.0) + eps);
        Self { d, d2, d3, d22 }
    }
}

fn second_moment_weight(stats: &MomentStats, rows: usize, remaining_columns: usize) -> f64 {
    let cells = (rows * remaining_columns) as i64;
    if stats.count == 0 || cells == stats.count {
        return 0.0;
    }
    let count = stats.count as f64;
    let n = remaining_columns as f64;
    let w = cells as f64 / (stats.count * (cells - stats.count)) as f64;
    w * (1.0 - w * (stats.ccount2 as f64 - count * count / n)) / 2.0
}
