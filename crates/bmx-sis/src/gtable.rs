use bmx_core::{BmxError, ErrorInfo, LogWeights};
use serde::{Deserialize, Serialize};

use crate::schedule::ColumnSchedule;

/// Entry of the generating table after ratio conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GRatio {
    /// The row cannot skip this column and still reach its margin.
    Infeasible,
    /// Multiplicative correction for the row's placement odds.
    Ratio(f64),
}

/// Per-row generating-function ratios indexed by
/// `(remaining capacity - 1, row label, column position)`.
///
/// Level `k` at position `j` compares the weighted odds of a row that still
/// needs `k + 1` ones taking column `j` against the unweighted odds
/// `(k + 1) / (n - j - k - 1)`, using elementary symmetric polynomials of the
/// row's weights over the later columns. The polynomials are accumulated in
/// log space so that rows with many columns neither overflow nor underflow.
#[derive(Debug, Clone, PartialEq)]
pub struct GTable {
    levels: usize,
    rows: usize,
    positions: usize,
    entries: Vec<GRatio>,
}

impl GTable {
    /// Builds the table for `capacities` (indexed by row label) over the
    /// columns of `schedule`, reading proposal log-weights by original labels.
    pub fn build(
        capacities: &[usize],
        max_capacity: usize,
        schedule: &ColumnSchedule,
        weights: &LogWeights,
    ) -> Result<Self, BmxError> {
        let rows = capacities.len();
        let cols = schedule.len();
        if weights.rows() != rows || weights.cols() != cols {
            return Err(BmxError::Precondition(
                ErrorInfo::new("weights-shape", "proposal weights do not match the margins")
                    .with_context("weights", format!("{}x{}", weights.rows(), weights.cols()))
                    .with_context("margins", format!("{rows}x{cols}")),
            ));
        }
        if let Some(row) = capacities.iter().position(|&cap| cap > max_capacity) {
            return Err(BmxError::Precondition(
                ErrorInfo::new("capacity-bound", "row capacity exceeds the table bound")
                    .with_context("row", row)
                    .with_context("capacity", capacities[row])
                    .with_context("max_capacity", max_capacity),
            ));
        }

        let levels = max_capacity + 1;
        let positions = cols.saturating_sub(1);
        let mut table = Self {
            levels,
            rows,
            positions,
            entries: vec![GRatio::Infeasible; levels * rows * positions],
        };
        if positions == 0 {
            return Ok(table);
        }

        let at = |level: usize, position: usize| level * positions + position;
        let mut log_g = vec![f64::NEG_INFINITY; levels * positions];
        for (row, &capacity) in capacities.iter().enumerate() {
            log_g.fill(f64::NEG_INFINITY);
            log_g[..positions].fill(0.0);
            if levels > 1 {
                log_g[at(1, positions - 1)] = weights.get(row, schedule.label(cols - 1));
            }

            for j in (1..positions).rev() {
                let log_w = weights.get(row, schedule.label(j));
                for k in 1..=capacity {
                    let b = log_g[at(k - 1, j)] + log_w;
                    let a = log_g[at(k, j)];
                    if a == f64::NEG_INFINITY && b == f64::NEG_INFINITY {
                        continue;
                    }
                    log_g[at(k, j - 1)] = log_add_exp(a, b);
                }
            }

            for j in 0..positions {
                let w = weights.get(row, schedule.label(j)).exp();
                for k in 0..max_capacity {
                    let numerator = log_g[at(k, j)];
                    let denominator = log_g[at(k + 1, j)];
                    let entry = if denominator.is_infinite() {
                        GRatio::Infeasible
                    } else {
                        let spread = (cols as f64 - j as f64 - k as f64 - 1.0) / (k as f64 + 1.0);
                        GRatio::Ratio(w * (numerator - denominator).exp() * spread)
                    };
                    let index = table.index(k, row, j);
                    table.entries[index] = entry;
                }
            }
        }
        Ok(table)
    }

    /// Number of capacity levels (`max_capacity + 1`).
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Number of rows covered.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of column positions (`columns - 1`).
    pub fn positions(&self) -> usize {
        self.positions
    }

    /// Returns the entry for a row that needs `level + 1` more ones.
    pub fn get(&self, level: usize, row: usize, position: usize) -> GRatio {
        self.entries[self.index(level, row, position)]
    }

    fn index(&self, level: usize, row: usize, position: usize) -> usize {
        (level * self.rows + row) * self.positions + position
    }
}

fn log_add_exp(a: f64, b: f64) -> f64 {
    if a > b {
        a + (1.0 + (b - a).exp()).ln()
    } else {
        b + (1.0 + (a - b).exp()).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(entry: GRatio) -> f64 {
        match entry {
            GRatio::Ratio(value) => value,
            GRatio::Infeasible => panic!("expected a ratio"),
        }
    }

    #[test]
    fn uniform_weights_give_unit_ratios() {
        let schedule = ColumnSchedule::from_column_sums(&[2, 2, 1, 1]);
        let caps = [3, 2, 1];
        let table = GTable::build(&caps, 3, &schedule, &LogWeights::zeros(3, 4)).unwrap();
        assert_eq!(table.positions(), 3);
        for (row, &cap) in caps.iter().enumerate() {
            for j in 0..3 {
                let later = 3 - j;
                for k in 0..cap {
                    let entry = table.get(k, row, j);
                    if k + 1 <= later {
                        assert!((ratio(entry) - 1.0).abs() < 1e-12, "row {row} j {j} k {k}");
                    } else {
                        assert_eq!(entry, GRatio::Infeasible);
                    }
                }
            }
        }
    }

    #[test]
    fn weighted_ratio_matches_direct_polynomials() {
        // One row, three columns with weights 1, 2, 3 in schedule order.
        let schedule = ColumnSchedule::from_column_sums(&[1, 1, 1]);
        let weights = LogWeights::from_odds(&[vec![1.0, 2.0, 3.0]]).unwrap();
        let table = GTable::build(&[2], 2, &schedule, &weights).unwrap();

        // Position 0, level 0: w0 * e0(w1, w2) / e1(w1, w2) * (3 - 0 - 0 - 1) / 1.
        let expected = 1.0 * 1.0 / (2.0 + 3.0) * 2.0;
        assert!((ratio(table.get(0, 0, 0)) - expected).abs() < 1e-12);
        // Position 0, level 1: w0 * e1 / e2 * (3 - 0 - 1 - 1) / 2.
        let expected = 1.0 * (2.0 + 3.0) / 6.0 * 0.5;
        assert!((ratio(table.get(1, 0, 0)) - expected).abs() < 1e-12);
        // Position 1, level 1: only one later column, so two more ones cannot fit.
        assert_eq!(table.get(1, 0, 1), GRatio::Infeasible);
        // The top level never has a level above it.
        assert_eq!(table.get(2, 0, 0), GRatio::Infeasible);
    }

    #[test]
    fn capacity_above_bound_is_rejected() {
        let schedule = ColumnSchedule::from_column_sums(&[1, 1]);
        let err = GTable::build(&[3], 2, &schedule, &LogWeights::zeros(1, 2)).unwrap_err();
        assert_eq!(err.info().code, "capacity-bound");
    }

    #[test]
    fn single_column_has_no_positions() {
        let schedule = ColumnSchedule::from_column_sums(&[1]);
        let table = GTable::build(&[1, 0], 1, &schedule, &LogWeights::zeros(2, 1)).unwrap();
        assert_eq!(table.positions(), 0);
    }
}
