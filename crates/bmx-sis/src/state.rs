use serde::{Deserialize, Serialize};

use crate::row_order::RankedRows;

/// Running sufficient statistics of the submatrix that is still unfilled.
///
/// Column moments shrink once per processed column; row moments shrink once
/// per placed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MomentStats {
    /// Ones still to be placed.
    pub count: i64,
    /// Sum of squared remaining column sums.
    pub ccount2: i64,
    /// Sum of `c (c - 1)` over remaining columns.
    pub ccount2c: i64,
    /// Sum of `c (c - 1) (c - 2)` over remaining columns.
    pub ccount3c: i64,
    /// Sum of squared remaining row capacities.
    pub rcount2: i64,
    /// Sum of `r (r - 1)` over rows.
    pub rcount2c: i64,
    /// Sum of `r (r - 1) (r - 2)` over rows.
    pub rcount3c: i64,
}

impl MomentStats {
    /// Computes the statistics of a fresh problem.
    pub fn from_margins(row_sums: &[usize], col_sums: &[usize]) -> Self {
        let mut stats = Self::default();
        for &c in col_sums {
            let c = c as i64;
            stats.count += c;
            stats.ccount2 += c * c;
            stats.ccount2c += c * (c - 1);
            stats.ccount3c += c * (c - 1) * (c - 2);
        }
        for &r in row_sums {
            let r = r as i64;
            stats.rcount2 += r * r;
            stats.rcount2c += r * (r - 1);
            stats.rcount3c += r * (r - 1) * (r - 2);
        }
        stats
    }

    /// Removes a column holding `colval` ones.
    pub fn consume_column(&mut self, colval: usize) {
        let c = colval as i64;
        self.count -= c;
        self.ccount2 -= c * c;
        self.ccount2c -= c * (c - 1);
        self.ccount3c -= c * (c - 1) * (c - 2);
    }

    /// Accounts for a one placed in a row whose capacity was `before`.
    pub fn consume_row_one(&mut self, before: usize) {
        let v = before as i64;
        self.rcount2 -= 2 * v - 1;
        self.rcount2c -= 2 * v - 2;
        self.rcount3c -= 3 * (v - 1) * (v - 2);
    }
}

/// Mutable state of one sweep over the column schedule.
///
/// A fresh state comes from [`crate::Prepared::fresh_state`]. Drivers advance
/// it in place; once [`MarginState::is_exhausted`] holds, further sweeps are
/// no-ops.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginState {
    pub(crate) rows: RankedRows,
    pub(crate) conjugate: Vec<usize>,
    pub(crate) stats: MomentStats,
    pub(crate) next_column: usize,
    pub(crate) remaining_columns: usize,
}

impl MarginState {
    pub(crate) fn new(
        rows: RankedRows,
        conjugate: Vec<usize>,
        stats: MomentStats,
        columns: usize,
    ) -> Self {
        Self {
            rows,
            conjugate,
            stats,
            next_column: 0,
            remaining_columns: columns,
        }
    }

    /// Ranked rows with their remaining capacities.
    pub fn rows(&self) -> &RankedRows {
        &self.rows
    }

    /// Remaining conjugate counts of the unprocessed columns.
    pub fn conjugate(&self) -> &[usize] {
        &self.conjugate
    }

    /// Current moment statistics.
    pub fn stats(&self) -> &MomentStats {
        &self.stats
    }

    /// Schedule position of the next column to process.
    pub fn next_column(&self) -> usize {
        self.next_column
    }

    /// Columns not yet processed.
    pub fn remaining_columns(&self) -> usize {
        self.remaining_columns
    }

    /// Returns whether no ones remain to be placed.
    pub fn is_exhausted(&self) -> bool {
        self.stats.count == 0 || self.remaining_columns == 0
    }
}
