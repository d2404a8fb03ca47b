use bmx_core::{BinaryMatrix, BmxError, ErrorInfo, LogWeights};

use crate::gtable::GTable;
use crate::row_order::RankedRows;
use crate::schedule::{conjugate, ColumnSchedule};
use crate::state::{MarginState, MomentStats};
use crate::window::Workspace;

/// Immutable per-problem inputs shared by every sweep over one set of
/// margins.
#[derive(Debug, Clone)]
pub struct Prepared {
    row_sums: Vec<usize>,
    col_sums: Vec<usize>,
    schedule: ColumnSchedule,
    table: GTable,
    initial: MarginState,
    total_ones: usize,
}

impl Prepared {
    /// Prepares margins with proposal log-weights `proposal` (rows × cols,
    /// indexed by original labels). Columns are scheduled by stable descending
    /// sum.
    pub fn new(
        row_sums: &[usize],
        col_sums: &[usize],
        proposal: &LogWeights,
    ) -> Result<Self, BmxError> {
        Self::with_schedule(row_sums, ColumnSchedule::from_column_sums(col_sums), proposal)
    }

    /// Prepares margins under the uniform proposal.
    pub fn unweighted(row_sums: &[usize], col_sums: &[usize]) -> Result<Self, BmxError> {
        Self::new(
            row_sums,
            col_sums,
            &LogWeights::zeros(row_sums.len(), col_sums.len()),
        )
    }

    /// Prepares the margins of an observed matrix.
    pub fn from_matrix(matrix: &BinaryMatrix, proposal: &LogWeights) -> Result<Self, BmxError> {
        Self::new(&matrix.row_sums(), &matrix.col_sums(), proposal)
    }

    /// Prepares margins with a caller-supplied column schedule.
    pub fn with_schedule(
        row_sums: &[usize],
        schedule: ColumnSchedule,
        proposal: &LogWeights,
    ) -> Result<Self, BmxError> {
        let rows = row_sums.len();
        let col_sums = schedule.sums_by_label();
        let cols = col_sums.len();

        let total_ones: usize = row_sums.iter().sum();
        let column_total: usize = col_sums.iter().sum();
        if total_ones != column_total {
            return Err(BmxError::Precondition(
                ErrorInfo::new("margins-inconsistent", "row and column margins differ in total")
                    .with_context("row_total", total_ones)
                    .with_context("column_total", column_total),
            ));
        }
        if let Some(row) = row_sums.iter().position(|&r| r > cols) {
            return Err(BmxError::Precondition(
                ErrorInfo::new("margin-bound", "row margin exceeds the number of columns")
                    .with_context("row", row)
                    .with_context("margin", row_sums[row])
                    .with_context("cols", cols),
            ));
        }
        if let Some(col) = col_sums.iter().position(|&c| c > rows) {
            return Err(BmxError::Precondition(
                ErrorInfo::new("margin-bound", "column margin exceeds the number of rows")
                    .with_context("column", col)
                    .with_context("margin", col_sums[col])
                    .with_context("rows", rows),
            ));
        }

        let max_capacity = row_sums.iter().copied().max().unwrap_or(0);
        let table = GTable::build(row_sums, max_capacity, &schedule, proposal)?;
        let initial = MarginState::new(
            RankedRows::new(row_sums.to_vec()),
            conjugate(&col_sums, rows),
            MomentStats::from_margins(row_sums, &col_sums),
            cols,
        );

        Ok(Self {
            row_sums: row_sums.to_vec(),
            col_sums,
            schedule,
            table,
            initial,
            total_ones,
        })
    }

    /// A fresh margin state positioned before the first column.
    pub fn fresh_state(&self) -> MarginState {
        self.initial.clone()
    }

    /// Scratch buffers sized for this problem.
    pub fn workspace(&self) -> Workspace {
        Workspace::new(self.rows(), self.schedule.max_sum(), self.total_ones)
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.row_sums.len()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.col_sums.len()
    }

    /// Row margins by label.
    pub fn row_sums(&self) -> &[usize] {
        &self.row_sums
    }

    /// Column margins by label.
    pub fn col_sums(&self) -> &[usize] {
        &self.col_sums
    }

    /// Total number of ones.
    pub fn total_ones(&self) -> usize {
        self.total_ones
    }

    /// Column processing order.
    pub fn schedule(&self) -> &ColumnSchedule {
        &self.schedule
    }

    /// Generating-table ratios of the proposal.
    pub fn table(&self) -> &GTable {
        &self.table
    }
}
