use bmx_core::{BmxError, ErrorInfo, Placement};

use crate::gtable::{GRatio, GTable};
use crate::row_order::RankedRows;
use crate::weighting::ColumnWeights;

/// Caller-owned scratch buffers for the placement engine.
///
/// Sized once for the worst case of a problem; the engine checks the sizes at
/// every column and never grows them.
#[derive(Debug, Clone)]
pub struct Workspace {
    rows: usize,
    max_column_sum: usize,
    /// Forward partial probabilities over achievable partial sums.
    window: Vec<f64>,
    /// `acceptance[j * rows + i]`: probability that the row ranked `i` takes a
    /// one when `j - 1` ones were already placed above it.
    acceptance: Vec<f64>,
    placements: Vec<Placement>,
    placement_capacity: usize,
}

impl Workspace {
    /// Allocates buffers for `rows` rows, columns of at most `max_column_sum`
    /// ones and `total_ones` placements in a sweep.
    pub fn new(rows: usize, max_column_sum: usize, total_ones: usize) -> Self {
        Self {
            rows,
            max_column_sum,
            window: vec![0.0; max_column_sum + 3],
            acceptance: vec![0.0; (max_column_sum + 2) * rows],
            placements: Vec::with_capacity(total_ones),
            placement_capacity: total_ones,
        }
    }

    /// Placements recorded by the most recent sweep, in placement order.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub(crate) fn clear_placements(&mut self) {
        self.placements.clear();
    }

    pub(crate) fn record(&mut self, placement: Placement) -> Result<(), BmxError> {
        if self.placements.len() >= self.placement_capacity {
            return Err(BmxError::Precondition(
                ErrorInfo::new("placement-log-full", "placement log is smaller than the ones placed")
                    .with_context("capacity", self.placement_capacity),
            ));
        }
        self.placements.push(placement);
        Ok(())
    }

    pub(crate) fn check_column(&self, rows: usize, colval: usize) -> Result<(), BmxError> {
        if rows != self.rows || colval > self.max_column_sum {
            return Err(BmxError::Precondition(
                ErrorInfo::new("workspace-too-small", "workspace was sized for a smaller problem")
                    .with_context("rows", rows)
                    .with_context("workspace_rows", self.rows)
                    .with_context("column_sum", colval)
                    .with_context("workspace_column_sum", self.max_column_sum)
                    .with_hint("allocate the workspace with Prepared::workspace"),
            ));
        }
        Ok(())
    }

    /// Acceptance probability for the row ranked `position` once `placed` ones
    /// are already in the column.
    pub(crate) fn acceptance(&self, placed: usize, position: usize) -> f64 {
        self.acceptance[(placed + 1) * self.rows + position]
    }
}

/// Inputs describing the column being filled.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColumnInput {
    /// Schedule position of the column (indexes the generating table).
    pub position: usize,
    /// Ones to place.
    pub colval: usize,
    /// Ones remaining before this column was removed.
    pub count_before: i64,
    /// Columns left after this one.
    pub remaining_columns: usize,
}

/// Result of the backward probability pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowOutcome {
    Ready,
    /// All mass in the window vanished while visiting the row ranked `position`.
    Collapsed { position: usize },
}

/// Sweeps rows from the lowest rank upward and fills the acceptance table.
///
/// `window[j]` holds the normalised weight of the rows visited so far taking
/// `colval + 1 - j` ones. Only `j` in `smin + 1 ..= smax + 1` is live: the rows
/// ranked above the current one must take at least `smin` and at most `smax`
/// ones, where `smin` comes from comparing their capacities with what the
/// remaining columns can absorb (the conjugate counts) and `smax` from their
/// number.
pub(crate) fn fill_acceptance(
    workspace: &mut Workspace,
    column: &ColumnInput,
    rows: &RankedRows,
    conjugate: &[usize],
    table: &GTable,
    weights: &ColumnWeights,
    rcount2c: i64,
) -> WindowOutcome {
    let m = rows.len();
    let colval = column.colval;
    let window = &mut workspace.window;
    let acceptance = &mut workspace.acceptance;
    acceptance[..(colval + 2) * m].fill(0.0);

    window[colval] = 0.0;
    window[colval + 1] = 1.0;
    window[colval + 2] = 0.0;

    let mut smin = colval as i64;
    let mut smax = colval;
    let mut cumsums = column.count_before;
    let mut cumconj = column.count_before - colval as i64;

    for i in (0..m).rev() {
        let label = rows.label_at(i);
        let val = rows.capacity_of(label);

        let (mut p, mut q) = weights.odds(val, column.remaining_columns, rcount2c);
        if column.remaining_columns > 0 && val > 0 {
            match table.get(val - 1, label, column.position) {
                GRatio::Infeasible => q = 0.0,
                GRatio::Ratio(ratio) => p *= ratio,
            }
        }

        cumsums -= val as i64;
        cumconj -= conjugate[i] as i64;

        smin = (smin - 1).max(cumsums - cumconj).max(0);
        smax = smax.min(i);
        let lo = smin as usize;
        if lo > smax {
            return WindowOutcome::Collapsed { position: i };
        }

        let mut total = 0.0;
        window[lo] = 0.0;
        for j in (lo + 1)..(smax + 2) {
            let a = window[j] * q;
            let b = window[j + 1] * p;
            let apb = a + b;
            total += apb;
            window[j] = apb;
            acceptance[j * m + i] = b / (apb + f64::EPSILON);
        }
        window[smax + 2] = 0.0;

        if total <= 0.0 {
            return WindowOutcome::Collapsed { position: i };
        }
        for value in &mut window[(lo + 1)..(smax + 2)] {
            *value /= total;
        }
    }
    WindowOutcome::Ready
}

#[cfg(test)]
mod tests {
    use bmx_core::BinaryMatrix;

    use crate::kernel::score;
    use crate::prepare::Prepared;
    use crate::weighting::Weighting;

    #[test]
    fn acceptance_outside_the_window_reads_zero() {
        let prepared = Prepared::unweighted(&[1, 1], &[1, 1]).unwrap();
        let mut workspace = prepared.workspace();
        workspace.acceptance.fill(0.7);
        let identity = BinaryMatrix::from_rows(vec![vec![1, 0], vec![0, 1]]).unwrap();
        score(&prepared, &identity, Weighting::SecondMoment, &mut workspace).unwrap();
        // Last column: the top row never sees one placed above it.
        assert_eq!(workspace.acceptance(1, 0), 0.0);
    }
}
