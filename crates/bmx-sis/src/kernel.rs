use bmx_core::{BinaryMatrix, BmxError, ErrorInfo, LogWeights, Placement};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::prepare::Prepared;
use crate::state::MarginState;
use crate::weighting::Weighting;
use crate::window::{fill_acceptance, ColumnInput, WindowOutcome, Workspace};

/// Source of the per-row decisions of a sweep.
pub trait PlacementOracle {
    /// Returns whether `row` takes a one in `column` (original labels), given
    /// the engine's acceptance probability `p`.
    fn decide(&mut self, row: usize, column: usize, p: f64) -> Result<bool, BmxError>;
}

/// Reads decisions off an observed matrix.
#[derive(Debug, Clone, Copy)]
pub struct Observed<'a> {
    matrix: &'a BinaryMatrix,
}

impl<'a> Observed<'a> {
    /// Wraps `matrix`.
    pub fn new(matrix: &'a BinaryMatrix) -> Self {
        Self { matrix }
    }
}

impl PlacementOracle for Observed<'_> {
    fn decide(&mut self, row: usize, column: usize, _p: f64) -> Result<bool, BmxError> {
        Ok(self.matrix.get(row, column))
    }
}

/// Consumes one uniform draw per visited row and places when `draw < p`.
#[derive(Debug, Clone)]
pub struct DrawSequence<'a> {
    draws: &'a [f64],
    cursor: usize,
}

impl<'a> DrawSequence<'a> {
    /// Wraps a slice of uniform draws in `[0, 1)`.
    pub fn new(draws: &'a [f64]) -> Self {
        Self { draws, cursor: 0 }
    }

    /// Draws consumed so far.
    pub fn draws_used(&self) -> usize {
        self.cursor
    }
}

impl PlacementOracle for DrawSequence<'_> {
    fn decide(&mut self, row: usize, column: usize, p: f64) -> Result<bool, BmxError> {
        let draw = self.draws.get(self.cursor).copied().ok_or_else(|| {
            BmxError::Precondition(
                ErrorInfo::new("draws-exhausted", "ran out of uniform draws")
                    .with_context("supplied", self.draws.len())
                    .with_context("row", row)
                    .with_context("column", column)
                    .with_hint("supply rows * cols draws per sample"),
            )
        })?;
        if !(0.0..1.0).contains(&draw) {
            return Err(BmxError::Rng(
                ErrorInfo::new("draw-out-of-range", "uniform draws must lie in [0, 1)")
                    .with_context("index", self.cursor)
                    .with_context("draw", draw),
            ));
        }
        self.cursor += 1;
        Ok(draw < p)
    }
}

/// Why a sweep stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Termination {
    /// Every one was placed, or only empty columns remain.
    Exhausted,
    /// The window lost all probability mass in the column at schedule
    /// `position` (original label `column`).
    Collapsed {
        /// Schedule position.
        position: usize,
        /// Original column label.
        column: usize,
    },
    /// The decisions ran past the last row with ones still owed.
    Underfilled {
        /// Schedule position.
        position: usize,
        /// Original column label.
        column: usize,
        /// Ones placed before the rows ran out.
        placed: usize,
    },
}

/// Totals of one call to [`run_sweep`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Sum of `ln p` over accepted rows and `ln (1 - p)` over rejected ones.
    pub log_proposal: f64,
    /// Ones placed.
    pub placed: usize,
    /// Columns whose window was evaluated.
    pub columns_processed: usize,
    /// Stop reason.
    pub termination: Termination,
}

/// Runs the column loop from the state's cursor to the end of the schedule.
///
/// The placement log is cleared first and then holds every one placed by this
/// call. Re-running on an exhausted state is a no-op that reports a zero
/// log-probability.
pub fn run_sweep<O: PlacementOracle + ?Sized>(
    state: &mut MarginState,
    prepared: &Prepared,
    weighting: Weighting,
    oracle: &mut O,
    workspace: &mut Workspace,
) -> Result<SweepReport, BmxError> {
    let schedule = prepared.schedule();
    let rows = state.rows.len();
    check_state(state, prepared)?;
    workspace.clear_placements();

    let mut report = SweepReport {
        log_proposal: 0.0,
        placed: 0,
        columns_processed: 0,
        termination: Termination::Exhausted,
    };

    while state.next_column < schedule.len() {
        let position = state.next_column;
        let colval = schedule.sum_at(position);
        if colval == 0 || state.stats.count == 0 {
            break;
        }
        workspace.check_column(rows, colval)?;
        let label = schedule.label(position);

        for slot in state.conjugate.iter_mut().take(colval) {
            *slot = slot.checked_sub(1).ok_or_else(|| {
                BmxError::Invariant(
                    ErrorInfo::new("conjugate-underflow", "conjugate count would become negative")
                        .with_context("column", label),
                )
            })?;
        }
        state.remaining_columns = state.remaining_columns.checked_sub(1).ok_or_else(|| {
            BmxError::invariant("column-cursor", "column cursor ran past the schedule")
        })?;
        state.next_column += 1;

        let count_before = state.stats.count;
        state.stats.consume_column(colval);
        let weights = weighting.for_column(&state.stats, rows, state.remaining_columns);
        let column = ColumnInput {
            position,
            colval,
            count_before,
            remaining_columns: state.remaining_columns,
        };
        report.columns_processed += 1;
        trace!(
            "column {label} (position {position}): placing {colval} of {rows} rows, {} columns left",
            state.remaining_columns
        );

        let outcome = fill_acceptance(
            workspace,
            &column,
            &state.rows,
            &state.conjugate,
            prepared.table(),
            &weights,
            state.stats.rcount2c,
        );
        if let WindowOutcome::Collapsed { position: rank } = outcome {
            debug!("window collapsed at column {label} while visiting rank {rank}");
            report.termination = Termination::Collapsed {
                position,
                column: label,
            };
            return Ok(report);
        }

        let start = workspace.placements().len();
        let mut placed = 0;
        for rank in 0..rows {
            if placed == colval {
                break;
            }
            let p = workspace.acceptance(placed, rank);
            let row = state.rows.label_at(rank);
            if oracle.decide(row, label, p)? {
                let before = state.rows.decrement(row)?;
                state.stats.consume_row_one(before);
                workspace.record(Placement { row, column: label })?;
                report.log_proposal += p.ln();
                placed += 1;
            } else {
                report.log_proposal += (1.0 - p).ln();
            }
        }
        report.placed += placed;

        if placed < colval {
            debug!("column {label} received {placed} of {colval} ones");
            report.termination = Termination::Underfilled {
                position,
                column: label,
                placed,
            };
            return Ok(report);
        }
        if state.stats.count == 0 {
            break;
        }
        state.rows.repair(&workspace.placements()[start..]);
    }

    debug!(
        "sweep exhausted after {} columns, log proposal {}",
        report.columns_processed, report.log_proposal
    );
    Ok(report)
}

/// Rejects a state that was not cloned from `prepared` or one of its sweeps.
fn check_state(state: &MarginState, prepared: &Prepared) -> Result<(), BmxError> {
    let rows = state.rows.len();
    let max_capacity = state.rows.capacities().iter().copied().max().unwrap_or(0);
    let table = prepared.table();
    let columns = prepared.schedule().len();
    let fits = rows == prepared.rows()
        && state.conjugate.len() == rows
        && max_capacity < table.levels()
        && state.next_column + state.remaining_columns == columns;
    if !fits {
        return Err(BmxError::Precondition(
            ErrorInfo::new("state-mismatch", "margin state does not belong to these margins")
                .with_context("rows", rows)
                .with_context("prepared_rows", prepared.rows())
                .with_context("max_capacity", max_capacity)
                .with_context("table_levels", table.levels())
                .with_context("columns", state.next_column + state.remaining_columns)
                .with_context("prepared_columns", columns)
                .with_hint("take states from Prepared::fresh_state"),
        ));
    }
    Ok(())
}

/// Result of scoring an observed matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum ScoreOutcome {
    /// Negative log proposal probability of the whole matrix. Infinite when
    /// the matrix has a one the proposal cannot produce.
    Complete {
        /// Negative log-likelihood.
        nll: f64,
    },
    /// The matrix is incompatible with the proposal at `column`.
    Infeasible {
        /// Original label of the first column that could not be filled.
        column: usize,
        /// Negative log-likelihood of the columns before it.
        partial_nll: f64,
    },
}

impl ScoreOutcome {
    /// The negative log-likelihood of a complete score.
    pub fn nll(&self) -> Option<f64> {
        match self {
            ScoreOutcome::Complete { nll } => Some(*nll),
            ScoreOutcome::Infeasible { .. } => None,
        }
    }
}

/// Scores `observed` under the second-moment policy.
pub fn score_basic(
    prepared: &Prepared,
    observed: &BinaryMatrix,
    workspace: &mut Workspace,
) -> Result<ScoreOutcome, BmxError> {
    score(prepared, observed, Weighting::SecondMoment, workspace)
}

/// Scores `observed` under the extended-moment policy.
pub fn score_extended(
    prepared: &Prepared,
    observed: &BinaryMatrix,
    workspace: &mut Workspace,
) -> Result<ScoreOutcome, BmxError> {
    score(prepared, observed, Weighting::ExtendedMoment, workspace)
}

/// Negative log proposal probability of `observed`, whose margins must equal
/// the prepared ones.
pub fn score(
    prepared: &Prepared,
    observed: &BinaryMatrix,
    weighting: Weighting,
    workspace: &mut Workspace,
) -> Result<ScoreOutcome, BmxError> {
    if observed.row_sums() != prepared.row_sums() || observed.col_sums() != prepared.col_sums() {
        return Err(BmxError::Precondition(
            ErrorInfo::new("margins-mismatch", "observed matrix does not have the prepared margins")
                .with_context("shape", format!("{}x{}", observed.rows(), observed.cols()))
                .with_context(
                    "prepared",
                    format!("{}x{}", prepared.rows(), prepared.cols()),
                ),
        ));
    }
    let mut state = prepared.fresh_state();
    let mut oracle = Observed::new(observed);
    let report = run_sweep(&mut state, prepared, weighting, &mut oracle, workspace)?;
    Ok(match report.termination {
        Termination::Exhausted => ScoreOutcome::Complete {
            nll: -report.log_proposal,
        },
        Termination::Collapsed { column, .. } | Termination::Underfilled { column, .. } => {
            ScoreOutcome::Infeasible {
                column,
                partial_nll: -report.log_proposal,
            }
        }
    })
}

/// One matrix drawn from the proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Ones in placement order (original labels).
    pub placements: Vec<Placement>,
    /// Log proposal probability of the draw.
    pub log_proposal: f64,
    /// Sum of target log-weights over the placed ones.
    pub log_target: f64,
    /// Uniform draws consumed.
    pub draws_used: usize,
}

impl Sample {
    /// Materialises the sample as a dense matrix.
    pub fn to_matrix(&self, rows: usize, cols: usize) -> Result<BinaryMatrix, BmxError> {
        BinaryMatrix::from_placements(rows, cols, &self.placements)
    }

    /// Log importance weight `log_target - log_proposal`.
    pub fn log_weight(&self) -> f64 {
        self.log_target - self.log_proposal
    }
}

/// Result of one sampling attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum SampleOutcome {
    /// A full matrix with the prepared margins.
    Complete(Sample),
    /// A column could not be filled; retry with fresh draws.
    Stalled {
        /// Original label of the column that stalled.
        column: usize,
        /// Uniform draws consumed before stalling.
        draws_used: usize,
    },
}

/// Samples under the second-moment policy.
pub fn sample(
    prepared: &Prepared,
    target: &LogWeights,
    draws: &[f64],
    workspace: &mut Workspace,
) -> Result<SampleOutcome, BmxError> {
    sample_with(prepared, Weighting::SecondMoment, target, draws, workspace)
}

/// Samples a matrix with the prepared margins from `draws`, scoring the
/// placed ones against the target log-weights.
pub fn sample_with(
    prepared: &Prepared,
    weighting: Weighting,
    target: &LogWeights,
    draws: &[f64],
    workspace: &mut Workspace,
) -> Result<SampleOutcome, BmxError> {
    if target.rows() != prepared.rows() || target.cols() != prepared.cols() {
        return Err(BmxError::Precondition(
            ErrorInfo::new("weights-shape", "target weights do not match the margins")
                .with_context("weights", format!("{}x{}", target.rows(), target.cols()))
                .with_context(
                    "margins",
                    format!("{}x{}", prepared.rows(), prepared.cols()),
                ),
        ));
    }
    let mut state = prepared.fresh_state();
    let mut oracle = DrawSequence::new(draws);
    let report = run_sweep(&mut state, prepared, weighting, &mut oracle, workspace)?;
    let draws_used = oracle.draws_used();
    Ok(match report.termination {
        Termination::Exhausted => {
            let placements = workspace.placements().to_vec();
            let log_target = placements
                .iter()
                .map(|placement| target.get(placement.row, placement.column))
                .sum();
            SampleOutcome::Complete(Sample {
                placements,
                log_proposal: report.log_proposal,
                log_target,
                draws_used,
            })
        }
        Termination::Collapsed { column, .. } | Termination::Underfilled { column, .. } => {
            SampleOutcome::Stalled { column, draws_used }
        }
    })
}
