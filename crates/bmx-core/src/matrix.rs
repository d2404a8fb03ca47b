//! Dense binary matrices and per-cell log-weights.

use serde::{Deserialize, Serialize};

use crate::errors::{BmxError, ErrorInfo};

/// A single one placed at `(row, column)`, both given as original labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Placement {
    /// Row label.
    pub row: usize,
    /// Column label.
    pub column: usize,
}

/// Row-major dense 0/1 matrix.
///
/// Serialized as a list of rows, e.g. `[[1, 0], [0, 1]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct BinaryMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

impl BinaryMatrix {
    /// Creates an all-zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![0; rows * cols],
        }
    }

    /// Builds a matrix from explicit rows, rejecting ragged input and values
    /// other than 0 and 1.
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self, BmxError> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut cells = Vec::with_capacity(rows.len() * cols);
        for (index, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(BmxError::Precondition(
                    ErrorInfo::new("ragged-matrix", "matrix rows differ in length")
                        .with_context("row", index)
                        .with_context("expected", cols)
                        .with_context("found", row.len()),
                ));
            }
            for (col, &value) in row.iter().enumerate() {
                if value > 1 {
                    return Err(BmxError::Precondition(
                        ErrorInfo::new("non-binary-cell", "matrix cells must be 0 or 1")
                            .with_context("row", index)
                            .with_context("column", col)
                            .with_context("value", value),
                    ));
                }
                cells.push(value);
            }
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            cells,
        })
    }

    /// Builds a matrix with a one at every listed placement.
    pub fn from_placements(
        rows: usize,
        cols: usize,
        placements: &[Placement],
    ) -> Result<Self, BmxError> {
        let mut matrix = Self::zeros(rows, cols);
        for placement in placements {
            if placement.row >= rows || placement.column >= cols {
                return Err(BmxError::Precondition(
                    ErrorInfo::new("placement-out-of-bounds", "placement outside the matrix")
                        .with_context("row", placement.row)
                        .with_context("column", placement.column)
                        .with_context("shape", format!("{rows}x{cols}")),
                ));
            }
            matrix.cells[placement.row * cols + placement.column] = 1;
        }
        Ok(matrix)
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns whether cell `(row, col)` holds a one.
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.cols + col] == 1
    }

    /// Row margins.
    pub fn row_sums(&self) -> Vec<usize> {
        if self.cols == 0 {
            return vec![0; self.rows];
        }
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(|&cell| cell as usize).sum())
            .collect()
    }

    /// Column margins.
    pub fn col_sums(&self) -> Vec<usize> {
        let mut sums = vec![0; self.cols];
        for row in self.cells.chunks(self.cols.max(1)) {
            for (sum, &cell) in sums.iter_mut().zip(row) {
                *sum += cell as usize;
            }
        }
        sums
    }

    /// Total number of ones.
    pub fn ones(&self) -> usize {
        self.cells.iter().map(|&cell| cell as usize).sum()
    }

    /// Raw row-major cells.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }
}

impl TryFrom<Vec<Vec<u8>>> for BinaryMatrix {
    type Error = BmxError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<BinaryMatrix> for Vec<Vec<u8>> {
    fn from(matrix: BinaryMatrix) -> Self {
        if matrix.cols == 0 {
            return vec![Vec::new(); matrix.rows];
        }
        matrix.cells.chunks(matrix.cols).map(<[u8]>::to_vec).collect()
    }
}

/// Row-major matrix of per-cell log-weights.
///
/// `-inf` marks a structural zero (a cell that can never hold a one under the
/// weighted model).
#[derive(Debug, Clone, PartialEq)]
pub struct LogWeights {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl LogWeights {
    /// Uniform weights (`log w = 0` everywhere).
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        }
    }

    /// Builds log-weights from explicit row-major values.
    pub fn from_log_values(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, BmxError> {
        if values.len() != rows * cols {
            return Err(BmxError::Precondition(
                ErrorInfo::new("weights-shape", "log-weight buffer does not match its shape")
                    .with_context("shape", format!("{rows}x{cols}"))
                    .with_context("len", values.len()),
            ));
        }
        if let Some(index) = values.iter().position(|v| v.is_nan() || *v == f64::INFINITY) {
            return Err(BmxError::Precondition(
                ErrorInfo::new("weights-non-finite", "log-weights must be finite or -inf")
                    .with_context("row", index / cols.max(1))
                    .with_context("column", index % cols.max(1)),
            ));
        }
        Ok(Self { rows, cols, values })
    }

    /// Converts odds `w = p / (1 - p)` into log-weights. Zero odds map to `-inf`.
    pub fn from_odds(odds: &[Vec<f64>]) -> Result<Self, BmxError> {
        let rows = odds.len();
        let cols = odds.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows * cols);
        for (index, row) in odds.iter().enumerate() {
            if row.len() != cols {
                return Err(BmxError::Precondition(
                    ErrorInfo::new("ragged-weights", "weight rows differ in length")
                        .with_context("row", index),
                ));
            }
            for (col, &w) in row.iter().enumerate() {
                if !(w >= 0.0) || w.is_infinite() {
                    return Err(BmxError::Precondition(
                        ErrorInfo::new("invalid-odds", "odds must be finite and non-negative")
                            .with_context("row", index)
                            .with_context("column", col)
                            .with_context("value", w),
                    ));
                }
                values.push(w.ln());
            }
        }
        Ok(Self { rows, cols, values })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Log-weight of cell `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }
}
