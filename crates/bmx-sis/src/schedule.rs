use bmx_core::{BmxError, ErrorInfo};
use serde::{Deserialize, Serialize};

/// Column processing order: sums sorted non-increasing, with the original
/// label of every processing slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchedule {
    sums: Vec<usize>,
    labels: Vec<usize>,
}

impl ColumnSchedule {
    /// Orders columns by descending sum. Ties keep their original order.
    pub fn from_column_sums(col_sums: &[usize]) -> Self {
        let mut labels: Vec<usize> = (0..col_sums.len()).collect();
        labels.sort_by(|&a, &b| col_sums[b].cmp(&col_sums[a]));
        let sums = labels.iter().map(|&label| col_sums[label]).collect();
        Self { sums, labels }
    }

    /// Accepts a caller-built schedule after checking that `sums` is
    /// non-increasing and `labels` is a permutation.
    pub fn from_parts(sums: Vec<usize>, labels: Vec<usize>) -> Result<Self, BmxError> {
        if sums.len() != labels.len() {
            return Err(BmxError::Precondition(
                ErrorInfo::new("schedule-shape", "schedule sums and labels differ in length")
                    .with_context("sums", sums.len())
                    .with_context("labels", labels.len()),
            ));
        }
        if let Some(position) = sums.windows(2).position(|pair| pair[0] < pair[1]) {
            return Err(BmxError::Precondition(
                ErrorInfo::new("schedule-not-descending", "column sums must be non-increasing")
                    .with_context("position", position + 1)
                    .with_hint("build the schedule with ColumnSchedule::from_column_sums"),
            ));
        }
        let mut seen = vec![false; labels.len()];
        for &label in &labels {
            if label >= labels.len() || std::mem::replace(&mut seen[label], true) {
                return Err(BmxError::Precondition(
                    ErrorInfo::new("schedule-labels", "column labels must form a permutation")
                        .with_context("label", label),
                ));
            }
        }
        Ok(Self { sums, labels })
    }

    /// Number of scheduled columns.
    pub fn len(&self) -> usize {
        self.sums.len()
    }

    /// Returns whether the schedule has no columns.
    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// Sum of the column processed at `position`.
    pub fn sum_at(&self, position: usize) -> usize {
        self.sums[position]
    }

    /// Original label of the column processed at `position`.
    pub fn label(&self, position: usize) -> usize {
        self.labels[position]
    }

    /// Largest column sum (the first one).
    pub fn max_sum(&self) -> usize {
        self.sums.first().copied().unwrap_or(0)
    }

    /// Column sums indexed by original label.
    pub fn sums_by_label(&self) -> Vec<usize> {
        let mut by_label = vec![0; self.labels.len()];
        for (&label, &sum) in self.labels.iter().zip(&self.sums) {
            by_label[label] = sum;
        }
        by_label
    }
}

/// Conjugate of the column margins over `rows` slots:
/// `conj[k] = #{ j : col_sums[j] > k }`.
pub fn conjugate(col_sums: &[usize], rows: usize) -> Vec<usize> {
    let mut conj = vec![0; rows];
    for &sum in col_sums {
        for slot in conj.iter_mut().take(sum) {
            *slot += 1;
        }
    }
    conj
}
