use bmx_core::{BmxError, ErrorInfo, Placement};

/// Row capacities together with a position/label permutation kept sorted by
/// descending capacity.
///
/// `label_at` maps a position to a row label and `position_of` is its
/// inverse. Every mutation goes through [`RankedRows::decrement`],
/// [`RankedRows::swap`] or [`RankedRows::repair`] so the two maps never drift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRows {
    capacity: Vec<usize>,
    order: Vec<usize>,
    position: Vec<usize>,
}

impl RankedRows {
    /// Ranks rows by descending capacity; ties keep label order.
    pub fn new(capacities: Vec<usize>) -> Self {
        let mut order: Vec<usize> = (0..capacities.len()).collect();
        order.sort_by(|&a, &b| capacities[b].cmp(&capacities[a]));
        let position = inverse(&order);
        Self {
            capacity: capacities,
            order,
            position,
        }
    }

    /// Accepts a caller-supplied order after checking that it is a
    /// permutation sorted by descending capacity.
    pub fn from_order(capacities: Vec<usize>, order: Vec<usize>) -> Result<Self, BmxError> {
        if order.len() != capacities.len() {
            return Err(BmxError::Precondition(
                ErrorInfo::new("row-order-shape", "row order and capacities differ in length")
                    .with_context("order", order.len())
                    .with_context("capacities", capacities.len()),
            ));
        }
        let mut seen = vec![false; order.len()];
        for &label in &order {
            if label >= order.len() || std::mem::replace(&mut seen[label], true) {
                return Err(BmxError::Precondition(
                    ErrorInfo::new("row-order-labels", "row order must be a permutation")
                        .with_context("label", label),
                ));
            }
        }
        let position = inverse(&order);
        let rows = Self {
            capacity: capacities,
            order,
            position,
        };
        if let Some(at) = rows.first_unsorted() {
            return Err(BmxError::Precondition(
                ErrorInfo::new("row-order-unsorted", "rows must be ranked by descending capacity")
                    .with_context("position", at),
            ));
        }
        Ok(rows)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Row label ranked at `position`.
    pub fn label_at(&self, position: usize) -> usize {
        self.order[position]
    }

    /// Rank position currently held by `label`.
    pub fn position_of(&self, label: usize) -> usize {
        self.position[label]
    }

    /// Remaining capacity of `label`.
    pub fn capacity_of(&self, label: usize) -> usize {
        self.capacity[label]
    }

    /// Remaining capacities indexed by label.
    pub fn capacities(&self) -> &[usize] {
        &self.capacity
    }

    /// Labels in rank order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Exchanges the rank positions of two labels.
    pub fn swap(&mut self, label_a: usize, label_b: usize) {
        let pos_a = self.position[label_a];
        let pos_b = self.position[label_b];
        self.order.swap(pos_a, pos_b);
        self.position[label_a] = pos_b;
        self.position[label_b] = pos_a;
    }

    /// Consumes one unit of capacity from `label` and returns the capacity it
    /// had before. The rank order is not touched; call [`RankedRows::repair`]
    /// once the column is finished.
    pub fn decrement(&mut self, label: usize) -> Result<usize, BmxError> {
        let before = self.capacity[label];
        if before == 0 {
            return Err(BmxError::Invariant(
                ErrorInfo::new("capacity-underflow", "row capacity would become negative")
                    .with_context("row", label),
            ));
        }
        self.capacity[label] = before - 1;
        Ok(before)
    }

    /// Restores the descending order after the rows in `placed` each lost one
    /// unit of capacity. `placed` must be listed in ascending rank order, which
    /// is how a column sweep records them.
    ///
    /// Each moved row swaps with the last row of the run that now outranks
    /// it. That run held the row's old capacity, so the swap keeps it intact.
    pub fn repair(&mut self, placed: &[Placement]) {
        let rows = self.len();
        for placement in placed.iter().rev() {
            let label = placement.row;
            let value = self.capacity[label];
            let start = self.position[label];

            let mut next = start + 1;
            if next >= rows || self.capacity[self.order[next]] <= value {
                continue;
            }
            next += 1;
            while next < rows && self.capacity[self.order[next]] > value {
                next += 1;
            }
            next -= 1;

            let displaced = self.order[next];
            self.swap(label, displaced);
        }
    }

    /// Returns whether the order is sorted by descending capacity.
    pub fn is_sorted(&self) -> bool {
        self.first_unsorted().is_none()
    }

    /// Returns whether `position_of` is the exact inverse of `label_at`.
    pub fn is_consistent(&self) -> bool {
        self.order
            .iter()
            .enumerate()
            .all(|(pos, &label)| self.position.get(label) == Some(&pos))
    }

    fn first_unsorted(&self) -> Option<usize> {
        self.order
            .windows(2)
            .position(|pair| self.capacity[pair[0]] < self.capacity[pair[1]])
            .map(|at| at + 1)
    }
}

fn inverse(order: &[usize]) -> Vec<usize> {
    let mut position = vec![0; order.len()];
    for (pos, &label) in order.iter().enumerate() {
        position[label] = pos;
    }
    position
}
