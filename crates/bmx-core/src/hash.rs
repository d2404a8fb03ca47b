//! Canonical SHA-256 hashes used in report provenance.

use sha2::{Digest, Sha256};

use crate::matrix::BinaryMatrix;

/// Computes the canonical structural hash for a binary matrix.
pub fn canonical_matrix_hash(matrix: &BinaryMatrix) -> String {
    let mut hasher = Sha256::new();
    hasher.update((matrix.rows() as u64).to_le_bytes());
    hasher.update((matrix.cols() as u64).to_le_bytes());
    hasher.update(matrix.cells());
    let digest = hasher.finalize();
    digest
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<String>()
}

/// Computes the canonical hash of a pair of margins.
pub fn canonical_margins_hash(row_sums: &[usize], col_sums: &[usize]) -> String {
    let mut hasher = Sha256::new();
    for sums in [row_sums, col_sums] {
        hasher.update((sums.len() as u64).to_le_bytes());
        for &value in sums {
            hasher.update((value as u64).to_le_bytes());
        }
    }
    let digest = hasher.finalize();
    digest
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<String>()
}
