#![deny(missing_docs)]
#![doc = "Core error, randomness and matrix types for the BMX binary-matrix SIS kernel."]

pub mod errors;
pub mod hash;
pub mod matrix;
pub mod provenance;
pub mod rng;

pub use errors::{BmxError, ErrorInfo};
pub use hash::{canonical_margins_hash, canonical_matrix_hash};
pub use matrix::{BinaryMatrix, LogWeights, Placement};
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};
