#![deny(missing_docs)]
#![doc = include_str!("../docs/sis-kernel.md")]

/// YAML configuration schema and defaults.
pub mod config;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Importance-sampling estimators.
pub mod estimate;
/// Log-domain generating table of the proposal weights.
pub mod gtable;
/// Shared column sweep and the scoring and sampling drivers.
pub mod kernel;
/// Sample report serialization helpers.
pub mod manifest;
/// Per-problem preparation.
pub mod prepare;
/// Rows ranked by remaining capacity.
pub mod row_order;
/// Column processing order and conjugate counts.
pub mod schedule;
/// Mutable sweep state and moment statistics.
pub mod state;
/// Placement weighting policies.
pub mod weighting;
/// Feasibility window and scratch buffers.
pub mod window;

pub use config::{OutputConfig, SamplerConfig, SeedPolicy};
pub use estimate::{conditional_nll_is, draw_samples, log_partition, PartitionEstimate};
pub use gtable::{GRatio, GTable};
pub use kernel::{
    run_sweep, sample, sample_with, score, score_basic, score_extended, DrawSequence, Observed,
    PlacementOracle, Sample, SampleOutcome, ScoreOutcome, SweepReport, Termination,
};
pub use manifest::SampleReport;
pub use prepare::Prepared;
pub use row_order::RankedRows;
pub use schedule::{conjugate, ColumnSchedule};
pub use state::{MarginState, MomentStats};
pub use weighting::{ColumnWeights, ExtendedTerms, Weighting};
pub use window::Workspace;
