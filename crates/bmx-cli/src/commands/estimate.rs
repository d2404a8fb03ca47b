use std::error::Error;
use std::path::PathBuf;

use bmx_core::canonical_matrix_hash;
use bmx_sis::{conditional_nll_is, draw_samples, log_partition, Prepared, SamplerConfig};
use clap::Args;
use serde_json::json;

use crate::{load_matrix, load_weights, print_json};

#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// Observed matrix as a JSON list of 0/1 rows.
    #[arg(long)]
    pub matrix: PathBuf,
    /// Target odds as a JSON list of rows, also used as proposal.
    #[arg(long)]
    pub weights: PathBuf,
    /// YAML sampler configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Overrides the configured master seed.
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: &EstimateArgs) -> Result<(), Box<dyn Error>> {
    let mut config = SamplerConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.seed_policy.master_seed = seed;
    }
    let observed = load_matrix(&args.matrix)?;
    let weights = load_weights(Some(&args.weights), observed.rows(), observed.cols())?;

    let prepared = Prepared::from_matrix(&observed, &weights)?;
    let samples = draw_samples(&prepared, &weights, &config)?;
    let estimate = log_partition(&samples)?;
    let nll = conditional_nll_is(&observed, &weights, &samples)?;

    print_json(&json!({
        "input_hash": canonical_matrix_hash(&observed),
        "seed": config.seed_policy.master_seed,
        "weighting": config.weighting,
        "conditional_nll": nll,
        "estimate": estimate,
    }))
}
