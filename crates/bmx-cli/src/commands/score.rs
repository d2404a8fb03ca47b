use std::error::Error;
use std::path::PathBuf;

use bmx_core::canonical_matrix_hash;
use bmx_sis::{score, Prepared, Weighting};
use clap::Args;
use serde_json::json;

use crate::{load_matrix, load_weights, parse_weighting, print_json};

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Observed matrix as a JSON list of 0/1 rows.
    #[arg(long)]
    pub matrix: PathBuf,
    /// Proposal odds as a JSON list of rows; uniform when omitted.
    #[arg(long)]
    pub weights: Option<PathBuf>,
    /// Weighting policy of the proposal.
    #[arg(long, default_value = "second-moment", value_parser = parse_weighting)]
    pub weighting: Weighting,
}

pub fn run(args: &ScoreArgs) -> Result<(), Box<dyn Error>> {
    let observed = load_matrix(&args.matrix)?;
    let proposal = load_weights(args.weights.as_deref(), observed.rows(), observed.cols())?;
    let prepared = Prepared::from_matrix(&observed, &proposal)?;
    let mut workspace = prepared.workspace();
    let outcome = score(&prepared, &observed, args.weighting, &mut workspace)?;

    print_json(&json!({
        "input_hash": canonical_matrix_hash(&observed),
        "weighting": args.weighting,
        "score": outcome,
    }))
}
