use std::error::Error;
use std::fs;
use std::path::PathBuf;

use bmx_core::{canonical_margins_hash, RunProvenance, SchemaVersion};
use bmx_sis::{draw_samples, log_partition, Prepared, SampleReport, SamplerConfig};
use clap::Args;
use log::info;

use crate::{load_margins, load_matrix, load_weights, tool_versions, write_json};

#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("input").required(true).args(["matrix", "margins"])))]
pub struct SampleArgs {
    /// Matrix whose margins are sampled.
    #[arg(long)]
    pub matrix: Option<PathBuf>,
    /// Margins as `{"rows": [..], "columns": [..]}`.
    #[arg(long)]
    pub margins: Option<PathBuf>,
    /// Odds used both as proposal and target; uniform when omitted.
    #[arg(long)]
    pub weights: Option<PathBuf>,
    /// YAML sampler configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for the report.
    #[arg(long)]
    pub out: PathBuf,
    /// Overrides the configured master seed.
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: &SampleArgs) -> Result<(), Box<dyn Error>> {
    let mut config = SamplerConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.seed_policy.master_seed = seed;
    }
    let (row_sums, col_sums) = match (&args.matrix, &args.margins) {
        (Some(path), _) => {
            let matrix = load_matrix(path)?;
            (matrix.row_sums(), matrix.col_sums())
        }
        (None, Some(path)) => load_margins(path)?,
        (None, None) => return Err("either --matrix or --margins is required".into()),
    };
    let weights = load_weights(args.weights.as_deref(), row_sums.len(), col_sums.len())?;

    let prepared = Prepared::new(&row_sums, &col_sums, &weights)?;
    let samples = draw_samples(&prepared, &weights, &config)?;
    let estimate = log_partition(&samples)?;
    info!(
        "drew {} samples, log kappa {}",
        estimate.samples, estimate.log_kappa
    );

    let report = SampleReport {
        schema_version: SchemaVersion::default(),
        provenance: RunProvenance {
            input_hash: canonical_margins_hash(&row_sums, &col_sums),
            seed: config.seed_policy.master_seed,
            label: config.seed_policy.label.clone(),
            tool_versions: tool_versions(),
        },
        weighting: config.weighting,
        samples,
        estimate,
    };
    fs::create_dir_all(&args.out)?;
    let path = args.out.join(&config.output.report_file);
    report.write(&path)?;
    write_json(args.out.join("config.json"), &config)?;
    println!("{}", path.display());
    Ok(())
}
