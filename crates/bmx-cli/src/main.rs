use std::error::Error;
use std::fs;
use std::path::Path;

use bmx_core::{BinaryMatrix, LogWeights};
use bmx_sis::Weighting;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use commands::{
    estimate::{self, EstimateArgs},
    sample::{self, SampleArgs},
    score::{self, ScoreArgs},
};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "bmx",
    about = "Sequential importance sampling for binary matrices with fixed margins"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score an observed matrix under the SIS proposal.
    Score(ScoreArgs),
    /// Draw importance samples with fixed margins and write a report.
    Sample(SampleArgs),
    /// Importance-sampled conditional NLL of an observed matrix.
    Estimate(EstimateArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Score(args) => score::run(&args),
        Command::Sample(args) => sample::run(&args),
        Command::Estimate(args) => estimate::run(&args),
    }
}

/// Margins file layout: `{"rows": [..], "columns": [..]}`.
#[derive(Debug, Deserialize)]
struct Margins {
    rows: Vec<usize>,
    columns: Vec<usize>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    let value = serde_json::from_str(&contents)
        .map_err(|err| format!("failed to parse {}: {err}", path.display()))?;
    Ok(value)
}

pub(crate) fn load_matrix(path: &Path) -> Result<BinaryMatrix, Box<dyn Error>> {
    read_json(path)
}

pub(crate) fn load_margins(path: &Path) -> Result<(Vec<usize>, Vec<usize>), Box<dyn Error>> {
    let margins: Margins = read_json(path)?;
    Ok((margins.rows, margins.columns))
}

/// Reads per-cell odds, or uniform weights when no file is given.
pub(crate) fn load_weights(
    path: Option<&Path>,
    rows: usize,
    cols: usize,
) -> Result<LogWeights, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(LogWeights::zeros(rows, cols));
    };
    let odds: Vec<Vec<f64>> = read_json(path)?;
    let weights = LogWeights::from_odds(&odds)?;
    if weights.rows() != rows || weights.cols() != cols {
        return Err(format!(
            "weights in {} are {}x{}, expected {rows}x{cols}",
            path.display(),
            weights.rows(),
            weights.cols()
        )
        .into());
    }
    Ok(weights)
}

pub(crate) fn parse_weighting(value: &str) -> Result<Weighting, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).map_err(|_| {
        format!("unknown weighting `{value}` (uniform, second-moment, extended-moment)")
    })
}

pub(crate) fn write_json<P: AsRef<Path>, T: serde::Serialize>(
    path: P,
    value: &T,
) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn tool_versions() -> std::collections::BTreeMap<String, String> {
    let mut versions = std::collections::BTreeMap::new();
    versions.insert("bmx".to_string(), env!("CARGO_PKG_VERSION").to_string());
    versions
}
