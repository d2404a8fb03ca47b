use std::fs;
use std::path::{Path, PathBuf};

use bmx_core::{BmxError, ErrorInfo};
use serde::{Deserialize, Serialize};

use crate::weighting::Weighting;

/// YAML-configurable parameters governing an importance-sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Weighting policy of the proposal.
    #[serde(default)]
    pub weighting: Weighting,
    /// Number of importance samples to draw.
    #[serde(default = "default_samples")]
    pub samples: usize,
    /// Attempts per sample before a stall becomes an error.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Output layout.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_samples() -> usize {
    100
}

fn default_max_attempts() -> usize {
    16
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            weighting: Weighting::default(),
            samples: default_samples(),
            max_attempts: default_max_attempts(),
            seed_policy: SeedPolicy::default(),
            output: OutputConfig::default(),
        }
    }
}

impl SamplerConfig {
    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), BmxError> {
        if self.samples == 0 {
            return Err(BmxError::Config(
                ErrorInfo::new("samples-zero", "at least one sample is required")
                    .with_context("samples", self.samples),
            ));
        }
        if self.max_attempts == 0 {
            return Err(BmxError::Config(
                ErrorInfo::new("attempts-zero", "max_attempts must be positive")
                    .with_context("max_attempts", self.max_attempts),
            ));
        }
        if self.output.report_file.as_os_str().is_empty() {
            return Err(BmxError::Config(ErrorInfo::new(
                "report-file-empty",
                "output.report_file must name a file",
            )));
        }
        Ok(())
    }

    /// Reads a YAML (or JSON, which YAML accepts) configuration and validates
    /// it.
    pub fn load(path: &Path) -> Result<Self, BmxError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            BmxError::Serde(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        let config: Self = serde_yaml::from_str(&contents).map_err(|err| {
            BmxError::Config(
                ErrorInfo::new("config-parse", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        config.validate()?;
        Ok(config)
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in report provenance.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Output file layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Report filename relative to the output directory.
    #[serde(default = "default_report_filename")]
    pub report_file: PathBuf,
}

fn default_report_filename() -> PathBuf {
    PathBuf::from("report.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_file: default_report_filename(),
        }
    }
}
