use std::fs;
use std::path::Path;

use bmx_core::{BmxError, ErrorInfo, RunProvenance, SchemaVersion};
use serde::{Deserialize, Serialize};

use crate::estimate::PartitionEstimate;
use crate::kernel::Sample;
use crate::weighting::Weighting;

/// Structured report describing an importance-sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleReport {
    /// Schema of this payload.
    #[serde(default)]
    pub schema_version: SchemaVersion,
    /// Input hash, seed and tool versions.
    pub provenance: RunProvenance,
    /// Proposal weighting policy.
    pub weighting: Weighting,
    /// Drawn samples in draw order.
    pub samples: Vec<Sample>,
    /// Partition estimate over `samples`.
    pub estimate: PartitionEstimate,
}

impl SampleReport {
    /// Writes the report as pretty JSON, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), BmxError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                BmxError::Serde(
                    ErrorInfo::new("report-mkdir", err.to_string())
                        .with_context("path", parent.display()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            BmxError::Serde(
                ErrorInfo::new("report-serialize", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            BmxError::Serde(
                ErrorInfo::new("report-write", err.to_string())
                    .with_context("path", path.display()),
            )
        })
    }

    /// Loads a report from disk.
    pub fn load(path: &Path) -> Result<Self, BmxError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            BmxError::Serde(
                ErrorInfo::new("report-read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            BmxError::Serde(
                ErrorInfo::new("report-parse", err.to_string())
                    .with_context("path", path.display()),
            )
        })
    }
}
