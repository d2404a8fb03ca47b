//! Importance-sampling estimators over proposal draws.
//!
//! Each draw carries `log_target - log_proposal` as its log importance weight;
//! their mean estimates the partition function of the target over all
//! matrices with the prepared margins.

use bmx_core::{BinaryMatrix, BmxError, ErrorInfo, LogWeights, RngHandle};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::SamplerConfig;
use crate::determinism::sample_seed;
use crate::kernel::{sample_with, Sample, SampleOutcome};
use crate::prepare::Prepared;

/// Importance-sampling estimate of the log partition function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartitionEstimate {
    /// `log kappa`, the log of the mean importance weight.
    pub log_kappa: f64,
    /// Log squared coefficient of variation of the weights; `None` with fewer
    /// than two samples.
    pub log_cvsq: Option<f64>,
    /// Number of samples behind the estimate.
    pub samples: usize,
}

/// Draws `config.samples` independent samples, each from `rows * cols`
/// uniforms of its own substream.
///
/// A stalled attempt is retried on the next attempt substream; a sample that
/// stalls `config.max_attempts` times fails the whole call.
pub fn draw_samples(
    prepared: &Prepared,
    target: &LogWeights,
    config: &SamplerConfig,
) -> Result<Vec<Sample>, BmxError> {
    config.validate()?;
    let draws_per_sample = prepared.rows() * prepared.cols();
    let mut workspace = prepared.workspace();
    let mut samples = Vec::with_capacity(config.samples);

    for index in 0..config.samples {
        let mut drawn = None;
        for attempt in 0..config.max_attempts {
            let seed = sample_seed(config.seed_policy.master_seed, index, attempt);
            let draws = RngHandle::from_seed(seed).uniform_draws(draws_per_sample);
            match sample_with(prepared, config.weighting, target, &draws, &mut workspace)? {
                SampleOutcome::Complete(sample) => {
                    drawn = Some(sample);
                    break;
                }
                SampleOutcome::Stalled { column, draws_used } => {
                    warn!(
                        "sample {index} attempt {attempt} stalled at column {column} after {draws_used} draws"
                    );
                }
            }
        }
        let sample = drawn.ok_or_else(|| {
            BmxError::Precondition(
                ErrorInfo::new("sample-stalled", "every attempt at a sample stalled")
                    .with_context("sample", index)
                    .with_context("attempts", config.max_attempts)
                    .with_hint("check that the proposal weights allow the margins"),
            )
        })?;
        samples.push(sample);
    }
    Ok(samples)
}

/// Estimates `log kappa` and the weight dispersion from `samples`.
pub fn log_partition(samples: &[Sample]) -> Result<PartitionEstimate, BmxError> {
    if samples.is_empty() {
        return Err(BmxError::precondition(
            "no-samples",
            "the partition estimate needs at least one sample",
        ));
    }
    let weights: Vec<f64> = samples.iter().map(Sample::log_weight).collect();
    let t = weights.len() as f64;
    let log_kappa = log_sum_exp(&weights) - t.ln();

    let log_cvsq = if weights.len() < 2 {
        None
    } else {
        let deviations: Vec<f64> = weights
            .iter()
            .map(|&w| 2.0 * log_abs_diff_exp(w, log_kappa))
            .collect();
        Some(-(t - 1.0).ln() - 2.0 * log_kappa + log_sum_exp(&deviations))
    };

    Ok(PartitionEstimate {
        log_kappa,
        log_cvsq,
        samples: weights.len(),
    })
}

/// Importance-sampled conditional negative log-likelihood of `observed`:
/// `log kappa` minus the target log-weights of its ones.
pub fn conditional_nll_is(
    observed: &BinaryMatrix,
    target: &LogWeights,
    samples: &[Sample],
) -> Result<f64, BmxError> {
    if observed.rows() != target.rows() || observed.cols() != target.cols() {
        return Err(BmxError::Precondition(
            ErrorInfo::new("weights-shape", "target weights do not match the observed matrix")
                .with_context("weights", format!("{}x{}", target.rows(), target.cols()))
                .with_context("matrix", format!("{}x{}", observed.rows(), observed.cols())),
        ));
    }
    let estimate = log_partition(samples)?;
    let mut observed_log_target = 0.0;
    for row in 0..observed.rows() {
        for col in 0..observed.cols() {
            if observed.get(row, col) {
                observed_log_target += target.get(row, col);
            }
        }
    }
    Ok(estimate.log_kappa - observed_log_target)
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|&v| (v - max).exp()).sum::<f64>().ln()
}

/// `ln |e^a - e^b|`.
fn log_abs_diff_exp(a: f64, b: f64) -> f64 {
    let hi = a.max(b);
    let gap = (a - b).abs();
    if gap == 0.0 || !hi.is_finite() {
        return if gap == 0.0 { f64::NEG_INFINITY } else { hi };
    }
    hi + (-(-gap).exp_m1()).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sum_exp_is_stable_for_large_values() {
        let value = log_sum_exp(&[1000.0, 1000.0]);
        assert!((value - (1000.0 + 2f64.ln())).abs() < 1e-12);
        assert_eq!(log_sum_exp(&[f64::NEG_INFINITY]), f64::NEG_INFINITY);
    }

    #[test]
    fn abs_diff_matches_direct_evaluation() {
        let direct = (3f64.exp() - 1f64.exp()).abs().ln();
        assert!((log_abs_diff_exp(1.0, 3.0) - direct).abs() < 1e-12);
        assert!((log_abs_diff_exp(3.0, 1.0) - direct).abs() < 1e-12);
        assert_eq!(log_abs_diff_exp(2.0, 2.0), f64::NEG_INFINITY);
    }
}
