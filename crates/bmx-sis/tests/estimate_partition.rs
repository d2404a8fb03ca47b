use bmx_core::{BinaryMatrix, LogWeights};
use bmx_sis::{conditional_nll_is, draw_samples, log_partition, Prepared, SamplerConfig, Weighting};

fn config(samples: usize, weighting: Weighting) -> SamplerConfig {
    SamplerConfig {
        samples,
        weighting,
        ..SamplerConfig::default()
    }
}

#[test]
fn permutations_are_counted_exactly() {
    // Every 3x3 permutation is proposed with probability 1/6 under each policy.
    let prepared = Prepared::unweighted(&[1, 1, 1], &[1, 1, 1]).unwrap();
    let target = LogWeights::zeros(3, 3);
    for weighting in [
        Weighting::Uniform,
        Weighting::SecondMoment,
        Weighting::ExtendedMoment,
    ] {
        let samples = draw_samples(&prepared, &target, &config(8, weighting)).unwrap();
        assert_eq!(samples.len(), 8);
        let estimate = log_partition(&samples).unwrap();
        assert!((estimate.log_kappa - 6f64.ln()).abs() < 1e-9, "{weighting:?}");
        assert_eq!(estimate.samples, 8);
        assert!(estimate.log_cvsq.is_some());
    }
}

#[test]
fn importance_estimate_approaches_the_matrix_count() {
    // Five 0/1 matrices have margins r = c = [2, 1, 1].
    let prepared = Prepared::unweighted(&[2, 1, 1], &[2, 1, 1]).unwrap();
    let samples =
        draw_samples(&prepared, &LogWeights::zeros(3, 3), &config(200, Weighting::SecondMoment))
            .unwrap();
    let kappa = log_partition(&samples).unwrap().log_kappa.exp();
    assert!((kappa - 5.0).abs() < 0.25, "kappa {kappa}");
}

#[test]
fn single_sample_has_no_dispersion_estimate() {
    let prepared = Prepared::unweighted(&[1, 1], &[1, 1]).unwrap();
    let samples =
        draw_samples(&prepared, &LogWeights::zeros(2, 2), &config(1, Weighting::Uniform)).unwrap();
    let estimate = log_partition(&samples).unwrap();
    assert_eq!(estimate.log_cvsq, None);
    assert!((estimate.log_kappa - 2f64.ln()).abs() < 1e-9);
}

#[test]
fn empty_sample_set_is_rejected() {
    let err = log_partition(&[]).unwrap_err();
    assert_eq!(err.info().code, "no-samples");
}

#[test]
fn conditional_nll_subtracts_the_observed_target() {
    let observed = BinaryMatrix::from_rows(vec![vec![1, 0], vec![0, 1]]).unwrap();
    let target = LogWeights::from_odds(&[vec![2.0, 1.0], vec![1.0, 2.0]]).unwrap();
    let prepared = Prepared::from_matrix(&observed, &LogWeights::zeros(2, 2)).unwrap();
    let samples = draw_samples(&prepared, &target, &config(64, Weighting::Uniform)).unwrap();

    let estimate = log_partition(&samples).unwrap();
    let nll = conditional_nll_is(&observed, &target, &samples).unwrap();
    assert!((nll - (estimate.log_kappa - 4f64.ln())).abs() < 1e-12);
    // kappa averages 2 * 4 and 2 * 1, so the identity has conditional
    // probability between 4/8 and 4/2.
    assert!(nll > -(2f64.ln()) && nll < 2f64.ln());
}

#[test]
fn stalling_problems_fail_after_max_attempts() {
    let proposal = LogWeights::from_odds(&[vec![0.0, 1.0], vec![0.0, 1.0]]).unwrap();
    let prepared = Prepared::new(&[1, 1], &[1, 1], &proposal).unwrap();
    let mut cfg = config(2, Weighting::SecondMoment);
    cfg.max_attempts = 3;
    let err = draw_samples(&prepared, &LogWeights::zeros(2, 2), &cfg).unwrap_err();
    assert_eq!(err.info().code, "sample-stalled");
    assert_eq!(err.info().context.get("sample").map(String::as_str), Some("0"));
}
