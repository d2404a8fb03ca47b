use bmx_core::{BmxError, LogWeights, RngHandle};
use bmx_sis::{sample, sample_with, score, Prepared, SampleOutcome, Weighting};
use proptest::prelude::*;

fn complete(outcome: SampleOutcome) -> bmx_sis::Sample {
    match outcome {
        SampleOutcome::Complete(sample) => sample,
        other => panic!("expected a complete sample, got {other:?}"),
    }
}

#[test]
fn permutation_margins_always_yield_a_permutation() {
    let prepared = Prepared::unweighted(&[1, 1], &[1, 1]).unwrap();
    let target = LogWeights::zeros(2, 2);
    let mut workspace = prepared.workspace();

    for a in [0.25, 0.75] {
        for b in [0.25, 0.75] {
            let draws = [a, b, a, b];
            let drawn = complete(sample(&prepared, &target, &draws, &mut workspace).unwrap());
            let matrix = drawn.to_matrix(2, 2).unwrap();
            assert_eq!(matrix.row_sums(), vec![1, 1], "draws {a} {b}");
            assert_eq!(matrix.col_sums(), vec![1, 1], "draws {a} {b}");
            assert_eq!(drawn.placements.len(), 2);
            assert!((drawn.log_proposal - 0.5f64.ln()).abs() < 1e-9);
            assert_eq!(drawn.log_target, 0.0);
            let expected_draws = if a < 0.5 { 2 } else { 3 };
            assert_eq!(drawn.draws_used, expected_draws);
        }
    }
}

#[test]
fn running_out_of_draws_is_an_error() {
    let prepared = Prepared::unweighted(&[1, 1], &[1, 1]).unwrap();
    let mut workspace = prepared.workspace();
    let err = sample(&prepared, &LogWeights::zeros(2, 2), &[0.75], &mut workspace).unwrap_err();
    assert_eq!(err.info().code, "draws-exhausted");
}

#[test]
fn draws_outside_unit_interval_are_rng_errors() {
    let prepared = Prepared::unweighted(&[1, 1], &[1, 1]).unwrap();
    let mut workspace = prepared.workspace();
    for bad in [1.5, -0.25, f64::NAN] {
        let err = sample(&prepared, &LogWeights::zeros(2, 2), &[bad, 0.5], &mut workspace)
            .unwrap_err();
        assert!(matches!(err, BmxError::Rng(_)), "{bad}: {err:?}");
        assert_eq!(err.info().code, "draw-out-of-range");
    }
}

#[test]
fn excluded_column_stalls_without_consuming_draws() {
    let proposal = LogWeights::from_odds(&[vec![0.0, 1.0], vec![0.0, 1.0]]).unwrap();
    let prepared = Prepared::new(&[1, 1], &[1, 1], &proposal).unwrap();
    let mut workspace = prepared.workspace();
    let outcome = sample(&prepared, &LogWeights::zeros(2, 2), &[0.1; 4], &mut workspace).unwrap();
    assert_eq!(
        outcome,
        SampleOutcome::Stalled {
            column: 0,
            draws_used: 0
        }
    );
}

#[test]
fn target_log_weight_sums_over_placed_ones() {
    let prepared = Prepared::unweighted(&[1, 1], &[1, 1]).unwrap();
    let target = LogWeights::from_odds(&[vec![2.0, 1.0], vec![1.0, 3.0]]).unwrap();
    let mut workspace = prepared.workspace();
    let drawn = complete(sample(&prepared, &target, &[0.25; 4], &mut workspace).unwrap());
    assert!(drawn.to_matrix(2, 2).unwrap().get(0, 0));
    assert!((drawn.log_target - 6f64.ln()).abs() < 1e-12);
    assert!((drawn.log_weight() - (6f64.ln() - 0.5f64.ln())).abs() < 1e-12);
}

#[test]
fn target_shape_is_checked() {
    let prepared = Prepared::unweighted(&[1, 1], &[1, 1]).unwrap();
    let mut workspace = prepared.workspace();
    let err = sample(&prepared, &LogWeights::zeros(2, 3), &[0.5; 4], &mut workspace).unwrap_err();
    assert_eq!(err.info().code, "weights-shape");
}

fn random_problem(seed: u64, rows: usize, cols: usize) -> (Vec<usize>, Vec<usize>, LogWeights) {
    let mut rng = RngHandle::from_seed(seed);
    let mut row_sums = vec![0; rows];
    let mut col_sums = vec![0; cols];
    for row in 0..rows {
        for col in 0..cols {
            if rng.next_uniform() < 0.5 {
                row_sums[row] += 1;
                col_sums[col] += 1;
            }
        }
    }
    let values = (0..rows * cols)
        .map(|_| 2.0 * rng.next_uniform() - 1.0)
        .collect();
    let weights = LogWeights::from_log_values(rows, cols, values).unwrap();
    (row_sums, col_sums, weights)
}

const POLICIES: [Weighting; 3] = [
    Weighting::Uniform,
    Weighting::SecondMoment,
    Weighting::ExtendedMoment,
];

proptest! {
    #[test]
    fn sampled_matrices_keep_margins_and_score_back(
        seed in any::<u64>(),
        rows in 1usize..7,
        cols in 1usize..7,
        policy in 0usize..3,
    ) {
        let (row_sums, col_sums, proposal) = random_problem(seed, rows, cols);
        let prepared = Prepared::new(&row_sums, &col_sums, &proposal).unwrap();
        let mut workspace = prepared.workspace();
        let weighting = POLICIES[policy];
        let draws = RngHandle::from_seed(seed ^ 0x5A5A).uniform_draws(rows * cols);

        let outcome = sample_with(&prepared, weighting, &proposal, &draws, &mut workspace).unwrap();
        let drawn = match outcome {
            SampleOutcome::Complete(drawn) => drawn,
            SampleOutcome::Stalled { .. } => return Ok(()),
        };
        prop_assert!(drawn.draws_used <= rows * cols);
        let matrix = drawn.to_matrix(rows, cols).unwrap();
        prop_assert_eq!(matrix.row_sums(), row_sums);
        prop_assert_eq!(matrix.col_sums(), col_sums);

        let nll = score(&prepared, &matrix, weighting, &mut workspace)
            .unwrap()
            .nll()
            .unwrap();
        prop_assert_eq!(nll, -drawn.log_proposal);
    }
}
