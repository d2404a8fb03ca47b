use bmx_core::{BinaryMatrix, LogWeights};
use bmx_sis::{
    run_sweep, score, score_basic, score_extended, Observed, Prepared, ScoreOutcome, Termination,
    Weighting,
};

fn identity() -> BinaryMatrix {
    BinaryMatrix::from_rows(vec![vec![1, 0], vec![0, 1]]).unwrap()
}

#[test]
fn full_matrix_has_probability_one_under_both_drivers() {
    let observed = BinaryMatrix::from_rows(vec![vec![1, 1], vec![1, 1]]).unwrap();
    let prepared = Prepared::from_matrix(&observed, &LogWeights::zeros(2, 2)).unwrap();
    let mut workspace = prepared.workspace();

    let basic = score_basic(&prepared, &observed, &mut workspace).unwrap();
    let extended = score_extended(&prepared, &observed, &mut workspace).unwrap();
    for outcome in [basic, extended] {
        let nll = outcome.nll().unwrap();
        assert!(nll.abs() < 1e-9, "nll {nll}");
    }
    assert_eq!(workspace.placements().len(), 4);
}

#[test]
fn permutation_costs_one_bit() {
    let observed = identity();
    let prepared = Prepared::from_matrix(&observed, &LogWeights::zeros(2, 2)).unwrap();
    let mut workspace = prepared.workspace();
    for weighting in [
        Weighting::Uniform,
        Weighting::SecondMoment,
        Weighting::ExtendedMoment,
    ] {
        let nll = score(&prepared, &observed, weighting, &mut workspace)
            .unwrap()
            .nll()
            .unwrap();
        assert!((nll - 2f64.ln()).abs() < 1e-9, "{weighting:?}: {nll}");
    }
}

#[test]
fn excluded_column_is_reported_infeasible() {
    let proposal = LogWeights::from_odds(&[vec![0.0, 1.0], vec![0.0, 1.0]]).unwrap();
    let observed = identity();
    let prepared = Prepared::from_matrix(&observed, &proposal).unwrap();
    let mut workspace = prepared.workspace();

    let outcome = score_basic(&prepared, &observed, &mut workspace).unwrap();
    assert_eq!(
        outcome,
        ScoreOutcome::Infeasible {
            column: 0,
            partial_nll: 0.0
        }
    );
    assert_eq!(outcome.nll(), None);
}

#[test]
fn mismatched_margins_are_rejected() {
    let prepared = Prepared::unweighted(&[2, 0], &[1, 1]).unwrap();
    let mut workspace = prepared.workspace();
    let err = score_basic(&prepared, &identity(), &mut workspace).unwrap_err();
    assert_eq!(err.info().code, "margins-mismatch");
}

#[test]
fn exhausted_state_adds_nothing() {
    let observed = BinaryMatrix::from_rows(vec![
        vec![1, 0, 1],
        vec![0, 1, 1],
        vec![1, 1, 0],
    ])
    .unwrap();
    let prepared = Prepared::from_matrix(&observed, &LogWeights::zeros(3, 3)).unwrap();
    let mut workspace = prepared.workspace();
    let mut state = prepared.fresh_state();

    let first = run_sweep(
        &mut state,
        &prepared,
        Weighting::SecondMoment,
        &mut Observed::new(&observed),
        &mut workspace,
    )
    .unwrap();
    assert_eq!(first.termination, Termination::Exhausted);
    assert_eq!(first.placed, 6);
    assert!(state.is_exhausted());
    assert_eq!(state.stats().count, 0);

    let again = run_sweep(
        &mut state,
        &prepared,
        Weighting::SecondMoment,
        &mut Observed::new(&observed),
        &mut workspace,
    )
    .unwrap();
    assert_eq!(again.log_proposal, 0.0);
    assert_eq!(again.placed, 0);
    assert_eq!(again.columns_processed, 0);
    assert_eq!(again.termination, Termination::Exhausted);
}

#[test]
fn empty_columns_are_never_visited() {
    let observed = BinaryMatrix::from_rows(vec![vec![1, 0], vec![1, 0]]).unwrap();
    let prepared = Prepared::from_matrix(&observed, &LogWeights::zeros(2, 2)).unwrap();
    let mut workspace = prepared.workspace();
    let mut state = prepared.fresh_state();

    let report = run_sweep(
        &mut state,
        &prepared,
        Weighting::SecondMoment,
        &mut Observed::new(&observed),
        &mut workspace,
    )
    .unwrap();
    assert_eq!(report.columns_processed, 1);
    assert!(report.log_proposal.abs() < 1e-9);
    assert_eq!(state.rows().capacities(), &[0, 0]);
}

#[test]
fn undersized_workspace_is_a_precondition_failure() {
    let observed = identity();
    let prepared = Prepared::from_matrix(&observed, &LogWeights::zeros(2, 2)).unwrap();
    let mut workspace = bmx_sis::Workspace::new(2, 0, 2);
    let err = score_basic(&prepared, &observed, &mut workspace).unwrap_err();
    assert_eq!(err.info().code, "workspace-too-small");
}

#[test]
fn state_from_other_margins_is_rejected() {
    let other = Prepared::unweighted(&[3, 3], &[2, 2, 2]).unwrap();
    let prepared = Prepared::unweighted(&[1, 1], &[1, 1]).unwrap();
    let mut workspace = prepared.workspace();
    let mut state = other.fresh_state();
    let err = run_sweep(
        &mut state,
        &prepared,
        Weighting::SecondMoment,
        &mut Observed::new(&identity()),
        &mut workspace,
    )
    .unwrap_err();
    assert_eq!(err.info().code, "state-mismatch");
}

#[test]
fn weighted_scores_are_finite_and_positive() {
    let observed = BinaryMatrix::from_rows(vec![
        vec![1, 1, 0, 0],
        vec![1, 0, 1, 0],
        vec![0, 1, 1, 1],
    ])
    .unwrap();
    let proposal = LogWeights::from_odds(&[
        vec![2.0, 0.5, 1.0, 1.0],
        vec![1.0, 1.0, 3.0, 0.2],
        vec![0.7, 1.5, 1.0, 2.0],
    ])
    .unwrap();
    let prepared = Prepared::from_matrix(&observed, &proposal).unwrap();
    let mut workspace = prepared.workspace();
    for weighting in [Weighting::SecondMoment, Weighting::ExtendedMoment] {
        let nll = score(&prepared, &observed, weighting, &mut workspace)
            .unwrap()
            .nll()
            .unwrap();
        assert!(nll.is_finite() && nll > 0.0, "{weighting:?}: {nll}");
    }
}

#[test]
fn weighted_scores_match_reference_values() {
    let observed = BinaryMatrix::from_rows(vec![
        vec![1, 1, 0, 1, 0, 1],
        vec![1, 0, 1, 1, 0, 0],
        vec![0, 1, 1, 1, 1, 0],
        vec![1, 1, 0, 0, 1, 1],
        vec![1, 0, 1, 1, 0, 0],
    ])
    .unwrap();
    let proposal = LogWeights::from_odds(&[
        vec![2.0, 0.5, 1.0, 1.0, 0.3, 1.2],
        vec![1.0, 1.0, 3.0, 0.2, 0.8, 1.0],
        vec![0.7, 1.5, 1.0, 2.0, 1.1, 0.4],
        vec![1.3, 0.9, 0.6, 1.7, 1.0, 2.2],
        vec![0.5, 1.4, 1.9, 0.8, 1.6, 1.0],
    ])
    .unwrap();
    let prepared = Prepared::from_matrix(&observed, &proposal).unwrap();
    let mut workspace = prepared.workspace();

    let basic = score_basic(&prepared, &observed, &mut workspace)
        .unwrap()
        .nll()
        .unwrap();
    let extended = score_extended(&prepared, &observed, &mut workspace)
        .unwrap()
        .nll()
        .unwrap();
    assert!((basic - 7.723_701_171_433_515_5).abs() < 1e-12, "basic {basic}");
    assert!(
        (extended - 7.649_167_337_144_501_9).abs() < 1e-12,
        "extended {extended}"
    );
}
