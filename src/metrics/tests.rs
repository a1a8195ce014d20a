use proptest::prelude::*;

use super::rank::average_ranks;
use super::*;
use crate::model::{IntervalMethod, MatchTier, ScoreVector};

fn tiered_truth(per_tier: usize) -> GroundTruth {
    let mut scores = Vec::new();
    let mut labels = Vec::new();
    for (tier, score) in MatchTier::ALL.iter().zip([1.0, 0.8, 0.6, 0.4, 0.0]) {
        for _ in 0..per_tier {
            scores.push(score);
            labels.push(*tier);
        }
    }
    GroundTruth::new(scores, labels).expect("aligned ground truth")
}

fn noisy_predictions(truth: &GroundTruth) -> ScoreVector {
    truth
        .scores()
        .iter()
        .enumerate()
        .map(|(index, score)| score * 0.7 + ((index * 37) % 11) as f64 / 40.0)
        .collect::<Vec<f64>>()
        .into()
}

#[test]
fn perfect_ranking_scores_one_with_zero_error() {
    let rho = spearman(&[1.0, 0.5, 0.0], &[1.0, 0.5, 0.0]).expect("valid input");
    let mse = mean_squared_error(&[1.0, 0.5, 0.0], &[1.0, 0.5, 0.0]).expect("valid input");
    assert!((rho - 1.0).abs() < 1e-12);
    assert_eq!(mse, 0.0);
}

#[test]
fn reversed_ranking_scores_minus_one() {
    let rho = spearman(&[1.0, 0.5, 0.0], &[0.1, 0.2, 0.3]).expect("valid input");
    assert!((rho + 1.0).abs() < 1e-12);
}

#[test]
fn constant_predictions_are_degenerate() {
    let error = spearman(&[1.0, 0.5, 0.0], &[0.0, 0.0, 0.0]).expect_err("zero variance");
    assert!(error.is_degenerate());

    let error = spearman(&[0.4, 0.4, 0.4], &[0.1, 0.2, 0.3]).expect_err("zero variance");
    assert!(error.is_degenerate());
}

#[test]
fn non_finite_predictions_are_degenerate() {
    let error = spearman(&[1.0, 0.5, 0.0], &[0.2, f64::NAN, 0.1]).expect_err("nan input");
    assert!(error.is_degenerate());
}

#[test]
fn mismatched_lengths_are_rejected() {
    let error = spearman(&[1.0, 0.5], &[1.0]).expect_err("length mismatch");
    assert!(matches!(
        error,
        EvalError::LengthMismatch {
            expected: 2,
            actual: 1
        }
    ));
}

#[test]
fn ties_share_average_ranks() {
    assert_eq!(average_ranks(&[0.4, 0.1, 0.4, 0.9]), vec![2.5, 1.0, 2.5, 4.0]);
}

#[test]
fn tied_ground_truth_still_correlates() {
    let truth = [1.0, 1.0, 0.6, 0.6, 0.0, 0.0];
    let predictions = [0.9, 0.8, 0.5, 0.55, 0.1, 0.2];
    let rho = spearman(&truth, &predictions).expect("valid input");
    assert!(rho > 0.9 && rho < 1.0, "rho={rho}");
}

#[test]
fn mean_squared_error_of_known_values() {
    let mse = mean_squared_error(&[1.0, 0.0], &[0.5, 0.5]).expect("valid input");
    assert!((mse - 0.25).abs() < 1e-12);
}

#[test]
fn p_value_matches_t_approximation() {
    let p = spearman_p_value(0.5, 10).expect("enough pairs");
    assert!((p - 0.1411).abs() < 1e-3, "p={p}");

    assert_eq!(spearman_p_value(1.0, 10), Some(0.0));
    assert!((spearman_p_value(0.0, 10).expect("enough pairs") - 1.0).abs() < 1e-12);
    assert_eq!(spearman_p_value(0.5, 2), None);
}

#[test]
fn bootstrap_interval_is_seeded() {
    let truth = tiered_truth(6);
    let predictions = noisy_predictions(&truth);
    let rho = spearman(truth.scores(), predictions.values()).expect("valid input");

    let first = bootstrap_spearman_interval_95(truth.scores(), predictions.values(), 200, 11)
        .expect("interval");
    let second = bootstrap_spearman_interval_95(truth.scores(), predictions.values(), 200, 11)
        .expect("interval");
    assert_eq!(first, second);
    assert!(first.0 <= first.1);
    assert!(first.0 > 0.0 && first.1 <= 1.0, "{first:?} vs {rho}");
}

#[test]
fn stratified_folds_keep_tier_proportions() {
    let truth = tiered_truth(20);
    let folds = stratified_folds(truth.labels(), 5, 3).expect("valid folds");

    assert_eq!(folds.len(), 5);
    let mut seen = folds.iter().flatten().copied().collect::<Vec<usize>>();
    seen.sort_unstable();
    assert_eq!(seen, (0..100).collect::<Vec<usize>>());

    for fold in &folds {
        assert_eq!(fold.len(), 20);
        for tier in MatchTier::ALL {
            let count = fold
                .iter()
                .filter(|index| truth.labels()[**index] == tier)
                .count();
            assert_eq!(count, 4, "tier {tier} in fold {fold:?}");
        }
    }
}

#[test]
fn stratified_folds_reject_bad_fold_counts() {
    let labels = [MatchTier::High, MatchTier::Low, MatchTier::Medium];
    assert!(matches!(
        stratified_folds(&labels, 1, 0),
        Err(EvalError::InvalidFolds { .. })
    ));
    assert!(matches!(
        stratified_folds(&labels, 4, 0),
        Err(EvalError::InvalidFolds { .. })
    ));
}

#[test]
fn complement_excludes_fold_members() {
    assert_eq!(complement(&[1, 3], 5), vec![0, 2, 4]);
}

#[test]
fn cross_validated_interval_skips_degenerate_folds() {
    let truth = [1.0, 0.0, 1.0, 0.0, 0.5, 0.5];
    let predictions = [0.9, 0.1, 0.8, 0.2, 0.4, 0.6];
    let folds = vec![vec![0, 1], vec![2, 3], vec![4, 5]];
    let interval = cross_validated_interval(&truth, &predictions, &folds)
        .expect("valid input")
        .expect("two usable folds");
    assert_eq!(interval.fold_correlations.len(), 2);
    assert!((interval.mean - 1.0).abs() < 1e-12);
}

#[test]
fn engine_reports_fold_interval_by_default() {
    let truth = tiered_truth(20);
    let predictions = noisy_predictions(&truth);
    let report = MetricsEngine::default()
        .evaluate("noisy", &truth, &predictions)
        .expect("valid evaluation");

    assert_eq!(report.model_name, "noisy");
    assert_eq!(report.pair_count, 100);
    assert_eq!(report.interval_method, Some(IntervalMethod::StratifiedKFold));
    assert_eq!(report.fold_correlations.len(), DEFAULT_FOLDS);
    let (low, high) = report.confidence_interval.expect("interval present");
    assert!(low <= high);
    assert!(report.p_value.expect("p-value present") < 0.05);
}

#[test]
fn engine_without_interval_reports_point_estimates_only() {
    let truth = tiered_truth(4);
    let predictions = ScoreVector::new(truth.scores().to_vec());
    let report = MetricsEngine::new(IntervalPlan::None)
        .evaluate("oracle", &truth, &predictions)
        .expect("valid evaluation");

    assert!((report.correlation - 1.0).abs() < 1e-12);
    assert_eq!(report.mean_squared_error, 0.0);
    assert_eq!(report.confidence_interval, None);
    assert_eq!(report.interval_method, None);
}

#[test]
fn default_engine_scores_datasets_smaller_than_the_fold_count() {
    let truth = GroundTruth::new(
        vec![1.0, 0.6, 0.0],
        vec![MatchTier::High, MatchTier::Medium, MatchTier::Low],
    )
    .expect("aligned ground truth");
    let predictions = ScoreVector::new(vec![1.0, 0.6, 0.0]);

    let report = MetricsEngine::default()
        .evaluate("toy", &truth, &predictions)
        .expect("small datasets still evaluate");
    assert!((report.correlation - 1.0).abs() < 1e-12);
    assert_eq!(report.mean_squared_error, 0.0);
    assert_eq!(report.confidence_interval, None);
    assert!(report.fold_correlations.is_empty());
}

#[test]
fn single_pair_folds_yield_no_interval() {
    let truth = tiered_truth(1);
    let predictions = noisy_predictions(&truth);
    let report = MetricsEngine::default()
        .evaluate("noisy", &truth, &predictions)
        .expect("valid evaluation");
    assert_eq!(report.confidence_interval, None);
    assert_eq!(report.interval_method, Some(IntervalMethod::StratifiedKFold));
}

#[test]
fn engine_still_rejects_fewer_than_two_folds() {
    let truth = tiered_truth(4);
    let predictions = noisy_predictions(&truth);
    let error = MetricsEngine::new(IntervalPlan::StratifiedKFold { folds: 1, seed: 3 })
        .evaluate("noisy", &truth, &predictions)
        .expect_err("one fold is not a partition");
    assert!(matches!(error, EvalError::InvalidFolds { .. }));
}

#[test]
fn engine_rejects_misaligned_predictions() {
    let truth = tiered_truth(2);
    let error = MetricsEngine::default()
        .evaluate("short", &truth, &ScoreVector::new(vec![0.5; 3]))
        .expect_err("length mismatch");
    assert!(matches!(error, EvalError::LengthMismatch { .. }));
}

proptest! {
    #[test]
    fn spearman_ignores_strictly_increasing_transforms(
        values in prop::collection::vec(0.0f64..1.0, 4..40),
        scale in 0.1f64..10.0,
        shift in -5.0f64..5.0,
    ) {
        let truth = (0..values.len()).map(|index| index as f64).collect::<Vec<f64>>();
        let first = values[0];
        prop_assume!(values.iter().any(|value| *value != first));

        let transformed = values
            .iter()
            .map(|value| (value * scale + shift).exp())
            .collect::<Vec<f64>>();
        let original = spearman(&truth, &values).expect("non-degenerate");
        let mapped = spearman(&truth, &transformed).expect("non-degenerate");
        prop_assert!((original - mapped).abs() < 1e-9);
    }
}
