use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::warn;

use super::rank::spearman;
use super::stats::mean_and_standard_deviation;
use crate::error::{EvalError, ensure_same_len};

pub const DEFAULT_FOLDS: usize = 5;
pub const DEFAULT_FOLD_SEED: u64 = 0x5EED_F01D;

const Z_95: f64 = 1.96;

/// Splits indices into `k` folds that each keep the label proportions.
///
/// Indices are shuffled within each label, then dealt round-robin; the deal
/// position carries over between labels so fold sizes differ by at most one.
pub fn stratified_folds<L: Ord>(
    labels: &[L],
    k: usize,
    seed: u64,
) -> Result<Vec<Vec<usize>>, EvalError> {
    if k < 2 {
        return Err(EvalError::InvalidFolds {
            reason: format!("need at least 2 folds, got {k}"),
        });
    }
    if k > labels.len() {
        return Err(EvalError::InvalidFolds {
            reason: format!("{k} folds requested for {} pairs", labels.len()),
        });
    }

    let mut groups = BTreeMap::<&L, Vec<usize>>::new();
    for (index, label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(index);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds = vec![Vec::<usize>::new(); k];
    let mut position = 0usize;
    for indices in groups.values_mut() {
        indices.shuffle(&mut rng);
        for index in indices.iter() {
            folds[position % k].push(*index);
            position += 1;
        }
    }

    for fold in &mut folds {
        fold.sort_unstable();
    }
    Ok(folds)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoldInterval {
    pub fold_correlations: Vec<f64>,
    pub mean: f64,
    pub low: f64,
    pub high: f64,
}

/// Held-out correlation per fold, summarized as `mean ± 1.96·sd/√k`.
///
/// Folds whose subset has no rank variance are skipped; fewer than two
/// usable folds yields `None`.
pub fn cross_validated_interval(
    ground_truth: &[f64],
    predictions: &[f64],
    folds: &[Vec<usize>],
) -> Result<Option<FoldInterval>, EvalError> {
    ensure_same_len(ground_truth.len(), predictions.len())?;

    let mut fold_correlations = Vec::with_capacity(folds.len());
    for (fold_index, fold) in folds.iter().enumerate() {
        let truth = fold.iter().map(|index| ground_truth[*index]).collect::<Vec<f64>>();
        let predicted = fold.iter().map(|index| predictions[*index]).collect::<Vec<f64>>();
        match spearman(&truth, &predicted) {
            Ok(rho) => fold_correlations.push(rho),
            Err(err) if err.is_degenerate() => {
                warn!(fold = fold_index, size = fold.len(), error = %err, "skipping degenerate fold");
            }
            Err(err) => return Err(err),
        }
    }

    if fold_correlations.len() < 2 {
        return Ok(None);
    }

    let Some((mean, sd)) = mean_and_standard_deviation(&fold_correlations) else {
        return Ok(None);
    };
    let half_width = Z_95 * sd / (fold_correlations.len() as f64).sqrt();

    Ok(Some(FoldInterval {
        fold_correlations,
        mean,
        low: (mean - half_width).clamp(-1.0, 1.0),
        high: (mean + half_width).clamp(-1.0, 1.0),
    }))
}

/// Indices not in `fold`, in ascending order.
pub fn complement(fold: &[usize], total: usize) -> Vec<usize> {
    let mut held_out = vec![false; total];
    for index in fold {
        held_out[*index] = true;
    }
    (0..total).filter(|index| !held_out[*index]).collect()
}
