use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EvalError, ensure_same_len};
use crate::hybrid::combine_vectors;
use crate::metrics::{complement, spearman};
use crate::model::{HeldOutFold, HeldOutSummary, ScoreVector, WeightConfiguration};

pub const DEFAULT_GRID_STEP: f64 = 0.05;

// A later grid point must beat the incumbent by more than this to replace it.
const IMPROVEMENT_EPSILON: f64 = 1e-12;

const STEP_TOLERANCE: f64 = 1e-9;

/// Evenly spaced alphas `i / steps` on `[0, 1]`, with `beta = 1 - alpha`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightGrid {
    step: f64,
    steps: usize,
}

impl WeightGrid {
    pub fn new(step: f64) -> Result<Self, EvalError> {
        if !step.is_finite() || step <= 0.0 || step > 1.0 {
            return Err(EvalError::InvalidGrid {
                reason: format!("step must lie in (0, 1], got {step}"),
            });
        }

        let exact = 1.0 / step;
        let steps = exact.round().max(1.0);
        if (exact - steps).abs() > STEP_TOLERANCE * steps {
            return Err(EvalError::InvalidGrid {
                reason: format!("step {step} does not divide [0, 1] evenly"),
            });
        }
        Ok(Self {
            step,
            steps: steps as usize,
        })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn len(&self) -> usize {
        self.steps + 1
    }

    pub fn points(&self) -> impl Iterator<Item = WeightConfiguration> + '_ {
        (0..=self.steps).map(|index| {
            let alpha = index as f64 / self.steps as f64;
            WeightConfiguration {
                alpha,
                beta: 1.0 - alpha,
            }
        })
    }
}

impl Default for WeightGrid {
    fn default() -> Self {
        Self {
            step: DEFAULT_GRID_STEP,
            steps: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub alpha: f64,
    pub beta: f64,
    /// `None` when the blended vector carried no rank information.
    pub correlation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationOutcome {
    pub weights: WeightConfiguration,
    pub correlation: f64,
    pub sweep: Vec<SweepPoint>,
}

/// Exhaustive search for the blend that maximizes Spearman correlation.
///
/// Operates on precomputed component vectors only; nothing is re-scored.
pub fn grid_search(
    grid: &WeightGrid,
    lexical: &ScoreVector,
    semantic: &ScoreVector,
    ground_truth: &[f64],
) -> Result<OptimizationOutcome, EvalError> {
    ensure_same_len(ground_truth.len(), lexical.len())?;
    ensure_same_len(ground_truth.len(), semantic.len())?;
    ensure_informative(ground_truth)?;

    let mut sweep = Vec::with_capacity(grid.len());
    let mut best: Option<(WeightConfiguration, f64)> = None;

    for weights in grid.points() {
        let blended = combine_vectors(lexical, semantic, weights)?;
        let correlation = match spearman(ground_truth, blended.values()) {
            Ok(rho) => Some(rho),
            Err(err) if err.is_degenerate() => {
                debug!(alpha = weights.alpha, error = %err, "skipping degenerate grid point");
                None
            }
            Err(err) => return Err(err),
        };

        if let Some(rho) = correlation {
            let improves = match best {
                Some((_, incumbent)) => rho > incumbent + IMPROVEMENT_EPSILON,
                None => true,
            };
            if improves {
                best = Some((weights, rho));
            }
        }

        sweep.push(SweepPoint {
            alpha: weights.alpha,
            beta: weights.beta,
            correlation,
        });
    }

    let Some((weights, correlation)) = best else {
        return Err(EvalError::degenerate(
            "no grid point produced a usable correlation",
        ));
    };

    Ok(OptimizationOutcome {
        weights,
        correlation,
        sweep,
    })
}

/// Nested search: for each fold, choose alpha on the other folds and score it on this one.
pub fn held_out_search(
    grid: &WeightGrid,
    lexical: &ScoreVector,
    semantic: &ScoreVector,
    ground_truth: &[f64],
    folds: &[Vec<usize>],
) -> Result<HeldOutSummary, EvalError> {
    ensure_same_len(ground_truth.len(), lexical.len())?;
    ensure_same_len(ground_truth.len(), semantic.len())?;

    let total = ground_truth.len();
    let mut results = Vec::with_capacity(folds.len());
    for (fold_index, fold) in folds.iter().enumerate() {
        let train = complement(fold, total);
        let train_truth = train.iter().map(|index| ground_truth[*index]).collect::<Vec<f64>>();
        let trained = match grid_search(
            grid,
            &ScoreVector::new(lexical.select(&train)),
            &ScoreVector::new(semantic.select(&train)),
            &train_truth,
        ) {
            Ok(outcome) => outcome,
            Err(err) if err.is_degenerate() => {
                warn!(fold = fold_index, error = %err, "skipping fold with degenerate training split");
                continue;
            }
            Err(err) => return Err(err),
        };

        let held_truth = fold.iter().map(|index| ground_truth[*index]).collect::<Vec<f64>>();
        let held_blend = combine_vectors(
            &ScoreVector::new(lexical.select(fold)),
            &ScoreVector::new(semantic.select(fold)),
            trained.weights,
        )?;
        let held_out_correlation = match spearman(&held_truth, held_blend.values()) {
            Ok(rho) => rho,
            Err(err) if err.is_degenerate() => {
                warn!(fold = fold_index, error = %err, "skipping degenerate held-out fold");
                continue;
            }
            Err(err) => return Err(err),
        };

        debug!(
            fold = fold_index,
            alpha = trained.weights.alpha,
            train_correlation = trained.correlation,
            held_out_correlation,
            "evaluated held-out fold"
        );
        results.push(HeldOutFold {
            fold: fold_index,
            alpha: trained.weights.alpha,
            train_correlation: trained.correlation,
            held_out_correlation,
        });
    }

    if results.is_empty() {
        return Err(EvalError::degenerate("no fold produced a held-out correlation"));
    }

    let mean_held_out_correlation = results
        .iter()
        .map(|fold| fold.held_out_correlation)
        .sum::<f64>()
        / results.len() as f64;
    info!(
        folds = results.len(),
        mean_held_out_correlation, "held-out evaluation complete"
    );

    Ok(HeldOutSummary {
        folds: results,
        mean_held_out_correlation,
    })
}

fn ensure_informative(ground_truth: &[f64]) -> Result<(), EvalError> {
    if ground_truth.len() < 2 {
        return Err(EvalError::degenerate(format!(
            "ground truth needs at least two values, got {}",
            ground_truth.len()
        )));
    }
    let first = ground_truth[0];
    if ground_truth.iter().all(|value| *value == first) {
        return Err(EvalError::degenerate("ground truth has zero variance"));
    }
    Ok(())
}
