//! Correlation and error metrics of predictions against ground truth.

mod folds;
mod rank;
mod stats;
#[cfg(test)]
mod tests;

pub use folds::{DEFAULT_FOLD_SEED, DEFAULT_FOLDS, complement, stratified_folds};
pub use rank::spearman;

use folds::cross_validated_interval;
use rank::mean_squared_error;
use stats::{bootstrap_spearman_interval_95, spearman_p_value};

use tracing::{debug, warn};

use crate::error::{EvalError, ensure_same_len};
use crate::model::{IntervalMethod, MatchTier, MetricsReport, ScoreVector};

pub const DEFAULT_BOOTSTRAP_ITERATIONS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalPlan {
    None,
    StratifiedKFold { folds: usize, seed: u64 },
    Bootstrap { iterations: usize, seed: u64 },
}

impl Default for IntervalPlan {
    fn default() -> Self {
        Self::StratifiedKFold {
            folds: DEFAULT_FOLDS,
            seed: DEFAULT_FOLD_SEED,
        }
    }
}

/// Ground truth of one evaluation run, shared by every scored model.
#[derive(Debug, Clone)]
pub struct GroundTruth {
    scores: Vec<f64>,
    labels: Vec<MatchTier>,
}

impl GroundTruth {
    pub fn new(scores: Vec<f64>, labels: Vec<MatchTier>) -> Result<Self, EvalError> {
        ensure_same_len(scores.len(), labels.len())?;
        Ok(Self { scores, labels })
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn labels(&self) -> &[MatchTier] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    plan: IntervalPlan,
}

impl MetricsEngine {
    pub fn new(plan: IntervalPlan) -> Self {
        Self { plan }
    }

    pub fn evaluate(
        &self,
        model_name: &str,
        truth: &GroundTruth,
        predictions: &ScoreVector,
    ) -> Result<MetricsReport, EvalError> {
        ensure_same_len(truth.len(), predictions.len())?;
        let predicted = predictions.values();

        let correlation = spearman(truth.scores(), predicted)?;
        let mean_squared_error = mean_squared_error(truth.scores(), predicted)?;
        let p_value = spearman_p_value(correlation, truth.len());

        let (confidence_interval, interval_method, fold_correlations) = match self.plan {
            IntervalPlan::None => (None, None, Vec::new()),
            IntervalPlan::StratifiedKFold { folds, .. } if folds > truth.len() => {
                warn!(
                    model = model_name,
                    folds,
                    pairs = truth.len(),
                    "too few pairs for the requested folds; reporting no interval"
                );
                (None, Some(IntervalMethod::StratifiedKFold), Vec::new())
            }
            IntervalPlan::StratifiedKFold { folds, seed } => {
                let partition = stratified_folds(truth.labels(), folds, seed)?;
                match cross_validated_interval(truth.scores(), predicted, &partition)? {
                    Some(interval) => {
                        debug!(
                            model = model_name,
                            folds = interval.fold_correlations.len(),
                            fold_mean = interval.mean,
                            "cross-validated correlation"
                        );
                        (
                            Some((interval.low, interval.high)),
                            Some(IntervalMethod::StratifiedKFold),
                            interval.fold_correlations,
                        )
                    }
                    None => (None, Some(IntervalMethod::StratifiedKFold), Vec::new()),
                }
            }
            IntervalPlan::Bootstrap { iterations, seed } => (
                bootstrap_spearman_interval_95(truth.scores(), predicted, iterations, seed),
                Some(IntervalMethod::Bootstrap),
                Vec::new(),
            ),
        };

        debug!(
            model = model_name,
            correlation,
            mean_squared_error,
            "computed metrics"
        );

        Ok(MetricsReport {
            model_name: model_name.to_string(),
            pair_count: truth.len(),
            correlation,
            mean_squared_error,
            confidence_interval,
            interval_method,
            fold_correlations,
            p_value,
        })
    }
}
