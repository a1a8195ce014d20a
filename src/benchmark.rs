use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::EvalError;
use crate::hybrid::{combine_vectors, hybrid_name};
use crate::model::{DocumentPair, ScoreVector, WeightConfiguration};
use crate::similarity::SimilarityAdapter;

/// One model to score in a benchmark run.
pub enum ScorerSpec<'a> {
    Adapter(&'a dyn SimilarityAdapter),
    Hybrid {
        name: Option<String>,
        lexical: &'a dyn SimilarityAdapter,
        semantic: &'a dyn SimilarityAdapter,
        weights: WeightConfiguration,
    },
}

impl<'a> ScorerSpec<'a> {
    pub fn hybrid(
        lexical: &'a dyn SimilarityAdapter,
        semantic: &'a dyn SimilarityAdapter,
        weights: WeightConfiguration,
    ) -> Self {
        Self::Hybrid {
            name: None,
            lexical,
            semantic,
            weights,
        }
    }

    pub fn named_hybrid(
        name: impl Into<String>,
        lexical: &'a dyn SimilarityAdapter,
        semantic: &'a dyn SimilarityAdapter,
        weights: WeightConfiguration,
    ) -> Self {
        Self::Hybrid {
            name: Some(name.into()),
            lexical,
            semantic,
            weights,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Adapter(adapter) => adapter.name().to_string(),
            Self::Hybrid {
                name: Some(name), ..
            } => name.clone(),
            Self::Hybrid { weights, .. } => hybrid_name(*weights),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedScores {
    pub name: String,
    pub scores: ScoreVector,
}

/// Scores every pair of a dataset with each requested model.
///
/// Component vectors are cached by adapter name for the lifetime of the
/// runner, so hybrids reuse what their components already scored. Names must
/// be unique: a second adapter under a cached name is rejected.
pub struct BenchmarkRunner<'d> {
    pairs: &'d [DocumentPair],
    cache: HashMap<String, CachedScores>,
}

struct CachedScores {
    adapter: usize,
    scores: ScoreVector,
}

impl<'d> BenchmarkRunner<'d> {
    pub fn new(pairs: &'d [DocumentPair]) -> Self {
        Self {
            pairs,
            cache: HashMap::new(),
        }
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn component(&mut self, adapter: &dyn SimilarityAdapter) -> Result<ScoreVector, EvalError> {
        let identity = std::ptr::from_ref(adapter).cast::<()>() as usize;
        if let Some(cached) = self.cache.get(adapter.name()) {
            if cached.adapter != identity {
                return Err(EvalError::DuplicateAdapter {
                    name: adapter.name().to_string(),
                });
            }
            debug!(adapter = adapter.name(), "reusing cached component scores");
            return Ok(cached.scores.clone());
        }

        let scores = score_adapter(self.pairs, adapter)?;
        self.cache.insert(
            adapter.name().to_string(),
            CachedScores {
                adapter: identity,
                scores: scores.clone(),
            },
        );
        Ok(scores)
    }

    pub fn run(&mut self, specs: &[ScorerSpec<'_>]) -> Result<Vec<NamedScores>, EvalError> {
        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            let scores = match spec {
                ScorerSpec::Adapter(adapter) => self.component(*adapter)?,
                ScorerSpec::Hybrid {
                    lexical,
                    semantic,
                    weights,
                    ..
                } => {
                    weights.validate_simplex()?;
                    let lexical_scores = self.component(*lexical)?;
                    let semantic_scores = self.component(*semantic)?;
                    combine_vectors(&lexical_scores, &semantic_scores, *weights)?
                }
            };

            let name = spec.name();
            info!(model = %name, pairs = scores.len(), "scored model");
            results.push(NamedScores { name, scores });
        }
        Ok(results)
    }
}

/// Scores each pair in order; the first adapter error aborts the whole vector.
pub fn score_adapter(
    pairs: &[DocumentPair],
    adapter: &dyn SimilarityAdapter,
) -> Result<ScoreVector, EvalError> {
    let scores = pairs
        .iter()
        .map(|pair| adapter.score(&pair.source_text, &pair.target_text))
        .collect::<Result<Vec<f64>, EvalError>>()?;
    ScoreVector::aligned(scores, pairs.len())
}
