use crate::error::{EvalError, ensure_same_len};
use crate::model::{ScoreVector, WeightConfiguration};

/// `alpha * lexical + beta * semantic`, unclipped.
pub fn combine(lexical_score: f64, semantic_score: f64, weights: WeightConfiguration) -> f64 {
    weights.alpha * lexical_score + weights.beta * semantic_score
}

pub fn combine_vectors(
    lexical: &ScoreVector,
    semantic: &ScoreVector,
    weights: WeightConfiguration,
) -> Result<ScoreVector, EvalError> {
    ensure_same_len(lexical.len(), semantic.len())?;
    Ok(lexical
        .values()
        .iter()
        .zip(semantic.values())
        .map(|(lexical_score, semantic_score)| combine(*lexical_score, *semantic_score, weights))
        .collect::<Vec<f64>>()
        .into())
}

pub fn hybrid_name(weights: WeightConfiguration) -> String {
    format!("Hybrid (a={:.2}, b={:.2})", weights.alpha, weights.beta)
}
