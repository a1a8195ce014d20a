use crate::error::EvalError;

/// Maps a (source, target) document pair to a similarity score.
///
/// Implementations hold no per-call mutable state; the only shared resource is
/// an embedding backend that loads once and is read-only afterwards.
pub trait SimilarityAdapter {
    fn name(&self) -> &str;

    fn score(&self, source_text: &str, target_text: &str) -> Result<f64, EvalError>;
}

impl<T: SimilarityAdapter + ?Sized> SimilarityAdapter for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn score(&self, source_text: &str, target_text: &str) -> Result<f64, EvalError> {
        (**self).score(source_text, target_text)
    }
}

pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Normalizes both sides of a comparison, rejecting empty documents.
pub fn normalized_pair(source_text: &str, target_text: &str) -> Result<(String, String), EvalError> {
    let source = normalize_whitespace(source_text);
    if source.is_empty() {
        return Err(EvalError::EmptyInput { side: "source" });
    }

    let target = normalize_whitespace(target_text);
    if target.is_empty() {
        return Err(EvalError::EmptyInput { side: "target" });
    }

    Ok((source, target))
}
