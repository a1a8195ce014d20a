#[cfg(feature = "bert")]
mod bert;

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::EvalError;
use crate::similarity::{SimilarityAdapter, normalize_whitespace, normalized_pair};

pub const DEFAULT_MODEL_ID: &str = "local-hash-v1";
pub const SENTENCE_MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_DIM: usize = 384;
pub const DEFAULT_NORMALIZATION: &str = "l2";
pub const HASH_BACKEND: &str = "local-hash-v1";
pub const BERT_BACKEND: &str = "candle-bert";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticModelConfig {
    pub model_id: String,
    pub model_name: String,
    pub dimensions: usize,
    pub normalization: String,
    pub backend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,
}

impl SemanticModelConfig {
    /// Report label: pretrained sentence encoders are SBERT, the hash backend is not.
    pub fn report_name(&self) -> String {
        if self.model_dir.is_some() {
            format!("SBERT ({})", self.model_id)
        } else {
            format!("Semantic ({})", self.model_id)
        }
    }
}

/// Without `model_dir` the deterministic hash backend is used; with it, the
/// pretrained encoder stored there (requires the `bert` feature).
pub fn resolve_model_config(
    model_id: Option<&str>,
    model_dir: Option<&Path>,
) -> SemanticModelConfig {
    let requested = model_id.map(str::trim).filter(|value| !value.is_empty());

    match model_dir {
        Some(dir) => {
            let resolved_id = requested.unwrap_or(SENTENCE_MODEL_NAME);
            SemanticModelConfig {
                model_id: resolved_id.to_string(),
                model_name: resolved_id.to_string(),
                dimensions: DEFAULT_EMBEDDING_DIM,
                normalization: DEFAULT_NORMALIZATION.to_string(),
                backend: BERT_BACKEND.to_string(),
                model_dir: Some(dir.to_path_buf()),
            }
        }
        None => {
            let resolved_id = requested.unwrap_or(DEFAULT_MODEL_ID);
            SemanticModelConfig {
                model_id: resolved_id.to_string(),
                model_name: HASH_BACKEND.to_string(),
                dimensions: DEFAULT_EMBEDDING_DIM,
                normalization: DEFAULT_NORMALIZATION.to_string(),
                backend: HASH_BACKEND.to_string(),
                model_dir: None,
            }
        }
    }
}

/// Dense text encoder behind the semantic adapter.
///
/// Backends must be safe to call from several workers at once.
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>, EvalError>;
}

/// Deterministic feature-hashing encoder over unigram and bigram tokens.
#[derive(Debug, Clone)]
pub struct LocalHashEmbedder {
    dimensions: usize,
}

impl LocalHashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(8),
        }
    }
}

impl Embedder for LocalHashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EvalError> {
        let mut vector = vec![0_f32; self.dimensions];
        let tokens = hash_features(text);
        if tokens.is_empty() {
            return Ok(vector);
        }

        for token in &tokens {
            let hash = stable_hash(token);
            let index = (hash as usize) % self.dimensions;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            let weight = 1.0 + (((hash >> 48) & 0xFF) as f32 / 255.0);
            vector[index] += sign * weight;
        }

        normalize_vector(&mut vector);
        Ok(vector)
    }
}

/// The process's embedding model: loaded on first use, read-only afterwards.
///
/// Construct one per process and pass it by reference to every consumer. A
/// failed load is remembered and reported on every later call.
pub struct SemanticModel {
    config: SemanticModelConfig,
    backend: OnceLock<Result<Box<dyn Embedder>, String>>,
    loads: AtomicUsize,
}

impl fmt::Debug for SemanticModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticModel")
            .field("model_id", &self.config.model_id)
            .field("backend", &self.config.backend)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl SemanticModel {
    pub fn new(config: SemanticModelConfig) -> Self {
        Self {
            config,
            backend: OnceLock::new(),
            loads: AtomicUsize::new(0),
        }
    }

    /// Uses an already constructed backend instead of the configured one.
    #[cfg(test)]
    pub fn with_embedder(config: SemanticModelConfig, embedder: Box<dyn Embedder>) -> Self {
        Self {
            config,
            backend: OnceLock::from(Ok(embedder)),
            loads: AtomicUsize::new(1),
        }
    }

    pub fn config(&self) -> &SemanticModelConfig {
        &self.config
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.backend.get(), Some(Ok(_)))
    }

    pub fn embedder(&self) -> Result<&dyn Embedder, EvalError> {
        let backend = self.backend.get_or_init(|| {
            self.loads.fetch_add(1, Ordering::Relaxed);
            info!(
                model_id = %self.config.model_id,
                model_name = %self.config.model_name,
                backend = %self.config.backend,
                "loading semantic model"
            );
            load_backend(&self.config).map_err(|err| err.to_string())
        });

        match backend {
            Ok(embedder) => Ok(&**embedder),
            Err(reason) => Err(EvalError::ModelLoad {
                reason: reason.clone(),
            }),
        }
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EvalError> {
        self.embedder()?.embed(text)
    }
}

fn load_backend(config: &SemanticModelConfig) -> Result<Box<dyn Embedder>, EvalError> {
    match &config.model_dir {
        None => Ok(Box::new(LocalHashEmbedder::new(config.dimensions))),
        Some(dir) => load_pretrained(dir),
    }
}

#[cfg(feature = "bert")]
fn load_pretrained(dir: &Path) -> Result<Box<dyn Embedder>, EvalError> {
    Ok(Box::new(bert::BertEmbedder::load(dir)?))
}

#[cfg(not(feature = "bert"))]
fn load_pretrained(dir: &Path) -> Result<Box<dyn Embedder>, EvalError> {
    Err(EvalError::ModelLoad {
        reason: format!("{} needs a build with the `bert` feature enabled", dir.display()),
    })
}

/// Cosine similarity of the two documents' embeddings.
pub struct SemanticAdapter<'m> {
    name: String,
    model: &'m SemanticModel,
}

impl<'m> SemanticAdapter<'m> {
    pub fn new(model: &'m SemanticModel) -> Self {
        Self {
            name: model.config().report_name(),
            model,
        }
    }
}

impl SimilarityAdapter for SemanticAdapter<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, source_text: &str, target_text: &str) -> Result<f64, EvalError> {
        let (source, target) = normalized_pair(source_text, target_text)?;
        let source_embedding = self.model.embed(&source)?;
        let target_embedding = self.model.embed(&target)?;
        Ok(cosine_similarity(&source_embedding, &target_embedding))
    }
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut left_norm = 0.0_f64;
    let mut right_norm = 0.0_f64;
    for (left_value, right_value) in left.iter().zip(right.iter()) {
        let (left_value, right_value) = (f64::from(*left_value), f64::from(*right_value));
        dot += left_value * right_value;
        left_norm += left_value * left_value;
        right_norm += right_value * right_value;
    }

    if left_norm <= 0.0 || right_norm <= 0.0 {
        return 0.0;
    }
    dot / (left_norm.sqrt() * right_norm.sqrt())
}

fn stable_hash(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn hash_features(payload: &str) -> Vec<String> {
    let normalized = normalize_whitespace(payload);
    if normalized.is_empty() {
        return Vec::new();
    }

    let words = normalized
        .split(' ')
        .map(|value| {
            value
                .chars()
                .filter(|character| character.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|value| !value.is_empty())
        .collect::<Vec<String>>();

    let mut features = Vec::<String>::with_capacity(words.len() * 2);
    for (index, word) in words.iter().enumerate() {
        features.push(format!("w:{word}"));
        if let Some(next) = words.get(index + 1) {
            features.push(format!("b:{word}_{next}"));
        }
    }
    features
}

fn normalize_vector(values: &mut [f32]) {
    let squared_norm = values
        .iter()
        .map(|value| f64::from(*value) * f64::from(*value))
        .sum::<f64>();

    if squared_norm <= 0.0 {
        return;
    }

    let norm = squared_norm.sqrt() as f32;
    for value in values {
        *value /= norm;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    struct CountingEmbedder {
        calls: Arc<AtomicUsize>,
    }

    impl Embedder for CountingEmbedder {
        fn dimensions(&self) -> usize {
            2
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, EvalError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(if text.contains("python") {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            })
        }
    }

    #[test]
    fn resolve_model_config_defaults_blank_ids() {
        let config = resolve_model_config(Some("   "), None);
        assert_eq!(config.model_id, DEFAULT_MODEL_ID);
        assert_eq!(config.model_name, HASH_BACKEND);
        assert_eq!(config.backend, HASH_BACKEND);
        assert_eq!(config.dimensions, DEFAULT_EMBEDDING_DIM);

        let custom = resolve_model_config(Some("custom-model"), None);
        assert_eq!(custom.model_id, "custom-model");
        assert_eq!(custom.backend, HASH_BACKEND);
    }

    #[test]
    fn hash_backend_is_not_reported_as_sbert() {
        let model = SemanticModel::new(resolve_model_config(None, None));
        let adapter = SemanticAdapter::new(&model);
        assert_eq!(adapter.name(), "Semantic (local-hash-v1)");
        assert_ne!(model.config().model_name, SENTENCE_MODEL_NAME);
    }

    #[test]
    fn model_dir_selects_the_pretrained_encoder() {
        let config = resolve_model_config(None, Some(Path::new("models/minilm")));
        assert_eq!(config.model_id, SENTENCE_MODEL_NAME);
        assert_eq!(config.backend, BERT_BACKEND);
        assert_eq!(config.report_name(), format!("SBERT ({SENTENCE_MODEL_NAME})"));
    }

    #[test]
    fn unusable_model_dir_fails_every_comparison() {
        let dir = tempfile::tempdir().expect("tempdir");
        let model = SemanticModel::new(resolve_model_config(None, Some(dir.path())));
        let adapter = SemanticAdapter::new(&model);

        for _ in 0..2 {
            let error = adapter.score("rust", "rust jobs").expect_err("empty model dir");
            assert!(matches!(error, EvalError::ModelLoad { .. }));
        }
        assert!(!model.is_loaded());
        assert_eq!(model.load_count(), 1);
    }

    #[test]
    fn local_embeddings_are_deterministic_and_unit_length() {
        let embedder = LocalHashEmbedder::new(DEFAULT_EMBEDDING_DIM);
        let first = embedder.embed("Senior Rust engineer").expect("embed");
        let second = embedder.embed("senior  rust engineer").expect("embed");
        assert_eq!(first, second);

        let norm = first.iter().map(|value| value * value).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn model_loads_once_across_many_comparisons() {
        let model = SemanticModel::new(resolve_model_config(None, None));
        assert!(!model.is_loaded());
        assert_eq!(model.load_count(), 0);

        let adapter = SemanticAdapter::new(&model);
        for _ in 0..25 {
            adapter
                .score("Python developer", "Hiring Python developer")
                .expect("score");
        }

        assert!(model.is_loaded());
        assert_eq!(model.load_count(), 1);
    }

    #[test]
    fn injected_embedder_drives_the_adapter() {
        let calls = Arc::new(AtomicUsize::new(0));
        let model = SemanticModel::with_embedder(
            resolve_model_config(Some("mock"), None),
            Box::new(CountingEmbedder {
                calls: Arc::clone(&calls),
            }),
        );
        let adapter = SemanticAdapter::new(&model);

        let aligned = adapter.score("python", "python jobs").expect("score");
        let orthogonal = adapter.score("python", "cooking").expect("score");
        assert!((aligned - 1.0).abs() < 1e-12);
        assert_eq!(orthogonal, 0.0);
        assert_eq!(calls.load(Ordering::Relaxed), 4);
        assert_eq!(adapter.name(), "Semantic (mock)");
    }

    #[test]
    fn identical_texts_score_one() {
        let model = SemanticModel::new(resolve_model_config(None, None));
        let adapter = SemanticAdapter::new(&model);
        let score = adapter
            .score("DevOps engineer with Kubernetes", "DevOps engineer with Kubernetes")
            .expect("score");
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn semantic_adapter_rejects_empty_documents() {
        let model = SemanticModel::new(resolve_model_config(None, None));
        let adapter = SemanticAdapter::new(&model);
        let error = adapter.score("resume", "\n").expect_err("blank target");
        assert!(matches!(error, EvalError::EmptyInput { side: "target" }));
        assert!(!model.is_loaded(), "rejected input must not load the model");
    }

    #[test]
    fn cosine_handles_mismatched_and_zero_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[3.0, 4.0], &[6.0, 8.0]) - 1.0).abs() < 1e-12);
    }
}
