use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, ensure_same_len};
use crate::optimizer::SweepPoint;

/// Tolerance used for the `alpha + beta == 1` simplex invariant.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchTier {
    #[serde(rename = "High")]
    High,
    #[serde(rename = "Medium-High")]
    MediumHigh,
    #[serde(rename = "Medium")]
    Medium,
    #[serde(rename = "Low-Medium")]
    LowMedium,
    #[serde(rename = "Low")]
    Low,
}

impl MatchTier {
    pub const ALL: [MatchTier; 5] = [
        MatchTier::High,
        MatchTier::MediumHigh,
        MatchTier::Medium,
        MatchTier::LowMedium,
        MatchTier::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::MediumHigh => "Medium-High",
            Self::Medium => "Medium",
            Self::LowMedium => "Low-Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labeled source/target pair. Consumed read-only once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DocumentPairRecord")]
pub struct DocumentPair {
    pub id: u64,
    pub source_text: String,
    pub target_text: String,
    pub ground_truth_label: MatchTier,
    pub ground_truth_score: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl DocumentPair {
    #[cfg(test)]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

// Accepts the legacy `resume_text`/`jd_text` layout with top-level role/level tags.
#[derive(Deserialize)]
struct DocumentPairRecord {
    id: u64,
    #[serde(alias = "resume_text")]
    source_text: String,
    #[serde(alias = "jd_text")]
    target_text: String,
    ground_truth_label: MatchTier,
    ground_truth_score: f64,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    level: Option<String>,
}

impl From<DocumentPairRecord> for DocumentPair {
    fn from(record: DocumentPairRecord) -> Self {
        let mut metadata = record.metadata;
        if let Some(role) = record.role {
            metadata.entry("role".to_string()).or_insert(role);
        }
        if let Some(level) = record.level {
            metadata.entry("level".to_string()).or_insert(level);
        }

        Self {
            id: record.id,
            source_text: record.source_text,
            target_text: record.target_text,
            ground_truth_label: record.ground_truth_label,
            ground_truth_score: record.ground_truth_score,
            metadata,
        }
    }
}

/// Per-pair scores of one model, index-aligned with the dataset they came from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreVector(Vec<f64>);

impl ScoreVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn aligned(values: Vec<f64>, expected_len: usize) -> Result<Self, EvalError> {
        ensure_same_len(expected_len, values.len())?;
        Ok(Self(values))
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn select(&self, indices: &[usize]) -> Vec<f64> {
        indices.iter().map(|index| self.0[*index]).collect()
    }
}

impl From<Vec<f64>> for ScoreVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightConfiguration {
    pub alpha: f64,
    pub beta: f64,
}

impl WeightConfiguration {
    /// Weights on the `alpha + beta = 1` simplex.
    pub fn simplex(alpha: f64) -> Result<Self, EvalError> {
        let weights = Self {
            alpha,
            beta: 1.0 - alpha,
        };
        weights.validate_simplex()?;
        Ok(weights)
    }

    /// Unconstrained weights, for exercising the combiner off the simplex.
    #[cfg(test)]
    pub fn relaxed(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    pub fn is_simplex(&self) -> bool {
        (0.0..=1.0).contains(&self.alpha)
            && (0.0..=1.0).contains(&self.beta)
            && (self.alpha + self.beta - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
    }

    pub fn validate_simplex(&self) -> Result<(), EvalError> {
        if self.is_simplex() {
            Ok(())
        } else {
            Err(EvalError::InvalidWeights {
                alpha: self.alpha,
                beta: self.beta,
            })
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntervalMethod {
    StratifiedKFold,
    Bootstrap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub model_name: String,
    pub pair_count: usize,
    pub correlation: f64,
    pub mean_squared_error: f64,
    pub confidence_interval: Option<(f64, f64)>,
    pub interval_method: Option<IntervalMethod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fold_correlations: Vec<f64>,
    pub p_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeldOutFold {
    pub fold: usize,
    pub alpha: f64,
    pub train_correlation: f64,
    pub held_out_correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeldOutSummary {
    pub folds: Vec<HeldOutFold>,
    pub mean_held_out_correlation: f64,
}

/// Calibrated blend weights read by the serving layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationArtifact {
    pub alpha: f64,
    pub beta: f64,
    pub correlation: f64,
    #[serde(default)]
    pub grid_step: Option<f64>,
    #[serde(default)]
    pub lexical_fit: Option<String>,
    #[serde(default)]
    pub semantic_model_id: Option<String>,
    #[serde(default)]
    pub dataset_sha256: Option<String>,
    #[serde(default)]
    pub pair_count: Option<usize>,
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub held_out: Option<HeldOutSummary>,
}

impl CalibrationArtifact {
    pub fn weights(&self) -> Result<WeightConfiguration, EvalError> {
        let weights = WeightConfiguration {
            alpha: self.alpha,
            beta: self.beta,
        };
        weights.validate_simplex()?;
        Ok(weights)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub seed: u64,
    pub category_count: usize,
    pub variants_per_tier: usize,
    pub pair_count: usize,
    pub tier_counts: BTreeMap<String, usize>,
    pub dataset_path: String,
    pub dataset_sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub run_id: String,
    pub generated_at: String,
    pub dataset_path: String,
    pub dataset_sha256: String,
    pub lexical_fit: String,
    pub semantic_model_id: String,
    pub semantic_backend: String,
    pub embedding_dimensions: usize,
    pub interval: String,
    pub reports: Vec<MetricsReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightSweepManifest {
    pub generated_at: String,
    pub grid_step: f64,
    pub lexical_fit: String,
    pub semantic_model_id: String,
    pub dataset_sha256: String,
    pub points: Vec<SweepPoint>,
}
