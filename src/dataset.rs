use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::catalog::canonical_score;
use crate::error::EvalError;
use crate::metrics::GroundTruth;
use crate::model::{DocumentPair, MatchTier};
use crate::util::write_json_pretty;

const SCORE_TOLERANCE: f64 = 1e-9;

pub fn load_dataset(path: &Path) -> Result<Vec<DocumentPair>> {
    if !path.exists() {
        return Err(EvalError::DatasetNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset: {}", path.display()))?;
    let pairs = serde_json::from_str::<Vec<DocumentPair>>(&raw)
        .with_context(|| format!("failed to parse dataset: {}", path.display()))?;
    validate_pairs(&pairs).with_context(|| format!("invalid dataset: {}", path.display()))?;
    Ok(pairs)
}

pub fn write_dataset(path: &Path, pairs: &[DocumentPair]) -> Result<()> {
    write_json_pretty(path, &pairs)
}

/// Checks ids are unique, texts are present and each score matches its tier.
pub fn validate_pairs(pairs: &[DocumentPair]) -> Result<(), EvalError> {
    if pairs.is_empty() {
        return Err(EvalError::InvalidDataset {
            reason: "dataset has no pairs".to_string(),
        });
    }

    let mut ids = HashSet::with_capacity(pairs.len());
    for pair in pairs {
        if !ids.insert(pair.id) {
            return Err(EvalError::InvalidDataset {
                reason: format!("duplicate pair id {}", pair.id),
            });
        }
        if pair.source_text.trim().is_empty() || pair.target_text.trim().is_empty() {
            return Err(EvalError::InvalidDataset {
                reason: format!("pair {} has an empty document", pair.id),
            });
        }

        let expected = canonical_score(pair.ground_truth_label);
        if (pair.ground_truth_score - expected).abs() > SCORE_TOLERANCE {
            return Err(EvalError::InvalidDataset {
                reason: format!(
                    "pair {} labelled {} has score {} (expected {expected})",
                    pair.id, pair.ground_truth_label, pair.ground_truth_score
                ),
            });
        }
    }
    Ok(())
}

pub fn ground_truth(pairs: &[DocumentPair]) -> Result<GroundTruth, EvalError> {
    GroundTruth::new(
        pairs.iter().map(|pair| pair.ground_truth_score).collect(),
        pairs
            .iter()
            .map(|pair| pair.ground_truth_label)
            .collect::<Vec<MatchTier>>(),
    )
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::catalog::RoleCatalog;
    use crate::generator::{DatasetGenerator, GeneratorConfig};

    fn generated() -> Vec<DocumentPair> {
        DatasetGenerator::new(RoleCatalog::default())
            .expect("default catalog")
            .generate(&GeneratorConfig {
                seed: Some(42),
                variants_per_tier: 2,
            })
            .expect("generation succeeds")
            .pairs
    }

    #[test]
    fn generated_dataset_survives_a_file_round_trip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("dataset.json");
        let pairs = generated();

        write_dataset(&path, &pairs).expect("write dataset");
        let loaded = load_dataset(&path).expect("load dataset");
        assert_eq!(loaded, pairs);
    }

    #[test]
    fn missing_file_reports_dataset_not_found() {
        let dir = tempdir().expect("tempdir");
        let error = load_dataset(&dir.path().join("absent.json")).expect_err("missing dataset");
        assert!(matches!(
            error.downcast_ref::<EvalError>(),
            Some(EvalError::DatasetNotFound { .. })
        ));
    }

    #[test]
    fn mismatched_tier_score_is_rejected() {
        let mut pairs = generated();
        pairs[0].ground_truth_score = 0.5;
        assert!(matches!(
            validate_pairs(&pairs),
            Err(EvalError::InvalidDataset { .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut pairs = generated();
        pairs[1].id = pairs[0].id;
        let error = validate_pairs(&pairs).expect_err("duplicate ids");
        assert!(error.to_string().contains("duplicate pair id"));
    }

    #[test]
    fn ground_truth_follows_dataset_order() {
        let pairs = generated();
        let truth = ground_truth(&pairs).expect("aligned");
        assert_eq!(truth.len(), pairs.len());
        assert_eq!(truth.scores()[0], pairs[0].ground_truth_score);
        assert_eq!(truth.labels()[0], pairs[0].ground_truth_label);
    }
}
