pub mod benchmark;
pub mod generate;
pub mod optimize;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::dataset::load_dataset;
use crate::model::DocumentPair;
use crate::util::sha256_file;

/// Artifact locations under a work directory.
#[derive(Debug, Clone)]
pub struct WorkPaths {
    root: PathBuf,
}

impl WorkPaths {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dataset(&self) -> PathBuf {
        self.root.join("dataset.json")
    }

    pub fn calibration(&self) -> PathBuf {
        self.root.join("optimized_params.json")
    }

    pub fn results_log(&self) -> PathBuf {
        self.root.join("benchmark_results.txt")
    }

    pub fn dataset_manifest(&self) -> PathBuf {
        self.manifests().join("dataset_manifest.json")
    }

    pub fn weight_sweep(&self) -> PathBuf {
        self.manifests().join("weight_sweep.json")
    }

    pub fn benchmark_report(&self) -> PathBuf {
        self.manifests().join("benchmark_report.json")
    }

    fn manifests(&self) -> PathBuf {
        self.root.join("manifests")
    }
}

pub(crate) struct LoadedDataset {
    pub path: PathBuf,
    pub sha256: String,
    pub pairs: Vec<DocumentPair>,
}

pub(crate) fn load_fingerprinted(path: PathBuf) -> Result<LoadedDataset> {
    let pairs = load_dataset(&path)?;
    let sha256 = sha256_file(&path)?;
    info!(
        path = %path.display(),
        pairs = pairs.len(),
        sha256 = %sha256,
        "loaded dataset"
    );
    Ok(LoadedDataset {
        path,
        sha256,
        pairs,
    })
}

/// Writes a hand-sized dataset, one pair per listed tier, with overlap shrinking by tier.
#[cfg(test)]
pub(crate) fn write_tiered_dataset(path: &Path, tiers: &[crate::model::MatchTier]) {
    use crate::catalog::canonical_score;
    use crate::model::MatchTier;

    const TARGET: &str = "Hiring Rust engineer for tokio, serde, axum and postgres work";

    let pairs = tiers
        .iter()
        .enumerate()
        .map(|(index, tier)| {
            let source = match tier {
                MatchTier::High => TARGET,
                MatchTier::MediumHigh => "Rust engineer shipping tokio, serde, axum and postgres",
                MatchTier::Medium => "Rust engineer using tokio and serde",
                MatchTier::LowMedium => "Rust hobbyist who paints landscapes",
                MatchTier::Low => "Pastry chef baking croissants daily",
            };
            DocumentPair {
                id: index as u64 + 1,
                source_text: source.to_string(),
                target_text: TARGET.to_string(),
                ground_truth_label: *tier,
                ground_truth_score: canonical_score(*tier),
                metadata: Default::default(),
            }
        })
        .collect::<Vec<DocumentPair>>();
    crate::dataset::write_dataset(path, &pairs).expect("write dataset");
}
