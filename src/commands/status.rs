use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::WorkPaths;
use crate::cli::StatusArgs;
use crate::model::{BenchmarkReport, CalibrationArtifact, DatasetManifest};
use crate::util::{read_json_optional, sha256_file};

pub fn run(args: StatusArgs) -> Result<()> {
    let paths = WorkPaths::new(&args.work_dir);
    info!(work_dir = %paths.root().display(), "status requested");

    match read_json_optional::<DatasetManifest>(&paths.dataset_manifest())? {
        Some(manifest) => {
            let fresh = dataset_matches_manifest(&manifest)?;
            info!(
                generated_at = %manifest.generated_at,
                seed = manifest.seed,
                pairs = manifest.pair_count,
                categories = manifest.category_count,
                tiers = ?manifest.tier_counts,
                fresh,
                "loaded dataset manifest"
            );
            if !fresh {
                warn!(path = %manifest.dataset_path, "dataset differs from its manifest");
            }
        }
        None => warn!(path = %paths.dataset_manifest().display(), "dataset manifest missing"),
    }

    match read_json_optional::<CalibrationArtifact>(&paths.calibration())? {
        Some(artifact) => info!(
            alpha = artifact.alpha,
            beta = artifact.beta,
            correlation = artifact.correlation,
            lexical_fit = %artifact.lexical_fit.unwrap_or_default(),
            model_id = %artifact.semantic_model_id.unwrap_or_default(),
            held_out_mean = ?artifact.held_out.map(|summary| summary.mean_held_out_correlation),
            generated_at = %artifact.generated_at.unwrap_or_default(),
            "loaded calibration artifact"
        ),
        None => warn!(path = %paths.calibration().display(), "calibration artifact missing"),
    }

    match read_json_optional::<BenchmarkReport>(&paths.benchmark_report())? {
        Some(report) => {
            info!(
                run_id = %report.run_id,
                generated_at = %report.generated_at,
                models = report.reports.len(),
                "loaded latest benchmark report"
            );
            for entry in &report.reports {
                info!(
                    model = %entry.model_name,
                    spearman = %format!("{:.4}", entry.correlation),
                    mse = %format!("{:.4}", entry.mean_squared_error),
                    "benchmark result"
                );
            }
        }
        None => warn!(path = %paths.benchmark_report().display(), "benchmark report missing"),
    }

    let log_path = paths.results_log();
    if log_path.exists() {
        let log = fs::read_to_string(&log_path)
            .with_context(|| format!("failed to read {}", log_path.display()))?;
        info!(
            path = %log_path.display(),
            runs = log.matches("=== Benchmark run").count(),
            "results log"
        );
    } else {
        warn!(path = %log_path.display(), "results log missing");
    }

    Ok(())
}

/// Whether the dataset the manifest points at still hashes to the recorded digest.
fn dataset_matches_manifest(manifest: &DatasetManifest) -> Result<bool> {
    let dataset_path = Path::new(&manifest.dataset_path);
    if !dataset_path.exists() {
        return Ok(false);
    }
    Ok(sha256_file(dataset_path)? == manifest.dataset_sha256)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::cli::GenerateArgs;
    use crate::commands::generate;

    #[test]
    fn status_tolerates_an_empty_work_dir() {
        let dir = tempdir().expect("tempdir");
        run(StatusArgs {
            work_dir: dir.path().to_path_buf(),
        })
        .expect("status succeeds without artifacts");
    }

    #[test]
    fn freshness_follows_the_recorded_dataset_path() {
        let dir = tempdir().expect("tempdir");
        let elsewhere = dir.path().join("custom").join("pairs.json");
        generate::run(GenerateArgs {
            work_dir: dir.path().to_path_buf(),
            output: Some(elsewhere.clone()),
            seed: Some(11),
            variants_per_tier: 1,
        })
        .expect("generate succeeds");

        let paths = WorkPaths::new(dir.path());
        let manifest = read_json_optional::<DatasetManifest>(&paths.dataset_manifest())
            .expect("manifest parses")
            .expect("manifest exists");
        assert!(!paths.dataset().exists());
        assert!(dataset_matches_manifest(&manifest).expect("hash dataset"));

        fs::write(&elsewhere, "[]").expect("overwrite dataset");
        assert!(!dataset_matches_manifest(&manifest).expect("hash dataset"));
    }
}
