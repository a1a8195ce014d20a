use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::info;

use super::WorkPaths;
use crate::catalog::RoleCatalog;
use crate::cli::GenerateArgs;
use crate::dataset::write_dataset;
use crate::generator::{DatasetGenerator, GeneratorConfig};
use crate::model::{DatasetManifest, DocumentPair, MatchTier};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

const DATASET_MANIFEST_VERSION: u32 = 1;

pub fn run(args: GenerateArgs) -> Result<()> {
    let paths = WorkPaths::new(&args.work_dir);
    let dataset_path = args.output.unwrap_or_else(|| paths.dataset());

    let generator =
        DatasetGenerator::new(RoleCatalog::default()).context("role catalog is invalid")?;
    info!(
        categories = generator.catalog().categories.len(),
        variants_per_tier = args.variants_per_tier,
        seed = ?args.seed,
        "generating synthetic dataset"
    );

    let generated = generator
        .generate(&GeneratorConfig {
            seed: args.seed,
            variants_per_tier: args.variants_per_tier,
        })
        .context("failed to generate dataset")?;

    write_dataset(&dataset_path, &generated.pairs)?;
    let dataset_sha256 = sha256_file(&dataset_path)?;

    let manifest = DatasetManifest {
        manifest_version: DATASET_MANIFEST_VERSION,
        generated_at: now_utc_string(),
        seed: generated.seed,
        category_count: generated.category_count,
        variants_per_tier: generated.variants_per_tier,
        pair_count: generated.pairs.len(),
        tier_counts: tier_counts(&generated.pairs),
        dataset_path: dataset_path.display().to_string(),
        dataset_sha256,
    };

    let manifest_path = paths.dataset_manifest();
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %dataset_path.display(), pairs = manifest.pair_count, seed = manifest.seed, "wrote dataset");
    info!(path = %manifest_path.display(), "wrote dataset manifest");

    Ok(())
}

fn tier_counts(pairs: &[DocumentPair]) -> BTreeMap<String, usize> {
    let mut counts = MatchTier::ALL
        .iter()
        .map(|tier| (tier.to_string(), 0usize))
        .collect::<BTreeMap<String, usize>>();
    for pair in pairs {
        *counts
            .entry(pair.ground_truth_label.to_string())
            .or_default() += 1;
    }
    counts
}
