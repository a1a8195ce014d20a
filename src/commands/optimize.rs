use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use super::{WorkPaths, load_fingerprinted};
use crate::benchmark::BenchmarkRunner;
use crate::cli::OptimizeArgs;
use crate::dataset::ground_truth;
use crate::error::EvalError;
use crate::lexical::{LexicalFit, TfidfAdapter};
use crate::metrics::stratified_folds;
use crate::model::{CalibrationArtifact, HeldOutSummary, WeightSweepManifest};
use crate::optimizer::{WeightGrid, grid_search, held_out_search};
use crate::semantic::{SemanticAdapter, SemanticModel, resolve_model_config};
use crate::util::{now_utc_string, write_json_pretty};

pub fn run(args: OptimizeArgs) -> Result<()> {
    let paths = WorkPaths::new(&args.work_dir);
    let grid = WeightGrid::new(args.step).with_context(|| format!("invalid --step {}", args.step))?;
    if args.folds < 2 {
        bail!("invalid --folds {}: need at least 2 folds", args.folds);
    }
    let dataset = load_fingerprinted(args.dataset.clone().unwrap_or_else(|| paths.dataset()))?;
    let truth = ground_truth(&dataset.pairs).context("failed to collect ground truth")?;

    let fit = LexicalFit::from(args.lexical_fit);
    let tfidf = TfidfAdapter::for_dataset(&dataset.pairs, fit)
        .context("failed to build TF-IDF adapter")?;
    let model = SemanticModel::new(resolve_model_config(
        args.model_id.as_deref(),
        args.model_dir.as_deref(),
    ));
    let semantic = SemanticAdapter::new(&model);

    let mut runner = BenchmarkRunner::new(&dataset.pairs);
    let lexical_scores = runner
        .component(&tfidf)
        .context("failed to score lexical component")?;
    let semantic_scores = runner
        .component(&semantic)
        .context("failed to score semantic component")?;
    info!(
        pairs = runner.pair_count(),
        grid_points = grid.len(),
        fit = args.lexical_fit.as_str(),
        "precomputed component scores"
    );

    let outcome = grid_search(&grid, &lexical_scores, &semantic_scores, truth.scores())
        .context("weight grid search failed")?;
    info!(
        alpha = outcome.weights.alpha,
        beta = outcome.weights.beta,
        correlation = %format!("{:.4}", outcome.correlation),
        "best weights found"
    );

    let held_out = stratified_folds(truth.labels(), args.folds, args.seed).and_then(|folds| {
        held_out_search(
            &grid,
            &lexical_scores,
            &semantic_scores,
            truth.scores(),
            &folds,
        )
    });
    let held_out = match held_out {
        Ok(summary) => Some(summary),
        Err(err) => skip_held_out(err)?,
    };

    let generated_at = now_utc_string();
    let artifact = CalibrationArtifact {
        alpha: outcome.weights.alpha,
        beta: outcome.weights.beta,
        correlation: outcome.correlation,
        grid_step: Some(grid.step()),
        lexical_fit: Some(fit.as_str().to_string()),
        semantic_model_id: Some(model.config().model_id.clone()),
        dataset_sha256: Some(dataset.sha256.clone()),
        pair_count: Some(dataset.pairs.len()),
        generated_at: Some(generated_at.clone()),
        held_out,
    };
    let sweep = WeightSweepManifest {
        generated_at,
        grid_step: grid.step(),
        lexical_fit: fit.as_str().to_string(),
        semantic_model_id: model.config().model_id.clone(),
        dataset_sha256: dataset.sha256.clone(),
        points: outcome.sweep,
    };

    let artifact_path = args.output.clone().unwrap_or_else(|| paths.calibration());
    let sweep_path = paths.weight_sweep();
    write_json_pretty(&artifact_path, &artifact)?;
    write_json_pretty(&sweep_path, &sweep)?;
    info!(path = %artifact_path.display(), "wrote calibration artifact");
    info!(path = %sweep_path.display(), points = sweep.points.len(), "wrote weight sweep");

    Ok(())
}

// The grid optimum is persisted even when the data cannot support held-out folds.
fn skip_held_out(err: EvalError) -> Result<Option<HeldOutSummary>> {
    match err {
        EvalError::InvalidFolds { .. } | EvalError::DegenerateInput { .. } => {
            warn!(error = %err, "held-out evaluation skipped");
            Ok(None)
        }
        other => Err(other).context("held-out evaluation failed"),
    }
}
