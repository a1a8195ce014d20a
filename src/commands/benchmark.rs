use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use super::{WorkPaths, load_fingerprinted};
use crate::benchmark::{BenchmarkRunner, ScorerSpec};
use crate::cli::{BenchmarkArgs, IntervalMode};
use crate::dataset::ground_truth;
use crate::lexical::{KeywordJaccardAdapter, LexicalFit, TfidfAdapter};
use crate::metrics::{IntervalPlan, MetricsEngine};
use crate::model::{BenchmarkReport, CalibrationArtifact, MetricsReport, WeightConfiguration};
use crate::results_log::append_run;
use crate::semantic::{SemanticAdapter, SemanticModel, resolve_model_config};
use crate::util::{now_utc_string, read_json_optional, utc_compact_string, write_json_pretty};

pub fn run(args: BenchmarkArgs) -> Result<()> {
    let paths = WorkPaths::new(&args.work_dir);
    let dataset_path = args.dataset.clone().unwrap_or_else(|| paths.dataset());
    let dataset = load_fingerprinted(dataset_path)?;
    let truth = ground_truth(&dataset.pairs).context("failed to collect ground truth")?;

    let fit = LexicalFit::from(args.lexical_fit);
    let tfidf = TfidfAdapter::for_dataset(&dataset.pairs, fit)
        .context("failed to build TF-IDF adapter")?
        .with_name(format!("TF-IDF (Baseline, {} fit)", fit.as_str()));
    if let Some(vocabulary) = tfidf.vocabulary_len() {
        info!(vocabulary, fit = tfidf.fit().as_str(), "fitted TF-IDF vocabulary");
    }

    let model = SemanticModel::new(resolve_model_config(
        args.model_id.as_deref(),
        args.model_dir.as_deref(),
    ));
    let semantic = SemanticAdapter::new(&model);
    let jaccard = if args.with_jaccard {
        Some(KeywordJaccardAdapter::new().context("failed to build Jaccard adapter")?)
    } else {
        None
    };

    let weights = WeightConfiguration::simplex(args.alpha)
        .with_context(|| format!("invalid --alpha {}", args.alpha))?;
    let calibration = if args.use_calibration {
        load_calibration(&paths.calibration(), fit)?
    } else {
        None
    };

    let mut specs = vec![
        ScorerSpec::Adapter(&tfidf),
        ScorerSpec::Adapter(&semantic),
        ScorerSpec::hybrid(&tfidf, &semantic, weights),
    ];
    if let Some(calibrated) = calibration {
        specs.push(ScorerSpec::named_hybrid(
            format!(
                "Hybrid calibrated (a={:.2}, b={:.2})",
                calibrated.alpha, calibrated.beta
            ),
            &tfidf,
            &semantic,
            calibrated,
        ));
    }
    if let Some(jaccard) = &jaccard {
        specs.push(ScorerSpec::Adapter(jaccard));
    }

    let mut runner = BenchmarkRunner::new(&dataset.pairs);
    let scored = runner.run(&specs).context("benchmark scoring failed")?;
    let embedding_dimensions = model.embedder()?.dimensions();
    info!(
        model_id = %model.config().model_id,
        dimensions = embedding_dimensions,
        loads = model.load_count(),
        "semantic scoring complete"
    );

    let engine = MetricsEngine::new(interval_plan(&args));
    let reports = scored
        .iter()
        .map(|result| {
            engine
                .evaluate(&result.name, &truth, &result.scores)
                .with_context(|| format!("failed to evaluate {}", result.name))
        })
        .collect::<Result<Vec<MetricsReport>>>()?;

    for report in &reports {
        info!(
            model = %report.model_name,
            spearman = %format!("{:.4}", report.correlation),
            mse = %format!("{:.4}", report.mean_squared_error),
            p_value = ?report.p_value,
            interval = ?report.confidence_interval,
            "model results"
        );
    }

    let now = Utc::now();
    let run_id = utc_compact_string(now);
    let report = BenchmarkReport {
        run_id: run_id.clone(),
        generated_at: now_utc_string(),
        dataset_path: dataset.path.display().to_string(),
        dataset_sha256: dataset.sha256,
        lexical_fit: fit.as_str().to_string(),
        semantic_model_id: model.config().model_id.clone(),
        semantic_backend: model.config().backend.clone(),
        embedding_dimensions,
        interval: args.interval.as_str().to_string(),
        reports,
    };

    let log_path = paths.results_log();
    append_run(&log_path, &run_id, &report.generated_at, &report.reports)?;
    let report_path = paths.benchmark_report();
    write_json_pretty(&report_path, &report)?;
    info!(path = %log_path.display(), "appended results log");
    info!(path = %report_path.display(), models = report.reports.len(), "wrote benchmark report");

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&report).context("failed to render benchmark report")?;
        println!("{rendered}");
    }

    Ok(())
}

pub fn interval_plan(args: &BenchmarkArgs) -> IntervalPlan {
    match args.interval {
        IntervalMode::Cv => IntervalPlan::StratifiedKFold {
            folds: args.folds,
            seed: args.seed,
        },
        IntervalMode::Bootstrap => IntervalPlan::Bootstrap {
            iterations: args.bootstrap_iterations,
            seed: args.seed,
        },
        IntervalMode::None => IntervalPlan::None,
    }
}

fn load_calibration(path: &Path, fit: LexicalFit) -> Result<Option<WeightConfiguration>> {
    let Some(artifact) = read_json_optional::<CalibrationArtifact>(path)? else {
        warn!(path = %path.display(), "calibration artifact missing; skipping calibrated hybrid");
        return Ok(None);
    };

    let calibrated_fit = artifact.lexical_fit.as_deref().unwrap_or(fit.as_str());
    if calibrated_fit != fit.as_str() {
        warn!(
            calibrated_fit,
            benchmark_fit = fit.as_str(),
            "calibration was fitted with a different lexical fit"
        );
    }

    let weights = artifact
        .weights()
        .with_context(|| format!("invalid calibration artifact: {}", path.display()))?;
    info!(
        alpha = weights.alpha,
        beta = weights.beta,
        correlation = artifact.correlation,
        "loaded calibration artifact"
    );
    Ok(Some(weights))
}
