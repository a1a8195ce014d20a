use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{IntervalMethod, MetricsReport};
use crate::util::ensure_directory;

const RULE_WIDTH: usize = 30;

/// Renders one run as text: a header, then one block per model.
pub fn render_run(run_id: &str, timestamp: &str, reports: &[MetricsReport]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Benchmark run {run_id} ({timestamp}) ===");
    for report in reports {
        let _ = writeln!(out, "--- {} Results ---", report.model_name);
        let _ = writeln!(out, "Spearman Correlation: {:.4}", report.correlation);
        let _ = writeln!(out, "Mean Squared Error:   {:.4}", report.mean_squared_error);
        if let Some(p_value) = report.p_value {
            let _ = writeln!(out, "p-value:              {p_value:.4}");
        }
        if let Some((low, high)) = report.confidence_interval {
            let method = match report.interval_method {
                Some(IntervalMethod::StratifiedKFold) => "k-fold",
                Some(IntervalMethod::Bootstrap) => "bootstrap",
                None => "unspecified",
            };
            let _ = writeln!(out, "95% CI ({method}):    [{low:.4}, {high:.4}]");
        }
        let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
    }
    out
}

/// Appends a completed run to the log in a single write; earlier runs are never rewritten.
pub fn append_run(
    path: &Path,
    run_id: &str,
    timestamp: &str,
    reports: &[MetricsReport],
) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let block = render_run(run_id, timestamp, reports);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open results log: {}", path.display()))?;
    file.write_all(block.as_bytes())
        .with_context(|| format!("failed to append results log: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn report(name: &str, correlation: f64) -> MetricsReport {
        MetricsReport {
            model_name: name.to_string(),
            pair_count: 100,
            correlation,
            mean_squared_error: 0.125,
            confidence_interval: Some((0.61, 0.79)),
            interval_method: Some(IntervalMethod::StratifiedKFold),
            fold_correlations: vec![0.7; 5],
            p_value: Some(0.0),
        }
    }

    #[test]
    fn blocks_follow_the_results_layout() {
        let text = render_run("20261017T120000Z", "2026-10-17T12:00:00Z", &[report("SBERT", 0.7)]);
        assert!(text.starts_with("=== Benchmark run 20261017T120000Z"));
        assert!(text.contains("--- SBERT Results ---\n"));
        assert!(text.contains("Spearman Correlation: 0.7000\n"));
        assert!(text.contains("Mean Squared Error:   0.1250\n"));
        assert!(text.contains("95% CI (k-fold):    [0.6100, 0.7900]\n"));
        assert!(text.ends_with(&format!("{}\n", "-".repeat(30))));
    }

    #[test]
    fn appending_preserves_earlier_runs() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("logs").join("benchmark_results.txt");

        append_run(&path, "run-a", "t1", &[report("TF-IDF", 0.5)]).expect("first append");
        let first = fs::read_to_string(&path).expect("read log");
        append_run(&path, "run-b", "t2", &[report("Hybrid", 0.8)]).expect("second append");
        let second = fs::read_to_string(&path).expect("read log");

        assert!(second.starts_with(&first));
        assert!(second.contains("run-b"));
        assert_eq!(second.matches("=== Benchmark run").count(), 2);
    }
}
