use crate::error::{EvalError, ensure_same_len};

/// 1-based ranks; tied values share the average of the ranks they span.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order = (0..values.len()).collect::<Vec<usize>>();
    order.sort_by(|left, right| values[*left].total_cmp(&values[*right]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0usize;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }

        // positions start..end hold ranks start+1..=end
        let shared = (start + end + 1) as f64 / 2.0;
        for index in &order[start..end] {
            ranks[*index] = shared;
        }
        start = end;
    }
    ranks
}

pub fn pearson(left: &[f64], right: &[f64]) -> Result<f64, EvalError> {
    ensure_same_len(left.len(), right.len())?;
    if left.len() < 2 {
        return Err(EvalError::degenerate(format!(
            "correlation needs at least two values, got {}",
            left.len()
        )));
    }

    let n = left.len() as f64;
    let mean_left = left.iter().sum::<f64>() / n;
    let mean_right = right.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance_left = 0.0;
    let mut variance_right = 0.0;
    for (left_value, right_value) in left.iter().zip(right) {
        let dl = left_value - mean_left;
        let dr = right_value - mean_right;
        covariance += dl * dr;
        variance_left += dl * dl;
        variance_right += dr * dr;
    }

    if variance_left <= 0.0 {
        return Err(EvalError::degenerate("first sequence has zero variance"));
    }
    if variance_right <= 0.0 {
        return Err(EvalError::degenerate("second sequence has zero variance"));
    }

    Ok((covariance / (variance_left.sqrt() * variance_right.sqrt())).clamp(-1.0, 1.0))
}

/// Spearman rank correlation of predictions against ground truth.
pub fn spearman(ground_truth: &[f64], predictions: &[f64]) -> Result<f64, EvalError> {
    ensure_same_len(ground_truth.len(), predictions.len())?;
    ensure_finite("ground truth", ground_truth)?;
    ensure_finite("predictions", predictions)?;

    if is_constant(ground_truth) {
        return Err(EvalError::degenerate("ground truth has zero variance"));
    }
    if is_constant(predictions) {
        return Err(EvalError::degenerate("predictions have zero variance"));
    }

    pearson(&average_ranks(ground_truth), &average_ranks(predictions))
}

pub fn mean_squared_error(ground_truth: &[f64], predictions: &[f64]) -> Result<f64, EvalError> {
    ensure_same_len(ground_truth.len(), predictions.len())?;
    if ground_truth.is_empty() {
        return Ok(0.0);
    }

    let total = ground_truth
        .iter()
        .zip(predictions)
        .map(|(expected, predicted)| (expected - predicted).powi(2))
        .sum::<f64>();
    Ok(total / ground_truth.len() as f64)
}

fn is_constant(values: &[f64]) -> bool {
    match values.first() {
        Some(first) => values.iter().all(|value| value == first),
        None => true,
    }
}

fn ensure_finite(label: &str, values: &[f64]) -> Result<(), EvalError> {
    match values.iter().position(|value| !value.is_finite()) {
        Some(index) => Err(EvalError::degenerate(format!(
            "{label} contains a non-finite value at index {index}"
        ))),
        None => Ok(()),
    }
}
