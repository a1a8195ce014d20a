use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::rank::spearman;

/// Two-sided p-value for Spearman's rho via the t approximation with `n - 2` dof.
pub fn spearman_p_value(rho: f64, n: usize) -> Option<f64> {
    if n < 3 || !rho.is_finite() {
        return None;
    }

    let dof = (n - 2) as f64;
    let rho_squared = rho * rho;
    if rho_squared >= 1.0 {
        return Some(0.0);
    }

    let t_squared = rho_squared * dof / (1.0 - rho_squared);
    let x = dof / (dof + t_squared);
    Some(regularized_incomplete_beta(x, dof / 2.0, 0.5).clamp(0.0, 1.0))
}

/// Percentile 95% interval of Spearman's rho over paired resamples.
pub fn bootstrap_spearman_interval_95(
    ground_truth: &[f64],
    predictions: &[f64],
    iterations: usize,
    seed: u64,
) -> Option<(f64, f64)> {
    let n = ground_truth.len();
    if n < 2 || n != predictions.len() || iterations == 0 {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut estimates = Vec::<f64>::with_capacity(iterations);
    let mut sample_truth = vec![0.0; n];
    let mut sample_predictions = vec![0.0; n];
    for _ in 0..iterations {
        for slot in 0..n {
            let index = rng.random_range(0..n);
            sample_truth[slot] = ground_truth[index];
            sample_predictions[slot] = predictions[index];
        }

        // resamples that collapse to a constant sequence carry no rank information
        if let Ok(rho) = spearman(&sample_truth, &sample_predictions) {
            estimates.push(rho);
        }
    }

    if estimates.is_empty() {
        return None;
    }

    estimates.sort_by(|left, right| left.total_cmp(right));
    let count = estimates.len();
    let low_index = ((count as f64) * 0.025).floor() as usize;
    let high_index = ((count as f64) * 0.975).ceil() as usize;
    let low = estimates[low_index.min(count - 1)];
    let high = estimates[high_index.saturating_sub(1).min(count - 1)];
    Some((low, high))
}

pub fn mean_and_standard_deviation(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() == 1 {
        return Some((mean, 0.0));
    }

    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    Some((mean, variance.sqrt()))
}

fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let log_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = log_front.exp();

    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(x, a, b) / a
    } else {
        1.0 - front * beta_continued_fraction(1.0 - x, b, a) / b
    }
}

// Lentz evaluation of the incomplete beta continued fraction.
fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    const MAX_ITERATIONS: usize = 300;
    const EPSILON: f64 = 1e-14;
    const TINY: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }
    h
}

fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 6] = [
        76.180_091_729_471_46,
        -86.505_320_329_416_77,
        24.014_098_240_830_91,
        -1.231_739_572_450_155,
        0.120_865_097_386_617_9e-2,
        -0.539_523_938_495_3e-5,
    ];

    let mut y = x;
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut series = 1.000_000_000_190_015;
    for coefficient in COEFFICIENTS {
        y += 1.0;
        series += coefficient / y;
    }
    -tmp + (2.506_628_274_631_000_5 * series / x).ln()
}
