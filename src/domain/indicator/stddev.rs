//! Standard Deviation.
//!
//! Population standard deviation over n values (divides by n).
//! Warmup: first (n-1) values are NaN.

pub fn calculate_stddev(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }

    for i in (period - 1)..values.len() {
        out[i] = population_stddev(&values[i + 1 - period..=i]);
    }
    out
}

pub(crate) fn population_stddev(window: &[f64]) -> f64 {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
