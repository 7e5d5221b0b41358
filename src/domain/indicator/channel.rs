//! Price channel detectors.

/// Binary detector: 1.0 when the value is the highest of the last `period`
/// values (ties count), 0.0 otherwise. NaN during warmup.
pub fn calculate_highest_close(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }

    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        let highest = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        out[i] = if values[i] >= highest { 1.0 } else { 0.0 };
    }
    out
}
