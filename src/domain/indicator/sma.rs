//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(P[i-n+1..=i]), maintained as a running window sum.
//! Warmup: first (n-1) values are NaN.

pub fn calculate_sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }

    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out[i] = sum / period as f64;
        }
    }
    out
}
