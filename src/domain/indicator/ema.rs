//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the SMA of the first n defined values, then
//! EMA[i] = P[i]*k + EMA[i-1]*(1-k). Leading NaNs in the input are skipped,
//! so the EMA of a warm-up padded series (e.g. the MACD line) is well formed.

pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }

    let first = match values.iter().position(|v| !v.is_nan()) {
        Some(i) => i,
        None => return out,
    };
    if values.len() - first < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let seed_end = first + period - 1;
    let mut ema = values[first..=seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end] = ema;

    for i in (seed_end + 1)..values.len() {
        ema = values[i] * k + ema * (1.0 - k);
        out[i] = ema;
    }
    out
}
