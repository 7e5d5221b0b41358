//! RSI (Relative Strength Index) with Wilder's smoothing.
//!
//! The first average gain/loss is the mean of the first n changes; after
//! that avg = (prev_avg * (n-1) + current) / n.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), or 100 when avg_loss == 0.
//! Warmup: the first n values are NaN.

pub fn calculate_rsi(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() <= period {
        return out;
    }

    let change = |i: usize| values[i] - values[i - 1];
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..=period {
        let c = change(i);
        if c > 0.0 {
            avg_gain += c;
        } else {
            avg_loss -= c;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = rsi_value(avg_gain, avg_loss);

    for i in (period + 1)..values.len() {
        let c = change(i);
        let (gain, loss) = if c > 0.0 { (c, 0.0) } else { (0.0, -c) };
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
