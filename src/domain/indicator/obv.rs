//! OBV (On-Balance Volume).
//!
//! OBV[0] = volume[0]; each later bar adds its volume on an up close,
//! subtracts it on a down close and carries the total on an unchanged close.
//! No warmup.

use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_obv(bars: &[OhlcvBar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut obv = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            obv = bar.volume;
        } else if bar.close > bars[i - 1].close {
            obv += bar.volume;
        } else if bar.close < bars[i - 1].close {
            obv -= bar.volume;
        }
        out.push(obv);
    }
    out
}
