//! MACD (Moving Average Convergence Divergence).
//!
//! Line = EMA(fast) - EMA(slow); Signal = EMA(signal) of the line;
//! Histogram = Line - Signal. The line is NaN until the slow EMA is seeded,
//! signal and histogram until the signal EMA is seeded.

use crate::domain::indicator::ema::calculate_ema;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST,
            slow: DEFAULT_SLOW,
            signal: DEFAULT_SIGNAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MacdLines {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn calculate_macd(values: &[f64], params: MacdParams) -> MacdLines {
    let fast = calculate_ema(values, params.fast);
    let slow = calculate_ema(values, params.slow);

    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = calculate_ema(&line, params.signal);
    let histogram = line.iter().zip(&signal).map(|(l, s)| l - s).collect();

    MacdLines {
        line,
        signal,
        histogram,
    }
}
