//! OHLCV bar representation.

use chrono::NaiveDate;

/// One trading bar. Series of bars are ordered by ascending date with no
/// duplicate dates; the last bar is "now".
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Percentage drop from open to close. Zero for green bars.
    pub fn decline_pct(&self) -> f64 {
        if self.open <= 0.0 || self.close >= self.open {
            return 0.0;
        }
        (self.open - self.close) / self.open * 100.0
    }
}

/// Index of the last bar dated on or before `date`.
pub fn last_index_on_or_before(bars: &[OhlcvBar], date: NaiveDate) -> Option<usize> {
    let count = bars.partition_point(|b| b.date <= date);
    count.checked_sub(1)
}

/// Mean volume over `bars`; NaN for an empty slice.
pub fn average_volume(bars: &[OhlcvBar]) -> f64 {
    if bars.is_empty() {
        return f64::NAN;
    }
    bars.iter().map(|b| b.volume).sum::<f64>() / bars.len() as f64
}
