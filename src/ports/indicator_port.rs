//! Indicator registry port trait.
//!
//! The evaluators never compute indicator math themselves; they ask a
//! registry for a series aligned 1:1 with the bars, with `NaN` wherever the
//! indicator is undefined (typically its warm-up window).

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::query::IndicatorSpec;

pub trait IndicatorRegistry {
    fn exists(&self, id: &str) -> bool;

    /// `None` when the indicator id is unknown. Otherwise the returned
    /// series has exactly `bars.len()` entries.
    fn compute(&self, spec: &IndicatorSpec, bars: &[OhlcvBar]) -> Option<Vec<f64>>;
}
