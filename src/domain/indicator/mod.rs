//! Built-in indicator registry.
//!
//! Every indicator produces a `Vec<f64>` aligned 1:1 with the input bars.
//! Bars inside an indicator's warm-up window hold `NaN`, which the
//! evaluators treat as "undefined here".
//!
//! Supported ids and parameters:
//! - `open`, `high`, `low`, `close`, `volume`: raw bar fields
//! - `sma`, `ema`, `wma`, `rsi`, `roc`, `stddev`, `atr`, `volume_sma`: `period`
//! - `obv`: no parameters
//! - `macd`: `fast`, `slow`, `signal`, `field` (0 line, 1 signal, 2 histogram)
//! - `bollinger`: `period`, `mult`, `band` (1 upper, 0 middle, -1 lower)
//! - `highest_close`: binary, 1 when the close is the highest of `period` closes

pub mod atr;
pub mod bollinger;
pub mod channel;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod wma;

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::query::IndicatorSpec;
use crate::ports::indicator_port::IndicatorRegistry;

pub const INDICATOR_IDS: [&str; 17] = [
    "open",
    "high",
    "low",
    "close",
    "volume",
    "sma",
    "ema",
    "wma",
    "rsi",
    "roc",
    "stddev",
    "atr",
    "obv",
    "macd",
    "bollinger",
    "volume_sma",
    "highest_close",
];

/// Registry backed by the indicator modules in this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRegistry;

impl IndicatorRegistry for BuiltinRegistry {
    fn exists(&self, id: &str) -> bool {
        INDICATOR_IDS.contains(&id)
    }

    fn compute(&self, spec: &IndicatorSpec, bars: &[OhlcvBar]) -> Option<Vec<f64>> {
        let closes = || bars.iter().map(|b| b.close).collect::<Vec<f64>>();

        let series = match spec.id.as_str() {
            "open" => bars.iter().map(|b| b.open).collect(),
            "high" => bars.iter().map(|b| b.high).collect(),
            "low" => bars.iter().map(|b| b.low).collect(),
            "close" => closes(),
            "volume" => bars.iter().map(|b| b.volume).collect(),
            "sma" => sma::calculate_sma(&closes(), spec.period(20)),
            "ema" => ema::calculate_ema(&closes(), spec.period(20)),
            "wma" => wma::calculate_wma(&closes(), spec.period(20)),
            "rsi" => rsi::calculate_rsi(&closes(), spec.period(14)),
            "roc" => roc::calculate_roc(&closes(), spec.period(10)),
            "stddev" => stddev::calculate_stddev(&closes(), spec.period(20)),
            "atr" => atr::calculate_atr(bars, spec.period(14)),
            "obv" => obv::calculate_obv(bars),
            "macd" => {
                let params = macd::MacdParams {
                    fast: spec.count_param("fast", macd::DEFAULT_FAST),
                    slow: spec.count_param("slow", macd::DEFAULT_SLOW),
                    signal: spec.count_param("signal", macd::DEFAULT_SIGNAL),
                };
                let lines = macd::calculate_macd(&closes(), params);
                match spec.param("field", 0.0) as i64 {
                    1 => lines.signal,
                    2 => lines.histogram,
                    _ => lines.line,
                }
            }
            "bollinger" => {
                let bands =
                    bollinger::calculate_bollinger(&closes(), spec.period(20), spec.param("mult", 2.0));
                let band = spec.param("band", 0.0);
                if band > 0.0 {
                    bands.upper
                } else if band < 0.0 {
                    bands.lower
                } else {
                    bands.middle
                }
            }
            "volume_sma" => {
                let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
                sma::calculate_sma(&volumes, spec.period(20))
            }
            "highest_close" => channel::calculate_highest_close(&closes(), spec.period(20)),
            _ => return None,
        };
        Some(series)
    }
}

#[cfg(test)]
pub(crate) fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    use chrono::{Duration, NaiveDate};

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            date: start + Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        })
        .collect()
}
