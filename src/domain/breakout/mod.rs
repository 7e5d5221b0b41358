//! Consolidation-before-breakout classification.
//!
//! Both classifiers search windows of recent bars for a tight range that
//! followed a strong upward move on contracting volume. [`tiered`] assigns a
//! tradeable tier and stops at the first failing criterion; [`diagnostic`]
//! scores every criterion for research and near-miss review.

pub mod diagnostic;
pub mod tiered;
pub mod window;

use std::fmt;
use std::str::FromStr;

use crate::ports::config_port::ConfigPort;

pub use diagnostic::{
    CriterionCheck, DiagnosticResult, WindowDiagnosis, diagnose_breakout, diagnose_with_thresholds,
};
pub use tiered::{classify_breakout, classify_with_thresholds};
pub use window::{ConsolidationWindow, Criterion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScanContext {
    #[default]
    Swing,
    Positional,
}

impl ScanContext {
    pub fn id(self) -> &'static str {
        match self {
            ScanContext::Swing => "swing",
            ScanContext::Positional => "positional",
        }
    }
}

impl fmt::Display for ScanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ScanContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "swing" => Ok(ScanContext::Swing),
            "positional" => Ok(ScanContext::Positional),
            other => Err(format!("unknown scan context '{other}' (expected swing or positional)")),
        }
    }
}

/// Numeric constants for one scan context. Percentages are in percent
/// units (`10.0` means 10%), ratios are plain fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdsConfig {
    pub min_history_bars: usize,
    pub consolidation_min_days: usize,
    pub consolidation_max_days: usize,
    pub max_range_pct: f64,
    pub touch_tolerance_pct: f64,
    pub min_support_touches: usize,
    pub min_resistance_touches: usize,
    pub large_red_candle_pct: f64,
    pub prior_move_window: usize,
    pub prior_move_window_extended: usize,
    pub min_prior_move_pct: f64,
    pub min_prior_move_pct_relaxed: f64,
    pub prior_move_direction_pct: f64,
    pub max_volume_contraction_ratio: f64,
    pub max_volume_contraction_ratio_relaxed: f64,
    pub min_close_position: f64,
    pub min_breakout_volume_ratio: f64,
    pub breakout_buffer_pct: f64,
    pub volume_avg_window: usize,
    pub tier_2a_distance_pct: f64,
    pub tier_2b_distance_pct: f64,
}

impl ThresholdsConfig {
    pub fn swing() -> Self {
        Self {
            min_history_bars: 60,
            consolidation_min_days: 5,
            consolidation_max_days: 25,
            max_range_pct: 10.0,
            touch_tolerance_pct: 1.0,
            min_support_touches: 2,
            min_resistance_touches: 2,
            large_red_candle_pct: 5.0,
            prior_move_window: 20,
            prior_move_window_extended: 30,
            min_prior_move_pct: 15.0,
            min_prior_move_pct_relaxed: 10.0,
            prior_move_direction_pct: 50.0,
            max_volume_contraction_ratio: 0.75,
            max_volume_contraction_ratio_relaxed: 0.90,
            min_close_position: 0.5,
            min_breakout_volume_ratio: 1.5,
            breakout_buffer_pct: 0.5,
            volume_avg_window: 20,
            tier_2a_distance_pct: 2.0,
            tier_2b_distance_pct: 5.0,
        }
    }

    pub fn positional() -> Self {
        Self {
            min_history_bars: 120,
            consolidation_min_days: 10,
            consolidation_max_days: 60,
            max_range_pct: 15.0,
            touch_tolerance_pct: 1.5,
            min_support_touches: 2,
            min_resistance_touches: 2,
            large_red_candle_pct: 7.0,
            prior_move_window: 40,
            prior_move_window_extended: 60,
            min_prior_move_pct: 25.0,
            min_prior_move_pct_relaxed: 18.0,
            prior_move_direction_pct: 50.0,
            max_volume_contraction_ratio: 0.70,
            max_volume_contraction_ratio_relaxed: 0.85,
            min_close_position: 0.5,
            min_breakout_volume_ratio: 1.5,
            breakout_buffer_pct: 1.0,
            volume_avg_window: 20,
            tier_2a_distance_pct: 3.0,
            tier_2b_distance_pct: 8.0,
        }
    }

    pub fn for_context(context: ScanContext) -> Self {
        match context {
            ScanContext::Swing => Self::swing(),
            ScanContext::Positional => Self::positional(),
        }
    }

    /// Context defaults with per-key overrides from `[breakout.<context>]`.
    /// Count keys below 1 keep their default.
    pub fn from_config(config: &dyn ConfigPort, context: ScanContext) -> Self {
        let section = format!("breakout.{}", context.id());
        let mut t = Self::for_context(context);

        let count = |key: &str, default: usize| -> usize {
            let v = config.get_int(&section, key, default as i64);
            if v >= 1 { v as usize } else { default }
        };
        t.min_history_bars = count("min_history_bars", t.min_history_bars);
        t.consolidation_min_days = count("consolidation_min_days", t.consolidation_min_days);
        t.consolidation_max_days = count("consolidation_max_days", t.consolidation_max_days);
        t.min_support_touches = count("min_support_touches", t.min_support_touches);
        t.min_resistance_touches = count("min_resistance_touches", t.min_resistance_touches);
        t.prior_move_window = count("prior_move_window", t.prior_move_window);
        t.prior_move_window_extended =
            count("prior_move_window_extended", t.prior_move_window_extended);
        t.volume_avg_window = count("volume_avg_window", t.volume_avg_window);

        let num = |key: &str, default: f64| config.get_double(&section, key, default);
        t.max_range_pct = num("max_range_pct", t.max_range_pct);
        t.touch_tolerance_pct = num("touch_tolerance_pct", t.touch_tolerance_pct);
        t.large_red_candle_pct = num("large_red_candle_pct", t.large_red_candle_pct);
        t.min_prior_move_pct = num("min_prior_move_pct", t.min_prior_move_pct);
        t.min_prior_move_pct_relaxed = num("min_prior_move_pct_relaxed", t.min_prior_move_pct_relaxed);
        t.prior_move_direction_pct = num("prior_move_direction_pct", t.prior_move_direction_pct);
        t.max_volume_contraction_ratio =
            num("max_volume_contraction_ratio", t.max_volume_contraction_ratio);
        t.max_volume_contraction_ratio_relaxed = num(
            "max_volume_contraction_ratio_relaxed",
            t.max_volume_contraction_ratio_relaxed,
        );
        t.min_close_position = num("min_close_position", t.min_close_position);
        t.min_breakout_volume_ratio = num("min_breakout_volume_ratio", t.min_breakout_volume_ratio);
        t.breakout_buffer_pct = num("breakout_buffer_pct", t.breakout_buffer_pct);
        t.tier_2a_distance_pct = num("tier_2a_distance_pct", t.tier_2a_distance_pct);
        t.tier_2b_distance_pct = num("tier_2b_distance_pct", t.tier_2b_distance_pct);
        t
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Closed through resistance on volume.
    Tier1,
    /// Within the 2A distance of resistance.
    Tier2A,
    /// Within the 2B distance of resistance.
    Tier2B,
    NoMatch,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Tier1 => "tier 1",
            Tier::Tier2A => "tier 2A",
            Tier::Tier2B => "tier 2B",
            Tier::NoMatch => "no match",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatchReason {
    InsufficientHistory,
    NoConsolidation,
    TooFarFromBreakout,
}

impl fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NoMatchReason::InsufficientHistory => "insufficient history",
            NoMatchReason::NoConsolidation => "no qualifying consolidation",
            NoMatchReason::TooFarFromBreakout => "too far from breakout",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TierResult {
    pub tier: Tier,
    pub reason: Option<NoMatchReason>,
    pub window: Option<ConsolidationWindow>,
    /// `(high - close) / high * 100`; negative once price is above the high.
    pub distance_pct: Option<f64>,
    /// Current volume over the recent average.
    pub volume_ratio: Option<f64>,
}

impl TierResult {
    pub fn no_match(reason: NoMatchReason) -> Self {
        Self {
            tier: Tier::NoMatch,
            reason: Some(reason),
            window: None,
            distance_pct: None,
            volume_ratio: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.tier != Tier::NoMatch
    }
}

/// Bars shaped as a 15-bar 3.4% consolidation (indices 54..=68) after a 22%
/// twenty-bar advance, followed by one current bar.
#[cfg(test)]
pub(crate) fn consolidation_fixture(
    current_close: f64,
    current_volume: f64,
    window_volume: f64,
) -> Vec<crate::domain::ohlcv::OhlcvBar> {
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::{Duration, NaiveDate};

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let bar = |i: usize, open: f64, high: f64, low: f64, close: f64, volume: f64| OhlcvBar {
        date: start + Duration::days(i as i64),
        open,
        high,
        low,
        close,
        volume,
    };

    let mut bars = Vec::with_capacity(70);
    for i in 0..34 {
        bars.push(bar(i, 80.0, 80.5, 79.5, 80.0, 1000.0));
    }
    for k in 0..20 {
        let open = 81.0 + 0.9 * k as f64;
        let close = open + 0.9;
        bars.push(bar(34 + k, open, close, open, close, 1000.0));
    }
    for k in 0..15 {
        let (open, close) = if k % 2 == 0 { (101.0, 102.0) } else { (102.0, 101.0) };
        bars.push(bar(54 + k, open, 103.0, 99.6, close, window_volume));
    }
    bars.push(bar(
        69,
        102.0,
        current_close.max(102.0) + 0.5,
        current_close.min(102.0) - 0.5,
        current_close,
        current_volume,
    ));
    bars
}
