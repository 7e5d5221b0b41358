//! Window geometry and the per-window measurements shared by both
//! classifiers.

use std::fmt;

use chrono::NaiveDate;

use super::ThresholdsConfig;
use crate::domain::ohlcv::{OhlcvBar, average_volume};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    Range,
    SupportTouches,
    ResistanceTouches,
    NoLargeRedCandle,
    PriorMove,
    PriorMoveDirection,
    VolumeContraction,
    ClosePosition,
}

impl Criterion {
    pub const ALL: [Criterion; 8] = [
        Criterion::Range,
        Criterion::SupportTouches,
        Criterion::ResistanceTouches,
        Criterion::NoLargeRedCandle,
        Criterion::PriorMove,
        Criterion::PriorMoveDirection,
        Criterion::VolumeContraction,
        Criterion::ClosePosition,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Criterion::Range => "range_pct",
            Criterion::SupportTouches => "support_touches",
            Criterion::ResistanceTouches => "resistance_touches",
            Criterion::NoLargeRedCandle => "largest_red_candle_pct",
            Criterion::PriorMove => "prior_move_pct",
            Criterion::PriorMoveDirection => "prior_move_direction_pct",
            Criterion::VolumeContraction => "volume_contraction_ratio",
            Criterion::ClosePosition => "close_position",
        }
    }

    /// True when `actual` must stay at or below `required`.
    pub fn is_ceiling(self) -> bool {
        matches!(
            self,
            Criterion::Range | Criterion::NoLargeRedCandle | Criterion::VolumeContraction
        )
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A candidate consolidation: bars `start..=end` of the series.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationWindow {
    pub start: usize,
    pub end: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub high: f64,
    pub low: f64,
    pub range_pct: f64,
}

impl ConsolidationWindow {
    pub fn from_bars(bars: &[OhlcvBar], start: usize, end: usize) -> Self {
        let slice = &bars[start..=end];
        let (high, low) = extremes(slice);
        Self {
            start,
            end,
            start_date: slice[0].date,
            end_date: slice[slice.len() - 1].date,
            high,
            low,
            range_pct: range_pct(high, low),
        }
    }

    pub fn days(&self) -> usize {
        self.end - self.start + 1
    }

    /// Tighter range first, then the longer window.
    pub fn is_better_than(&self, other: &ConsolidationWindow) -> bool {
        self.range_pct < other.range_pct
            || (self.range_pct == other.range_pct && self.days() > other.days())
    }
}

/// `(start, end)` pairs for every candidate window. All windows end on the
/// bar before the current one; shorter windows come first.
pub fn candidate_windows(bar_count: usize, t: &ThresholdsConfig) -> Vec<(usize, usize)> {
    if bar_count < 2 {
        return Vec::new();
    }
    let end = bar_count - 2;
    (t.consolidation_min_days.max(1)..=t.consolidation_max_days)
        .filter(|&days| days <= end + 1)
        .map(|days| (end + 1 - days, end))
        .collect()
}

/// `(highest high, lowest low)` of a non-empty slice.
pub fn extremes(bars: &[OhlcvBar]) -> (f64, f64) {
    bars.iter().fold((f64::MIN, f64::MAX), |(h, l), b| {
        (h.max(b.high), l.min(b.low))
    })
}

pub fn range_pct(high: f64, low: f64) -> f64 {
    if low <= 0.0 {
        return f64::INFINITY;
    }
    (high - low) / low * 100.0
}

pub fn support_touches(window: &[OhlcvBar], low: f64, tolerance_pct: f64) -> usize {
    if low <= 0.0 {
        return 0;
    }
    window
        .iter()
        .filter(|b| (b.low - low) / low * 100.0 <= tolerance_pct)
        .count()
}

pub fn resistance_touches(window: &[OhlcvBar], high: f64, tolerance_pct: f64) -> usize {
    if high <= 0.0 {
        return 0;
    }
    window
        .iter()
        .filter(|b| (high - b.high) / high * 100.0 <= tolerance_pct)
        .count()
}

pub fn largest_decline_pct(window: &[OhlcvBar]) -> f64 {
    window.iter().map(OhlcvBar::decline_pct).fold(0.0, f64::max)
}

/// The advance leading into a window, measured over `lookback` bars.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorMove {
    pub lookback: usize,
    pub lowest_low: f64,
    pub highest_high: f64,
    /// The lowest low comes before the highest high.
    pub low_first: bool,
    /// `(HH - LL) / LL * 100` for an advance, zero otherwise.
    pub move_pct: f64,
    /// Net close change across the segment as a percentage of `HH - LL`.
    pub direction_pct: f64,
    pub avg_volume: f64,
}

impl PriorMove {
    pub fn qualifies(&self, min_move_pct: f64) -> bool {
        self.low_first && self.move_pct >= min_move_pct
    }
}

pub fn measure_prior_move(segment: &[OhlcvBar]) -> Option<PriorMove> {
    let first = segment.first()?;
    let last = segment.last()?;

    let mut low_idx = 0;
    let mut high_idx = 0;
    for (i, b) in segment.iter().enumerate() {
        if b.low < segment[low_idx].low {
            low_idx = i;
        }
        if b.high >= segment[high_idx].high {
            high_idx = i;
        }
    }
    let lowest_low = segment[low_idx].low;
    let highest_high = segment[high_idx].high;
    let low_first = low_idx < high_idx;

    let move_pct = if low_first && lowest_low > 0.0 {
        (highest_high - lowest_low) / lowest_low * 100.0
    } else {
        0.0
    };
    let span = highest_high - lowest_low;
    let direction_pct = if span > 0.0 {
        (last.close - first.close) / span * 100.0
    } else {
        0.0
    };

    Some(PriorMove {
        lookback: segment.len(),
        lowest_low,
        highest_high,
        low_first,
        move_pct,
        direction_pct,
        avg_volume: average_volume(segment),
    })
}

/// The standard lookback when it shows a qualifying move, else the extended
/// one when it does. With neither qualifying, the first measurable segment
/// is returned so its values can still be reported.
pub fn select_prior_move(
    bars: &[OhlcvBar],
    window_start: usize,
    t: &ThresholdsConfig,
    min_move_pct: f64,
) -> Option<PriorMove> {
    let mut fallback = None;
    for lookback in [t.prior_move_window, t.prior_move_window_extended] {
        if lookback == 0 || lookback > window_start {
            continue;
        }
        let Some(prior) = measure_prior_move(&bars[window_start - lookback..window_start]) else {
            continue;
        };
        if prior.qualifies(min_move_pct) {
            return Some(prior);
        }
        fallback.get_or_insert(prior);
    }
    fallback
}

/// Window average volume over the prior segment's; infinite when the prior
/// segment traded nothing.
pub fn volume_contraction(window: &[OhlcvBar], prior: &PriorMove) -> f64 {
    let window_avg = average_volume(window);
    if prior.avg_volume.is_nan() || prior.avg_volume <= 0.0 || window_avg.is_nan() {
        return f64::INFINITY;
    }
    window_avg / prior.avg_volume
}

/// Where `close` sits in `[low, high]`; a flat range counts as the top.
pub fn close_position(close: f64, high: f64, low: f64) -> f64 {
    if high == low {
        return 1.0;
    }
    (close - low) / (high - low)
}

/// Average volume of the `window` bars before `now`.
pub fn recent_volume_average(bars: &[OhlcvBar], now: usize, window: usize) -> f64 {
    let from = now.saturating_sub(window);
    average_volume(&bars[from..now])
}
