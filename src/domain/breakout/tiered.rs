//! Tiered classifier: finds the tightest qualifying consolidation and
//! grades how close the current bar is to breaking out of it.

use log::debug;

use super::window::{
    ConsolidationWindow, candidate_windows, close_position, extremes, largest_decline_pct,
    range_pct, recent_volume_average, resistance_touches, select_prior_move, support_touches,
    volume_contraction,
};
use super::{NoMatchReason, ScanContext, ThresholdsConfig, Tier, TierResult};
use crate::domain::ohlcv::OhlcvBar;

pub fn classify_breakout(bars: &[OhlcvBar], context: ScanContext) -> TierResult {
    classify_with_thresholds(bars, &ThresholdsConfig::for_context(context))
}

pub fn classify_with_thresholds(bars: &[OhlcvBar], t: &ThresholdsConfig) -> TierResult {
    if bars.len() < t.min_history_bars.max(2) {
        return TierResult::no_match(NoMatchReason::InsufficientHistory);
    }
    let now = bars.len() - 1;
    let current = &bars[now];

    let mut best: Option<ConsolidationWindow> = None;
    for (start, end) in candidate_windows(bars.len(), t) {
        if !qualifies(bars, start, end, current.close, t) {
            continue;
        }
        let window = ConsolidationWindow::from_bars(bars, start, end);
        if best.as_ref().is_none_or(|b| window.is_better_than(b)) {
            best = Some(window);
        }
    }

    let Some(window) = best else {
        return TierResult::no_match(NoMatchReason::NoConsolidation);
    };
    debug!(
        "best window {}..={} ({} bars, range {:.2}%)",
        window.start_date,
        window.end_date,
        window.days(),
        window.range_pct
    );

    let avg_volume = recent_volume_average(bars, now, t.volume_avg_window);
    let volume_ratio = if avg_volume > 0.0 {
        current.volume / avg_volume
    } else {
        0.0
    };
    let distance_pct = (window.high - current.close) / window.high * 100.0;

    let breakout_level = window.high * (1.0 + t.breakout_buffer_pct / 100.0);
    let tier = if current.close >= breakout_level && volume_ratio >= t.min_breakout_volume_ratio {
        Tier::Tier1
    } else if distance_pct <= t.tier_2a_distance_pct {
        Tier::Tier2A
    } else if distance_pct <= t.tier_2b_distance_pct {
        Tier::Tier2B
    } else {
        Tier::NoMatch
    };

    TierResult {
        tier,
        reason: (tier == Tier::NoMatch).then_some(NoMatchReason::TooFarFromBreakout),
        window: Some(window),
        distance_pct: Some(distance_pct),
        volume_ratio: Some(volume_ratio),
    }
}

/// All eight criteria, cheapest first, stopping at the first failure.
fn qualifies(bars: &[OhlcvBar], start: usize, end: usize, close: f64, t: &ThresholdsConfig) -> bool {
    let window = &bars[start..=end];
    let (high, low) = extremes(window);

    if range_pct(high, low) > t.max_range_pct {
        return false;
    }
    if support_touches(window, low, t.touch_tolerance_pct) < t.min_support_touches
        || resistance_touches(window, high, t.touch_tolerance_pct) < t.min_resistance_touches
    {
        return false;
    }
    if largest_decline_pct(window) > t.large_red_candle_pct {
        return false;
    }

    let Some(prior) = select_prior_move(bars, start, t, t.min_prior_move_pct) else {
        return false;
    };
    if !prior.qualifies(t.min_prior_move_pct) || prior.direction_pct < t.prior_move_direction_pct {
        return false;
    }
    if volume_contraction(window, &prior) > t.max_volume_contraction_ratio {
        return false;
    }
    close_position(close, high, low) >= t.min_close_position
}
