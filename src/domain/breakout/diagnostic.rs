//! Diagnostic scorer: runs every criterion against every candidate window
//! and reports actual-versus-required values, so a near miss can be told
//! apart from a chart that is nowhere close.
//!
//! Relaxed thresholds only raise the `near_miss` flag; tier decisions live
//! in [`super::tiered`] and are never influenced by this module.

use super::window::{
    ConsolidationWindow, Criterion, PriorMove, candidate_windows, close_position, extremes,
    largest_decline_pct, resistance_touches, select_prior_move, support_touches,
    volume_contraction,
};
use super::{ScanContext, ThresholdsConfig};
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, PartialEq)]
pub struct CriterionCheck {
    pub criterion: Criterion,
    pub actual: f64,
    pub required: f64,
    pub passed: bool,
}

impl CriterionCheck {
    fn new(criterion: Criterion, actual: f64, required: f64) -> Self {
        let passed = if criterion.is_ceiling() {
            actual <= required
        } else {
            actual >= required
        };
        Self {
            criterion,
            actual,
            required,
            passed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowDiagnosis {
    pub window: ConsolidationWindow,
    pub checks: Vec<CriterionCheck>,
    /// Passed checks over total checks, in `[0, 1]`.
    pub score: f64,
}

impl WindowDiagnosis {
    pub fn failed(&self) -> impl Iterator<Item = Criterion> + '_ {
        self.checks.iter().filter(|c| !c.passed).map(|c| c.criterion)
    }

    pub fn passed_all(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Higher score, then tighter range, then longer window.
    fn is_better_than(&self, other: &WindowDiagnosis) -> bool {
        if self.score != other.score {
            return self.score > other.score;
        }
        self.window.is_better_than(&other.window)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticResult {
    pub score: f64,
    pub best: Option<WindowDiagnosis>,
    pub near_miss: bool,
    pub windows_evaluated: usize,
    pub insufficient_history: bool,
}

pub fn diagnose_breakout(bars: &[OhlcvBar], context: ScanContext) -> DiagnosticResult {
    diagnose_with_thresholds(bars, &ThresholdsConfig::for_context(context))
}

pub fn diagnose_with_thresholds(bars: &[OhlcvBar], t: &ThresholdsConfig) -> DiagnosticResult {
    if bars.len() < t.min_history_bars.max(2) {
        return DiagnosticResult {
            score: 0.0,
            best: None,
            near_miss: false,
            windows_evaluated: 0,
            insufficient_history: true,
        };
    }
    let close = bars[bars.len() - 1].close;

    let mut best: Option<WindowDiagnosis> = None;
    let mut windows_evaluated = 0;
    for (start, end) in candidate_windows(bars.len(), t) {
        windows_evaluated += 1;
        let diagnosis = diagnose_window(bars, start, end, close, t);
        if best.as_ref().is_none_or(|b| diagnosis.is_better_than(b)) {
            best = Some(diagnosis);
        }
    }

    let near_miss = best
        .as_ref()
        .is_some_and(|b| is_near_miss(bars, b, t));
    DiagnosticResult {
        score: best.as_ref().map_or(0.0, |b| b.score),
        best,
        near_miss,
        windows_evaluated,
        insufficient_history: false,
    }
}

pub fn diagnose_window(
    bars: &[OhlcvBar],
    start: usize,
    end: usize,
    close: f64,
    t: &ThresholdsConfig,
) -> WindowDiagnosis {
    let window = ConsolidationWindow::from_bars(bars, start, end);
    let slice = &bars[start..=end];
    let (high, low) = extremes(slice);
    let prior = select_prior_move(bars, start, t, t.min_prior_move_pct);

    let (move_pct, direction_pct, contraction) = prior_values(slice, prior.as_ref());
    let mut checks = vec![
        CriterionCheck::new(Criterion::Range, window.range_pct, t.max_range_pct),
        CriterionCheck::new(
            Criterion::SupportTouches,
            support_touches(slice, low, t.touch_tolerance_pct) as f64,
            t.min_support_touches as f64,
        ),
        CriterionCheck::new(
            Criterion::ResistanceTouches,
            resistance_touches(slice, high, t.touch_tolerance_pct) as f64,
            t.min_resistance_touches as f64,
        ),
        CriterionCheck::new(
            Criterion::NoLargeRedCandle,
            largest_decline_pct(slice),
            t.large_red_candle_pct,
        ),
        CriterionCheck::new(Criterion::PriorMove, move_pct, t.min_prior_move_pct),
        CriterionCheck::new(
            Criterion::PriorMoveDirection,
            direction_pct,
            t.prior_move_direction_pct,
        ),
        CriterionCheck::new(
            Criterion::VolumeContraction,
            contraction,
            t.max_volume_contraction_ratio,
        ),
        CriterionCheck::new(
            Criterion::ClosePosition,
            close_position(close, high, low),
            t.min_close_position,
        ),
    ];
    if prior.is_none() {
        for check in &mut checks {
            if matches!(
                check.criterion,
                Criterion::PriorMove | Criterion::PriorMoveDirection | Criterion::VolumeContraction
            ) {
                check.passed = false;
            }
        }
    }

    let passed = checks.iter().filter(|c| c.passed).count();
    let score = passed as f64 / checks.len() as f64;
    WindowDiagnosis {
        window,
        checks,
        score,
    }
}

/// `(move %, direction %, contraction ratio)`; zeros and an infinite ratio
/// when there is not enough history before the window.
fn prior_values(window: &[OhlcvBar], prior: Option<&PriorMove>) -> (f64, f64, f64) {
    match prior {
        Some(p) => (p.move_pct, p.direction_pct, volume_contraction(window, p)),
        None => (0.0, 0.0, f64::INFINITY),
    }
}

/// The window fails nothing but prior-move magnitude and volume contraction,
/// and both pass under the relaxed thresholds.
fn is_near_miss(bars: &[OhlcvBar], diagnosis: &WindowDiagnosis, t: &ThresholdsConfig) -> bool {
    let mut failed = diagnosis.failed().peekable();
    if failed.peek().is_none() {
        return false;
    }
    if !failed.all(|c| matches!(c, Criterion::PriorMove | Criterion::VolumeContraction)) {
        return false;
    }

    let window = &diagnosis.window;
    let Some(prior) = select_prior_move(bars, window.start, t, t.min_prior_move_pct_relaxed) else {
        return false;
    };
    let slice = &bars[window.start..=window.end];
    prior.qualifies(t.min_prior_move_pct_relaxed)
        && volume_contraction(slice, &prior) <= t.max_volume_contraction_ratio_relaxed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::breakout::{Tier, classify_breakout, consolidation_fixture};
    use approx::assert_relative_eq;

    fn check(d: &WindowDiagnosis, criterion: Criterion) -> &CriterionCheck {
        d.checks.iter().find(|c| c.criterion == criterion).unwrap()
    }

    #[test]
    fn qualifying_window_scores_full_marks() {
        let bars = consolidation_fixture(104.03, 1325.0, 550.0);
        let result = diagnose_breakout(&bars, ScanContext::Swing);

        assert!(!result.insufficient_history);
        assert_eq!(result.windows_evaluated, 21);
        assert_eq!(result.score, 1.0);
        assert!(!result.near_miss);

        let best = result.best.unwrap();
        assert_eq!((best.window.start, best.window.end), (54, 68));
        assert_eq!(best.checks.len(), Criterion::ALL.len());
        assert!(best.passed_all());
        assert_relative_eq!(
            check(&best, Criterion::VolumeContraction).actual,
            0.55,
            epsilon = 1e-12
        );
        assert_eq!(check(&best, Criterion::SupportTouches).actual, 15.0);
    }

    #[test]
    fn contraction_near_miss() {
        let bars = consolidation_fixture(104.03, 1700.0, 850.0);
        let result = diagnose_breakout(&bars, ScanContext::Swing);

        let best = result.best.as_ref().unwrap();
        assert_eq!((best.window.start, best.window.end), (54, 68));
        assert_relative_eq!(result.score, 7.0 / 8.0, epsilon = 1e-12);
        assert_eq!(best.failed().collect::<Vec<_>>(), vec![Criterion::VolumeContraction]);
        let c = check(best, Criterion::VolumeContraction);
        assert_relative_eq!(c.actual, 0.85, epsilon = 1e-12);
        assert_eq!(c.required, 0.75);
        assert!(result.near_miss);

        // Diagnostics do not upgrade the tier.
        assert_eq!(classify_breakout(&bars, ScanContext::Swing).tier, Tier::NoMatch);
    }

    #[test]
    fn contraction_beyond_relaxed_is_not_near_miss() {
        let bars = consolidation_fixture(104.03, 1900.0, 950.0);
        let result = diagnose_breakout(&bars, ScanContext::Swing);
        let best = result.best.as_ref().unwrap();
        assert_eq!(best.failed().collect::<Vec<_>>(), vec![Criterion::VolumeContraction]);
        assert!(!result.near_miss);
    }

    /// The breakout fixture with its run-up rebuilt to start from `base`:
    /// flat bars at `base`, then a climb to 99 whose last bar closes at 101.
    /// Every prior segment, box highs included, stays under a 15% move
    /// while `base` is above ~89.6.
    fn advance_fixture(base: f64) -> Vec<OhlcvBar> {
        let mut bars = consolidation_fixture(104.03, 1325.0, 550.0);
        for bar in &mut bars[..34] {
            bar.open = base;
            bar.close = base;
            bar.high = base + 0.5;
            bar.low = base;
        }
        let step = (99.0 - base) / 19.0;
        for (k, bar) in bars[34..54].iter_mut().enumerate() {
            bar.open = base + step * k as f64;
            bar.low = bar.open;
            bar.close = if k == 19 { 101.0 } else { bar.open + step };
            bar.high = bar.close;
        }
        bars
    }

    #[test]
    fn weak_prior_move_near_miss() {
        let base = 89.8;
        let bars = advance_fixture(base);
        let result = diagnose_breakout(&bars, ScanContext::Swing);

        let best = result.best.as_ref().unwrap();
        assert_eq!((best.window.start, best.window.end), (54, 68));
        assert_eq!(best.failed().collect::<Vec<_>>(), vec![Criterion::PriorMove]);
        let c = check(best, Criterion::PriorMove);
        assert_relative_eq!(c.actual, (101.0 - base) / base * 100.0, epsilon = 1e-9);
        assert_relative_eq!(result.score, 7.0 / 8.0, epsilon = 1e-12);
        assert!(result.near_miss);

        let tier = classify_breakout(&bars, ScanContext::Swing);
        assert_eq!(tier.tier, Tier::NoMatch);
        assert_eq!(tier.reason, Some(crate::domain::breakout::NoMatchReason::NoConsolidation));
    }

    #[test]
    fn prior_move_below_relaxed_is_not_near_miss() {
        // (101 - 93.5) / 93.5 is about 8%.
        let bars = advance_fixture(93.5);
        let result = diagnose_breakout(&bars, ScanContext::Swing);

        let best = result.best.as_ref().unwrap();
        assert_eq!((best.window.start, best.window.end), (54, 68));
        assert_eq!(best.failed().collect::<Vec<_>>(), vec![Criterion::PriorMove]);
        assert!(!result.near_miss);
        assert_eq!(classify_breakout(&bars, ScanContext::Swing).tier, Tier::NoMatch);
    }

    #[test]
    fn structural_failure_is_never_near_miss() {
        let mut bars = consolidation_fixture(104.03, 1700.0, 850.0);
        for bar in &mut bars[54..=68] {
            bar.open = 103.0;
            bar.close = 97.0;
            bar.low = 97.0;
        }
        let result = diagnose_breakout(&bars, ScanContext::Swing);
        let best = result.best.unwrap();
        assert!(best.failed().any(|c| c == Criterion::NoLargeRedCandle));
        assert!(!result.near_miss);
    }

    #[test]
    fn short_history_is_flagged() {
        let bars = consolidation_fixture(104.03, 1325.0, 550.0);
        let result = diagnose_breakout(&bars, ScanContext::Positional);
        assert!(result.insufficient_history);
        assert!(result.best.is_none());
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn missing_prior_history_fails_prior_checks() {
        let bars = consolidation_fixture(104.03, 1325.0, 550.0);
        let t = ThresholdsConfig::swing();
        // Starts too early for either lookback.
        let d = diagnose_window(&bars, 10, 30, 104.03, &t);
        assert!(!check(&d, Criterion::PriorMove).passed);
        assert!(!check(&d, Criterion::PriorMoveDirection).passed);
        assert!(!check(&d, Criterion::VolumeContraction).passed);
        assert!(check(&d, Criterion::VolumeContraction).actual.is_infinite());
    }

    #[test]
    fn ceiling_and_floor_checks() {
        assert!(CriterionCheck::new(Criterion::Range, 10.0, 10.0).passed);
        assert!(!CriterionCheck::new(Criterion::Range, 10.1, 10.0).passed);
        assert!(CriterionCheck::new(Criterion::SupportTouches, 2.0, 2.0).passed);
        assert!(!CriterionCheck::new(Criterion::SupportTouches, 1.0, 2.0).passed);
    }
}
