//! Query evaluation engine.
//!
//! Evaluates screening queries against per-timeframe OHLCV series, resolving
//! indicator operands lazily through an [`IndicatorRegistry`].
//!
//! # Evaluation Semantics
//!
//! - Condition: incomplete, unknown indicator or unknown operator → `false`
//! - `is_increasing`/`is_decreasing`: every one of the last N bar pairs must
//!   move strictly, regardless of the time-modifier flag (N defaults to 3)
//! - `within_last(N)`: OR over the last N bars, newest first; stops quietly
//!   when history runs out
//! - `all_of_last(N)`: AND over the last N bars; missing history → `false`
//! - `exactly_ago(N)`: the single bar N bars before the anchor
//! - Group: AND/OR over complete conditions; no complete condition → `false`
//! - Query: groups folded strictly left to right with each group's own
//!   connector; the first connector is ignored; a timeframe without bars
//!   fails only its own group

use crate::domain::ohlcv::{OhlcvBar, last_index_on_or_before};
use crate::domain::operator::{self, Operator, RightValue};
use crate::domain::query::{
    ConditionState, GroupState, Logic, QueryState, RightOperand, TimeModifierMode,
};
use crate::ports::indicator_port::IndicatorRegistry;
use chrono::NaiveDate;
use std::collections::HashMap;

pub const DEFAULT_WINDOW_BARS: usize = 5;
pub const DEFAULT_MONOTONIC_BARS: usize = 3;

/// Why a condition produced the result it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStatus {
    Evaluated,
    Incomplete,
    UnknownIndicator,
    UnknownOperator,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionOutcome {
    pub matched: bool,
    pub status: ConditionStatus,
}

impl ConditionOutcome {
    fn failed(status: ConditionStatus) -> Self {
        Self {
            matched: false,
            status,
        }
    }

    fn evaluated(matched: bool) -> Self {
        Self {
            matched,
            status: ConditionStatus::Evaluated,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupEvalResult {
    pub group_id: String,
    pub timeframe: String,
    pub matched: bool,
    /// Number of bars the group was evaluated against.
    pub bars: usize,
    /// One outcome per condition, in group order, incomplete ones included.
    pub conditions: Vec<ConditionOutcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalResult {
    pub matched: bool,
    pub matching_groups: usize,
    pub groups: Vec<GroupEvalResult>,
}

/// Evaluate one condition with bar `as_of` as "now". Bars after `as_of` are
/// never shown to the indicator registry.
pub fn evaluate_condition<R>(
    condition: &ConditionState,
    bars: &[OhlcvBar],
    registry: &R,
    as_of: usize,
) -> ConditionOutcome
where
    R: IndicatorRegistry + ?Sized,
{
    if !condition.is_complete() {
        return ConditionOutcome::failed(ConditionStatus::Incomplete);
    }
    if as_of >= bars.len() {
        return ConditionOutcome::failed(ConditionStatus::NoData);
    }
    let op = match Operator::from_id(&condition.operator) {
        Some(op) => op,
        None => return ConditionOutcome::failed(ConditionStatus::UnknownOperator),
    };

    let visible = &bars[..=as_of];
    let left = match registry.compute(&condition.left, visible) {
        Some(series) => series,
        None => return ConditionOutcome::failed(ConditionStatus::UnknownIndicator),
    };

    let right_series;
    let right = if !op.needs_right() {
        RightValue::None
    } else {
        match &condition.right {
            RightOperand::None => RightValue::None,
            RightOperand::Scalar { value, value2 } => RightValue::Scalar(*value, *value2),
            RightOperand::Series {
                indicator,
                multiplier,
            } => {
                right_series = match registry.compute(indicator, visible) {
                    Some(series) => series,
                    None => return ConditionOutcome::failed(ConditionStatus::UnknownIndicator),
                };
                RightValue::Series(&right_series, *multiplier)
            }
        }
    };

    ConditionOutcome::evaluated(evaluate_window(condition, op, &left, right, as_of))
}

fn evaluate_window(
    condition: &ConditionState,
    op: Operator,
    left: &[f64],
    right: RightValue<'_>,
    as_of: usize,
) -> bool {
    let at = |index: usize| operator::evaluate(op, left, right, index);
    let configured = condition.modifier_bars.filter(|&n| n > 0);

    if op.is_monotonic() {
        let pairs = configured.unwrap_or(DEFAULT_MONOTONIC_BARS);
        return (0..pairs).all(|k| match as_of.checked_sub(k) {
            Some(index) if index > 0 => at(index),
            _ => false,
        });
    }

    let mode = match condition.time_modifier {
        Some(mode) => mode,
        None => return at(as_of),
    };
    let window = configured.unwrap_or(DEFAULT_WINDOW_BARS);

    match mode {
        TimeModifierMode::ExactlyAgo => match as_of.checked_sub(window) {
            Some(index) => at(index),
            None => false,
        },
        TimeModifierMode::AllOfLast => {
            if window > as_of + 1 {
                return false;
            }
            (0..window).all(|k| at(as_of - k))
        }
        TimeModifierMode::WithinLast => (0..window)
            .map_while(|k| as_of.checked_sub(k))
            .any(at),
    }
}

/// Evaluate a group with the last bar as "now".
pub fn evaluate_group<R>(group: &GroupState, bars: &[OhlcvBar], registry: &R) -> GroupEvalResult
where
    R: IndicatorRegistry + ?Sized,
{
    evaluate_group_at(group, bars, registry, bars.len().saturating_sub(1))
}

pub fn evaluate_group_at<R>(
    group: &GroupState,
    bars: &[OhlcvBar],
    registry: &R,
    as_of: usize,
) -> GroupEvalResult
where
    R: IndicatorRegistry + ?Sized,
{
    let conditions: Vec<ConditionOutcome> = group
        .conditions
        .iter()
        .map(|c| evaluate_condition(c, bars, registry, as_of))
        .collect();

    let mut complete = group
        .conditions
        .iter()
        .zip(&conditions)
        .filter(|(c, _)| c.is_complete())
        .map(|(_, outcome)| outcome.matched)
        .peekable();

    let matched = if complete.peek().is_none() {
        false
    } else {
        match group.logic {
            Logic::And => complete.all(|m| m),
            Logic::Or => complete.any(|m| m),
        }
    };

    let seen = bars.len().min(as_of + 1);
    log::debug!(
        "group {} [{}] on {} bars: matched={}",
        group.id,
        group.timeframe,
        seen,
        matched
    );

    GroupEvalResult {
        group_id: group.id.clone(),
        timeframe: group.timeframe.clone(),
        matched,
        bars: seen,
        conditions,
    }
}

/// Evaluate a query with each timeframe's last bar as "now".
pub fn evaluate_query<R>(
    query: &QueryState,
    bars_by_timeframe: &HashMap<String, Vec<OhlcvBar>>,
    registry: &R,
) -> EvalResult
where
    R: IndicatorRegistry + ?Sized,
{
    evaluate_with(query, registry, |timeframe| {
        bars_by_timeframe
            .get(timeframe)
            .map(Vec::as_slice)
            .unwrap_or_default()
    })
}

/// Evaluate a query as it would have evaluated at the close of `date`: each
/// timeframe's series is cut after its last bar dated on or before `date`.
pub fn evaluate_query_as_of<R>(
    query: &QueryState,
    bars_by_timeframe: &HashMap<String, Vec<OhlcvBar>>,
    registry: &R,
    date: NaiveDate,
) -> EvalResult
where
    R: IndicatorRegistry + ?Sized,
{
    evaluate_with(query, registry, |timeframe| {
        let bars: &[OhlcvBar] = bars_by_timeframe
            .get(timeframe)
            .map(Vec::as_slice)
            .unwrap_or_default();
        match last_index_on_or_before(bars, date) {
            Some(index) => &bars[..=index],
            None => &bars[..0],
        }
    })
}

fn evaluate_with<'a, R, F>(query: &QueryState, registry: &R, bars_for: F) -> EvalResult
where
    R: IndicatorRegistry + ?Sized,
    F: Fn(&str) -> &'a [OhlcvBar],
{
    let mut groups = Vec::with_capacity(query.groups.len());
    let mut running: Option<bool> = None;

    for group in &query.groups {
        let bars = bars_for(&group.timeframe);
        if bars.is_empty() {
            log::debug!("group {}: no bars for timeframe {}", group.id, group.timeframe);
        }
        let result = evaluate_group(group, bars, registry);

        running = Some(match running {
            None => result.matched,
            Some(acc) => match group.connector {
                Logic::Or => acc || result.matched,
                Logic::And => acc && result.matched,
            },
        });
        groups.push(result);
    }

    EvalResult {
        matched: running.unwrap_or(false),
        matching_groups: groups.iter().filter(|g| g.matched).count(),
        groups,
    }
}
