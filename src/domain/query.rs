//! Screening query data structures.
//!
//! - `IndicatorSpec`: indicator id plus numeric parameters
//! - `RightOperand`: what the left series is compared against
//! - `ConditionState`: one predicate, optionally over a window of bars
//! - `GroupState`: conditions sharing one timeframe, combined by AND/OR
//! - `QueryState`: ordered groups folded by per-group connectors
//!
//! Queries arrive as JSON in a flat, UI-shaped form (`RawCondition`) and are
//! converted into the tagged model on load.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound for window-length parameters.
pub const MAX_BAR_COUNT: usize = u32::MAX as usize;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    pub id: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl IndicatorSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn param(&self, key: &str, default: f64) -> f64 {
        self.params
            .get(key)
            .copied()
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }

    /// The `period` parameter as a bar count. Non-positive values fall back
    /// to `default`.
    pub fn period(&self, default: usize) -> usize {
        self.count_param("period", default)
    }

    /// A bar-count parameter, capped at [`MAX_BAR_COUNT`]. Values below one
    /// fall back to `default`.
    pub fn count_param(&self, key: &str, default: usize) -> usize {
        let p = self.param(key, default as f64);
        if p >= 1.0 {
            p.min(MAX_BAR_COUNT as f64) as usize
        } else {
            default
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RightOperand {
    None,
    Scalar {
        value: Option<f64>,
        value2: Option<f64>,
    },
    Series {
        indicator: IndicatorSpec,
        multiplier: f64,
    },
}

impl RightOperand {
    pub fn scalar(value: f64) -> Self {
        RightOperand::Scalar {
            value: Some(value),
            value2: None,
        }
    }

    pub fn range(low: f64, high: f64) -> Self {
        RightOperand::Scalar {
            value: Some(low),
            value2: Some(high),
        }
    }

    pub fn series(indicator: IndicatorSpec) -> Self {
        RightOperand::Series {
            indicator,
            multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeModifierMode {
    WithinLast,
    ExactlyAgo,
    AllOfLast,
}

impl TimeModifierMode {
    /// Anything other than the two explicit modes means `within_last`.
    pub fn from_id(id: &str) -> Self {
        match id.trim() {
            "exactly_ago" => TimeModifierMode::ExactlyAgo,
            "all_of_last" => TimeModifierMode::AllOfLast,
            _ => TimeModifierMode::WithinLast,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawCondition")]
pub struct ConditionState {
    pub left: IndicatorSpec,
    pub operator: String,
    pub right: RightOperand,
    /// `None` when the time-modifier flag is off.
    pub time_modifier: Option<TimeModifierMode>,
    /// Window size in bars. Kept even with the flag off because the
    /// monotonic operators always read it.
    pub modifier_bars: Option<usize>,
}

impl ConditionState {
    pub fn new(left: IndicatorSpec, operator: impl Into<String>, right: RightOperand) -> Self {
        Self {
            left,
            operator: operator.into(),
            right,
            time_modifier: None,
            modifier_bars: None,
        }
    }

    pub fn with_time_modifier(mut self, mode: TimeModifierMode, bars: usize) -> Self {
        self.time_modifier = Some(mode);
        self.modifier_bars = Some(bars);
        self
    }

    /// A condition missing its left indicator or operator never takes part
    /// in a match.
    pub fn is_complete(&self) -> bool {
        !self.left.id.trim().is_empty() && !self.operator.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Logic {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupState {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub logic: Logic,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    /// How this group folds into the running result of the groups before it.
    #[serde(default)]
    pub connector: Logic,
    #[serde(default)]
    pub conditions: Vec<ConditionState>,
}

fn default_timeframe() -> String {
    "1d".to_string()
}

impl GroupState {
    pub fn new(id: impl Into<String>, logic: Logic, timeframe: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            logic,
            timeframe: timeframe.into(),
            connector: Logic::And,
            conditions: Vec::new(),
        }
    }

    pub fn with_connector(mut self, connector: Logic) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_condition(mut self, condition: ConditionState) -> Self {
        self.conditions.push(condition);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryState {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "universeId")]
    pub universe: String,
    #[serde(default)]
    pub groups: Vec<GroupState>,
}

impl QueryState {
    /// Distinct timeframes referenced by the groups, in first-use order.
    pub fn timeframes(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for g in &self.groups {
            if !out.contains(&g.timeframe) {
                out.push(g.timeframe.clone());
            }
        }
        out
    }
}

/// A numeric literal as authored: either a JSON number or free text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Literal {
    Number(f64),
    Text(String),
}

impl Literal {
    fn parse(&self) -> Option<f64> {
        let v = match self {
            Literal::Number(n) => *n,
            Literal::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }
}

/// Flat wire form of a condition, as produced by the query builder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawCondition {
    left_indicator: String,
    left_params: BTreeMap<String, f64>,
    operator: String,
    right_type: String,
    right_indicator: String,
    right_params: BTreeMap<String, f64>,
    right_multiplier: Option<f64>,
    right_value: Option<Literal>,
    right_value2: Option<Literal>,
    time_modifier: bool,
    time_modifier_mode: String,
    time_modifier_bars: Option<usize>,
}

impl From<RawCondition> for ConditionState {
    fn from(raw: RawCondition) -> Self {
        let right = if raw.right_type == "indicator" && !raw.right_indicator.trim().is_empty() {
            RightOperand::Series {
                indicator: IndicatorSpec {
                    id: raw.right_indicator,
                    params: raw.right_params,
                },
                multiplier: raw.right_multiplier.unwrap_or(1.0),
            }
        } else {
            let value = raw.right_value.as_ref().and_then(Literal::parse);
            let value2 = raw.right_value2.as_ref().and_then(Literal::parse);
            if value.is_none() && value2.is_none() {
                RightOperand::None
            } else {
                RightOperand::Scalar { value, value2 }
            }
        };

        ConditionState {
            left: IndicatorSpec {
                id: raw.left_indicator,
                params: raw.left_params,
            },
            operator: raw.operator,
            right,
            time_modifier: raw
                .time_modifier
                .then(|| TimeModifierMode::from_id(&raw.time_modifier_mode)),
            modifier_bars: raw.time_modifier_bars,
        }
    }
}
