//! Strict query validation.
//!
//! Evaluation fails closed on malformed conditions and never reports why a
//! query cannot match. This pass lists the problems up front so an author
//! can tell "no instrument matched" from "this query can never match".
//! It does not change how a query evaluates.

use crate::domain::operator::Operator;
use crate::domain::query::{ConditionState, QueryState, RightOperand};
use crate::ports::indicator_port::IndicatorRegistry;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryIssue {
    #[error("query has no groups")]
    EmptyQuery,

    #[error("group {group}: no complete conditions, group can never match")]
    EmptyGroup { group: String },

    #[error("group {group} condition {index}: missing indicator or operator")]
    Incomplete { group: String, index: usize },

    #[error("group {group} condition {index}: unknown operator '{operator}'")]
    UnknownOperator {
        group: String,
        index: usize,
        operator: String,
    },

    #[error("group {group} condition {index}: unknown indicator '{indicator}'")]
    UnknownIndicator {
        group: String,
        index: usize,
        indicator: String,
    },

    #[error("group {group} condition {index}: {operator} has no usable right operand")]
    MissingOperand {
        group: String,
        index: usize,
        operator: String,
    },

    #[error("group {group} condition {index}: is_between bounds {low} > {high} match nothing")]
    DescendingBounds {
        group: String,
        index: usize,
        low: f64,
        high: f64,
    },

    #[error("group {group} condition {index}: time window of zero bars")]
    ZeroWindow { group: String, index: usize },
}

pub fn validate_query<R>(query: &QueryState, registry: &R) -> Vec<QueryIssue>
where
    R: IndicatorRegistry + ?Sized,
{
    let mut issues = Vec::new();
    if query.groups.is_empty() {
        issues.push(QueryIssue::EmptyQuery);
    }

    for (gi, group) in query.groups.iter().enumerate() {
        let label = if group.id.trim().is_empty() {
            format!("#{}", gi + 1)
        } else {
            group.id.clone()
        };

        if !group.conditions.iter().any(ConditionState::is_complete) {
            issues.push(QueryIssue::EmptyGroup {
                group: label.clone(),
            });
        }

        for (index, condition) in group.conditions.iter().enumerate() {
            validate_condition(condition, registry, &label, index, &mut issues);
        }
    }
    issues
}

fn validate_condition<R>(
    condition: &ConditionState,
    registry: &R,
    group: &str,
    index: usize,
    issues: &mut Vec<QueryIssue>,
) where
    R: IndicatorRegistry + ?Sized,
{
    if !condition.is_complete() {
        issues.push(QueryIssue::Incomplete {
            group: group.to_string(),
            index,
        });
        return;
    }

    if !registry.exists(&condition.left.id) {
        issues.push(QueryIssue::UnknownIndicator {
            group: group.to_string(),
            index,
            indicator: condition.left.id.clone(),
        });
    }

    if condition.modifier_bars == Some(0) {
        issues.push(QueryIssue::ZeroWindow {
            group: group.to_string(),
            index,
        });
    }

    let op = match Operator::from_id(&condition.operator) {
        Some(op) => op,
        None => {
            issues.push(QueryIssue::UnknownOperator {
                group: group.to_string(),
                index,
                operator: condition.operator.clone(),
            });
            return;
        }
    };
    if !op.needs_right() {
        return;
    }

    let missing = QueryIssue::MissingOperand {
        group: group.to_string(),
        index,
        operator: op.id().to_string(),
    };

    match (&condition.right, op) {
        (RightOperand::Series { .. }, Operator::IsBetween) => issues.push(missing),
        (RightOperand::Series { indicator, .. }, _) => {
            if !registry.exists(&indicator.id) {
                issues.push(QueryIssue::UnknownIndicator {
                    group: group.to_string(),
                    index,
                    indicator: indicator.id.clone(),
                });
            }
        }
        (
            RightOperand::Scalar {
                value: Some(low),
                value2: Some(high),
            },
            Operator::IsBetween,
        ) => {
            if low > high {
                issues.push(QueryIssue::DescendingBounds {
                    group: group.to_string(),
                    index,
                    low: *low,
                    high: *high,
                });
            }
        }
        (_, Operator::IsBetween) => issues.push(missing),
        (RightOperand::Scalar { value: Some(_), .. }, _) => {}
        _ => issues.push(missing),
    }
}
