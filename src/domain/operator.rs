//! Single-bar predicate evaluation.
//!
//! Decides one operator between a left series and a right operand at one bar
//! index. Every failure mode (undefined values, missing history, missing
//! operands) resolves to `false`; nothing here panics.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    IsBetween,
    CrossedAbove,
    CrossedBelow,
    Detected,
    IsIncreasing,
    IsDecreasing,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::GreaterEqual,
        Operator::LessEqual,
        Operator::IsBetween,
        Operator::CrossedAbove,
        Operator::CrossedBelow,
        Operator::Detected,
        Operator::IsIncreasing,
        Operator::IsDecreasing,
    ];

    pub fn from_id(id: &str) -> Option<Operator> {
        let op = match id.trim() {
            "greater_than" => Operator::GreaterThan,
            "less_than" => Operator::LessThan,
            "greater_equal" => Operator::GreaterEqual,
            "less_equal" => Operator::LessEqual,
            "is_between" => Operator::IsBetween,
            "crossed_above" => Operator::CrossedAbove,
            "crossed_below" => Operator::CrossedBelow,
            "detected" => Operator::Detected,
            "is_increasing" => Operator::IsIncreasing,
            "is_decreasing" => Operator::IsDecreasing,
            _ => return None,
        };
        Some(op)
    }

    pub fn id(self) -> &'static str {
        match self {
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::GreaterEqual => "greater_equal",
            Operator::LessEqual => "less_equal",
            Operator::IsBetween => "is_between",
            Operator::CrossedAbove => "crossed_above",
            Operator::CrossedBelow => "crossed_below",
            Operator::Detected => "detected",
            Operator::IsIncreasing => "is_increasing",
            Operator::IsDecreasing => "is_decreasing",
        }
    }

    /// Operators that only look at the left series.
    pub fn needs_right(self) -> bool {
        !matches!(
            self,
            Operator::Detected | Operator::IsIncreasing | Operator::IsDecreasing
        )
    }

    pub fn is_monotonic(self) -> bool {
        matches!(self, Operator::IsIncreasing | Operator::IsDecreasing)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// The right-hand side of a predicate, resolved to numbers.
#[derive(Debug, Clone, Copy)]
pub enum RightValue<'a> {
    None,
    Scalar(Option<f64>, Option<f64>),
    Series(&'a [f64], f64),
}

impl RightValue<'_> {
    /// Comparison value at `index`: scaled series value, else the first
    /// scalar, else zero.
    fn at(&self, index: usize) -> f64 {
        match self {
            RightValue::Series(values, multiplier) => values
                .get(index)
                .map(|v| v * multiplier)
                .unwrap_or(f64::NAN),
            RightValue::Scalar(Some(v), _) => *v,
            RightValue::Scalar(None, _) | RightValue::None => 0.0,
        }
    }
}

fn value_at(series: &[f64], index: usize) -> f64 {
    series.get(index).copied().unwrap_or(f64::NAN)
}

pub fn evaluate(op: Operator, left: &[f64], right: RightValue<'_>, index: usize) -> bool {
    let curr = value_at(left, index);
    if curr.is_nan() {
        return false;
    }

    match op {
        Operator::GreaterThan => curr > right.at(index),
        Operator::LessThan => curr < right.at(index),
        Operator::GreaterEqual => curr >= right.at(index),
        Operator::LessEqual => curr <= right.at(index),
        Operator::IsBetween => match right {
            RightValue::Scalar(Some(lower), Some(upper)) => curr >= lower && curr <= upper,
            _ => false,
        },
        Operator::CrossedAbove | Operator::CrossedBelow => {
            if index == 0 {
                return false;
            }
            let prev = value_at(left, index - 1);
            let right_curr = right.at(index);
            let right_prev = right.at(index - 1);
            if prev.is_nan() || right_prev.is_nan() || right_curr.is_nan() {
                return false;
            }
            if op == Operator::CrossedAbove {
                prev <= right_prev && curr > right_curr
            } else {
                prev >= right_prev && curr < right_curr
            }
        }
        Operator::Detected => curr == 1.0,
        Operator::IsIncreasing | Operator::IsDecreasing => {
            if index == 0 {
                return false;
            }
            let prev = value_at(left, index - 1);
            if prev.is_nan() {
                return false;
            }
            if op == Operator::IsIncreasing {
                curr > prev
            } else {
                curr < prev
            }
        }
    }
}

/// String-keyed entry point: unknown operator ids evaluate to `false`.
pub fn evaluate_id(op_id: &str, left: &[f64], right: RightValue<'_>, index: usize) -> bool {
    match Operator::from_id(op_id) {
        Some(op) => evaluate(op, left, right, index),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAN: f64 = f64::NAN;

    #[test]
    fn ids_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_id(op.id()), Some(op));
        }
        assert_eq!(Operator::from_id("equals"), None);
    }

    #[test]
    fn comparisons_against_scalar() {
        let left = [105.0];
        let r = RightValue::Scalar(Some(100.0), None);
        assert!(evaluate(Operator::GreaterThan, &left, r, 0));
        assert!(evaluate(Operator::GreaterEqual, &left, r, 0));
        assert!(!evaluate(Operator::LessThan, &left, r, 0));
        assert!(!evaluate(Operator::LessEqual, &left, r, 0));

        let eq = RightValue::Scalar(Some(105.0), None);
        assert!(!evaluate(Operator::GreaterThan, &left, eq, 0));
        assert!(evaluate(Operator::GreaterEqual, &left, eq, 0));
        assert!(evaluate(Operator::LessEqual, &left, eq, 0));
    }

    #[test]
    fn comparison_defaults_to_zero_without_operand() {
        assert!(evaluate(Operator::GreaterThan, &[0.5], RightValue::None, 0));
        assert!(evaluate(Operator::LessThan, &[-0.5], RightValue::Scalar(None, None), 0));
    }

    #[test]
    fn comparison_against_scaled_series() {
        let left = [10.0, 10.0];
        let right = [9.0, 9.5];
        assert!(evaluate(Operator::GreaterThan, &left, RightValue::Series(&right, 1.0), 1));
        assert!(!evaluate(Operator::GreaterThan, &left, RightValue::Series(&right, 1.1), 1));
    }

    #[test]
    fn undefined_values_fail_closed() {
        for op in Operator::ALL {
            assert!(!evaluate(op, &[NAN], RightValue::Scalar(Some(0.0), Some(1.0)), 0));
            assert!(!evaluate(op, &[1.0, NAN], RightValue::Scalar(Some(0.0), Some(1.0)), 1));
        }
        let right = [NAN];
        assert!(!evaluate(Operator::GreaterThan, &[1.0], RightValue::Series(&right, 1.0), 0));
    }

    #[test]
    fn index_out_of_range_is_false() {
        assert!(!evaluate(Operator::GreaterThan, &[1.0], RightValue::None, 3));
    }

    #[test]
    fn is_between_uses_bounds_as_given() {
        let r = RightValue::Scalar(Some(30.0), Some(70.0));
        assert!(evaluate(Operator::IsBetween, &[30.0], r, 0));
        assert!(evaluate(Operator::IsBetween, &[50.0], r, 0));
        assert!(evaluate(Operator::IsBetween, &[70.0], r, 0));
        assert!(!evaluate(Operator::IsBetween, &[70.1], r, 0));

        // Descending bounds are not reordered, so nothing can be between them.
        let reversed = RightValue::Scalar(Some(70.0), Some(30.0));
        assert!(!evaluate(Operator::IsBetween, &[50.0], reversed, 0));

        assert!(!evaluate(Operator::IsBetween, &[50.0], RightValue::Scalar(Some(30.0), None), 0));
    }

    #[test]
    fn crossed_above_ema_example() {
        let ema21 = [10.0, 10.0];
        assert!(evaluate(
            Operator::CrossedAbove,
            &[9.8, 10.2],
            RightValue::Series(&ema21, 1.0),
            1
        ));
        assert!(!evaluate(
            Operator::CrossedAbove,
            &[10.1, 10.2],
            RightValue::Series(&ema21, 1.0),
            1
        ));
    }

    #[test]
    fn crossed_above_touching_prior_bar_counts() {
        let right = [10.0, 10.0];
        assert!(evaluate(Operator::CrossedAbove, &[10.0, 10.5], RightValue::Series(&right, 1.0), 1));
        assert!(!evaluate(Operator::CrossedAbove, &[9.0, 10.0], RightValue::Series(&right, 1.0), 1));
    }

    #[test]
    fn crossed_below_and_first_bar() {
        let r = RightValue::Scalar(Some(100.0), None);
        assert!(evaluate(Operator::CrossedBelow, &[105.0, 95.0], r, 1));
        assert!(!evaluate(Operator::CrossedBelow, &[95.0, 90.0], r, 1));
        assert!(!evaluate(Operator::CrossedBelow, &[95.0], r, 0));
        assert!(!evaluate(Operator::CrossedAbove, &[105.0], r, 0));
    }

    #[test]
    fn crossed_with_undefined_prior_is_false() {
        let r = RightValue::Scalar(Some(100.0), None);
        assert!(!evaluate(Operator::CrossedAbove, &[NAN, 105.0], r, 1));
        let right = [NAN, 100.0];
        assert!(!evaluate(Operator::CrossedAbove, &[95.0, 105.0], RightValue::Series(&right, 1.0), 1));
    }

    #[test]
    fn detected_is_exactly_one() {
        assert!(evaluate(Operator::Detected, &[1.0], RightValue::None, 0));
        assert!(!evaluate(Operator::Detected, &[0.0], RightValue::None, 0));
        assert!(!evaluate(Operator::Detected, &[2.0], RightValue::None, 0));
    }

    #[test]
    fn increasing_and_decreasing() {
        let s = [1.0, 2.0, 2.0, 1.0];
        assert!(!evaluate(Operator::IsIncreasing, &s, RightValue::None, 0));
        assert!(evaluate(Operator::IsIncreasing, &s, RightValue::None, 1));
        assert!(!evaluate(Operator::IsIncreasing, &s, RightValue::None, 2));
        assert!(!evaluate(Operator::IsDecreasing, &s, RightValue::None, 2));
        assert!(evaluate(Operator::IsDecreasing, &s, RightValue::None, 3));
    }

    #[test]
    fn unknown_operator_id_is_false() {
        assert!(!evaluate_id("moon_phase", &[1.0], RightValue::None, 0));
        assert!(evaluate_id("greater_than", &[1.0], RightValue::None, 0));
    }
}
