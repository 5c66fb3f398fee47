//! Per-group aggregate state.
//!
//! An accumulator starts empty, folds scalars one at a time, and finalizes
//! to a single scalar. Null inputs are skipped; an accumulator that never
//! observed a value finalizes to null (`COUNT` finalizes to 0).

use quarry_common::{QuarryError, Result};
use quarry_planner::AggregateFunction;

use crate::scalar::{scalar_gt, scalar_lt, ScalarValue};

/// Mutable aggregate state for one group.
#[derive(Debug, Clone)]
pub enum Accumulator {
    /// Largest value seen.
    Max(Option<ScalarValue>),
    /// Smallest value seen.
    Min(Option<ScalarValue>),
    /// Running sum; concatenation for strings.
    Sum(Option<ScalarValue>),
    /// Running sum and count; finalizes to sum / count in the input type.
    Avg {
        /// Sum of observed values.
        sum: Option<ScalarValue>,
        /// Number of observed values.
        count: i64,
    },
    /// Number of non-null values.
    Count(i64),
}

impl Accumulator {
    /// Fresh accumulator for an aggregate function.
    pub fn new(func: AggregateFunction) -> Self {
        match func {
            AggregateFunction::Max => Accumulator::Max(None),
            AggregateFunction::Min => Accumulator::Min(None),
            AggregateFunction::Sum => Accumulator::Sum(None),
            AggregateFunction::Avg => Accumulator::Avg {
                sum: None,
                count: 0,
            },
            AggregateFunction::Count => Accumulator::Count(0),
        }
    }

    /// Fold one value into the state. Nulls are ignored.
    pub fn accumulate(&mut self, value: &ScalarValue) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }

        match self {
            Accumulator::Max(current) => {
                match current {
                    Some(existing) => {
                        if scalar_gt(value, existing)? {
                            *current = Some(value.clone());
                        }
                    }
                    None => *current = Some(value.clone()),
                }
                Ok(())
            }
            Accumulator::Min(current) => {
                match current {
                    Some(existing) => {
                        if scalar_lt(value, existing)? {
                            *current = Some(value.clone());
                        }
                    }
                    None => *current = Some(value.clone()),
                }
                Ok(())
            }
            Accumulator::Sum(current) => {
                *current = Some(add_scalars(current.as_ref(), value)?);
                Ok(())
            }
            Accumulator::Avg { sum, count } => {
                *sum = Some(add_scalars(sum.as_ref(), value)?);
                *count += 1;
                Ok(())
            }
            Accumulator::Count(count) => {
                *count += 1;
                Ok(())
            }
        }
    }

    /// The aggregated value; null when nothing was accumulated.
    pub fn final_value(&self) -> Result<ScalarValue> {
        match self {
            Accumulator::Max(current) | Accumulator::Min(current) | Accumulator::Sum(current) => {
                Ok(current.clone().unwrap_or(ScalarValue::Null))
            }
            Accumulator::Avg { sum, count } => match (sum, count) {
                (Some(ScalarValue::Int64(total)), c) if *c > 0 => {
                    Ok(ScalarValue::Int64(total / c))
                }
                (Some(ScalarValue::Float64Bits(bits)), c) if *c > 0 => {
                    Ok(ScalarValue::from_f64(f64::from_bits(*bits) / *c as f64))
                }
                (Some(other), _) => Err(QuarryError::Internal(format!(
                    "unsupported value {other:?} in average state"
                ))),
                (None, _) => Ok(ScalarValue::Null),
            },
            Accumulator::Count(count) => Ok(ScalarValue::Int64(*count)),
        }
    }
}

/// Sum two scalars of the same type; `current = None` starts the sum.
fn add_scalars(current: Option<&ScalarValue>, value: &ScalarValue) -> Result<ScalarValue> {
    let Some(current) = current else {
        return match value {
            ScalarValue::Int64(_) | ScalarValue::Float64Bits(_) | ScalarValue::Utf8(_) => {
                Ok(value.clone())
            }
            other => Err(QuarryError::Internal(format!(
                "unsupported value type {other:?} for sum"
            ))),
        };
    };

    match (current, value) {
        (ScalarValue::Int64(a), ScalarValue::Int64(b)) => a
            .checked_add(*b)
            .map(ScalarValue::Int64)
            .ok_or_else(|| QuarryError::Internal("int64 overflow in sum".to_string())),
        (ScalarValue::Float64Bits(a), ScalarValue::Float64Bits(b)) => Ok(ScalarValue::from_f64(
            f64::from_bits(*a) + f64::from_bits(*b),
        )),
        (ScalarValue::Utf8(a), ScalarValue::Utf8(b)) => {
            Ok(ScalarValue::Utf8(format!("{a}{b}")))
        }
        (a, b) => Err(QuarryError::Internal(format!(
            "cannot sum values of different types: {a:?} and {b:?}"
        ))),
    }
}
