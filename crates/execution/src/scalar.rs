//! Owned scalar values with hashable float representation.
//!
//! `ScalarValue` is the row-level currency of the execution layer: group
//! keys hash and compare by value, accumulators fold scalars, and the
//! aggregate output table is built back up from them. Floats are stored as
//! bit patterns so keys can derive `Eq` and `Hash`.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, BooleanBuilder, Float64Array, Float64Builder, Int64Array,
    Int64Builder, StringArray, StringBuilder,
};
use arrow_schema::DataType;
use quarry_common::{QuarryError, Result};

/// A single typed value, possibly null.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarValue {
    /// 64-bit integer.
    Int64(i64),
    /// 64-bit float, stored as its bit pattern.
    Float64Bits(u64),
    /// String.
    Utf8(String),
    /// Boolean.
    Boolean(bool),
    /// Null of any type.
    Null,
}

impl ScalarValue {
    /// Wrap a float value.
    pub fn from_f64(v: f64) -> Self {
        ScalarValue::Float64Bits(v.to_bits())
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Int64(v) => Some(*v as f64),
            ScalarValue::Float64Bits(v) => Some(f64::from_bits(*v)),
            _ => None,
        }
    }

    /// Whether this is the null scalar.
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }
}

/// Extract the scalar at `row` from an array.
pub fn scalar_at(array: &ArrayRef, row: usize) -> Result<ScalarValue> {
    if row >= array.len() {
        return Err(QuarryError::OutOfRange(format!(
            "row {row} out of range for array of length {}",
            array.len()
        )));
    }
    if array.is_null(row) {
        return Ok(ScalarValue::Null);
    }

    match array.data_type() {
        DataType::Int64 => {
            let a = downcast::<Int64Array>(array, "Int64Array")?;
            Ok(ScalarValue::Int64(a.value(row)))
        }
        DataType::Float64 => {
            let a = downcast::<Float64Array>(array, "Float64Array")?;
            Ok(ScalarValue::from_f64(a.value(row)))
        }
        DataType::Utf8 => {
            let a = downcast::<StringArray>(array, "StringArray")?;
            Ok(ScalarValue::Utf8(a.value(row).to_string()))
        }
        DataType::Boolean => {
            let a = downcast::<BooleanArray>(array, "BooleanArray")?;
            Ok(ScalarValue::Boolean(a.value(row)))
        }
        other => Err(QuarryError::Internal(format!(
            "unsupported array type {other} for scalar extraction"
        ))),
    }
}

/// Strict less-than over same-typed scalars.
///
/// Numeric for int64/float64, lexicographic for utf8, false-before-true for
/// booleans. Nulls and mixed types fail with `Internal`.
pub fn scalar_lt(a: &ScalarValue, b: &ScalarValue) -> Result<bool> {
    match (a, b) {
        (ScalarValue::Int64(x), ScalarValue::Int64(y)) => Ok(x < y),
        (ScalarValue::Float64Bits(x), ScalarValue::Float64Bits(y)) => {
            Ok(f64::from_bits(*x) < f64::from_bits(*y))
        }
        (ScalarValue::Utf8(x), ScalarValue::Utf8(y)) => Ok(x < y),
        (ScalarValue::Boolean(x), ScalarValue::Boolean(y)) => Ok(!*x & *y),
        _ => Err(QuarryError::Internal(
            "cannot compare scalars of different or null types".to_string(),
        )),
    }
}

/// Strict greater-than; see [`scalar_lt`].
pub fn scalar_gt(a: &ScalarValue, b: &ScalarValue) -> Result<bool> {
    scalar_lt(b, a)
}

/// Build a typed column from scalars, sized to `values.len()`.
///
/// Each non-null scalar must match `data_type`.
pub fn build_column(values: &[ScalarValue], data_type: &DataType) -> Result<ArrayRef> {
    match data_type {
        DataType::Int64 => {
            let mut builder = Int64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    ScalarValue::Int64(v) => builder.append_value(*v),
                    ScalarValue::Null => builder.append_null(),
                    other => return Err(type_conflict(other, data_type)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::with_capacity(values.len());
            for value in values {
                match value {
                    ScalarValue::Float64Bits(v) => builder.append_value(f64::from_bits(*v)),
                    ScalarValue::Null => builder.append_null(),
                    other => return Err(type_conflict(other, data_type)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Utf8 => {
            let mut builder = StringBuilder::new();
            for value in values {
                match value {
                    ScalarValue::Utf8(v) => builder.append_value(v),
                    ScalarValue::Null => builder.append_null(),
                    other => return Err(type_conflict(other, data_type)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(values.len());
            for value in values {
                match value {
                    ScalarValue::Boolean(v) => builder.append_value(*v),
                    ScalarValue::Null => builder.append_null(),
                    other => return Err(type_conflict(other, data_type)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        other => Err(QuarryError::Internal(format!(
            "unsupported output column type {other}"
        ))),
    }
}

fn type_conflict(value: &ScalarValue, data_type: &DataType) -> QuarryError {
    QuarryError::Internal(format!(
        "scalar {value:?} does not fit output column of type {data_type}"
    ))
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, expected: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| QuarryError::Internal(format!("expected {expected}")))
}
