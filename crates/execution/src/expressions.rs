//! Physical expressions evaluated against record batches.
//!
//! The variant set is closed: each expression evaluates to one array of the
//! batch's row count. Operand arrays must agree in length and type; any
//! runtime shape violation fails with `Internal` (planning already rejected
//! user-visible type conflicts as `TypeMismatch`).

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, BooleanBuilder, Float64Array, Float64Builder, Int64Array,
    Int64Builder, StringArray, StringBuilder,
};
use arrow::compute::kernels::boolean::{and_kleene, not, or_kleene};
use arrow::compute::kernels::cast::cast;
use arrow::compute::kernels::cmp;
use arrow::record_batch::RecordBatch;
use arrow_schema::DataType;
use quarry_common::{QuarryError, Result};
use quarry_planner::{BinaryOp, LiteralValue};

/// A compiled physical expression.
#[derive(Debug, Clone)]
pub enum PhysicalExpr {
    /// Column of the input batch by position.
    Column(usize),
    /// Constant value, materialized to the batch's row count.
    Literal(LiteralValue),
    /// Boolean negation.
    Not(Box<PhysicalExpr>),
    /// Binary operation.
    BinaryOp {
        /// Left operand.
        left: Box<PhysicalExpr>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<PhysicalExpr>,
    },
    /// Cast to a target type.
    Cast {
        /// Input expression.
        expr: Box<PhysicalExpr>,
        /// Target type.
        to_type: DataType,
    },
}

impl PhysicalExpr {
    /// Evaluate against a batch, producing an array of the batch's length.
    pub fn evaluate(&self, batch: &RecordBatch) -> Result<ArrayRef> {
        match self {
            PhysicalExpr::Column(index) => {
                if *index >= batch.num_columns() {
                    return Err(QuarryError::OutOfRange(format!(
                        "column index {index} out of range for batch with {} columns",
                        batch.num_columns()
                    )));
                }
                Ok(Arc::clone(batch.column(*index)))
            }
            PhysicalExpr::Literal(value) => literal_array(value, batch.num_rows()),
            PhysicalExpr::Not(expr) => {
                let array = expr.evaluate(batch)?;
                let booleans = as_boolean(&array, "NOT")?;
                let out = not(booleans)
                    .map_err(|e| QuarryError::Internal(format!("NOT kernel failed: {e}")))?;
                Ok(Arc::new(out))
            }
            PhysicalExpr::BinaryOp { left, op, right } => {
                let l = left.evaluate(batch)?;
                let r = right.evaluate(batch)?;

                if l.len() != r.len() {
                    return Err(QuarryError::Internal(format!(
                        "'{op}' operand lengths differ: {} vs {}",
                        l.len(),
                        r.len()
                    )));
                }
                if l.data_type() != r.data_type() {
                    return Err(QuarryError::Internal(format!(
                        "'{op}' operand types differ: {} vs {}",
                        l.data_type(),
                        r.data_type()
                    )));
                }

                match op {
                    BinaryOp::And | BinaryOp::Or => {
                        let lb = as_boolean(&l, "AND/OR")?;
                        let rb = as_boolean(&r, "AND/OR")?;
                        let out = match op {
                            BinaryOp::And => and_kleene(lb, rb),
                            _ => or_kleene(lb, rb),
                        }
                        .map_err(|e| {
                            QuarryError::Internal(format!("boolean kernel failed: {e}"))
                        })?;
                        Ok(Arc::new(out))
                    }
                    BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Lt
                    | BinaryOp::LtEq
                    | BinaryOp::Gt
                    | BinaryOp::GtEq => eval_comparison(*op, &l, &r),
                    BinaryOp::Plus
                    | BinaryOp::Minus
                    | BinaryOp::Multiply
                    | BinaryOp::Divide
                    | BinaryOp::Modulus => eval_math(*op, &l, &r),
                }
            }
            PhysicalExpr::Cast { expr, to_type } => {
                let array = expr.evaluate(batch)?;
                if array.data_type() == to_type {
                    return Ok(array);
                }
                if !cast_supported(array.data_type(), to_type) {
                    return Err(QuarryError::Unimplemented(format!(
                        "cast from {} to {} is not supported",
                        array.data_type(),
                        to_type
                    )));
                }
                cast(&array, to_type)
                    .map_err(|e| QuarryError::Internal(format!("cast kernel failed: {e}")))
            }
        }
    }
}

/// v1 castable pairs: int64 <-> float64, numeric -> utf8.
fn cast_supported(from: &DataType, to: &DataType) -> bool {
    matches!(
        (from, to),
        (DataType::Int64, DataType::Float64)
            | (DataType::Float64, DataType::Int64)
            | (DataType::Int64, DataType::Utf8)
            | (DataType::Float64, DataType::Utf8)
    )
}

fn literal_array(value: &LiteralValue, rows: usize) -> Result<ArrayRef> {
    match value {
        LiteralValue::Int64(v) => {
            let mut builder = Int64Builder::with_capacity(rows);
            for _ in 0..rows {
                builder.append_value(*v);
            }
            Ok(Arc::new(builder.finish()))
        }
        LiteralValue::Float64(v) => {
            let mut builder = Float64Builder::with_capacity(rows);
            for _ in 0..rows {
                builder.append_value(*v);
            }
            Ok(Arc::new(builder.finish()))
        }
        LiteralValue::Utf8(v) => {
            let mut builder = StringBuilder::with_capacity(rows, rows * v.len());
            for _ in 0..rows {
                builder.append_value(v);
            }
            Ok(Arc::new(builder.finish()))
        }
        LiteralValue::Boolean(v) => {
            let mut builder = BooleanBuilder::with_capacity(rows);
            for _ in 0..rows {
                builder.append_value(*v);
            }
            Ok(Arc::new(builder.finish()))
        }
    }
}

/// Comparisons dispatch per type: numeric for int64/float64, lexicographic
/// for utf8, false-before-true for booleans.
fn eval_comparison(op: BinaryOp, l: &ArrayRef, r: &ArrayRef) -> Result<ArrayRef> {
    macro_rules! compare {
        ($array_type:ty) => {{
            let la = l
                .as_any()
                .downcast_ref::<$array_type>()
                .ok_or_else(|| QuarryError::Internal("comparison downcast failed".to_string()))?;
            let ra = r
                .as_any()
                .downcast_ref::<$array_type>()
                .ok_or_else(|| QuarryError::Internal("comparison downcast failed".to_string()))?;
            match op {
                BinaryOp::Eq => cmp::eq(la, ra),
                BinaryOp::NotEq => cmp::neq(la, ra),
                BinaryOp::Lt => cmp::lt(la, ra),
                BinaryOp::LtEq => cmp::lt_eq(la, ra),
                BinaryOp::Gt => cmp::gt(la, ra),
                BinaryOp::GtEq => cmp::gt_eq(la, ra),
                other => {
                    return Err(QuarryError::Internal(format!(
                        "'{other}' is not a comparison operator"
                    )));
                }
            }
            .map_err(|e| QuarryError::Internal(format!("comparison kernel failed: {e}")))
        }};
    }

    let out = match l.data_type() {
        DataType::Int64 => compare!(Int64Array)?,
        DataType::Float64 => compare!(Float64Array)?,
        DataType::Utf8 => compare!(StringArray)?,
        DataType::Boolean => compare!(BooleanArray)?,
        other => {
            return Err(QuarryError::Internal(format!(
                "unsupported type {other} in comparison"
            )));
        }
    };
    Ok(Arc::new(out))
}

/// Per-row checked arithmetic. A null operand, division or modulus by zero,
/// and int64 overflow all fail with `Internal`.
fn eval_math(op: BinaryOp, l: &ArrayRef, r: &ArrayRef) -> Result<ArrayRef> {
    match l.data_type() {
        DataType::Int64 => {
            let la = l
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| QuarryError::Internal("expected Int64Array".to_string()))?;
            let ra = r
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| QuarryError::Internal("expected Int64Array".to_string()))?;

            let mut builder = Int64Builder::with_capacity(la.len());
            for i in 0..la.len() {
                if la.is_null(i) || ra.is_null(i) {
                    return Err(null_operand(op));
                }
                let (a, b) = (la.value(i), ra.value(i));
                let value = match op {
                    BinaryOp::Plus => a.checked_add(b),
                    BinaryOp::Minus => a.checked_sub(b),
                    BinaryOp::Multiply => a.checked_mul(b),
                    BinaryOp::Divide => {
                        if b == 0 {
                            return Err(division_by_zero(op));
                        }
                        a.checked_div(b)
                    }
                    BinaryOp::Modulus => {
                        if b == 0 {
                            return Err(division_by_zero(op));
                        }
                        a.checked_rem(b)
                    }
                    _ => unreachable!("math evaluation called with '{op}'"),
                };
                let value = value.ok_or_else(|| {
                    QuarryError::Internal(format!("int64 overflow evaluating '{a} {op} {b}'"))
                })?;
                builder.append_value(value);
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Float64 => {
            let la = l
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| QuarryError::Internal("expected Float64Array".to_string()))?;
            let ra = r
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| QuarryError::Internal("expected Float64Array".to_string()))?;

            let mut builder = Float64Builder::with_capacity(la.len());
            for i in 0..la.len() {
                if la.is_null(i) || ra.is_null(i) {
                    return Err(null_operand(op));
                }
                let (a, b) = (la.value(i), ra.value(i));
                let value = match op {
                    BinaryOp::Plus => a + b,
                    BinaryOp::Minus => a - b,
                    BinaryOp::Multiply => a * b,
                    BinaryOp::Divide => {
                        if b == 0.0 {
                            return Err(division_by_zero(op));
                        }
                        a / b
                    }
                    BinaryOp::Modulus => {
                        if b == 0.0 {
                            return Err(division_by_zero(op));
                        }
                        a % b
                    }
                    _ => unreachable!("math evaluation called with '{op}'"),
                };
                builder.append_value(value);
            }
            Ok(Arc::new(builder.finish()))
        }
        other => Err(QuarryError::Internal(format!(
            "unsupported type {other} in math expression"
        ))),
    }
}

fn null_operand(op: BinaryOp) -> QuarryError {
    QuarryError::Internal(format!("null operand in '{op}' expression"))
}

fn division_by_zero(op: BinaryOp) -> QuarryError {
    QuarryError::Internal(format!("division by zero in '{op}' expression"))
}

fn as_boolean<'a>(array: &'a ArrayRef, context: &str) -> Result<&'a BooleanArray> {
    array
        .as_any()
        .downcast_ref::<BooleanArray>()
        .ok_or_else(|| {
            QuarryError::Internal(format!(
                "{context} expects a boolean operand, got {}",
                array.data_type()
            ))
        })
}
