//! Logical expressions and relational operators with schema inference.
//!
//! Expressions answer "what field do I produce against this input" via
//! [`LogicalExpr::to_field`]; plans answer "what schema do I emit" via
//! [`LogicalPlan::schema`]. Both are pure: trees are built once and never
//! mutated. All type checking happens here, before anything executes.

use std::fmt;
use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef};
use quarry_common::{QuarryError, Result};
use quarry_storage::{projected_indices, DataSource};

/// A literal value in a logical expression.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// 64-bit integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// String.
    Utf8(String),
    /// Boolean.
    Boolean(bool),
}

impl LiteralValue {
    /// Arrow type of the literal.
    pub fn data_type(&self) -> DataType {
        match self {
            LiteralValue::Int64(_) => DataType::Int64,
            LiteralValue::Float64(_) => DataType::Float64,
            LiteralValue::Utf8(_) => DataType::Utf8,
            LiteralValue::Boolean(_) => DataType::Boolean,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Int64(v) => write!(f, "{v}"),
            LiteralValue::Float64(v) => write!(f, "{v}"),
            LiteralValue::Utf8(v) => write!(f, "'{v}'"),
            LiteralValue::Boolean(v) => write!(f, "{v}"),
        }
    }
}

/// Binary operators in the logical algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Logical AND (boolean operands).
    And,
    /// Logical OR (boolean operands).
    Or,
    /// Equality.
    Eq,
    /// Inequality.
    NotEq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    GtEq,
    /// Less than.
    Lt,
    /// Less than or equal.
    LtEq,
    /// Addition.
    Plus,
    /// Subtraction.
    Minus,
    /// Multiplication.
    Multiply,
    /// Division.
    Divide,
    /// Remainder.
    Modulus,
}

impl BinaryOp {
    /// Whether the result type is boolean (logical and comparison
    /// operators) rather than the operand type (math operators).
    pub fn produces_boolean(self) -> bool {
        !matches!(
            self,
            BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulus
        )
    }

    /// Whether the operands themselves must be boolean.
    pub fn requires_boolean_operands(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulus => "%",
        };
        write!(f, "{symbol}")
    }
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    /// Running sum (string concatenation for utf8).
    Sum,
    /// Minimum.
    Min,
    /// Maximum.
    Max,
    /// Average.
    Avg,
    /// Count of non-null inputs; always int64.
    Count,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Count => "COUNT",
        };
        write!(f, "{name}")
    }
}

/// A logical expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalExpr {
    /// Column reference by name.
    Column(String),
    /// Column reference by position in the input schema.
    ColumnIndex(usize),
    /// Constant value.
    Literal(LiteralValue),
    /// Boolean negation.
    Not(Box<LogicalExpr>),
    /// Binary operation.
    BinaryOp {
        /// Left operand.
        left: Box<LogicalExpr>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<LogicalExpr>,
    },
    /// Cast to a target type.
    Cast {
        /// Expression being cast.
        expr: Box<LogicalExpr>,
        /// Target type.
        to_type: DataType,
    },
    /// Rename the produced field.
    Alias {
        /// Aliased expression.
        expr: Box<LogicalExpr>,
        /// Output name.
        name: String,
    },
    /// Aggregate over an input expression.
    Aggregate {
        /// Aggregate function.
        func: AggregateFunction,
        /// Aggregated input expression.
        expr: Box<LogicalExpr>,
    },
}

impl LogicalExpr {
    /// The field this expression produces when evaluated against `input`.
    ///
    /// Type rules are deterministic with no implicit coercions: math
    /// operators require equal operand types and produce the left type,
    /// logical/comparison operators produce boolean (logical operators also
    /// require boolean operands), casts produce the target type, aggregates
    /// produce their input type except `COUNT` which produces int64.
    pub fn to_field(&self, input: &LogicalPlan) -> Result<Field> {
        match self {
            LogicalExpr::Column(name) => {
                let schema = input.schema()?;
                let field = schema
                    .fields()
                    .iter()
                    .find(|f| f.name() == name)
                    .ok_or_else(|| {
                        QuarryError::NotFound(format!("column '{name}' not found in input schema"))
                    })?;
                Ok(field.as_ref().clone())
            }
            LogicalExpr::ColumnIndex(index) => {
                let schema = input.schema()?;
                let field = schema.fields().get(*index).ok_or_else(|| {
                    QuarryError::OutOfRange(format!(
                        "column index {index} out of range for schema with {} fields",
                        schema.fields().len()
                    ))
                })?;
                Ok(field.as_ref().clone())
            }
            LogicalExpr::Literal(value) => {
                Ok(Field::new(self.to_string(), value.data_type(), true))
            }
            LogicalExpr::Not(expr) => {
                let inner = expr.to_field(input)?;
                if inner.data_type() != &DataType::Boolean {
                    return Err(QuarryError::TypeMismatch(format!(
                        "NOT requires a boolean operand, got {} of type {}",
                        inner.name(),
                        inner.data_type()
                    )));
                }
                Ok(Field::new(self.to_string(), DataType::Boolean, true))
            }
            LogicalExpr::BinaryOp { left, op, right } => {
                let lf = left.to_field(input)?;
                let rf = right.to_field(input)?;
                if lf.data_type() != rf.data_type() {
                    return Err(QuarryError::TypeMismatch(format!(
                        "'{op}' operands have different types: {} vs {}",
                        lf.data_type(),
                        rf.data_type()
                    )));
                }
                if op.requires_boolean_operands() && lf.data_type() != &DataType::Boolean {
                    return Err(QuarryError::TypeMismatch(format!(
                        "'{op}' requires boolean operands, got {}",
                        lf.data_type()
                    )));
                }
                let data_type = if op.produces_boolean() {
                    DataType::Boolean
                } else {
                    lf.data_type().clone()
                };
                Ok(Field::new(self.to_string(), data_type, true))
            }
            LogicalExpr::Cast { expr, to_type } => {
                expr.to_field(input)?;
                Ok(Field::new(self.to_string(), to_type.clone(), true))
            }
            LogicalExpr::Alias { expr, name } => {
                let inner = expr.to_field(input)?;
                Ok(Field::new(name, inner.data_type().clone(), true))
            }
            LogicalExpr::Aggregate { func, expr } => {
                let inner = expr.to_field(input)?;
                let data_type = match func {
                    AggregateFunction::Count => DataType::Int64,
                    _ => inner.data_type().clone(),
                };
                Ok(Field::new(self.to_string(), data_type, true))
            }
        }
    }
}

impl fmt::Display for LogicalExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalExpr::Column(name) => write!(f, "{name}"),
            LogicalExpr::ColumnIndex(index) => write!(f, "#{index}"),
            LogicalExpr::Literal(value) => write!(f, "{value}"),
            LogicalExpr::Not(expr) => write!(f, "NOT {expr}"),
            LogicalExpr::BinaryOp { left, op, right } => write!(f, "{left} {op} {right}"),
            LogicalExpr::Cast { expr, to_type } => {
                write!(f, "CAST({expr} AS {})", type_name(to_type))
            }
            LogicalExpr::Alias { expr, name } => write!(f, "{expr} AS {name}"),
            LogicalExpr::Aggregate { func, expr } => write!(f, "{func}({expr})"),
        }
    }
}

fn type_name(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::Boolean => "boolean",
        DataType::Int64 => "long",
        DataType::Float64 => "double",
        DataType::Utf8 => "string",
        _ => "unsupported",
    }
}

/// A logical relational operator tree.
#[derive(Debug, Clone)]
pub enum LogicalPlan {
    /// Read from a data source, optionally restricted to named columns.
    Scan {
        /// The underlying data source.
        source: Arc<dyn DataSource>,
        /// Column names to read; empty means all.
        projection: Vec<String>,
    },
    /// Evaluate expressions against the input.
    Projection {
        /// Input plan.
        input: Box<LogicalPlan>,
        /// Output expressions, in order.
        exprs: Vec<LogicalExpr>,
    },
    /// Keep rows where the predicate is true.
    Selection {
        /// Input plan.
        input: Box<LogicalPlan>,
        /// Boolean predicate.
        predicate: LogicalExpr,
    },
    /// Group and aggregate.
    Aggregation {
        /// Input plan.
        input: Box<LogicalPlan>,
        /// Grouping expressions.
        group_exprs: Vec<LogicalExpr>,
        /// Aggregate expressions (each an `Aggregate`, possibly aliased).
        agg_exprs: Vec<LogicalExpr>,
    },
}

impl LogicalPlan {
    /// Output schema of this operator.
    ///
    /// Every field name in the result is unique; duplicates fail with
    /// `InvalidInput`.
    pub fn schema(&self) -> Result<SchemaRef> {
        match self {
            LogicalPlan::Scan { source, projection } => {
                let schema = source.schema();
                if projection.is_empty() {
                    return Ok(schema);
                }
                let indices = projected_indices(&schema, projection)?;
                let projected = schema.project(&indices).map_err(|e| {
                    QuarryError::Internal(format!("schema projection failed: {e}"))
                })?;
                Ok(Arc::new(projected))
            }
            LogicalPlan::Projection { input, exprs } => {
                let fields = exprs
                    .iter()
                    .map(|e| e.to_field(input))
                    .collect::<Result<Vec<_>>>()?;
                ensure_unique_names(&fields)?;
                Ok(Arc::new(Schema::new(fields)))
            }
            LogicalPlan::Selection { input, predicate } => {
                let field = predicate.to_field(input)?;
                if field.data_type() != &DataType::Boolean {
                    return Err(QuarryError::TypeMismatch(format!(
                        "selection predicate '{predicate}' has type {}, expected boolean",
                        field.data_type()
                    )));
                }
                input.schema()
            }
            LogicalPlan::Aggregation {
                input,
                group_exprs,
                agg_exprs,
            } => {
                let mut fields = group_exprs
                    .iter()
                    .map(|e| e.to_field(input))
                    .collect::<Result<Vec<_>>>()?;
                for expr in agg_exprs {
                    fields.push(expr.to_field(input)?);
                }
                ensure_unique_names(&fields)?;
                Ok(Arc::new(Schema::new(fields)))
            }
        }
    }

    /// Direct children of this operator.
    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::Scan { .. } => vec![],
            LogicalPlan::Projection { input, .. }
            | LogicalPlan::Selection { input, .. }
            | LogicalPlan::Aggregation { input, .. } => vec![input.as_ref()],
        }
    }
}

fn ensure_unique_names(fields: &[Field]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for field in fields {
        if !seen.insert(field.name().as_str()) {
            return Err(QuarryError::InvalidInput(format!(
                "duplicate output column name '{}'",
                field.name()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::record_batch::RecordBatch;
    use quarry_storage::MemSource;

    fn test_scan() -> LogicalPlan {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("name", DataType::Utf8, true),
            Field::new("age", DataType::Int64, true),
            Field::new("frequency", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            Arc::clone(&schema),
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec!["r1", "r2"])),
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(Float64Array::from(vec![1.1, 2.2])),
            ],
        )
        .expect("batch");
        LogicalPlan::Scan {
            source: Arc::new(MemSource::new(schema, vec![batch]).expect("source")),
            projection: vec![],
        }
    }

    fn col(name: &str) -> LogicalExpr {
        LogicalExpr::Column(name.to_string())
    }

    #[test]
    fn column_resolves_type_from_input() {
        let scan = test_scan();
        let field = col("frequency").to_field(&scan).expect("field");
        assert_eq!(field.name(), "frequency");
        assert_eq!(field.data_type(), &DataType::Float64);
    }

    #[test]
    fn missing_column_is_not_found() {
        let scan = test_scan();
        let err = col("missing").to_field(&scan).expect_err("should fail");
        assert!(matches!(err, QuarryError::NotFound(_)), "{err}");
    }

    #[test]
    fn column_index_out_of_range() {
        let scan = test_scan();
        let err = LogicalExpr::ColumnIndex(9)
            .to_field(&scan)
            .expect_err("should fail");
        assert!(matches!(err, QuarryError::OutOfRange(_)), "{err}");
    }

    #[test]
    fn literal_fields_carry_literal_types_and_names() {
        let scan = test_scan();
        let field = LogicalExpr::Literal(LiteralValue::Int64(42))
            .to_field(&scan)
            .expect("field");
        assert_eq!(field.name(), "42");
        assert_eq!(field.data_type(), &DataType::Int64);
    }

    #[test]
    fn math_requires_equal_operand_types() {
        let scan = test_scan();
        let expr = LogicalExpr::BinaryOp {
            left: Box::new(col("age")),
            op: BinaryOp::Plus,
            right: Box::new(col("frequency")),
        };
        let err = expr.to_field(&scan).expect_err("should fail");
        assert!(matches!(err, QuarryError::TypeMismatch(_)), "{err}");
    }

    #[test]
    fn math_produces_left_operand_type() {
        let scan = test_scan();
        let expr = LogicalExpr::BinaryOp {
            left: Box::new(col("age")),
            op: BinaryOp::Multiply,
            right: Box::new(col("id")),
        };
        let field = expr.to_field(&scan).expect("field");
        assert_eq!(field.data_type(), &DataType::Int64);
        assert_eq!(field.name(), "age * id");
    }

    #[test]
    fn comparison_of_mismatched_types_fails() {
        let scan = test_scan();
        let expr = LogicalExpr::BinaryOp {
            left: Box::new(LogicalExpr::Literal(LiteralValue::Int64(1))),
            op: BinaryOp::Eq,
            right: Box::new(LogicalExpr::Literal(LiteralValue::Utf8("x".to_string()))),
        };
        let err = expr.to_field(&scan).expect_err("should fail");
        assert!(matches!(err, QuarryError::TypeMismatch(_)), "{err}");
    }

    #[test]
    fn and_requires_boolean_operands() {
        let scan = test_scan();
        let expr = LogicalExpr::BinaryOp {
            left: Box::new(col("id")),
            op: BinaryOp::And,
            right: Box::new(col("age")),
        };
        let err = expr.to_field(&scan).expect_err("should fail");
        assert!(matches!(err, QuarryError::TypeMismatch(_)), "{err}");
    }

    #[test]
    fn alias_renames_and_keeps_type() {
        let scan = test_scan();
        let expr = LogicalExpr::Alias {
            expr: Box::new(col("age")),
            name: "years".to_string(),
        };
        let field = expr.to_field(&scan).expect("field");
        assert_eq!(field.name(), "years");
        assert_eq!(field.data_type(), &DataType::Int64);
    }

    #[test]
    fn cast_produces_target_type() {
        let scan = test_scan();
        let expr = LogicalExpr::Cast {
            expr: Box::new(col("age")),
            to_type: DataType::Float64,
        };
        let field = expr.to_field(&scan).expect("field");
        assert_eq!(field.data_type(), &DataType::Float64);
    }

    #[test]
    fn count_is_int64_other_aggregates_keep_input_type() {
        let scan = test_scan();
        let count = LogicalExpr::Aggregate {
            func: AggregateFunction::Count,
            expr: Box::new(col("name")),
        };
        assert_eq!(
            count.to_field(&scan).expect("field").data_type(),
            &DataType::Int64
        );

        let sum = LogicalExpr::Aggregate {
            func: AggregateFunction::Sum,
            expr: Box::new(col("frequency")),
        };
        let field = sum.to_field(&scan).expect("field");
        assert_eq!(field.data_type(), &DataType::Float64);
        assert_eq!(field.name(), "SUM(frequency)");
    }

    #[test]
    fn scan_schema_honors_projection_in_source_order() {
        let scan = match test_scan() {
            LogicalPlan::Scan { source, .. } => LogicalPlan::Scan {
                source,
                projection: vec!["age".to_string(), "id".to_string()],
            },
            other => panic!("unexpected plan {other:?}"),
        };
        let schema = scan.schema().expect("schema");
        assert_eq!(schema.field(0).name(), "id");
        assert_eq!(schema.field(1).name(), "age");
    }

    #[test]
    fn selection_preserves_schema_and_rejects_non_boolean_predicates() {
        let plan = LogicalPlan::Selection {
            input: Box::new(test_scan()),
            predicate: LogicalExpr::BinaryOp {
                left: Box::new(col("age")),
                op: BinaryOp::Gt,
                right: Box::new(LogicalExpr::Literal(LiteralValue::Int64(10))),
            },
        };
        assert_eq!(plan.schema().expect("schema").fields().len(), 4);

        let bad = LogicalPlan::Selection {
            input: Box::new(test_scan()),
            predicate: col("age"),
        };
        let err = bad.schema().expect_err("should fail");
        assert!(matches!(err, QuarryError::TypeMismatch(_)), "{err}");
    }

    #[test]
    fn aggregation_schema_is_groups_then_aggregates() {
        let plan = LogicalPlan::Aggregation {
            input: Box::new(test_scan()),
            group_exprs: vec![col("id")],
            agg_exprs: vec![LogicalExpr::Aggregate {
                func: AggregateFunction::Sum,
                expr: Box::new(col("age")),
            }],
        };
        let schema = plan.schema().expect("schema");
        assert_eq!(schema.field(0).name(), "id");
        assert_eq!(schema.field(1).name(), "SUM(age)");
    }

    #[test]
    fn duplicate_projection_names_are_rejected() {
        let plan = LogicalPlan::Projection {
            input: Box::new(test_scan()),
            exprs: vec![col("id"), col("id")],
        };
        let err = plan.schema().expect_err("should fail");
        assert!(matches!(err, QuarryError::InvalidInput(_)), "{err}");
    }
}
