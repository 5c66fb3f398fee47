//! SQL AST → logical plan lowering.
//!
//! Contract:
//! - the table must resolve through the supplied [`TableResolver`];
//! - GROUP BY requires at least one aggregate in the projection;
//! - ORDER BY and HAVING parse but do not plan (`Unimplemented`);
//! - the produced plan is schema-validated before it is returned, so
//!   unknown columns and operand type conflicts fail here rather than at
//!   execution time.

use std::collections::HashSet;

use arrow_schema::DataType;
use quarry_common::{QuarryError, Result};
use quarry_sql::{SqlBinaryOp, SqlExpr, SqlSelect};
use tracing::debug;

use crate::logical_plan::{AggregateFunction, BinaryOp, LiteralValue, LogicalExpr, LogicalPlan};

/// Resolves a table name to the logical plan of its data.
pub trait TableResolver {
    /// The base plan for `name`, typically a `Scan` over a registered
    /// source. Fails with `NotFound` for unknown names.
    fn resolve_table(&self, name: &str) -> Result<LogicalPlan>;
}

/// Lower a parsed `SELECT` into a logical plan.
pub fn plan_select(select: &SqlSelect, tables: &dyn TableResolver) -> Result<LogicalPlan> {
    if !select.order_by.is_empty() {
        return Err(QuarryError::Unimplemented(
            "ORDER BY is parsed but not executed in this version".to_string(),
        ));
    }
    if select.having.is_some() {
        return Err(QuarryError::Unimplemented(
            "HAVING is parsed but not executed in this version".to_string(),
        ));
    }

    let table_plan = tables.resolve_table(&select.table)?;

    // SELECT * expands to every source column, so the wildcard flows
    // through planning and push-down like any explicit projection.
    let projection_exprs = if select.projection.is_empty() {
        table_plan
            .schema()?
            .fields()
            .iter()
            .map(|f| LogicalExpr::Column(f.name().clone()))
            .collect()
    } else {
        select
            .projection
            .iter()
            .map(lower_expr)
            .collect::<Result<Vec<_>>>()?
    };

    let agg_count = projection_exprs
        .iter()
        .filter(|e| contains_aggregate(e))
        .count();
    if agg_count == 0 && !select.group_by.is_empty() {
        return Err(QuarryError::InvalidInput(
            "GROUP BY requires at least one aggregate expression in the projection".to_string(),
        ));
    }

    let filter_expr = select.selection.as_deref().map(lower_expr).transpose()?;

    // Columns the query touches seed the scan projection; push-down later
    // re-derives this from the full plan.
    let mut referenced = HashSet::new();
    for expr in &projection_exprs {
        collect_columns(expr, &mut referenced);
    }
    if let Some(filter) = &filter_expr {
        collect_columns(filter, &mut referenced);
    }

    let mut plan = scan_with_projection(table_plan, &referenced);
    if let Some(predicate) = filter_expr {
        plan = LogicalPlan::Selection {
            input: Box::new(plan),
            predicate,
        };
    }

    let plan = if agg_count == 0 {
        LogicalPlan::Projection {
            input: Box::new(plan),
            exprs: projection_exprs,
        }
    } else {
        let (agg_exprs, group_exprs): (Vec<_>, Vec<_>) = projection_exprs
            .into_iter()
            .partition(contains_aggregate);
        LogicalPlan::Aggregation {
            input: Box::new(plan),
            group_exprs,
            agg_exprs,
        }
    };

    // Validate eagerly: surfaces NotFound / TypeMismatch during planning.
    let schema = plan.schema()?;
    debug!(table = %select.table, fields = schema.fields().len(), "planned select");
    Ok(plan)
}

/// Narrow a base scan to the referenced columns, in source order. Names not
/// present in the source stay out of the scan projection and fail later as
/// `NotFound` during schema validation.
fn scan_with_projection(table_plan: LogicalPlan, referenced: &HashSet<String>) -> LogicalPlan {
    match table_plan {
        LogicalPlan::Scan { source, .. } => {
            let projection = source
                .schema()
                .fields()
                .iter()
                .filter(|f| referenced.contains(f.name().as_str()))
                .map(|f| f.name().clone())
                .collect();
            LogicalPlan::Scan { source, projection }
        }
        other => other,
    }
}

/// Lower one SQL expression to a logical expression.
pub fn lower_expr(expr: &SqlExpr) -> Result<LogicalExpr> {
    match expr {
        SqlExpr::Identifier(name) => Ok(LogicalExpr::Column(name.clone())),
        SqlExpr::Long(value) => Ok(LogicalExpr::Literal(LiteralValue::Int64(*value))),
        SqlExpr::Double(value) => Ok(LogicalExpr::Literal(LiteralValue::Float64(*value))),
        SqlExpr::String(value) => Ok(LogicalExpr::Literal(LiteralValue::Utf8(value.clone()))),
        SqlExpr::Alias { expr, alias } => Ok(LogicalExpr::Alias {
            expr: Box::new(lower_expr(expr)?),
            name: alias.clone(),
        }),
        SqlExpr::Cast { expr, data_type } => Ok(LogicalExpr::Cast {
            expr: Box::new(lower_expr(expr)?),
            to_type: parse_type(data_type)?,
        }),
        SqlExpr::BinaryOp { left, op, right } => Ok(LogicalExpr::BinaryOp {
            left: Box::new(lower_expr(left)?),
            op: lower_binary_op(*op),
            right: Box::new(lower_expr(right)?),
        }),
        SqlExpr::Function { name, args } => {
            let func = match name.to_ascii_uppercase().as_str() {
                "MIN" => AggregateFunction::Min,
                "MAX" => AggregateFunction::Max,
                "SUM" => AggregateFunction::Sum,
                "AVG" => AggregateFunction::Avg,
                "COUNT" => AggregateFunction::Count,
                other => {
                    return Err(QuarryError::InvalidInput(format!(
                        "unknown function '{other}'"
                    )));
                }
            };
            if args.len() != 1 {
                return Err(QuarryError::InvalidInput(format!(
                    "{func} takes exactly one argument, got {}",
                    args.len()
                )));
            }
            Ok(LogicalExpr::Aggregate {
                func,
                expr: Box::new(lower_expr(&args[0])?),
            })
        }
        SqlExpr::Sort { .. } | SqlExpr::Select(_) => Err(QuarryError::InvalidInput(format!(
            "expression not valid in this position: {expr:?}"
        ))),
    }
}

fn lower_binary_op(op: SqlBinaryOp) -> BinaryOp {
    match op {
        SqlBinaryOp::And => BinaryOp::And,
        SqlBinaryOp::Or => BinaryOp::Or,
        SqlBinaryOp::Eq => BinaryOp::Eq,
        SqlBinaryOp::NotEq => BinaryOp::NotEq,
        SqlBinaryOp::Gt => BinaryOp::Gt,
        SqlBinaryOp::GtEq => BinaryOp::GtEq,
        SqlBinaryOp::Lt => BinaryOp::Lt,
        SqlBinaryOp::LtEq => BinaryOp::LtEq,
        SqlBinaryOp::Plus => BinaryOp::Plus,
        SqlBinaryOp::Minus => BinaryOp::Minus,
        SqlBinaryOp::Multiply => BinaryOp::Multiply,
        SqlBinaryOp::Divide => BinaryOp::Divide,
        SqlBinaryOp::Modulus => BinaryOp::Modulus,
    }
}

fn parse_type(name: &str) -> Result<DataType> {
    match name.to_ascii_lowercase().as_str() {
        "long" => Ok(DataType::Int64),
        "double" => Ok(DataType::Float64),
        "string" => Ok(DataType::Utf8),
        other => Err(QuarryError::InvalidInput(format!(
            "unknown type '{other}' in cast expression"
        ))),
    }
}

/// Whether the expression reaches an aggregate anywhere in its tree.
pub fn contains_aggregate(expr: &LogicalExpr) -> bool {
    match expr {
        LogicalExpr::Aggregate { .. } => true,
        LogicalExpr::Alias { expr, .. }
        | LogicalExpr::Cast { expr, .. }
        | LogicalExpr::Not(expr) => contains_aggregate(expr),
        LogicalExpr::BinaryOp { left, right, .. } => {
            contains_aggregate(left) || contains_aggregate(right)
        }
        LogicalExpr::Column(_) | LogicalExpr::ColumnIndex(_) | LogicalExpr::Literal(_) => false,
    }
}

/// Collect column names referenced by the expression.
fn collect_columns(expr: &LogicalExpr, accum: &mut HashSet<String>) {
    match expr {
        LogicalExpr::Column(name) => {
            accum.insert(name.clone());
        }
        LogicalExpr::Alias { expr, .. }
        | LogicalExpr::Cast { expr, .. }
        | LogicalExpr::Not(expr)
        | LogicalExpr::Aggregate { expr, .. } => collect_columns(expr, accum),
        LogicalExpr::BinaryOp { left, right, .. } => {
            collect_columns(left, accum);
            collect_columns(right, accum);
        }
        LogicalExpr::ColumnIndex(_) | LogicalExpr::Literal(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::record_batch::RecordBatch;
    use arrow_schema::{Field, Schema};
    use quarry_sql::parse_sql;
    use quarry_storage::MemSource;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct TestTables {
        tables: HashMap<String, LogicalPlan>,
    }

    impl TestTables {
        fn with_t() -> Self {
            let schema = Arc::new(Schema::new(vec![
                Field::new("id", DataType::Int64, true),
                Field::new("name", DataType::Utf8, true),
                Field::new("age", DataType::Int64, true),
                Field::new("frequency", DataType::Float64, true),
            ]));
            let batch = RecordBatch::try_new(
                Arc::clone(&schema),
                vec![
                    Arc::new(Int64Array::from(vec![1])),
                    Arc::new(StringArray::from(vec!["r1"])),
                    Arc::new(Int64Array::from(vec![1])),
                    Arc::new(Float64Array::from(vec![1.1])),
                ],
            )
            .expect("batch");
            let mut tables = HashMap::new();
            tables.insert(
                "t".to_string(),
                LogicalPlan::Scan {
                    source: Arc::new(MemSource::new(schema, vec![batch]).expect("source")),
                    projection: vec![],
                },
            );
            Self { tables }
        }
    }

    impl TableResolver for TestTables {
        fn resolve_table(&self, name: &str) -> Result<LogicalPlan> {
            self.tables
                .get(name)
                .cloned()
                .ok_or_else(|| QuarryError::NotFound(format!("unknown table: {name}")))
        }
    }

    fn plan(sql: &str) -> Result<LogicalPlan> {
        let select = parse_sql(sql).expect("parse");
        plan_select(&select, &TestTables::with_t())
    }

    #[test]
    fn projection_narrows_scan_to_referenced_columns() {
        let plan = plan("SELECT id, name FROM t").expect("plan");
        let schema = plan.schema().expect("schema");
        assert_eq!(schema.field(0).name(), "id");
        assert_eq!(schema.field(1).name(), "name");

        match &plan {
            LogicalPlan::Projection { input, .. } => match input.as_ref() {
                LogicalPlan::Scan { projection, .. } => {
                    assert_eq!(projection, &vec!["id".to_string(), "name".to_string()]);
                }
                other => panic!("expected Scan input, got {other:?}"),
            },
            other => panic!("expected Projection, got {other:?}"),
        }
    }

    #[test]
    fn select_star_expands_to_every_column() {
        let plan = plan("SELECT * FROM t").expect("plan");
        let schema = plan.schema().expect("schema");
        assert_eq!(schema.fields().len(), 4);
        assert!(matches!(plan, LogicalPlan::Projection { .. }));
    }

    #[test]
    fn select_star_with_filter_keeps_full_schema() {
        let plan = plan("SELECT * FROM t WHERE age > 10").expect("plan");
        let schema = plan.schema().expect("schema");
        assert_eq!(schema.fields().len(), 4);

        let optimized = crate::optimizer::Optimizer::new()
            .optimize(&plan)
            .expect("optimize");
        assert_eq!(
            optimized.schema().expect("schema").fields(),
            schema.fields()
        );
    }

    #[test]
    fn where_clause_feeds_scan_projection() {
        let plan = plan("SELECT id FROM t WHERE age > 10").expect("plan");
        match &plan {
            LogicalPlan::Projection { input, .. } => match input.as_ref() {
                LogicalPlan::Selection { input, .. } => match input.as_ref() {
                    LogicalPlan::Scan { projection, .. } => {
                        assert_eq!(projection, &vec!["id".to_string(), "age".to_string()]);
                    }
                    other => panic!("expected Scan, got {other:?}"),
                },
                other => panic!("expected Selection, got {other:?}"),
            },
            other => panic!("expected Projection, got {other:?}"),
        }
    }

    #[test]
    fn aggregates_split_into_groups_and_aggregates() {
        let plan = plan("SELECT id, SUM(age) FROM t GROUP BY id").expect("plan");
        match &plan {
            LogicalPlan::Aggregation {
                group_exprs,
                agg_exprs,
                ..
            } => {
                assert_eq!(group_exprs.len(), 1);
                assert_eq!(agg_exprs.len(), 1);
            }
            other => panic!("expected Aggregation, got {other:?}"),
        }
        let schema = plan.schema().expect("schema");
        assert_eq!(schema.field(0).name(), "id");
        assert_eq!(schema.field(1).name(), "SUM(age)");
    }

    #[test]
    fn group_by_without_aggregate_is_invalid() {
        let err = plan("SELECT id FROM t GROUP BY id").expect_err("should fail");
        assert!(matches!(err, QuarryError::InvalidInput(_)), "{err}");
    }

    #[test]
    fn order_by_and_having_are_unimplemented() {
        let err = plan("SELECT id FROM t ORDER BY id").expect_err("should fail");
        assert!(matches!(err, QuarryError::Unimplemented(_)), "{err}");

        let err = plan("SELECT SUM(age) FROM t GROUP BY id HAVING SUM(age) > 1")
            .expect_err("should fail");
        assert!(matches!(err, QuarryError::Unimplemented(_)), "{err}");
    }

    #[test]
    fn unknown_table_is_not_found() {
        let err = plan("SELECT id FROM nope").expect_err("should fail");
        assert!(matches!(err, QuarryError::NotFound(_)), "{err}");
    }

    #[test]
    fn unknown_column_is_not_found() {
        let err = plan("SELECT missing FROM t").expect_err("should fail");
        assert!(matches!(err, QuarryError::NotFound(_)), "{err}");
    }

    #[test]
    fn mismatched_comparison_is_type_error_at_planning() {
        let err = plan(r#"SELECT 1 = "x" FROM t"#).expect_err("should fail");
        assert!(matches!(err, QuarryError::TypeMismatch(_)), "{err}");
    }

    #[test]
    fn unknown_cast_type_is_invalid() {
        let err = plan("SELECT CAST(id AS decimal) FROM t").expect_err("should fail");
        assert!(matches!(err, QuarryError::InvalidInput(_)), "{err}");
    }

    #[test]
    fn unknown_function_is_invalid() {
        let err = plan("SELECT MEDIAN(age) FROM t").expect_err("should fail");
        assert!(matches!(err, QuarryError::InvalidInput(_)), "{err}");
    }
}
