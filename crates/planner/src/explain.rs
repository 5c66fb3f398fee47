//! Textual plan rendering for debugging and tests.

use std::fmt::Write;

use crate::logical_plan::LogicalPlan;

/// Render a logical plan as an indented tree, one node per line.
pub fn explain_logical(plan: &LogicalPlan) -> String {
    let mut out = String::new();
    render(plan, 0, &mut out);
    out
}

fn render(plan: &LogicalPlan, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    match plan {
        LogicalPlan::Scan { projection, .. } => {
            if projection.is_empty() {
                let _ = writeln!(out, "Scan: projection=*");
            } else {
                let _ = writeln!(out, "Scan: projection=[{}]", projection.join(", "));
            }
        }
        LogicalPlan::Projection { exprs, .. } => {
            let rendered: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
            let _ = writeln!(out, "Projection: {}", rendered.join(", "));
        }
        LogicalPlan::Selection { predicate, .. } => {
            let _ = writeln!(out, "Selection: {predicate}");
        }
        LogicalPlan::Aggregation {
            group_exprs,
            agg_exprs,
            ..
        } => {
            let groups: Vec<String> = group_exprs.iter().map(|e| e.to_string()).collect();
            let aggs: Vec<String> = agg_exprs.iter().map(|e| e.to_string()).collect();
            let _ = writeln!(
                out,
                "Aggregation: groups=[{}], aggregates=[{}]",
                groups.join(", "),
                aggs.join(", ")
            );
        }
    }
    for child in plan.children() {
        render(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical_plan::{BinaryOp, LiteralValue, LogicalExpr};
    use arrow::array::Int64Array;
    use arrow::record_batch::RecordBatch;
    use arrow_schema::{DataType, Field, Schema};
    use quarry_storage::MemSource;
    use std::sync::Arc;

    #[test]
    fn renders_nested_plan_with_indentation() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("age", DataType::Int64, true),
        ]));
        let batch = RecordBatch::try_new(
            Arc::clone(&schema),
            vec![
                Arc::new(Int64Array::from(vec![1])),
                Arc::new(Int64Array::from(vec![2])),
            ],
        )
        .expect("batch");
        let plan = LogicalPlan::Projection {
            input: Box::new(LogicalPlan::Selection {
                input: Box::new(LogicalPlan::Scan {
                    source: Arc::new(MemSource::new(schema, vec![batch]).expect("source")),
                    projection: vec!["id".to_string(), "age".to_string()],
                }),
                predicate: LogicalExpr::BinaryOp {
                    left: Box::new(LogicalExpr::Column("age".to_string())),
                    op: BinaryOp::Gt,
                    right: Box::new(LogicalExpr::Literal(LiteralValue::Int64(10))),
                },
            }),
            exprs: vec![LogicalExpr::Column("id".to_string())],
        };

        let rendered = explain_logical(&plan);
        assert_eq!(
            rendered,
            "Projection: id\n  Selection: age > 10\n    Scan: projection=[id, age]\n"
        );
    }
}
