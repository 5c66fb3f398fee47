//! Logical plan → physical operator lowering.
//!
//! Lowering is bottom-up and name-resolving: logical column names become
//! positional indices against the child's schema, aliases disappear, and
//! each logical node carries its inferred schema into the physical operator
//! so emitted batches match the planned schema exactly.

use std::sync::Arc;

use quarry_common::{QuarryError, Result};
use quarry_planner::{LogicalExpr, LogicalPlan};

use crate::expressions::PhysicalExpr;
use crate::operators::{
    AggregateExpr, HashAggregateExec, PhysicalPlan, ProjectionExec, ScanExec, SelectionExec,
};

/// Lower a logical plan into a physical operator tree.
pub fn create_physical_plan(plan: &LogicalPlan, batch_size: usize) -> Result<PhysicalPlan> {
    match plan {
        LogicalPlan::Scan { source, projection } => Ok(PhysicalPlan::Scan(ScanExec::new(
            Arc::clone(source),
            projection.clone(),
            batch_size,
        )?)),
        LogicalPlan::Selection { input, predicate } => {
            let child = create_physical_plan(input, batch_size)?;
            let predicate = create_physical_expr(predicate, input)?;
            let schema = input.schema()?;
            Ok(PhysicalPlan::Selection(SelectionExec::new(
                Box::new(child),
                schema,
                predicate,
            )))
        }
        LogicalPlan::Projection { input, exprs } => {
            let child = create_physical_plan(input, batch_size)?;
            let schema = plan.schema()?;
            let physical_exprs = exprs
                .iter()
                .map(|e| create_physical_expr(e, input))
                .collect::<Result<Vec<_>>>()?;
            Ok(PhysicalPlan::Projection(ProjectionExec::new(
                Box::new(child),
                schema,
                physical_exprs,
            )))
        }
        LogicalPlan::Aggregation {
            input,
            group_exprs,
            agg_exprs,
        } => {
            let child = create_physical_plan(input, batch_size)?;
            let schema = plan.schema()?;
            let groups = group_exprs
                .iter()
                .map(|e| create_physical_expr(e, input))
                .collect::<Result<Vec<_>>>()?;
            let aggregates = agg_exprs
                .iter()
                .map(|e| create_aggregate_expr(e, input))
                .collect::<Result<Vec<_>>>()?;
            Ok(PhysicalPlan::HashAggregate(HashAggregateExec::new(
                Box::new(child),
                schema,
                groups,
                aggregates,
            )))
        }
    }
}

/// Lower a scalar logical expression against `input`'s schema.
pub fn create_physical_expr(expr: &LogicalExpr, input: &LogicalPlan) -> Result<PhysicalExpr> {
    match expr {
        LogicalExpr::Column(name) => {
            let schema = input.schema()?;
            let index = schema
                .fields()
                .iter()
                .position(|f| f.name() == name)
                .ok_or_else(|| {
                    QuarryError::InvalidInput(format!(
                        "column '{name}' not found in input schema during lowering"
                    ))
                })?;
            Ok(PhysicalExpr::Column(index))
        }
        LogicalExpr::ColumnIndex(index) => Ok(PhysicalExpr::Column(*index)),
        LogicalExpr::Literal(value) => Ok(PhysicalExpr::Literal(value.clone())),
        LogicalExpr::Not(inner) => Ok(PhysicalExpr::Not(Box::new(create_physical_expr(
            inner, input,
        )?))),
        LogicalExpr::BinaryOp { left, op, right } => Ok(PhysicalExpr::BinaryOp {
            left: Box::new(create_physical_expr(left, input)?),
            op: *op,
            right: Box::new(create_physical_expr(right, input)?),
        }),
        LogicalExpr::Cast { expr, to_type } => Ok(PhysicalExpr::Cast {
            expr: Box::new(create_physical_expr(expr, input)?),
            to_type: to_type.clone(),
        }),
        // Aliases only rename the output field; evaluation sees through them.
        LogicalExpr::Alias { expr, .. } => create_physical_expr(expr, input),
        LogicalExpr::Aggregate { .. } => Err(QuarryError::InvalidInput(format!(
            "aggregate expression '{expr}' is not valid in a scalar position"
        ))),
    }
}

/// Lower an aggregate projection entry (an `Aggregate`, possibly aliased).
fn create_aggregate_expr(expr: &LogicalExpr, input: &LogicalPlan) -> Result<AggregateExpr> {
    match expr {
        LogicalExpr::Alias { expr, .. } => create_aggregate_expr(expr, input),
        LogicalExpr::Aggregate { func, expr } => Ok(AggregateExpr {
            func: *func,
            expr: create_physical_expr(expr, input)?,
        }),
        other => Err(QuarryError::Unimplemented(format!(
            "expression '{other}' over an aggregate is not supported; use a plain or aliased aggregate"
        ))),
    }
}
