//! Rule-based logical plan rewrites.
//!
//! The optimizer is a fixed list of rules applied in sequence; every rule
//! maps a plan to an equivalent plan with the same schema.

use std::collections::HashSet;

use quarry_common::{QuarryError, Result};
use tracing::debug;

use crate::logical_plan::{LogicalExpr, LogicalPlan};

/// A logical-to-logical rewrite.
pub trait OptimizerRule {
    /// Rule name for logging.
    fn name(&self) -> &'static str;

    /// Rewrite `plan` into an equivalent plan.
    fn optimize(&self, plan: &LogicalPlan) -> Result<LogicalPlan>;
}

/// Applies the built-in rule list in order.
pub struct Optimizer {
    rules: Vec<Box<dyn OptimizerRule>>,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer {
    /// Optimizer with the default rule set.
    pub fn new() -> Self {
        Self {
            rules: vec![Box::new(ProjectionPushDown)],
        }
    }

    /// Run every rule over the plan in sequence.
    pub fn optimize(&self, plan: &LogicalPlan) -> Result<LogicalPlan> {
        let mut optimized = plan.clone();
        for rule in &self.rules {
            optimized = rule.optimize(&optimized)?;
            debug!(rule = rule.name(), "applied optimizer rule");
        }
        Ok(optimized)
    }
}

/// Moves the column selection as close to the scan as possible, shrinking
/// the width of every batch the scan emits.
pub struct ProjectionPushDown;

impl OptimizerRule for ProjectionPushDown {
    fn name(&self) -> &'static str {
        "projection_push_down"
    }

    fn optimize(&self, plan: &LogicalPlan) -> Result<LogicalPlan> {
        let mut needed = HashSet::new();
        push_down(plan, &mut needed)
    }
}

/// Top-down walk carrying the accumulated set of needed column names.
fn push_down(plan: &LogicalPlan, needed: &mut HashSet<String>) -> Result<LogicalPlan> {
    match plan {
        LogicalPlan::Projection { input, exprs } => {
            extract_columns_all(exprs, input, needed)?;
            let new_input = push_down(input, needed)?;
            Ok(LogicalPlan::Projection {
                input: Box::new(new_input),
                exprs: exprs.clone(),
            })
        }
        LogicalPlan::Selection { input, predicate } => {
            extract_columns(predicate, input, needed)?;
            let new_input = push_down(input, needed)?;
            Ok(LogicalPlan::Selection {
                input: Box::new(new_input),
                predicate: predicate.clone(),
            })
        }
        LogicalPlan::Aggregation {
            input,
            group_exprs,
            agg_exprs,
        } => {
            extract_columns_all(group_exprs, input, needed)?;
            extract_columns_all(agg_exprs, input, needed)?;
            let new_input = push_down(input, needed)?;
            Ok(LogicalPlan::Aggregation {
                input: Box::new(new_input),
                group_exprs: group_exprs.clone(),
                agg_exprs: agg_exprs.clone(),
            })
        }
        LogicalPlan::Scan { source, projection } => {
            // No references at all (e.g. a pure-literal projection): keep
            // the scan as it was rather than widening it to everything.
            if needed.is_empty() {
                return Ok(LogicalPlan::Scan {
                    source: source.clone(),
                    projection: projection.clone(),
                });
            }

            let pushed = source
                .schema()
                .fields()
                .iter()
                .filter(|f| needed.contains(f.name().as_str()))
                .map(|f| f.name().clone())
                .collect();
            Ok(LogicalPlan::Scan {
                source: source.clone(),
                projection: pushed,
            })
        }
    }
}

fn extract_columns_all(
    exprs: &[LogicalExpr],
    input: &LogicalPlan,
    accum: &mut HashSet<String>,
) -> Result<()> {
    for expr in exprs {
        extract_columns(expr, input, accum)?;
    }
    Ok(())
}

/// Add every column name the expression references, resolving positional
/// references against the input schema.
fn extract_columns(
    expr: &LogicalExpr,
    input: &LogicalPlan,
    accum: &mut HashSet<String>,
) -> Result<()> {
    match expr {
        LogicalExpr::Column(name) => {
            accum.insert(name.clone());
        }
        LogicalExpr::ColumnIndex(index) => {
            let schema = input.schema()?;
            let field = schema.fields().get(*index).ok_or_else(|| {
                QuarryError::OutOfRange(format!(
                    "column index {index} out of range while extracting references"
                ))
            })?;
            accum.insert(field.name().clone());
        }
        LogicalExpr::Alias { expr, .. }
        | LogicalExpr::Cast { expr, .. }
        | LogicalExpr::Not(expr)
        | LogicalExpr::Aggregate { expr, .. } => extract_columns(expr, input, accum)?,
        LogicalExpr::BinaryOp { left, right, .. } => {
            extract_columns(left, input, accum)?;
            extract_columns(right, input, accum)?;
        }
        LogicalExpr::Literal(_) => {}
    }
    Ok(())
}
