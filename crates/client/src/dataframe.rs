//! Plan-building DataFrame surface.

use arrow_schema::SchemaRef;
use quarry_common::Result;
use quarry_planner::{explain_logical, LogicalExpr, LogicalPlan};

/// An immutable handle over a logical plan.
///
/// Every builder method wraps the current plan in a new operator and
/// returns a new DataFrame; execution happens through
/// [`crate::ExecutionContext`].
#[derive(Debug, Clone)]
pub struct DataFrame {
    plan: LogicalPlan,
}

impl DataFrame {
    /// Wrap an existing logical plan.
    pub fn new(plan: LogicalPlan) -> Self {
        Self { plan }
    }

    /// The underlying logical plan.
    pub fn logical_plan(&self) -> &LogicalPlan {
        &self.plan
    }

    /// Schema this DataFrame produces.
    pub fn schema(&self) -> Result<SchemaRef> {
        self.plan.schema()
    }

    /// Project expressions over this DataFrame.
    pub fn project(self, exprs: Vec<LogicalExpr>) -> Self {
        Self::new(LogicalPlan::Projection {
            input: Box::new(self.plan),
            exprs,
        })
    }

    /// Keep rows matching a boolean predicate.
    pub fn filter(self, predicate: LogicalExpr) -> Self {
        Self::new(LogicalPlan::Selection {
            input: Box::new(self.plan),
            predicate,
        })
    }

    /// Group and aggregate.
    pub fn aggregate(self, group_exprs: Vec<LogicalExpr>, agg_exprs: Vec<LogicalExpr>) -> Self {
        Self::new(LogicalPlan::Aggregation {
            input: Box::new(self.plan),
            group_exprs,
            agg_exprs,
        })
    }

    /// Render the logical plan as text.
    pub fn explain(&self) -> String {
        explain_logical(&self.plan)
    }
}
