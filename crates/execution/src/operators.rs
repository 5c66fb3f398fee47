//! Pull-based physical operators.
//!
//! Operators are prepared once, then drained by repeated `next()` calls;
//! `Ok(None)` signals exhaustion. Instances hold their own streaming state
//! and must not be shared across callers.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray};
use arrow::compute::filter_record_batch;
use arrow::record_batch::RecordBatch;
use arrow_schema::SchemaRef;
use quarry_common::{QuarryError, Result};
use quarry_planner::AggregateFunction;
use quarry_storage::{projected_indices, BatchIter, DataSource};
use tracing::debug;

use crate::accumulator::Accumulator;
use crate::expressions::PhysicalExpr;
use crate::scalar::{build_column, scalar_at, ScalarValue};

/// A physical operator tree.
#[derive(Debug)]
pub enum PhysicalPlan {
    /// Source scan.
    Scan(ScanExec),
    /// Expression projection.
    Projection(ProjectionExec),
    /// Predicate filter.
    Selection(SelectionExec),
    /// Blocking hash aggregation.
    HashAggregate(HashAggregateExec),
}

impl PhysicalPlan {
    /// Operator name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            PhysicalPlan::Scan(_) => "Scan",
            PhysicalPlan::Projection(_) => "Projection",
            PhysicalPlan::Selection(_) => "Selection",
            PhysicalPlan::HashAggregate(_) => "HashAggregate",
        }
    }

    /// Schema of every batch this operator emits.
    pub fn schema(&self) -> SchemaRef {
        match self {
            PhysicalPlan::Scan(exec) => Arc::clone(&exec.schema),
            PhysicalPlan::Projection(exec) => Arc::clone(&exec.schema),
            PhysicalPlan::Selection(exec) => Arc::clone(&exec.schema),
            PhysicalPlan::HashAggregate(exec) => Arc::clone(&exec.schema),
        }
    }

    /// Direct children.
    pub fn children(&self) -> Vec<&PhysicalPlan> {
        match self {
            PhysicalPlan::Scan(_) => vec![],
            PhysicalPlan::Projection(exec) => vec![exec.input.as_ref()],
            PhysicalPlan::Selection(exec) => vec![exec.input.as_ref()],
            PhysicalPlan::HashAggregate(exec) => vec![exec.input.as_ref()],
        }
    }

    /// One-shot initialization; idempotent. May open files.
    pub fn prepare(&mut self) -> Result<()> {
        match self {
            PhysicalPlan::Scan(exec) => exec.prepare(),
            PhysicalPlan::Projection(exec) => exec.input.prepare(),
            PhysicalPlan::Selection(exec) => exec.input.prepare(),
            PhysicalPlan::HashAggregate(exec) => exec.input.prepare(),
        }
    }

    /// Pull the next batch; `Ok(None)` when exhausted.
    pub fn next(&mut self) -> Result<Option<RecordBatch>> {
        match self {
            PhysicalPlan::Scan(exec) => exec.next(),
            PhysicalPlan::Projection(exec) => exec.next(),
            PhysicalPlan::Selection(exec) => exec.next(),
            PhysicalPlan::HashAggregate(exec) => exec.next(),
        }
    }
}

/// Reads batches from a data source with an optional column projection.
#[derive(Debug)]
pub struct ScanExec {
    source: Arc<dyn DataSource>,
    projection: Vec<String>,
    batch_size: usize,
    schema: SchemaRef,
    reader: Option<BatchIter>,
}

impl ScanExec {
    /// Create a scan; the schema is the source schema narrowed to the
    /// projection.
    pub fn new(
        source: Arc<dyn DataSource>,
        projection: Vec<String>,
        batch_size: usize,
    ) -> Result<Self> {
        let schema = if projection.is_empty() {
            source.schema()
        } else {
            let full = source.schema();
            let indices = projected_indices(&full, &projection)?;
            Arc::new(full.project(&indices).map_err(|e| {
                QuarryError::Internal(format!("schema projection failed: {e}"))
            })?)
        };
        Ok(Self {
            source,
            projection,
            batch_size,
            schema,
            reader: None,
        })
    }

    fn prepare(&mut self) -> Result<()> {
        if self.reader.is_none() {
            debug!(projection = ?self.projection, "opening scan reader");
            self.reader = Some(self.source.scan(&self.projection, self.batch_size)?);
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<RecordBatch>> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| QuarryError::Internal("scan pulled before prepare".to_string()))?;
        reader.next().transpose()
    }
}

/// Evaluates one expression per output column against each input batch.
#[derive(Debug)]
pub struct ProjectionExec {
    input: Box<PhysicalPlan>,
    schema: SchemaRef,
    exprs: Vec<PhysicalExpr>,
}

impl ProjectionExec {
    /// Create a projection emitting `schema`, one field per expression.
    pub fn new(input: Box<PhysicalPlan>, schema: SchemaRef, exprs: Vec<PhysicalExpr>) -> Self {
        Self {
            input,
            schema,
            exprs,
        }
    }

    fn next(&mut self) -> Result<Option<RecordBatch>> {
        let Some(batch) = self.input.next()? else {
            return Ok(None);
        };

        let columns = self
            .exprs
            .iter()
            .map(|e| e.evaluate(&batch))
            .collect::<Result<Vec<_>>>()?;
        if columns.len() != self.schema.fields().len() {
            return Err(QuarryError::Internal(format!(
                "projection produced {} columns for a schema of {} fields",
                columns.len(),
                self.schema.fields().len()
            )));
        }

        let out = RecordBatch::try_new(Arc::clone(&self.schema), columns)
            .map_err(|e| QuarryError::Internal(format!("projected batch assembly failed: {e}")))?;
        Ok(Some(out))
    }
}

/// Keeps rows where the predicate evaluates to true.
#[derive(Debug)]
pub struct SelectionExec {
    input: Box<PhysicalPlan>,
    schema: SchemaRef,
    predicate: PhysicalExpr,
}

impl SelectionExec {
    /// Create a filter; `schema` is the unchanged child schema.
    pub fn new(input: Box<PhysicalPlan>, schema: SchemaRef, predicate: PhysicalExpr) -> Self {
        Self {
            input,
            schema,
            predicate,
        }
    }

    fn next(&mut self) -> Result<Option<RecordBatch>> {
        let Some(batch) = self.input.next()? else {
            return Ok(None);
        };

        let mask = self.predicate.evaluate(&batch)?;
        let mask = mask
            .as_any()
            .downcast_ref::<BooleanArray>()
            .ok_or_else(|| {
                QuarryError::Internal(format!(
                    "selection predicate evaluated to {}, expected boolean",
                    mask.data_type()
                ))
            })?;
        if mask.len() != batch.num_rows() {
            return Err(QuarryError::Internal(format!(
                "predicate mask length {} does not match batch rows {}",
                mask.len(),
                batch.num_rows()
            )));
        }

        let out = filter_record_batch(&batch, mask)
            .map_err(|e| QuarryError::Internal(format!("filter kernel failed: {e}")))?;
        Ok(Some(out))
    }
}

/// An aggregate expression paired with its input.
#[derive(Debug)]
pub struct AggregateExpr {
    /// Aggregate function.
    pub func: AggregateFunction,
    /// Input expression evaluated per batch.
    pub expr: PhysicalExpr,
}

impl AggregateExpr {
    /// Fresh accumulator for this aggregate.
    pub fn create_accumulator(&self) -> Accumulator {
        Accumulator::new(self.func)
    }
}

/// Single-pass hash aggregation.
///
/// The first `next()` drains the entire child, folds every row into
/// per-group accumulators keyed by the grouping values, and materializes
/// one output table; subsequent calls stream that table out. Group order
/// is deterministic but otherwise unspecified.
#[derive(Debug)]
pub struct HashAggregateExec {
    input: Box<PhysicalPlan>,
    schema: SchemaRef,
    group_exprs: Vec<PhysicalExpr>,
    agg_exprs: Vec<AggregateExpr>,
    output: Option<VecDeque<RecordBatch>>,
}

impl HashAggregateExec {
    /// Create a hash aggregation emitting `schema` (group fields then
    /// aggregate fields).
    pub fn new(
        input: Box<PhysicalPlan>,
        schema: SchemaRef,
        group_exprs: Vec<PhysicalExpr>,
        agg_exprs: Vec<AggregateExpr>,
    ) -> Self {
        Self {
            input,
            schema,
            group_exprs,
            agg_exprs,
            output: None,
        }
    }

    fn next(&mut self) -> Result<Option<RecordBatch>> {
        if self.output.is_none() {
            let batch = self.aggregate_input()?;
            self.output = Some(VecDeque::from([batch]));
        }
        Ok(self.output.as_mut().and_then(VecDeque::pop_front))
    }

    fn aggregate_input(&mut self) -> Result<RecordBatch> {
        let mut groups: HashMap<Vec<ScalarValue>, Vec<Accumulator>> = HashMap::new();
        let mut input_rows = 0usize;

        while let Some(batch) = self.input.next()? {
            input_rows += batch.num_rows();

            let group_arrays = self
                .group_exprs
                .iter()
                .map(|e| e.evaluate(&batch))
                .collect::<Result<Vec<ArrayRef>>>()?;
            let input_arrays = self
                .agg_exprs
                .iter()
                .map(|a| a.expr.evaluate(&batch))
                .collect::<Result<Vec<ArrayRef>>>()?;

            for row in 0..batch.num_rows() {
                let key = group_arrays
                    .iter()
                    .map(|a| scalar_at(a, row))
                    .collect::<Result<Vec<_>>>()?;

                let accumulators = groups
                    .entry(key)
                    .or_insert_with(|| self.agg_exprs.iter().map(|a| a.create_accumulator()).collect());

                for (j, array) in input_arrays.iter().enumerate() {
                    let value = scalar_at(array, row)?;
                    accumulators[j].accumulate(&value)?;
                }
            }
        }

        // A global aggregate over empty input still produces one row.
        if self.group_exprs.is_empty() && groups.is_empty() {
            groups.insert(
                Vec::new(),
                self.agg_exprs.iter().map(|a| a.create_accumulator()).collect(),
            );
        }

        debug!(
            input_rows,
            groups = groups.len(),
            "hash aggregation drained input"
        );
        self.build_output(groups)
    }

    fn build_output(
        &self,
        groups: HashMap<Vec<ScalarValue>, Vec<Accumulator>>,
    ) -> Result<RecordBatch> {
        let mut keys: Vec<&Vec<ScalarValue>> = groups.keys().collect();
        keys.sort_by(|a, b| format!("{a:?}").cmp(&format!("{b:?}")));

        let group_count = self.group_exprs.len();
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.schema.fields().len());

        for gidx in 0..group_count {
            let values: Vec<ScalarValue> = keys.iter().map(|k| k[gidx].clone()).collect();
            columns.push(build_column(
                &values,
                self.schema.field(gidx).data_type(),
            )?);
        }

        for (aidx, _) in self.agg_exprs.iter().enumerate() {
            let mut values = Vec::with_capacity(keys.len());
            for key in &keys {
                let accumulators = groups.get(*key).ok_or_else(|| {
                    QuarryError::Internal("missing aggregate state for group key".to_string())
                })?;
                values.push(accumulators[aidx].final_value()?);
            }
            columns.push(build_column(
                &values,
                self.schema.field(group_count + aidx).data_type(),
            )?);
        }

        RecordBatch::try_new(Arc::clone(&self.schema), columns)
            .map_err(|e| QuarryError::Internal(format!("aggregate batch assembly failed: {e}")))
    }
}
