//! Data-source contract and the in-memory source.

use std::fmt;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use arrow_schema::SchemaRef;
use quarry_common::{QuarryError, Result};

/// Boxed batch iterator returned by [`DataSource::scan`].
pub struct BatchIter(Box<dyn Iterator<Item = Result<RecordBatch>> + Send>);

impl BatchIter {
    /// Wrap a boxed iterator of batches.
    pub fn new(iter: Box<dyn Iterator<Item = Result<RecordBatch>> + Send>) -> Self {
        Self(iter)
    }
}

impl Iterator for BatchIter {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl fmt::Debug for BatchIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchIter").finish_non_exhaustive()
    }
}

/// A read-only tabular data source.
///
/// Sources are shared by reference across plans; each `scan` opens an
/// independent cursor. An empty projection selects every column. Projected
/// columns come back in the order the source declares them, regardless of
/// the order names appear in `projection`.
pub trait DataSource: fmt::Debug + Send + Sync {
    /// Full schema of the source.
    fn schema(&self) -> SchemaRef;

    /// Start reading batches, restricted to `projection` column names.
    fn scan(&self, projection: &[String], batch_size: usize) -> Result<BatchIter>;
}

/// Resolve projected column names to field indices in source order.
///
/// Fails with `InvalidInput` when a name is missing from `schema`.
pub fn projected_indices(schema: &SchemaRef, projection: &[String]) -> Result<Vec<usize>> {
    for name in projection {
        if !schema.fields().iter().any(|f| f.name() == name) {
            return Err(QuarryError::InvalidInput(format!(
                "projected column '{name}' does not exist in source schema"
            )));
        }
    }

    Ok(schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| projection.iter().any(|name| name == f.name()))
        .map(|(i, _)| i)
        .collect())
}

/// An in-memory data source over pre-built record batches.
///
/// Backs the aggregation result reader and test fixtures.
#[derive(Debug, Clone)]
pub struct MemSource {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl MemSource {
    /// Create a source from a schema and batches of that schema.
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self> {
        for batch in &batches {
            if batch.schema().fields() != schema.fields() {
                return Err(QuarryError::Internal(
                    "in-memory batch schema does not match source schema".to_string(),
                ));
            }
        }
        Ok(Self { schema, batches })
    }
}

impl DataSource for MemSource {
    fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    fn scan(&self, projection: &[String], _batch_size: usize) -> Result<BatchIter> {
        if projection.is_empty() {
            let batches = self.batches.clone();
            return Ok(BatchIter::new(Box::new(batches.into_iter().map(Ok))));
        }

        let indices = projected_indices(&self.schema, projection)?;
        let projected = self
            .batches
            .iter()
            .map(|b| {
                b.project(&indices)
                    .map_err(|e| QuarryError::Internal(format!("batch projection failed: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(BatchIter::new(Box::new(projected.into_iter().map(Ok))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use arrow_schema::{DataType, Field, Schema};

    fn sample_source() -> MemSource {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            Arc::clone(&schema),
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec!["a", "b"])),
            ],
        )
        .expect("batch");
        MemSource::new(schema, vec![batch]).expect("source")
    }

    #[test]
    fn empty_projection_returns_all_columns() {
        let source = sample_source();
        let mut iter = source.scan(&[], 1024).expect("scan");
        let batch = iter.next().expect("one batch").expect("ok");
        assert_eq!(batch.num_columns(), 2);
        assert!(iter.next().is_none());
    }

    #[test]
    fn projection_follows_source_order() {
        let source = sample_source();
        // Requested out of order; source order wins.
        let projection = vec!["name".to_string(), "id".to_string()];
        let mut iter = source.scan(&projection, 1024).expect("scan");
        let batch = iter.next().expect("one batch").expect("ok");
        assert_eq!(batch.schema().field(0).name(), "id");
        assert_eq!(batch.schema().field(1).name(), "name");
    }

    #[test]
    fn unknown_projected_column_is_invalid_input() {
        let source = sample_source();
        let err = source
            .scan(&["missing".to_string()], 1024)
            .expect_err("should fail");
        assert!(matches!(err, QuarryError::InvalidInput(_)), "{err}");
    }
}
