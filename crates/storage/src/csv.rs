//! CSV-backed data source.

use std::fs::File;
use std::io::Seek;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use quarry_common::{QuarryError, Result};
use tracing::debug;

use crate::source::{projected_indices, BatchIter, DataSource};

/// Rows sampled when inferring the schema from file contents.
const SCHEMA_INFERENCE_ROWS: usize = 1000;

/// A CSV file with a header row; column names form the schema.
///
/// The schema is inferred once at open time and every column is normalized
/// to the supported type set (boolean, int64, float64, utf8). Each `scan`
/// opens a fresh reader over the file.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    schema: SchemaRef,
}

impl CsvSource {
    /// Open a CSV file and infer its schema from the header and a sample of
    /// rows.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = File::open(&path)
            .map_err(|e| QuarryError::Internal(format!("cannot open {}: {e}", path.display())))?;

        let format = Format::default().with_header(true);
        let (schema, _) = format
            .infer_schema(&mut file, Some(SCHEMA_INFERENCE_ROWS))
            .map_err(|e| {
                QuarryError::Internal(format!(
                    "schema inference failed for {}: {e}",
                    path.display()
                ))
            })?;
        file.rewind()?;

        let schema = Arc::new(normalize_schema(&schema));
        debug!(path = %path.display(), fields = schema.fields().len(), "opened csv source");
        Ok(Self { path, schema })
    }
}

impl DataSource for CsvSource {
    fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    fn scan(&self, projection: &[String], batch_size: usize) -> Result<BatchIter> {
        let file = File::open(&self.path).map_err(|e| {
            QuarryError::Internal(format!("cannot open {}: {e}", self.path.display()))
        })?;

        let mut builder = ReaderBuilder::new(Arc::clone(&self.schema))
            .with_header(true)
            .with_batch_size(batch_size);
        if !projection.is_empty() {
            let indices = projected_indices(&self.schema, projection)?;
            builder = builder.with_projection(indices);
        }

        let reader = builder.build(file).map_err(|e| {
            QuarryError::Internal(format!("csv reader failed for {}: {e}", self.path.display()))
        })?;

        Ok(BatchIter::new(Box::new(reader.map(|res| {
            res.map_err(|e| QuarryError::Internal(format!("csv decode failed: {e}")))
        }))))
    }
}

/// Clamp inferred field types to the supported set; anything else reads as
/// utf8.
fn normalize_schema(schema: &Schema) -> Schema {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| {
            let data_type = match f.data_type() {
                DataType::Boolean => DataType::Boolean,
                DataType::Int64 => DataType::Int64,
                DataType::Float64 => DataType::Float64,
                _ => DataType::Utf8,
            };
            Field::new(f.name(), data_type, true)
        })
        .collect();
    Schema::new(fields)
}
