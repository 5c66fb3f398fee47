//! Query entry point: a catalog of named DataFrames plus the
//! parse → plan → optimize → execute pipeline.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use arrow_schema::SchemaRef;
use quarry_common::{EngineConfig, QuarryError, Result};
use quarry_execution::{create_physical_plan, PhysicalPlan};
use quarry_planner::{plan_select, LogicalPlan, Optimizer, TableResolver};
use quarry_sql::parse_sql;
use quarry_storage::{Catalog, CsvSource, DataSource};
use tracing::debug;

use crate::dataframe::DataFrame;

/// Holds the table catalog and runs queries against it.
pub struct ExecutionContext {
    config: EngineConfig,
    tables: HashMap<String, DataFrame>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    /// Context with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Context with explicit configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            tables: HashMap::new(),
        }
    }

    /// A DataFrame scanning a CSV file, without registering it.
    pub fn csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let source = CsvSource::open(path.as_ref())?;
        Ok(DataFrame::new(LogicalPlan::Scan {
            source: Arc::new(source),
            projection: vec![],
        }))
    }

    /// Declared for API parity; the Parquet path is not available yet.
    pub fn parquet(&self, _path: impl AsRef<Path>) -> Result<DataFrame> {
        Err(QuarryError::Unimplemented(
            "parquet sources are not available in this version".to_string(),
        ))
    }

    /// Register a CSV file under a table name.
    pub fn register_csv(&mut self, name: impl Into<String>, path: impl AsRef<Path>) -> Result<()> {
        let frame = self.csv(path)?;
        self.tables.insert(name.into(), frame);
        Ok(())
    }

    /// Register an arbitrary data source under a table name.
    pub fn register_source(&mut self, name: impl Into<String>, source: Arc<dyn DataSource>) {
        let frame = DataFrame::new(LogicalPlan::Scan {
            source,
            projection: vec![],
        });
        self.tables.insert(name.into(), frame);
    }

    /// Register every table listed in a catalog file (`.json` or `.toml`).
    pub fn register_catalog_file(&mut self, path: &str) -> Result<()> {
        let catalog = Catalog::load(path)?;
        for def in catalog.tables() {
            self.register_csv(def.name, def.uri)?;
        }
        Ok(())
    }

    /// A DataFrame over a registered table.
    pub fn table(&self, name: &str) -> Result<DataFrame> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| QuarryError::NotFound(format!("unknown table: {name}")))
    }

    /// Registered table names, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Parse and plan a SQL `SELECT` against the registered tables.
    pub fn sql(&self, query: &str) -> Result<DataFrame> {
        debug!(query, "planning sql");
        let select = parse_sql(query)?;
        let plan = plan_select(&select, self)?;
        Ok(DataFrame::new(plan))
    }

    /// Optimize, lower, and prepare a DataFrame for pulling batches.
    pub fn execute(&self, frame: &DataFrame) -> Result<BatchStream> {
        let optimized = Optimizer::new().optimize(frame.logical_plan())?;
        let schema = optimized.schema()?;
        let mut plan = create_physical_plan(&optimized, self.config.batch_size_rows)?;
        plan.prepare()?;
        debug!(operator = plan.name(), "prepared physical plan");
        Ok(BatchStream { plan, schema })
    }

    /// Run a DataFrame to completion.
    pub fn collect(&self, frame: &DataFrame) -> Result<Vec<RecordBatch>> {
        self.execute(frame)?.collect()
    }
}

impl TableResolver for ExecutionContext {
    fn resolve_table(&self, name: &str) -> Result<LogicalPlan> {
        Ok(self.table(name)?.logical_plan().clone())
    }
}

/// A prepared query; iterating pulls batches from the root operator.
pub struct BatchStream {
    plan: PhysicalPlan,
    schema: SchemaRef,
}

impl BatchStream {
    /// Schema of every batch the stream yields.
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }
}

impl Iterator for BatchStream {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.plan.next().transpose()
    }
}
