//! Data sources for Quarry: the `DataSource` contract, the CSV and
//! in-memory implementations, and catalog file loading.

/// Catalog file definitions and loading.
pub mod catalog;
/// CSV-backed data source.
pub mod csv;
/// Data-source contract and in-memory source.
pub mod source;

pub use catalog::{Catalog, TableDef};
pub use csv::CsvSource;
pub use source::{projected_indices, BatchIter, DataSource, MemSource};
