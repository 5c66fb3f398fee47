//! Client surface for Quarry: the [`ExecutionContext`] catalog and entry
//! point, and the plan-building [`DataFrame`].
//!
//! ```no_run
//! use quarry_client::ExecutionContext;
//!
//! # fn main() -> quarry_common::Result<()> {
//! let mut ctx = ExecutionContext::new();
//! ctx.register_csv("t", "data.csv")?;
//! for batch in ctx.execute(&ctx.sql("SELECT id FROM t WHERE age > 10")?)? {
//!     let batch = batch?;
//!     println!("{} rows", batch.num_rows());
//! }
//! # Ok(())
//! # }
//! ```

/// Execution context and batch stream.
pub mod context;
/// Plan-building DataFrame.
pub mod dataframe;
/// Expression-building shorthand.
pub mod expr;

pub use context::{BatchStream, ExecutionContext};
pub use dataframe::DataFrame;
