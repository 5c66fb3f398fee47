#![deny(missing_docs)]

//! Shared configuration and error types for Quarry crates.
//!
//! Architecture role:
//! - provides the common [`QuarryError`] / [`Result`] contracts
//! - defines engine configuration passed across layers

/// Engine configuration types.
pub mod config;
/// Shared error taxonomy.
pub mod error;

pub use config::EngineConfig;
pub use error::{QuarryError, Result};
