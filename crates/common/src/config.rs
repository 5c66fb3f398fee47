use serde::{Deserialize, Serialize};

/// Engine/session configuration shared across planner and execution layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target rows per batch read from data sources.
    #[serde(default = "default_batch_size_rows")]
    pub batch_size_rows: usize,
}

fn default_batch_size_rows() -> usize {
    8192
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size_rows: default_batch_size_rows(),
        }
    }
}
