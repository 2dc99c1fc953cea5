//! Orchestrator configuration

use serde::{Deserialize, Serialize};

use super::stats::{DEFAULT_DISPLAY_CHARS, DEFAULT_HISTORY_CAPACITY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Number of recent predictions kept for dashboards
    pub history_capacity: usize,
    /// Characters of input text kept per history entry
    pub display_chars: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            display_chars: DEFAULT_DISPLAY_CHARS,
        }
    }
}

impl InferenceConfig {
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }
}
