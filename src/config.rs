use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ReconcileError;

fn default_threshold() -> usize {
    2
}

fn default_context_chars() -> usize {
    20
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Validation stops with `error` after this many mismatched words in a row.
    #[serde(default = "default_threshold")]
    pub consecutive_bad_word_threshold: usize,
    /// Characters of context kept on each side of a mismatch.
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
    /// Style merge fails on any mismatch instead of patching with a diff.
    #[serde(default)]
    pub strict: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            consecutive_bad_word_threshold: default_threshold(),
            context_chars: default_context_chars(),
            strict: false,
        }
    }
}

impl ReconcileConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReconcileError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ReconcileError::Config(format!("Failed to read config: {e}")))?;
        let config: ReconcileConfig = serde_json::from_str(&content)
            .map_err(|e| ReconcileError::Config(format!("Failed to parse config: {e}")))?;
        if config.consecutive_bad_word_threshold == 0 {
            return Err(ReconcileError::Config(
                "consecutive_bad_word_threshold must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }
}
