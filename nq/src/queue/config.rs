//! Queue configuration

use serde::{Deserialize, Serialize};

/// Queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QueueConfig {
    /// Max keys running at once (0 is treated as 1)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    1
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

impl QueueConfig {
    /// Config with the given concurrency limit
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self { concurrency }
    }

    /// Concurrency limit actually enforced
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}
