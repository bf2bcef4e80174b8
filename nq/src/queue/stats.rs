//! Queue statistics
//!
//! Tracks admission and completion events:
//! - Completed runs and coalesced duplicate submissions
//! - Peak number of keys running at once
//! - Time spent waiting in the backlog
//! - Per-key run counts and processing time

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Point-in-time view of a queue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Requests waiting for admission
    pub backlog: usize,
    /// Keys currently running
    pub in_flight: usize,
    /// Peak keys running at once
    pub max_concurrent: usize,
    /// Completed runs
    pub total_processed: u64,
    /// Submissions coalesced into an already running key
    pub duplicate_task_calls: u64,
    /// Average backlog wait in milliseconds
    pub avg_wait_ms: f64,
    /// Per-key history
    pub per_key: HashMap<String, KeyStats>,
}

/// History of a single key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyStats {
    /// Completed runs of this key
    pub count: u64,
    /// Average processing time in milliseconds
    pub avg_processing_ms: f64,
}

#[derive(Debug, Default)]
struct KeyHistory {
    count: u64,
    total_processing: Duration,
}

impl KeyHistory {
    fn avg_processing_ms(&self) -> f64 {
        average_ms(self.total_processing, self.count)
    }
}

#[derive(Debug, Default)]
struct StatsState {
    total_processed: u64,
    duplicate_task_calls: u64,
    max_concurrent: usize,
    total_wait: Duration,
    wait_samples: u64,
    per_key: HashMap<String, KeyHistory>,
}

fn average_ms(total: Duration, samples: u64) -> f64 {
    if samples == 0 {
        0.0
    } else {
        total.as_secs_f64() * 1000.0 / samples as f64
    }
}

/// Records queue events
///
/// Only the scheduler mutates it, so a reset can never interleave with a
/// half-recorded event.
#[derive(Debug, Default)]
pub struct StatsCollector {
    state: StatsState,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A submission was merged into a running key
    pub fn record_duplicate(&mut self, key: &str) {
        debug!(%key, "StatsCollector::record_duplicate: called");
        self.state.duplicate_task_calls += 1;
    }

    /// A key was admitted; `in_flight` includes it
    pub fn record_admission(&mut self, key: &str, in_flight: usize, wait: Duration) {
        debug!(%key, in_flight, wait_ms = wait.as_millis() as u64, "StatsCollector::record_admission: called");
        self.state.max_concurrent = self.state.max_concurrent.max(in_flight);
        self.state.total_wait += wait;
        self.state.wait_samples += 1;
    }

    /// A key finished after running for `processing`
    pub fn record_completion(&mut self, key: &str, processing: Duration) {
        debug!(%key, processing_ms = processing.as_millis() as u64, "StatsCollector::record_completion: called");
        self.state.total_processed += 1;
        let history = self.state.per_key.entry(key.to_string()).or_default();
        history.count += 1;
        history.total_processing += processing;
    }

    /// Replace every counter and history with a zero state
    pub fn reset(&mut self) {
        debug!("StatsCollector::reset: called");
        self.state = StatsState::default();
    }

    /// Snapshot combined with the live backlog and in-flight sizes
    pub fn snapshot(&self, backlog: usize, in_flight: usize) -> QueueStats {
        QueueStats {
            backlog,
            in_flight,
            max_concurrent: self.state.max_concurrent,
            total_processed: self.state.total_processed,
            duplicate_task_calls: self.state.duplicate_task_calls,
            avg_wait_ms: average_ms(self.state.total_wait, self.state.wait_samples),
            per_key: self
                .state
                .per_key
                .iter()
                .map(|(key, history)| {
                    (
                        key.clone(),
                        KeyStats {
                            count: history.count,
                            avg_processing_ms: history.avg_processing_ms(),
                        },
                    )
                })
                .collect(),
        }
    }
}
