//! Simulated workloads for the `nq` binary
//!
//! A workload is a YAML list of jobs. Each job sleeps for its duration and
//! then succeeds or fails, which makes the queue's coalescing and admission
//! order visible from the command line.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use eyre::{Context, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::QueueError;
use crate::queue::{NamedQueue, QueueStats};
use crate::task::{Processor, Task};

/// One simulated job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Job {
    /// Deduplication key
    pub key: Option<String>,

    /// How long the work sleeps
    #[serde(default)]
    pub duration_ms: u64,

    /// Submit at the backlog head
    #[serde(default)]
    pub front: bool,

    /// Finish with an error instead of a result
    #[serde(default)]
    pub fail: bool,
}

impl Task for Job {
    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

/// A list of jobs, submitted in order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub jobs: Vec<Job>,
}

impl Workload {
    /// Load a workload from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read workload {}", path.display()))?;
        let workload: Self = serde_yaml::from_str(&content).context("Failed to parse workload")?;
        debug!(jobs = workload.jobs.len(), "Workload::load: parsed");
        Ok(workload)
    }
}

/// Processor that sleeps for each job's duration
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepProcessor;

#[async_trait]
impl Processor<Job> for SleepProcessor {
    type Output = String;
    type Error = String;

    async fn process(&self, job: Job) -> Result<String, String> {
        let key = job.key.unwrap_or_default();
        debug!(%key, duration_ms = job.duration_ms, "SleepProcessor::process: called");
        tokio::time::sleep(Duration::from_millis(job.duration_ms)).await;
        if job.fail {
            Err(format!("{} failed after {}ms", key, job.duration_ms))
        } else {
            Ok(format!("{} done after {}ms", key, job.duration_ms))
        }
    }
}

/// Outcome of one submitted job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobReport {
    pub key: Option<String>,
    pub ok: bool,
    pub message: String,
}

/// Results of a whole workload run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub results: Vec<JobReport>,
    pub stats: QueueStats,
}

/// Submit every job and wait for all of them
///
/// Jobs without a key are reported as rejected; the rest of the workload
/// still runs.
pub async fn run_workload<P>(queue: &NamedQueue<Job, P>, workload: Workload) -> Result<RunReport>
where
    P: Processor<Job, Output = String, Error = String>,
{
    debug!(jobs = workload.jobs.len(), "run_workload: called");
    let mut pending = Vec::with_capacity(workload.jobs.len());
    let mut results: Vec<Option<JobReport>> = Vec::with_capacity(workload.jobs.len());

    for job in workload.jobs {
        let key = job.key.clone();
        let submitted = if job.front { queue.unshift(job) } else { queue.push(job) };
        match submitted {
            Ok(ticket) => {
                pending.push((results.len(), ticket));
                results.push(None);
            }
            Err(err) if !err.is_caller_error() => {
                return Err(eyre::eyre!("Queue refused job {:?}: {}", key, err));
            }
            Err(err) => {
                debug!(?key, error = %err, "run_workload: job rejected");
                results.push(Some(JobReport {
                    key,
                    ok: false,
                    message: err.to_string(),
                }));
            }
        }
    }

    let (slots, tickets): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
    let keys: Vec<String> = tickets.iter().map(|ticket| ticket.key().to_string()).collect();
    let outcomes = join_all(tickets).await;

    for ((slot, key), outcome) in slots.into_iter().zip(keys).zip(outcomes) {
        let (ok, message) = match outcome {
            Ok(Ok(output)) => (true, output),
            Ok(Err(failure)) => (false, failure),
            Err(QueueError::Closed) => return Err(eyre::eyre!("Queue shut down before {} finished", key)),
            Err(err) => (false, err.to_string()),
        };
        results[slot] = Some(JobReport {
            key: Some(key),
            ok,
            message,
        });
    }

    let stats = queue.stats().await.context("Failed to read queue stats")?;
    Ok(RunReport {
        results: results.into_iter().flatten().collect(),
        stats,
    })
}
