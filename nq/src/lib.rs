//! namedqueue - keyed task queue with a concurrency limit
//!
//! Submissions that share a key while that key is running are coalesced: the
//! work runs once and every submitter receives the same result. At most
//! `concurrency` keys run at once; everything else waits in a backlog that is
//! drained in FIFO order, with `unshift` available to jump the line.
//!
//! # Example
//!
//! ```ignore
//! use namedqueue::{NamedQueue, QueueConfig};
//!
//! let queue = NamedQueue::new(MyProcessor, QueueConfig::with_concurrency(4));
//! let first = queue.push("users".to_string())?;
//! let second = queue.push("users".to_string())?; // coalesced
//! assert_eq!(first.await, second.await);
//! ```
//!
//! # Modules
//!
//! - [`queue`] - Backlog, running-key registry, scheduler and stats
//! - [`task`] - Task and processor traits
//! - [`config`] - Configuration types and loading
//! - [`workload`] - Simulated workloads for the `nq` binary
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod queue;
pub mod task;
pub mod workload;

pub use config::Config;
pub use error::QueueError;
pub use queue::{Delivery, KeyStats, NamedQueue, QueueConfig, QueueStats, Ticket};
pub use task::{Processor, Task};
pub use workload::{Job, JobReport, RunReport, SleepProcessor, Workload, run_workload};
