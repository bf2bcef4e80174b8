//! Keyed task queue
//!
//! Runs submitted tasks under a concurrency limit and coalesces submissions
//! that share a key while that key is running. A single scheduler task owns
//! the backlog, the registry of running keys and the statistics; handles talk
//! to it over channels.

mod backlog;
mod config;
mod core;
mod handle;
mod messages;
mod registry;
mod stats;

pub use backlog::{Backlog, PendingRequest};
pub use config::QueueConfig;
pub use handle::{NamedQueue, Ticket};
pub use messages::Delivery;
pub use registry::{InFlightEntry, Registry};
pub use stats::{KeyStats, QueueStats, StatsCollector};
