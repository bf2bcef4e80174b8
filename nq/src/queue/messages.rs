//! Messages exchanged with the scheduler task

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::QueueError;

use super::stats::QueueStats;

/// What a waiter finally receives
pub type Delivery<O, E> = Result<Result<O, E>, QueueError>;

/// Sending half of a waiter's result slot
pub(crate) type Waiter<O, E> = oneshot::Sender<Delivery<O, E>>;

/// Requests sent from queue handles to the scheduler
pub(crate) enum QueueRequest<T, O, E> {
    /// Submit a task; `front` inserts at the backlog head
    Submit {
        key: String,
        task: T,
        waiter: Waiter<O, E>,
        front: bool,
        submitted_at: Instant,
    },

    Length {
        reply_tx: oneshot::Sender<usize>,
    },

    InFlight {
        reply_tx: oneshot::Sender<usize>,
    },

    Stats {
        reply_tx: oneshot::Sender<QueueStats>,
    },

    ResetStats {
        reply_tx: oneshot::Sender<()>,
    },
}

/// Messages the scheduler posts to itself
pub(crate) enum Control<O, E> {
    /// Work for `key` finished
    Completed {
        key: String,
        run_id: u64,
        outcome: Delivery<O, E>,
    },

    /// Run an admission pass
    Drain,
}
