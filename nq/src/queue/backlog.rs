//! Backlog of requests waiting for admission

use std::collections::VecDeque;

use tokio::time::Instant;
use tracing::debug;

/// A submission waiting in the backlog
#[derive(Debug)]
pub struct PendingRequest<T, W> {
    pub key: String,
    pub task: T,
    pub waiter: W,
    pub enqueued_at: Instant,
}

impl<T, W> PendingRequest<T, W> {
    /// Create a request submitted at `enqueued_at`
    pub fn new(key: impl Into<String>, task: T, waiter: W, enqueued_at: Instant) -> Self {
        Self {
            key: key.into(),
            task,
            waiter,
            enqueued_at,
        }
    }
}

/// Ordered container of queued requests
///
/// Tail insertion keeps FIFO order, head insertion jumps the line.
/// No deduplication happens here.
#[derive(Debug)]
pub struct Backlog<R> {
    entries: VecDeque<R>,
}

impl<R> Default for Backlog<R> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<R> Backlog<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_tail(&mut self, request: R) {
        self.entries.push_back(request);
        debug!(len = self.entries.len(), "Backlog::enqueue_tail: queued");
    }

    pub fn enqueue_head(&mut self, request: R) {
        self.entries.push_front(request);
        debug!(len = self.entries.len(), "Backlog::enqueue_head: queued");
    }

    pub fn dequeue_head(&mut self) -> Option<R> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
