//! NamedQueue - client interface to the scheduler task

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::debug;

use crate::error::QueueError;
use crate::task::{Processor, Task, task_key};

use super::config::QueueConfig;
use super::core::{QueueCore, RequestOf};
use super::messages::{Delivery, QueueRequest};
use super::stats::QueueStats;

/// Keyed task queue with a concurrency limit
///
/// The handle is cheap to clone. All clones talk to the same scheduler task,
/// which keeps running until every handle is dropped and the remaining work
/// has finished.
pub struct NamedQueue<T: Task, P: Processor<T>> {
    tx: mpsc::UnboundedSender<RequestOf<T, P>>,
    concurrency: usize,
}

impl<T: Task, P: Processor<T>> Clone for NamedQueue<T, P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            concurrency: self.concurrency,
        }
    }
}

impl<T: Task, P: Processor<T>> NamedQueue<T, P> {
    /// Create a queue and spawn its scheduler
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(processor: P, config: QueueConfig) -> Self {
        let concurrency = config.effective_concurrency();
        debug!(concurrency, "NamedQueue::new: called");

        let (tx, rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let core = QueueCore::new(Arc::new(processor), concurrency, control_tx);
        tokio::spawn(core.run(rx, control_rx));

        Self { tx, concurrency }
    }

    /// Create a queue with the given concurrency limit (0 means 1)
    pub fn with_concurrency(processor: P, concurrency: usize) -> Self {
        Self::new(processor, QueueConfig::with_concurrency(concurrency))
    }

    /// Concurrency limit in effect
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Submit a task at the back of the backlog
    ///
    /// If the key is already running, the returned ticket resolves with that
    /// run's result instead.
    pub fn push(&self, task: T) -> Result<Ticket<P::Output, P::Error>, QueueError> {
        self.submit(task, false)
    }

    /// Submit a task at the front of the backlog
    ///
    /// The task jumps ahead of everything still waiting, but not of anything
    /// already running.
    pub fn unshift(&self, task: T) -> Result<Ticket<P::Output, P::Error>, QueueError> {
        self.submit(task, true)
    }

    fn submit(&self, task: T, front: bool) -> Result<Ticket<P::Output, P::Error>, QueueError> {
        let Some(key) = task_key(&task) else {
            debug!(front, "NamedQueue::submit: task has no key, rejecting");
            return Err(QueueError::InvalidTask);
        };
        debug!(%key, front, "NamedQueue::submit: called");

        let (waiter, rx) = oneshot::channel();
        self.tx
            .send(QueueRequest::Submit {
                key: key.clone(),
                task,
                waiter,
                front,
                submitted_at: Instant::now(),
            })
            .map_err(|_| QueueError::Closed)?;

        Ok(Ticket { key, rx })
    }

    /// Number of requests waiting in the backlog (excludes running keys)
    pub async fn length(&self) -> Result<usize, QueueError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(QueueRequest::Length { reply_tx }, reply_rx).await
    }

    /// Number of keys currently running
    pub async fn in_flight(&self) -> Result<usize, QueueError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(QueueRequest::InFlight { reply_tx }, reply_rx).await
    }

    /// Statistics snapshot
    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(QueueRequest::Stats { reply_tx }, reply_rx).await
    }

    /// Clear all statistics; backlog and running keys are untouched
    pub async fn reset_stats(&self) -> Result<&Self, QueueError> {
        debug!("NamedQueue::reset_stats: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(QueueRequest::ResetStats { reply_tx }, reply_rx).await?;
        Ok(self)
    }

    async fn request<R>(&self, request: RequestOf<T, P>, reply_rx: oneshot::Receiver<R>) -> Result<R, QueueError> {
        self.tx.send(request).map_err(|_| QueueError::Closed)?;
        reply_rx.await.map_err(|_| QueueError::Closed)
    }
}

/// Pending result of a submission
///
/// Resolves once the run for its key finishes. Every ticket coalesced under
/// the same run receives a clone of the same result.
#[must_use = "a ticket does nothing unless awaited"]
pub struct Ticket<O, E> {
    key: String,
    rx: oneshot::Receiver<Delivery<O, E>>,
}

impl<O, E> Ticket<O, E> {
    /// Key this ticket waits on
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<O, E> Future for Ticket<O, E> {
    type Output = Delivery<O, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(QueueError::Closed)))
    }
}
