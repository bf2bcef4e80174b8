//! Task and processor traits
//!
//! A [`Task`] is any caller value that exposes a key. A [`Processor`] is the
//! work function the queue invokes once per admitted key.

use async_trait::async_trait;

/// A unit of work submitted to a [`NamedQueue`](crate::NamedQueue)
///
/// Tasks with equal keys are the same logical work: while one of them is
/// running, later submissions wait for its result instead of running again.
pub trait Task: Send + 'static {
    /// Deduplication key, `None` (or empty) when the task has none
    fn key(&self) -> Option<&str>;
}

impl Task for String {
    fn key(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl Task for &'static str {
    fn key(&self) -> Option<&str> {
        Some(*self)
    }
}

/// The work function behind a queue
///
/// Whatever `process` returns is forwarded verbatim to every waiter
/// coalesced under the task's key. The queue never inspects it.
#[async_trait]
pub trait Processor<T: Task>: Send + Sync + 'static {
    /// Success payload
    type Output: Clone + Send + 'static;

    /// Failure payload
    type Error: Clone + Send + 'static;

    async fn process(&self, task: T) -> Result<Self::Output, Self::Error>;
}

/// Validated key of a task
pub(crate) fn task_key<T: Task>(task: &T) -> Option<String> {
    match task.key() {
        Some(key) if !key.is_empty() => Some(key.to_string()),
        _ => None,
    }
}
