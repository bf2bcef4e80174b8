//! Registry of keys currently running

use std::collections::HashMap;

use tokio::time::Instant;
use tracing::debug;

use crate::error::QueueError;

/// Bookkeeping for one running key
#[derive(Debug)]
pub struct InFlightEntry<W> {
    /// Admission this entry belongs to
    pub run_id: u64,
    pub started_at: Instant,
    /// Waiters in attach order
    pub waiters: Vec<W>,
}

/// Tracks, per key, the waiters of work currently executing
///
/// A key has at most one entry at a time.
#[derive(Debug)]
pub struct Registry<W> {
    entries: HashMap<String, InFlightEntry<W>>,
}

impl<W> Default for Registry<W> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<W> Registry<W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Run id of the live entry for `key`
    pub fn run_id(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.run_id)
    }

    /// Create the entry for a key that just started running
    pub fn register_running(&mut self, key: impl Into<String>, run_id: u64, started_at: Instant, waiter: W) {
        let key = key.into();
        debug!(%key, run_id, "Registry::register_running: called");
        debug_assert!(!self.entries.contains_key(&key), "key registered twice");
        self.entries.insert(
            key,
            InFlightEntry {
                run_id,
                started_at,
                waiters: vec![waiter],
            },
        );
    }

    /// Append a waiter to a running key, returning the waiter count
    pub fn attach(&mut self, key: &str, waiter: W) -> Result<usize, QueueError> {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.waiters.push(waiter);
                debug!(%key, waiters = entry.waiters.len(), "Registry::attach: attached");
                Ok(entry.waiters.len())
            }
            None => {
                debug!(%key, "Registry::attach: key not running");
                Err(QueueError::NoSuchKey { key: key.to_string() })
            }
        }
    }

    /// Destroy the entry for `key` and hand back its waiters
    pub fn complete(&mut self, key: &str) -> Result<InFlightEntry<W>, QueueError> {
        debug!(%key, "Registry::complete: called");
        self.entries
            .remove(key)
            .ok_or_else(|| QueueError::NoSuchKey { key: key.to_string() })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
