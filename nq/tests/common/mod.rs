//! Shared helpers for queue integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use namedqueue::{Processor, Task};
use tokio::sync::{Notify, mpsc};

/// Task used by the integration tests
#[derive(Debug, Clone)]
pub struct TestJob {
    pub key: Option<String>,
    pub fail: bool,
}

impl Task for TestJob {
    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

pub fn job(key: &str) -> TestJob {
    TestJob {
        key: Some(key.to_string()),
        fail: false,
    }
}

pub fn failing_job(key: &str) -> TestJob {
    TestJob {
        key: Some(key.to_string()),
        fail: true,
    }
}

#[derive(Default)]
struct Shared {
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    running: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl Shared {
    fn gate(&self, key: &str) -> Arc<Notify> {
        let mut gates = self.gates.lock().unwrap();
        Arc::clone(gates.entry(key.to_string()).or_insert_with(|| Arc::new(Notify::new())))
    }
}

/// Processor whose runs block until the test releases their key
pub struct GatedProcessor {
    shared: Arc<Shared>,
    started_tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Processor<TestJob> for GatedProcessor {
    type Output = String;
    type Error = String;

    async fn process(&self, task: TestJob) -> Result<String, String> {
        let key = task.key.clone().unwrap_or_default();
        self.shared.calls.lock().unwrap().push(key.clone());
        let running = self.shared.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.peak.fetch_max(running, Ordering::SeqCst);
        let _ = self.started_tx.send(key.clone());

        self.shared.gate(&key).notified().await;

        self.shared.running.fetch_sub(1, Ordering::SeqCst);
        if task.fail {
            Err(format!("failed:{}", key))
        } else {
            Ok(format!("done:{}", key))
        }
    }
}

/// Test-side controls for a [`GatedProcessor`]
pub struct Harness {
    shared: Arc<Shared>,
    started_rx: mpsc::UnboundedReceiver<String>,
}

impl Harness {
    /// Let one run of `key` finish
    pub fn release(&self, key: &str) {
        self.shared.gate(key).notify_one();
    }

    /// Wait for the next run to start and return its key
    pub async fn next_started(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(2), self.started_rx.recv())
            .await
            .expect("timed out waiting for a run to start")
            .expect("processor dropped")
    }

    /// Assert nothing else starts within a short window
    pub async fn assert_idle(&mut self) {
        let started = tokio::time::timeout(Duration::from_millis(50), self.started_rx.recv()).await;
        assert!(started.is_err(), "unexpected run started: {:?}", started);
    }

    /// Keys passed to the processor, in call order
    pub fn calls(&self) -> Vec<String> {
        self.shared.calls.lock().unwrap().clone()
    }

    /// Most runs observed at the same time
    pub fn peak(&self) -> usize {
        self.shared.peak.load(Ordering::SeqCst)
    }
}

pub fn gated() -> (GatedProcessor, Harness) {
    let shared = Arc::new(Shared::default());
    let (started_tx, started_rx) = mpsc::unbounded_channel();
    (
        GatedProcessor {
            shared: Arc::clone(&shared),
            started_tx,
        },
        Harness { shared, started_rx },
    )
}
