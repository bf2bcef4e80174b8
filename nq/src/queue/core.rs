//! Scheduler task: admission loop and completion handling

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::QueueError;
use crate::task::{Processor, Task};

use super::backlog::{Backlog, PendingRequest};
use super::messages::{Control, Delivery, QueueRequest, Waiter};
use super::registry::Registry;
use super::stats::StatsCollector;

type WaiterOf<T, P> = Waiter<<P as Processor<T>>::Output, <P as Processor<T>>::Error>;
type DeliveryOf<T, P> = Delivery<<P as Processor<T>>::Output, <P as Processor<T>>::Error>;
pub(crate) type RequestOf<T, P> = QueueRequest<T, <P as Processor<T>>::Output, <P as Processor<T>>::Error>;
pub(crate) type ControlOf<T, P> = Control<<P as Processor<T>>::Output, <P as Processor<T>>::Error>;

/// State owned by the scheduler task
///
/// Every mutation of the backlog, registry, counter and stats happens inside
/// `run`, one message at a time.
pub(crate) struct QueueCore<T: Task, P: Processor<T>> {
    concurrency: usize,
    processor: Arc<P>,
    backlog: Backlog<PendingRequest<T, WaiterOf<T, P>>>,
    registry: Registry<WaiterOf<T, P>>,
    /// Keys currently running; always equal to `registry.len()`
    in_flight: usize,
    stats: StatsCollector,
    next_run_id: u64,
    drain_scheduled: bool,
    control_tx: mpsc::UnboundedSender<ControlOf<T, P>>,
}

impl<T: Task, P: Processor<T>> QueueCore<T, P> {
    pub(crate) fn new(processor: Arc<P>, concurrency: usize, control_tx: mpsc::UnboundedSender<ControlOf<T, P>>) -> Self {
        debug!(concurrency, "QueueCore::new: called");
        Self {
            concurrency: concurrency.max(1),
            processor,
            backlog: Backlog::new(),
            registry: Registry::new(),
            in_flight: 0,
            stats: StatsCollector::new(),
            next_run_id: 0,
            drain_scheduled: false,
            control_tx,
        }
    }

    /// Run the scheduler until every handle is dropped and all work drained
    pub(crate) async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<RequestOf<T, P>>,
        mut control: mpsc::UnboundedReceiver<ControlOf<T, P>>,
    ) {
        info!(concurrency = self.concurrency, "Queue scheduler started");
        let mut accepting = true;

        loop {
            if !accepting && self.is_idle() {
                break;
            }

            tokio::select! {
                biased;

                Some(message) = control.recv() => {
                    // Submissions already sent land before the admission pass
                    if accepting && matches!(message, Control::Drain) {
                        while let Ok(request) = requests.try_recv() {
                            self.handle_request(request);
                        }
                    }
                    self.handle_control(message)
                }

                request = requests.recv(), if accepting => match request {
                    Some(request) => self.handle_request(request),
                    None => {
                        debug!(
                            backlog = self.backlog.len(),
                            in_flight = self.in_flight,
                            "QueueCore::run: all handles dropped, draining"
                        );
                        accepting = false;
                    }
                },
            }
        }

        info!("Queue scheduler stopped");
    }

    fn is_idle(&self) -> bool {
        self.backlog.is_empty() && self.in_flight == 0
    }

    fn handle_request(&mut self, request: RequestOf<T, P>) {
        match request {
            QueueRequest::Submit {
                key,
                task,
                waiter,
                front,
                submitted_at,
            } => self.submit(key, task, waiter, front, submitted_at),
            QueueRequest::Length { reply_tx } => {
                let _ = reply_tx.send(self.backlog.len());
            }
            QueueRequest::InFlight { reply_tx } => {
                let _ = reply_tx.send(self.in_flight);
            }
            QueueRequest::Stats { reply_tx } => {
                let _ = reply_tx.send(self.stats.snapshot(self.backlog.len(), self.in_flight));
            }
            QueueRequest::ResetStats { reply_tx } => {
                self.stats.reset();
                let _ = reply_tx.send(());
            }
        }
    }

    fn handle_control(&mut self, message: ControlOf<T, P>) {
        match message {
            Control::Completed { key, run_id, outcome } => self.complete(key, run_id, outcome),
            Control::Drain => self.drain(),
        }
    }

    fn submit(&mut self, key: String, task: T, waiter: WaiterOf<T, P>, front: bool, submitted_at: Instant) {
        debug!(%key, front, "QueueCore::submit: called");
        if self.registry.is_running(&key) {
            self.coalesce(&key, waiter);
            return;
        }

        let request = PendingRequest::new(key, task, waiter, submitted_at);
        if front {
            self.backlog.enqueue_head(request);
        } else {
            self.backlog.enqueue_tail(request);
        }
        self.schedule_drain();
    }

    fn coalesce(&mut self, key: &str, waiter: WaiterOf<T, P>) {
        match self.registry.attach(key, waiter) {
            Ok(waiters) => {
                debug!(%key, waiters, "QueueCore::coalesce: merged into running key");
                self.stats.record_duplicate(key);
            }
            Err(err) => warn!(%key, error = %err, "QueueCore::coalesce: attach failed"),
        }
    }

    fn schedule_drain(&mut self) {
        if self.drain_scheduled {
            return;
        }
        self.drain_scheduled = true;
        if self.control_tx.send(Control::Drain).is_err() {
            warn!("QueueCore::schedule_drain: control channel closed");
        }
    }

    /// Admission pass
    fn drain(&mut self) {
        self.drain_scheduled = false;
        debug!(
            backlog = self.backlog.len(),
            in_flight = self.in_flight,
            "QueueCore::drain: called"
        );

        while self.in_flight < self.concurrency {
            let Some(request) = self.backlog.dequeue_head() else {
                break;
            };

            // Key started running after this request was queued
            if self.registry.is_running(&request.key) {
                self.coalesce(&request.key, request.waiter);
                continue;
            }

            self.admit(request);
        }
    }

    fn admit(&mut self, request: PendingRequest<T, WaiterOf<T, P>>) {
        let PendingRequest {
            key,
            task,
            waiter,
            enqueued_at,
        } = request;

        let run_id = self.next_run_id;
        self.next_run_id += 1;

        let now = Instant::now();
        self.registry.register_running(key.clone(), run_id, now, waiter);
        self.in_flight += 1;
        self.stats
            .record_admission(&key, self.in_flight, now.saturating_duration_since(enqueued_at));

        debug!(%key, run_id, in_flight = self.in_flight, "QueueCore::admit: starting work");
        self.spawn_work(key, run_id, task);
    }

    fn spawn_work(&self, key: String, run_id: u64, task: T) {
        let processor = Arc::clone(&self.processor);
        let control_tx = self.control_tx.clone();

        tokio::spawn(async move {
            let work = tokio::spawn(async move { processor.process(task).await });
            let outcome = match work.await {
                Ok(result) => Ok(result),
                Err(err) => {
                    warn!(%key, run_id, error = %err, "Processor task failed");
                    Err(QueueError::Aborted { key: key.clone() })
                }
            };

            if control_tx.send(Control::Completed { key, run_id, outcome }).is_err() {
                debug!(run_id, "QueueCore::spawn_work: scheduler gone, dropping completion");
            }
        });
    }

    fn complete(&mut self, key: String, run_id: u64, outcome: DeliveryOf<T, P>) {
        if self.registry.run_id(&key) != Some(run_id) {
            debug!(%key, run_id, "QueueCore::complete: no matching in-flight entry, ignoring");
            return;
        }

        let entry = match self.registry.complete(&key) {
            Ok(entry) => entry,
            Err(err) => {
                debug!(%key, run_id, error = %err, "QueueCore::complete: already completed");
                return;
            }
        };

        self.in_flight -= 1;
        self.stats.record_completion(&key, entry.started_at.elapsed());

        debug!(%key, run_id, waiters = entry.waiters.len(), "QueueCore::complete: delivering result");
        for waiter in entry.waiters {
            if waiter.send(outcome.clone()).is_err() {
                debug!(%key, "QueueCore::complete: waiter dropped its ticket");
            }
        }

        self.schedule_drain();
    }
}
