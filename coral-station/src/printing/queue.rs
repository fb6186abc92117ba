//! Delivery queue - ordered, retry-capable work queue
//!
//! One worker at a time drains the queue head-first. A failed job sits out
//! a fixed backoff and is requeued at the tail, so a permanently bad job
//! never blocks receipts for fresher jobs. After the attempt budget is
//! spent the job is dropped and surfaced on the failure channel.
//!
//! A periodic sweep restarts the worker if jobs remain while no worker is
//! running (self-healing against lost wake-ups between the empty-check and
//! a racing enqueue).

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::util::now_millis;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Attempts per job before it is dropped and reported
pub const MAX_DELIVERY_ATTEMPTS: u32 = 3;
/// Fixed pause before a failed job is requeued at the tail
pub const RETRY_BACKOFF: Duration = Duration::from_secs(2);
/// Failure channel capacity
const FAILURE_CHANNEL_CAPACITY: usize = 256;

/// A single delivery attempt failed; the queue decides what happens next
#[derive(Debug, Error)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Performs one delivery attempt for a queued payload
#[async_trait]
pub trait DeliveryHandler<T>: Send + Sync + 'static {
    async fn deliver(&self, payload: &T) -> Result<(), DeliveryError>;
}

/// One queued unit of work
///
/// The payload is an immutable snapshot - later mutations to live state
/// must not alter a job already in flight. The id exists for log
/// correlation across retries.
#[derive(Debug, Clone)]
struct QueuedJob<T> {
    id: Uuid,
    payload: T,
    attempts: u32,
    enqueued_at: i64,
}

/// A job whose attempt budget is exhausted
#[derive(Debug, Clone)]
pub struct FailedDelivery<T> {
    pub payload: T,
    pub attempts: u32,
}

/// Ordered retry queue with a single worker
pub struct DeliveryQueue<T> {
    jobs: Arc<Mutex<VecDeque<QueuedJob<T>>>>,
    worker_active: Arc<AtomicBool>,
    handler: Arc<dyn DeliveryHandler<T>>,
    failure_tx: broadcast::Sender<FailedDelivery<T>>,
    shutdown: CancellationToken,
    backoff: Duration,
}

impl<T> Clone for DeliveryQueue<T> {
    fn clone(&self) -> Self {
        Self {
            jobs: Arc::clone(&self.jobs),
            worker_active: Arc::clone(&self.worker_active),
            handler: Arc::clone(&self.handler),
            failure_tx: self.failure_tx.clone(),
            shutdown: self.shutdown.clone(),
            backoff: self.backoff,
        }
    }
}

impl<T> DeliveryQueue<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(handler: Arc<dyn DeliveryHandler<T>>, shutdown: CancellationToken) -> Self {
        let (failure_tx, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        Self {
            jobs: Arc::new(Mutex::new(VecDeque::new())),
            worker_active: Arc::new(AtomicBool::new(false)),
            handler,
            failure_tx,
            shutdown,
            backoff: RETRY_BACKOFF,
        }
    }

    /// Override the retry backoff (tests use short ones)
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Subscribe to exhausted-job reports
    pub fn failures(&self) -> broadcast::Receiver<FailedDelivery<T>> {
        self.failure_tx.subscribe()
    }

    /// Append a job at the tail and make sure a worker is draining
    ///
    /// Safe to call from any number of tasks concurrently; at most one
    /// worker runs at a time.
    pub fn enqueue(&self, payload: T) {
        let id = Uuid::new_v4();
        {
            let mut jobs = self.jobs.lock();
            jobs.push_back(QueuedJob {
                id,
                payload,
                attempts: 0,
                enqueued_at: now_millis(),
            });
            tracing::debug!(job_id = %id, queued = jobs.len(), "Job enqueued");
        }
        self.ensure_worker();
    }

    /// Jobs currently waiting (not counting one in flight)
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Whether a worker loop is currently running
    pub fn worker_active(&self) -> bool {
        self.worker_active.load(Ordering::SeqCst)
    }

    /// Start a worker if none is running
    pub fn ensure_worker(&self) {
        if self
            .worker_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let queue = self.clone();
            tokio::spawn(async move {
                queue.run_worker().await;
            });
        }
    }

    /// Periodic sweep: resume processing if jobs remain while no worker
    /// runs (blocks until shutdown)
    pub async fn run_sweeper(self, period: Duration) {
        tracing::info!(period_ms = period.as_millis() as u64, "Queue sweeper started");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Queue sweeper received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    if !self.is_empty() && !self.worker_active() {
                        tracing::warn!(queued = self.len(), "Sweeper found stalled queue, restarting worker");
                        self.ensure_worker();
                    }
                }
            }
        }
    }

    /// Worker loop: drain the queue head-first, one job at a time
    async fn run_worker(self) {
        tracing::debug!("Delivery worker started");

        loop {
            if self.shutdown.is_cancelled() {
                self.worker_active.store(false, Ordering::SeqCst);
                tracing::debug!("Delivery worker received shutdown signal");
                return;
            }

            let job = self.jobs.lock().pop_front();
            let Some(mut job) = job else {
                // An enqueue racing with this store is resumed by the
                // sweeper or by the next enqueue.
                self.worker_active.store(false, Ordering::SeqCst);
                tracing::debug!("Queue drained, delivery worker stopping");
                return;
            };

            job.attempts += 1;
            match self.handler.deliver(&job.payload).await {
                Ok(()) => {
                    tracing::info!(
                        job_id = %job.id,
                        attempts = job.attempts,
                        waited_ms = now_millis() - job.enqueued_at,
                        "Job delivered"
                    );
                }
                Err(e) if job.attempts >= MAX_DELIVERY_ATTEMPTS => {
                    tracing::error!(
                        job_id = %job.id,
                        attempts = job.attempts,
                        waited_ms = now_millis() - job.enqueued_at,
                        error = %e,
                        "Job exhausted its attempts, dropping"
                    );
                    let _ = self.failure_tx.send(FailedDelivery {
                        payload: job.payload,
                        attempts: job.attempts,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        job_id = %job.id,
                        attempts = job.attempts,
                        error = %e,
                        "Delivery failed, will requeue at tail"
                    );
                    tokio::select! {
                        _ = self.shutdown.cancelled() => {
                            // Keep the job so a restarted worker can retry it
                            self.jobs.lock().push_back(job);
                            self.worker_active.store(false, Ordering::SeqCst);
                            return;
                        }
                        _ = tokio::time::sleep(self.backoff) => {}
                    }
                    self.jobs.lock().push_back(job);
                }
            }
        }
    }

    /// Insert a job without waking a worker (simulates a lost wake-up)
    #[cfg(test)]
    fn push_without_worker(&self, payload: T) {
        self.jobs.lock().push_back(QueuedJob {
            id: Uuid::new_v4(),
            payload,
            attempts: 0,
            enqueued_at: now_millis(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Scripted handler: per-payload list of results, plus an attempt log
    struct ScriptedHandler {
        // payload -> number of failures before success (None = always fail)
        failures: Mutex<HashMap<String, Option<u32>>>,
        log: Mutex<Vec<String>>,
    }

    impl ScriptedHandler {
        fn new() -> Self {
            Self {
                failures: Mutex::new(HashMap::new()),
                log: Mutex::new(Vec::new()),
            }
        }

        fn fail_n_times(&self, payload: &str, n: u32) {
            self.failures.lock().insert(payload.to_string(), Some(n));
        }

        fn always_fail(&self, payload: &str) {
            self.failures.lock().insert(payload.to_string(), None);
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().clone()
        }
    }

    #[async_trait]
    impl DeliveryHandler<String> for ScriptedHandler {
        async fn deliver(&self, payload: &String) -> Result<(), DeliveryError> {
            self.log.lock().push(payload.clone());
            let mut failures = self.failures.lock();
            match failures.get_mut(payload) {
                None => Ok(()),
                Some(None) => Err(DeliveryError("printer unreachable".to_string())),
                Some(Some(0)) => Ok(()),
                Some(Some(n)) => {
                    *n -= 1;
                    Err(DeliveryError("printer unreachable".to_string()))
                }
            }
        }
    }

    fn test_queue(handler: Arc<ScriptedHandler>) -> DeliveryQueue<String> {
        DeliveryQueue::new(handler, CancellationToken::new())
            .with_backoff(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_successful_delivery_removes_job() {
        let handler = Arc::new(ScriptedHandler::new());
        let queue = test_queue(handler.clone());

        queue.enqueue("a".to_string());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(queue.is_empty());
        assert_eq!(handler.log(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_retry_bound_is_exact() {
        let handler = Arc::new(ScriptedHandler::new());
        handler.always_fail("doomed");
        let queue = test_queue(handler.clone());
        let mut failures = queue.failures();

        queue.enqueue("doomed".to_string());

        let failed = tokio::time::timeout(Duration::from_secs(2), failures.recv())
            .await
            .expect("failure not reported in time")
            .unwrap();
        assert_eq!(failed.payload, "doomed");
        assert_eq!(failed.attempts, MAX_DELIVERY_ATTEMPTS);
        assert_eq!(handler.log().len(), MAX_DELIVERY_ATTEMPTS as usize);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let handler = Arc::new(ScriptedHandler::new());
        handler.fail_n_times("flaky", 2);
        let queue = test_queue(handler.clone());

        queue.enqueue("flaky".to_string());
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(queue.is_empty());
        assert_eq!(handler.log(), vec!["flaky", "flaky", "flaky"]);
    }

    #[tokio::test]
    async fn test_liveness_under_head_of_line_failure() {
        let handler = Arc::new(ScriptedHandler::new());
        handler.always_fail("a");
        let queue = test_queue(handler.clone());
        let mut failures = queue.failures();

        queue.enqueue("a".to_string());
        queue.enqueue("b".to_string());

        // Wait until A exhausts its attempts
        tokio::time::timeout(Duration::from_secs(2), failures.recv())
            .await
            .expect("failure not reported in time")
            .unwrap();

        let log = handler.log();
        let b_first_attempt = log.iter().position(|p| p == "b").unwrap();
        let a_second_attempt = log.iter().enumerate().filter(|(_, p)| *p == "a").nth(1).unwrap().0;
        // Requeue-to-tail: B is attempted before A's second attempt
        assert!(b_first_attempt < a_second_attempt);
    }

    #[tokio::test]
    async fn test_sweeper_resumes_stalled_queue() {
        let handler = Arc::new(ScriptedHandler::new());
        let queue = test_queue(handler.clone());

        // Job lands without a wake-up
        queue.push_without_worker("orphan".to_string());
        assert!(!queue.worker_active());

        tokio::spawn(queue.clone().run_sweeper(Duration::from_millis(20)));
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(queue.is_empty());
        assert_eq!(handler.log(), vec!["orphan"]);
    }

    #[tokio::test]
    async fn test_concurrent_enqueue_single_worker() {
        let handler = Arc::new(ScriptedHandler::new());
        let queue = test_queue(handler.clone());

        let mut handles = Vec::new();
        for i in 0..8 {
            let q = queue.clone();
            handles.push(tokio::spawn(async move {
                q.enqueue(format!("job-{i}"));
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(queue.is_empty());
        assert_eq!(handler.log().len(), 8);
    }
}
