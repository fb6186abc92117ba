//! Periodic poll adapter
//!
//! The poll loop is the baseline source of truth. Every tick fetches the
//! full active-order list and replays it through the pipeline as `Created`
//! events; the store's idempotent admission makes the replay harmless and
//! catches anything the realtime channel or push path dropped.

use crate::adapters::EventPipeline;
use crate::backend::BackendClient;
use crate::notice::ConnectivityTracker;
use shared::order::{EventSource, OrderEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct PollFetchAdapter {
    backend: Arc<BackendClient>,
    pipeline: Arc<EventPipeline>,
    interval: Duration,
    connectivity: Arc<ConnectivityTracker>,
}

impl PollFetchAdapter {
    pub fn new(
        backend: Arc<BackendClient>,
        pipeline: Arc<EventPipeline>,
        interval: Duration,
        connectivity: Arc<ConnectivityTracker>,
    ) -> Self {
        Self {
            backend,
            pipeline,
            interval,
            connectivity,
        }
    }

    /// Poll loop, runs until the shutdown token fires
    ///
    /// Every cycle reports reachability to the tracker, which owns the
    /// dedup of state transitions.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "Poll adapter started");

        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.cancelled() => {
                    info!("Poll adapter stopped");
                    return;
                }
            }

            match self.poll_once().await {
                Ok(count) => {
                    debug!(orders = count, "Poll cycle complete");
                    self.connectivity.set_backend_reachable(true);
                }
                Err(e) => {
                    warn!(error = %e, "Poll cycle failed");
                    self.connectivity.set_backend_reachable(false);
                }
            }
        }
    }

    /// One poll cycle: fetch the active list and replay it through the store
    pub async fn poll_once(&self) -> Result<usize, crate::backend::BackendError> {
        let orders = self.backend.fetch_active_orders().await?;
        let count = orders.len();

        for order in orders {
            self.pipeline
                .deliver(OrderEvent::created(EventSource::Poll, order))
                .await;
        }

        Ok(count)
    }
}
