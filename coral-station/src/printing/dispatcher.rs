//! Print dispatcher
//!
//! Wraps the delivery queue with printer-specific send semantics: every
//! endpoint error or timeout is a retryable failure, and an exhausted job
//! becomes a user-visible [`StationNotice::PrintFailed`] rather than a
//! silent drop.

use crate::notice::StationNotice;
use crate::printing::queue::{DeliveryError, DeliveryHandler, DeliveryQueue, FailedDelivery};
use async_trait::async_trait;
use coral_printer::{PrinterEndpoint, PrinterHealth};
use shared::OrderRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Sends one receipt through the printer endpoint
struct PrintDeliveryHandler {
    endpoint: Arc<dyn PrinterEndpoint>,
}

#[async_trait]
impl DeliveryHandler<OrderRecord> for PrintDeliveryHandler {
    async fn deliver(&self, order: &OrderRecord) -> Result<(), DeliveryError> {
        // Rejections, timeouts and connection failures all classify as
        // retryable; the queue owns the attempt budget.
        self.endpoint
            .print(order)
            .await
            .map_err(|e| DeliveryError(e.to_string()))
    }
}

/// Resilient print delivery for order receipts
pub struct PrintDispatcher {
    queue: DeliveryQueue<OrderRecord>,
    endpoint: Arc<dyn PrinterEndpoint>,
}

impl PrintDispatcher {
    /// Create a dispatcher and start forwarding exhausted jobs as notices
    pub fn new(
        endpoint: Arc<dyn PrinterEndpoint>,
        notice_tx: broadcast::Sender<StationNotice>,
        shutdown: CancellationToken,
    ) -> Self {
        let handler = Arc::new(PrintDeliveryHandler {
            endpoint: Arc::clone(&endpoint),
        });
        let queue = DeliveryQueue::new(handler, shutdown.clone());

        // Exhausted jobs surface to the operator, never silently
        tokio::spawn(Self::forward_failures(
            queue.failures(),
            notice_tx,
            shutdown,
        ));

        Self { queue, endpoint }
    }

    /// Forward exhausted jobs to operator notices until shutdown
    ///
    /// A lagged receiver loses the skipped reports but must keep
    /// forwarding later ones; only a closed channel ends the loop.
    async fn forward_failures(
        mut failures: broadcast::Receiver<FailedDelivery<OrderRecord>>,
        notice_tx: broadcast::Sender<StationNotice>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                failed = failures.recv() => match failed {
                    Ok(FailedDelivery { payload, attempts }) => {
                        tracing::error!(
                            order_id = %payload.id,
                            order_number = %payload.order_number,
                            attempts,
                            "Receipt print failed permanently, manual print required"
                        );
                        let _ = notice_tx.send(StationNotice::PrintFailed {
                            order_id: payload.id,
                            order_number: payload.order_number,
                            attempts,
                        });
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            skipped,
                            "Failure reports lagged, some print failures were not relayed"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }

    /// Override the retry backoff (tests use short ones)
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.queue = self.queue.with_backoff(backoff);
        self
    }

    /// Queue a receipt for delivery
    ///
    /// The snapshot taken here is immutable; later changes to the live
    /// record do not touch a job already queued.
    pub fn enqueue(&self, order: &OrderRecord) {
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            "Print job enqueued"
        );
        self.queue.enqueue(order.clone());
    }

    /// Jobs currently waiting
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Probe the printer endpoint
    pub async fn health(&self) -> PrinterHealth {
        self.endpoint.health().await
    }

    /// Sweeper loop for this dispatcher's queue (blocks until shutdown)
    pub async fn run_sweeper(&self, period: Duration) {
        self.queue.clone().run_sweeper(period).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use shared::order::OrderStatus;
    use shared::util::now_millis;

    struct FlakyPrinter {
        failures_left: Mutex<u32>,
        printed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PrinterEndpoint for FlakyPrinter {
        async fn print(&self, order: &OrderRecord) -> coral_printer::PrintResult<()> {
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                return Err(coral_printer::PrintError::Connection(
                    "bridge down".to_string(),
                ));
            }
            self.printed.lock().push(order.id.clone());
            Ok(())
        }

        async fn health(&self) -> PrinterHealth {
            PrinterHealth::Online
        }
    }

    fn make_order(id: &str) -> OrderRecord {
        OrderRecord {
            id: id.to_string(),
            order_number: format!("N-{id}"),
            table_number: None,
            items: vec![],
            status: OrderStatus::Received,
            created_at: now_millis(),
            status_history: vec![],
            subtotal: 10.0,
            tax: 1.0,
            tip: None,
            total: 11.0,
        }
    }

    #[tokio::test]
    async fn test_transient_failure_recovers() {
        let printer = Arc::new(FlakyPrinter {
            failures_left: Mutex::new(2),
            printed: Mutex::new(Vec::new()),
        });
        let (notice_tx, _) = broadcast::channel(16);
        let dispatcher = PrintDispatcher::new(
            printer.clone(),
            notice_tx,
            CancellationToken::new(),
        )
        .with_backoff(Duration::from_millis(10));

        dispatcher.enqueue(&make_order("o1"));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(printer.printed.lock().clone(), vec!["o1"]);
        assert_eq!(dispatcher.queued(), 0);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_order_and_attempts() {
        let printer = Arc::new(FlakyPrinter {
            failures_left: Mutex::new(u32::MAX),
            printed: Mutex::new(Vec::new()),
        });
        let (notice_tx, mut notices) = broadcast::channel(16);
        let dispatcher = PrintDispatcher::new(
            printer,
            notice_tx,
            CancellationToken::new(),
        )
        .with_backoff(Duration::from_millis(10));

        dispatcher.enqueue(&make_order("O2"));

        let notice = tokio::time::timeout(Duration::from_secs(2), notices.recv())
            .await
            .expect("notice not delivered in time")
            .unwrap();
        assert_eq!(
            notice,
            StationNotice::PrintFailed {
                order_id: "O2".to_string(),
                order_number: "N-O2".to_string(),
                attempts: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_forwarder_survives_lagged_failure_channel() {
        // Tiny channel, overflowed before the forwarder runs: the first
        // recv yields Lagged, which must not end the loop.
        let (failure_tx, failures) = broadcast::channel(1);
        let (notice_tx, mut notices) = broadcast::channel(16);

        for i in 0..3 {
            let _ = failure_tx.send(FailedDelivery {
                payload: make_order(&format!("old-{i}")),
                attempts: 3,
            });
        }

        tokio::spawn(PrintDispatcher::forward_failures(
            failures,
            notice_tx,
            CancellationToken::new(),
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let _ = failure_tx.send(FailedDelivery {
            payload: make_order("fresh"),
            attempts: 3,
        });

        // Notices keep flowing after the lag; the surviving buffered report
        // and the fresh one both arrive.
        let mut seen = Vec::new();
        while let Ok(Ok(notice)) =
            tokio::time::timeout(Duration::from_millis(500), notices.recv()).await
        {
            if let StationNotice::PrintFailed { order_id, .. } = notice {
                seen.push(order_id);
            }
            if seen.iter().any(|id| id == "fresh") {
                break;
            }
        }
        assert!(seen.iter().any(|id| id == "fresh"));
    }
}
