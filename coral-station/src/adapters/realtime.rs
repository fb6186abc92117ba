//! Realtime channel adapter
//!
//! Low-latency path. The transport itself (websocket, message bus) lives
//! behind [`RealtimeTransport`] so the adapter only deals with channel
//! lifecycle and message translation. On every reconnect the restaurant
//! channel is re-joined; the poll loop covers whatever was missed while
//! disconnected.

use crate::adapters::{AdapterResult, EventPipeline};
use crate::notice::ConnectivityTracker;
use async_trait::async_trait;
use shared::message::RealtimeMessage;
use shared::order::{EventSource, OrderEvent};
use shared::util::now_millis;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Connection lifecycle events surfaced by a transport
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Connected,
    Message(RealtimeMessage),
    Disconnected,
}

/// Abstraction over the realtime connection
///
/// Implementations own reconnection and deliver `Connected` again after
/// each successful re-establish. `next_event` returning `None` means the
/// transport is permanently closed.
#[async_trait]
pub trait RealtimeTransport: Send {
    async fn next_event(&mut self) -> Option<TransportEvent>;
    async fn join(&mut self, channel: &str) -> AdapterResult<()>;
}

pub struct RealtimePushAdapter {
    pipeline: Arc<EventPipeline>,
    channel: String,
    connectivity: Arc<ConnectivityTracker>,
}

impl RealtimePushAdapter {
    pub fn new(
        pipeline: Arc<EventPipeline>,
        channel: impl Into<String>,
        connectivity: Arc<ConnectivityTracker>,
    ) -> Self {
        Self {
            pipeline,
            channel: channel.into(),
            connectivity,
        }
    }

    /// Drive the transport until shutdown or permanent close
    pub async fn run<T: RealtimeTransport>(
        &self,
        mut transport: T,
        shutdown: CancellationToken,
    ) {
        info!(channel = %self.channel, "Realtime adapter started");

        loop {
            let event = tokio::select! {
                event = transport.next_event() => event,
                _ = shutdown.cancelled() => {
                    info!("Realtime adapter stopped");
                    return;
                }
            };

            match event {
                Some(TransportEvent::Connected) => {
                    info!(channel = %self.channel, "Realtime connected");
                    if let Err(e) = transport.join(&self.channel).await {
                        warn!(channel = %self.channel, error = %e, "Channel join failed");
                        continue;
                    }
                    self.connectivity.set_realtime(true);
                }
                Some(TransportEvent::Message(msg)) => {
                    self.handle_message(msg).await;
                }
                Some(TransportEvent::Disconnected) => {
                    warn!("Realtime disconnected, poll continues as fallback");
                    self.connectivity.set_realtime(false);
                }
                None => {
                    warn!("Realtime transport closed");
                    self.connectivity.set_realtime(false);
                    return;
                }
            }
        }
    }

    async fn handle_message(&self, msg: RealtimeMessage) {
        match msg {
            RealtimeMessage::NewOrder { order } => {
                debug!(order_id = %order.id, "Realtime new-order");
                self.pipeline
                    .deliver(OrderEvent::created(EventSource::Realtime, order))
                    .await;
            }
            RealtimeMessage::OrderStatusChanged {
                order_id,
                status,
                timestamp,
            } => {
                debug!(order_id = %order_id, status = %status, "Realtime status change");
                self.pipeline
                    .deliver(OrderEvent::status_changed(
                        EventSource::Realtime,
                        order_id,
                        status,
                        timestamp.unwrap_or_else(now_millis),
                    ))
                    .await;
            }
        }
    }
}
