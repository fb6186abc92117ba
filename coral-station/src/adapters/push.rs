//! Push notification adapter
//!
//! Push payloads are loosely typed and id-only, so a `new-order` push must
//! be hydrated with a backend fetch before it can enter the store. A failed
//! hydration is not fatal; the next poll cycle picks the order up.

use crate::adapters::{AdapterError, AdapterResult, EventPipeline};
use crate::backend::BackendClient;
use shared::message::{PushKind, PushPayload};
use shared::order::{EventSource, OrderEvent, OrderStatus};
use shared::util::now_millis;
use std::sync::Arc;
use tracing::debug;

pub struct NotificationPushAdapter {
    backend: Arc<BackendClient>,
    pipeline: Arc<EventPipeline>,
}

impl NotificationPushAdapter {
    pub fn new(backend: Arc<BackendClient>, pipeline: Arc<EventPipeline>) -> Self {
        Self { backend, pipeline }
    }

    /// Handle one raw push payload
    pub async fn handle(&self, raw: serde_json::Value) -> AdapterResult<()> {
        let payload: PushPayload = serde_json::from_value(raw)
            .map_err(|e| AdapterError::Malformed(e.to_string()))?;

        match payload.kind {
            PushKind::NewOrder => {
                debug!(order_id = %payload.order_id, "Push new-order, fetching body");
                let order = self.backend.fetch_order(&payload.order_id).await?;
                self.pipeline
                    .deliver(OrderEvent::created(EventSource::Push, order))
                    .await;
            }
            PushKind::OrderStatusChanged => {
                let status_str = payload
                    .status
                    .ok_or_else(|| AdapterError::Malformed("status change without status".into()))?;
                let status: OrderStatus = status_str
                    .parse()
                    .map_err(|e: shared::order::UnknownStatus| AdapterError::Malformed(e.to_string()))?;

                debug!(order_id = %payload.order_id, status = %status, "Push status change");
                self.pipeline
                    .deliver(OrderEvent::status_changed(
                        EventSource::Push,
                        payload.order_id,
                        status,
                        payload.timestamp.unwrap_or_else(now_millis),
                    ))
                    .await;
            }
        }

        Ok(())
    }
}
