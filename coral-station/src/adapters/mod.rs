//! Event source adapters
//!
//! Each adapter translates one transport (poll, realtime channel, push
//! notification) into `OrderEvent` and feeds the shared pipeline. The
//! adapters never touch the store directly.

mod poll;
mod push;
mod realtime;

pub use poll::PollFetchAdapter;
pub use push::NotificationPushAdapter;
pub use realtime::{RealtimePushAdapter, RealtimeTransport, TransportEvent};

use crate::backend::BackendError;
use crate::effects::NotificationEffectsGate;
use crate::store::{MergeResult, ReconciliationStore};
use shared::order::{OrderEvent, OrderEventKind};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Adapter errors
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Shared delivery path from any adapter into the store
///
/// Notification side effects fire only when the store actually admits a new
/// order, so a duplicate arriving over a second transport cannot re-trigger
/// the chime or the kitchen ticket.
pub struct EventPipeline {
    store: Arc<ReconciliationStore>,
    gate: Arc<NotificationEffectsGate>,
}

impl EventPipeline {
    pub fn new(store: Arc<ReconciliationStore>, gate: Arc<NotificationEffectsGate>) -> Self {
        Self { store, gate }
    }

    pub fn store(&self) -> &Arc<ReconciliationStore> {
        &self.store
    }

    /// Merge one event and run admission side effects
    pub async fn deliver(&self, event: OrderEvent) {
        let source = event.source;
        let order_id = event.order_id().to_string();
        let is_created = matches!(event.kind, OrderEventKind::Created { .. });

        match self.store.merge(&event) {
            Ok(MergeResult::Admitted) if is_created => {
                debug!(order_id = %order_id, source = ?source, "Order admitted");
                if let Some(order) = self.store.get(&order_id) {
                    self.gate.on_order_admitted(&order).await;
                }
            }
            Ok(result) => {
                debug!(order_id = %order_id, source = ?source, result = ?result, "Event merged");
            }
            Err(e) => {
                warn!(source = ?source, error = %e, "Rejected malformed event");
            }
        }
    }
}
