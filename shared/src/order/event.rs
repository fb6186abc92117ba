//! Normalized order events - the single shape all adapters produce
//!
//! Adapters own the translation from their wire formats into this union;
//! the reconciliation store never inspects source-specific fields. The
//! `source` tag exists for structured logging only.

use super::record::{OrderRecord, OrderStatus};
use serde::{Deserialize, Serialize};

/// Where an event entered the system
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Periodic REST fetch
    Poll,
    /// Persistent realtime channel
    Realtime,
    /// Out-of-band push notification
    Push,
    /// Optimistic update issued by the local UI
    Local,
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSource::Poll => write!(f, "poll"),
            EventSource::Realtime => write!(f, "realtime"),
            EventSource::Push => write!(f, "push"),
            EventSource::Local => write!(f, "local"),
        }
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventKind {
    /// A full order appeared
    Created { order: OrderRecord },
    /// An existing order moved to a new status
    StatusChanged {
        order_id: String,
        new_status: OrderStatus,
        /// Unix milliseconds, as reported by the source
        timestamp: i64,
    },
}

/// A normalized order event from any source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderEvent {
    pub source: EventSource,
    #[serde(flatten)]
    pub kind: OrderEventKind,
}

impl OrderEvent {
    pub fn created(source: EventSource, order: OrderRecord) -> Self {
        Self {
            source,
            kind: OrderEventKind::Created { order },
        }
    }

    pub fn status_changed(
        source: EventSource,
        order_id: impl Into<String>,
        new_status: OrderStatus,
        timestamp: i64,
    ) -> Self {
        Self {
            source,
            kind: OrderEventKind::StatusChanged {
                order_id: order_id.into(),
                new_status,
                timestamp,
            },
        }
    }

    /// Order this event refers to
    pub fn order_id(&self) -> &str {
        match &self.kind {
            OrderEventKind::Created { order } => &order.id,
            OrderEventKind::StatusChanged { order_id, .. } => order_id,
        }
    }
}
