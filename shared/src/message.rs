//! Wire payloads for the realtime channel and the push provider
//!
//! These mirror what the backend actually sends; adapters translate them
//! into [`crate::order::OrderEvent`]s and nothing downstream ever sees them.

use crate::order::{OrderRecord, OrderStatus};
use serde::{Deserialize, Serialize};

// ==================== Realtime Channel ====================

/// Inbound realtime channel messages
///
/// Two message types exist on the wire: `new-order` and
/// `order-status-changed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RealtimeMessage {
    NewOrder {
        order: OrderRecord,
    },
    OrderStatusChanged {
        order_id: String,
        status: OrderStatus,
        /// Server timestamp (unix milliseconds); absent on legacy backends
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
}

// ==================== Push Notifications ====================

/// Push payload discriminator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PushKind {
    NewOrder,
    OrderStatusChanged,
}

/// Out-of-band push notification payload
///
/// Push payloads are id-only for `new-order`; the full order body must be
/// fetched before a Created event can be emitted. The `status` field is a
/// raw string because provider payloads are loosely typed - parsing happens
/// at the adapter boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushPayload {
    #[serde(rename = "type")]
    pub kind: PushKind,
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_message_wire_format() {
        let json = r#"{
            "type": "order-status-changed",
            "order_id": "ord-9",
            "status": "READY",
            "timestamp": 1700000000000
        }"#;
        let msg: RealtimeMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            RealtimeMessage::OrderStatusChanged {
                order_id: "ord-9".to_string(),
                status: OrderStatus::Ready,
                timestamp: Some(1_700_000_000_000),
            }
        );
    }

    #[test]
    fn test_push_payload_new_order_is_id_only() {
        let json = r#"{"type": "new-order", "order_id": "ord-3"}"#;
        let payload: PushPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.kind, PushKind::NewOrder);
        assert_eq!(payload.order_id, "ord-3");
        assert!(payload.status.is_none());
    }
}
