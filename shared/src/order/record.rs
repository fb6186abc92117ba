//! Canonical order record and its status lifecycle

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Status
// ============================================================================

/// Order lifecycle status
///
/// Transitions only advance forward through
/// `Received → Preparing → Ready → Served`, or jump directly to `Cancelled`
/// from any non-terminal state. `Served` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Received,
    Preparing,
    Ready,
    Served,
    Cancelled,
}

impl OrderStatus {
    /// Whether this status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Served | OrderStatus::Cancelled)
    }

    /// Position in the forward chain
    fn rank(&self) -> u8 {
        match self {
            OrderStatus::Received => 0,
            OrderStatus::Preparing => 1,
            OrderStatus::Ready => 2,
            OrderStatus::Served => 3,
            OrderStatus::Cancelled => 4,
        }
    }

    /// Whether the forward-progress rule admits a transition to `next`
    ///
    /// Terminal states admit nothing. `Cancelled` is reachable from any
    /// non-terminal state; everything else must move strictly forward.
    pub fn can_advance_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            OrderStatus::Cancelled => true,
            _ => next.rank() > self.rank(),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Received => write!(f, "received"),
            OrderStatus::Preparing => write!(f, "preparing"),
            OrderStatus::Ready => write!(f, "ready"),
            OrderStatus::Served => write!(f, "served"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Raised when a wire payload carries a status string we do not know
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    /// Case-insensitive parse, accepts both `preparing` and `PREPARING`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "received" => Ok(OrderStatus::Received),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "served" => Ok(OrderStatus::Served),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

// ============================================================================
// Record
// ============================================================================

/// One entry in the append-only status history
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StatusEntry {
    pub status: OrderStatus,
    /// Unix milliseconds
    pub timestamp: i64,
}

/// A single line item on an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    /// Item name as shown on the ticket
    pub name: String,
    /// Quantity ordered
    pub quantity: i32,
    /// Unit price
    pub unit_price: f64,
    /// Selected customizations (e.g. "no onions")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Vec<String>>,
    /// Free-text kitchen instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl OrderLine {
    /// Line subtotal computed from quantity and unit price
    pub fn line_total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

/// Canonical order entity
///
/// `id` is opaque and stable across all sources; `order_number` is the
/// human-facing number (unique within the active set, not globally).
/// `created_at` is authoritative for age/urgency calculations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRecord {
    /// Order ID (assigned by the backend)
    pub id: String,
    /// Human-facing order number
    pub order_number: String,
    /// Table this order belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_number: Option<String>,
    /// Line items, in ordering sequence
    pub items: Vec<OrderLine>,
    /// Current status
    pub status: OrderStatus,
    /// Creation timestamp (unix milliseconds)
    pub created_at: i64,
    /// Append-only status history
    #[serde(default)]
    pub status_history: Vec<StatusEntry>,
    /// Subtotal before tax
    pub subtotal: f64,
    /// Tax amount
    #[serde(default)]
    pub tax: f64,
    /// Tip, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip: Option<f64>,
    /// Grand total
    pub total: f64,
}

impl OrderRecord {
    /// Overwrite the status and append to the history
    ///
    /// The caller owns the transition policy; this only records the fact.
    pub fn record_status(&mut self, status: OrderStatus, timestamp: i64) {
        self.status = status;
        self.status_history.push(StatusEntry { status, timestamp });
    }

    /// Age of the order relative to `now` (unix milliseconds)
    pub fn age_millis(&self, now: i64) -> i64 {
        now - self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_progress_rule() {
        assert!(OrderStatus::Received.can_advance_to(OrderStatus::Preparing));
        assert!(OrderStatus::Received.can_advance_to(OrderStatus::Ready));
        assert!(OrderStatus::Preparing.can_advance_to(OrderStatus::Served));
        assert!(!OrderStatus::Ready.can_advance_to(OrderStatus::Preparing));
        assert!(!OrderStatus::Preparing.can_advance_to(OrderStatus::Preparing));
    }

    #[test]
    fn test_cancelled_reachable_from_any_non_terminal() {
        assert!(OrderStatus::Received.can_advance_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Ready.can_advance_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Served.can_advance_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_advance_to(OrderStatus::Received));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("preparing".parse::<OrderStatus>(), Ok(OrderStatus::Preparing));
        assert_eq!("SERVED".parse::<OrderStatus>(), Ok(OrderStatus::Served));
        assert_eq!(
            "on-fire".parse::<OrderStatus>(),
            Err(UnknownStatus("on-fire".to_string()))
        );
    }

    #[test]
    fn test_line_total() {
        let line = OrderLine {
            name: "Paella".to_string(),
            quantity: 3,
            unit_price: 12.5,
            customizations: None,
            instructions: None,
        };
        assert_eq!(line.line_total(), 37.5);
    }
}
