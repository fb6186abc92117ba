//! Shared types for the Coral Station client
//!
//! Canonical order model, normalized order events, wire payloads for the
//! realtime channel and push notifications, notification settings and the
//! backend response envelope. Every other crate in the workspace depends on
//! these types; none of them carries transport-specific fields.

pub mod message;
pub mod order;
pub mod response;
pub mod settings;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use order::{
    EventSource, OrderEvent, OrderEventKind, OrderLine, OrderRecord, OrderStatus, StatusEntry,
    UnknownStatus,
};
pub use response::ApiResponse;
pub use settings::NotificationSettings;
