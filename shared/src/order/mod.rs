//! Order model and normalized order events

pub mod event;
pub mod record;

pub use event::{EventSource, OrderEvent, OrderEventKind};
pub use record::{OrderLine, OrderRecord, OrderStatus, StatusEntry, UnknownStatus};
