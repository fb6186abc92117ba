//! Receipt print delivery
//!
//! [`queue`] is the generic retry queue; [`dispatcher`] binds it to the
//! printer endpoint and to operator notices.

pub mod dispatcher;
pub mod queue;

pub use dispatcher::PrintDispatcher;
pub use queue::{
    DeliveryError, DeliveryHandler, DeliveryQueue, FailedDelivery, MAX_DELIVERY_ATTEMPTS,
    RETRY_BACKOFF,
};
