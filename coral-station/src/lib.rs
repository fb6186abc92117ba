//! Coral Station - order workstation core
//!
//! Client-side engine for a restaurant front-of-house terminal: reconciles
//! order events from poll, realtime and push sources into one active-order
//! set, and drives kitchen ticket printing through a resilient retry queue.

pub mod adapters;
pub mod backend;
pub mod config;
pub mod effects;
pub mod notice;
pub mod printing;
pub mod station;
pub mod store;
pub mod tasks;

pub use adapters::{
    EventPipeline, NotificationPushAdapter, PollFetchAdapter, RealtimePushAdapter,
    RealtimeTransport, TransportEvent,
};
pub use backend::{BackendClient, BackendError, StatusUpdateResponse};
pub use config::Config;
pub use effects::{FeedbackError, FeedbackSink, NotificationEffectsGate};
pub use notice::{ConnectivityState, ConnectivityTracker, StationNotice};
pub use printing::PrintDispatcher;
pub use station::Station;
pub use store::{MergeResult, ReconciliationStore, StoreError, StoreUpdate};

// Re-export shared types for convenience
pub use shared::order::{OrderEvent, OrderRecord, OrderStatus};
pub use shared::settings::NotificationSettings;
