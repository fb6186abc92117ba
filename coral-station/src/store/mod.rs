//! ReconciliationStore - single authoritative owner of the active order set
//!
//! Three adapters feed this store concurrently and know nothing about each
//! other; a poll fetch, the realtime channel and push notifications all race
//! and re-deliver. All merge policy lives here so there is exactly one copy
//! of the dedup and forward-progress rules:
//!
//! - duplicate `Created` events are suppressed (idempotent admission)
//! - `StatusChanged` for an unknown id is a silent drop, not an error
//! - status only advances forward; stale transitions are ignored
//! - authoritative events supersede optimistic local state, even when the
//!   authoritative status looks older - the network is not assumed ordered
//! - terminal statuses remove the record from the active set, and the id is
//!   never re-admitted during this process lifetime
//!
//! A single mutex serializes all mutations (single-writer discipline);
//! consumers read through [`ReconciliationStore::snapshot`] or subscribe to
//! [`StoreUpdate`] broadcasts.

use parking_lot::Mutex;
use shared::order::{OrderEvent, OrderEventKind, OrderRecord, OrderStatus, StatusEntry};
use shared::util::now_millis;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::broadcast;

/// Update channel capacity (UI subscribers)
const UPDATE_CHANNEL_CAPACITY: usize = 1024;

/// Store errors
///
/// Malformed events are rejected at this boundary and never mutate state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Event is missing an order id")]
    MissingOrderId,
}

/// Outcome of a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResult {
    /// New order admitted at the head of the active ordering
    Admitted,
    /// Duplicate creation suppressed - the id is already active
    AlreadyActive,
    /// Creation for an id retired earlier in this process lifetime
    AlreadyRetired,
    /// Status applied to an active record
    Updated,
    /// Transition ignored by the forward-progress rule
    Stale,
    /// Record reached a terminal status and left the active set
    Retired,
    /// StatusChanged for an id not in the active set (sources race)
    UnknownOrder,
}

/// Read-model updates broadcast to UI subscribers
#[derive(Debug, Clone)]
pub enum StoreUpdate {
    Admitted(OrderRecord),
    Updated(OrderRecord),
    Removed {
        order_id: String,
        status: OrderStatus,
    },
}

/// Active record plus client-local merge state
///
/// The optimistic flag never leaves the store - print snapshots and UI
/// reads see plain [`OrderRecord`]s.
struct ActiveOrder {
    record: OrderRecord,
    /// Set by `apply_optimistic`, cleared by the next authoritative event
    optimistic: bool,
}

struct StoreInner {
    active: HashMap<String, ActiveOrder>,
    /// Active ids, most-recent-admission-first
    ordering: Vec<String>,
    /// Ids that reached a terminal status this process lifetime
    retired: HashSet<String>,
}

/// The single mutable source of truth for "currently active orders"
pub struct ReconciliationStore {
    inner: Mutex<StoreInner>,
    update_tx: broadcast::Sender<StoreUpdate>,
}

impl Default for ReconciliationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationStore {
    pub fn new() -> Self {
        let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(StoreInner {
                active: HashMap::new(),
                ordering: Vec::new(),
                retired: HashSet::new(),
            }),
            update_tx,
        }
    }

    /// Subscribe to read-model updates
    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate> {
        self.update_tx.subscribe()
    }

    /// Merge an authoritative event from any adapter
    pub fn merge(&self, event: &OrderEvent) -> Result<MergeResult, StoreError> {
        match &event.kind {
            OrderEventKind::Created { order } => {
                let result = self.admit(order)?;
                tracing::debug!(
                    order_id = %order.id,
                    source = %event.source,
                    result = ?result,
                    "Merged creation event"
                );
                Ok(result)
            }
            OrderEventKind::StatusChanged {
                order_id,
                new_status,
                timestamp,
            } => {
                let result = self.apply_status(order_id, *new_status, *timestamp, true)?;
                tracing::debug!(
                    order_id = %order_id,
                    source = %event.source,
                    new_status = %new_status,
                    result = ?result,
                    "Merged status event"
                );
                Ok(result)
            }
        }
    }

    /// Apply a status change issued by the local UI before the backend
    /// confirms it
    ///
    /// Gated by the same forward-progress rule as `merge`, but superseded by
    /// the next authoritative event for the same id.
    pub fn apply_optimistic(
        &self,
        order_id: &str,
        new_status: OrderStatus,
    ) -> Result<MergeResult, StoreError> {
        let result = self.apply_status(order_id, new_status, now_millis(), false)?;
        tracing::debug!(
            order_id = %order_id,
            new_status = %new_status,
            result = ?result,
            "Applied optimistic status"
        );
        Ok(result)
    }

    /// Current active set, most-recent-creation-first
    pub fn snapshot(&self) -> Vec<OrderRecord> {
        let inner = self.inner.lock();
        inner
            .ordering
            .iter()
            .filter_map(|id| inner.active.get(id).map(|e| e.record.clone()))
            .collect()
    }

    /// Look up a single active order
    pub fn get(&self, order_id: &str) -> Option<OrderRecord> {
        self.inner.lock().active.get(order_id).map(|e| e.record.clone())
    }

    /// Number of active orders
    pub fn len(&self) -> usize {
        self.inner.lock().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn admit(&self, order: &OrderRecord) -> Result<MergeResult, StoreError> {
        if order.id.is_empty() {
            return Err(StoreError::MissingOrderId);
        }

        let mut inner = self.inner.lock();
        if inner.retired.contains(&order.id) {
            return Ok(MergeResult::AlreadyRetired);
        }
        if inner.active.contains_key(&order.id) {
            return Ok(MergeResult::AlreadyActive);
        }
        // A creation already in a terminal state never enters the active
        // set; retire the id so later re-deliveries stay out too.
        if order.status.is_terminal() {
            inner.retired.insert(order.id.clone());
            return Ok(MergeResult::AlreadyRetired);
        }

        let mut record = order.clone();
        if record.status_history.is_empty() {
            record.status_history.push(StatusEntry {
                status: record.status,
                timestamp: record.created_at,
            });
        }

        inner.ordering.insert(0, record.id.clone());
        inner.active.insert(
            record.id.clone(),
            ActiveOrder {
                record: record.clone(),
                optimistic: false,
            },
        );
        drop(inner);

        tracing::info!(
            order_id = %record.id,
            order_number = %record.order_number,
            "Order admitted to active set"
        );
        let _ = self.update_tx.send(StoreUpdate::Admitted(record));
        Ok(MergeResult::Admitted)
    }

    fn apply_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
        timestamp: i64,
        authoritative: bool,
    ) -> Result<MergeResult, StoreError> {
        if order_id.is_empty() {
            return Err(StoreError::MissingOrderId);
        }

        let mut inner = self.inner.lock();
        let Some(entry) = inner.active.get_mut(order_id) else {
            // May refer to an order not yet admitted, or already removed.
            return Ok(MergeResult::UnknownOrder);
        };

        let current = entry.record.status;
        let accept = if authoritative && entry.optimistic {
            // Last authoritative event wins over optimistic state, even if
            // it looks older - the network is not assumed ordered.
            true
        } else if current == new_status {
            // Re-delivered event; only the history timestamp moves.
            authoritative
        } else {
            current.can_advance_to(new_status)
        };

        if !accept {
            return Ok(MergeResult::Stale);
        }

        entry.record.record_status(new_status, timestamp);
        if authoritative {
            entry.optimistic = false;
        } else {
            entry.optimistic = true;
        }
        let record = entry.record.clone();

        if new_status.is_terminal() {
            inner.active.remove(order_id);
            inner.ordering.retain(|id| id != order_id);
            inner.retired.insert(order_id.to_string());
            drop(inner);

            tracing::info!(
                order_id = %record.id,
                status = %new_status,
                "Order reached terminal status, removed from active set"
            );
            let _ = self.update_tx.send(StoreUpdate::Removed {
                order_id: record.id,
                status: new_status,
            });
            Ok(MergeResult::Retired)
        } else {
            drop(inner);
            let _ = self.update_tx.send(StoreUpdate::Updated(record));
            Ok(MergeResult::Updated)
        }
    }
}
