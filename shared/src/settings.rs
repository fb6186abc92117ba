//! Notification settings
//!
//! Owned and mutated by the settings UI; the core observes snapshots
//! through a `watch` channel and never writes back. Changes take effect on
//! the next incoming event - jobs already queued keep draining.

use serde::{Deserialize, Serialize};

/// Operator-facing notification switches
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    /// Auto-enqueue a receipt print for every new order
    pub auto_print_enabled: bool,
    /// Play the new-order chime
    pub sound_enabled: bool,
    /// Vibrate on new orders
    pub vibration_enabled: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            auto_print_enabled: true,
            sound_enabled: true,
            vibration_enabled: true,
        }
    }
}
