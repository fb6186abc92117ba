//! Operator-facing notices
//!
//! Non-fatal conditions the UI must relay to the operator: print failures
//! after the retry budget is spent, realtime connectivity transitions and
//! printer health. Broadcast so any number of UI surfaces can listen.

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

/// How the station is currently receiving order updates
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    /// Realtime channel connected
    Realtime,
    /// Realtime down; the periodic poll fetch is the baseline
    PollOnly,
    /// Even the poll fetch is failing
    BackendUnreachable,
}

/// A user-visible, non-fatal condition
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StationNotice {
    /// A receipt could not be printed after the full retry budget; the
    /// order itself stays valid and visible - print manually.
    PrintFailed {
        order_id: String,
        order_number: String,
        attempts: u32,
    },
    /// Update-channel connectivity changed
    Connectivity(ConnectivityState),
    /// Result of the latest printer health probe
    PrinterHealth { online: bool },
}

/// Derives the operator-facing connectivity state from both link signals
///
/// The poll and realtime adapters only report their own link here; neither
/// can claim a state on the other's behalf. A broadcast goes out only when
/// the derived state actually changes, so repeated failed ticks stay quiet.
pub struct ConnectivityTracker {
    links: Mutex<Links>,
    notice_tx: broadcast::Sender<StationNotice>,
}

struct Links {
    realtime_up: bool,
    backend_reachable: bool,
    last: Option<ConnectivityState>,
}

impl ConnectivityTracker {
    pub fn new(notice_tx: broadcast::Sender<StationNotice>) -> Self {
        Self {
            links: Mutex::new(Links {
                realtime_up: false,
                backend_reachable: true,
                last: None,
            }),
            notice_tx,
        }
    }

    /// Report the realtime channel link state
    pub fn set_realtime(&self, up: bool) {
        let mut links = self.links.lock();
        links.realtime_up = up;
        self.publish(&mut links);
    }

    /// Report the outcome of the latest poll fetch
    pub fn set_backend_reachable(&self, reachable: bool) {
        let mut links = self.links.lock();
        links.backend_reachable = reachable;
        self.publish(&mut links);
    }

    /// Current derived state
    pub fn state(&self) -> ConnectivityState {
        let links = self.links.lock();
        Self::derive(&links)
    }

    fn derive(links: &Links) -> ConnectivityState {
        if links.realtime_up {
            // Updates are flowing over the channel even if REST is degraded
            ConnectivityState::Realtime
        } else if links.backend_reachable {
            ConnectivityState::PollOnly
        } else {
            ConnectivityState::BackendUnreachable
        }
    }

    fn publish(&self, links: &mut Links) {
        let state = Self::derive(links);
        if links.last != Some(state) {
            links.last = Some(state);
            let _ = self.notice_tx.send(StationNotice::Connectivity(state));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> (ConnectivityTracker, broadcast::Receiver<StationNotice>) {
        let (notice_tx, notices) = broadcast::channel(16);
        (ConnectivityTracker::new(notice_tx), notices)
    }

    fn drain(notices: &mut broadcast::Receiver<StationNotice>) -> Vec<ConnectivityState> {
        let mut states = Vec::new();
        while let Ok(notice) = notices.try_recv() {
            if let StationNotice::Connectivity(state) = notice {
                states.push(state);
            }
        }
        states
    }

    #[tokio::test]
    async fn test_poll_failure_and_recovery() {
        let (tracker, mut notices) = tracker();

        tracker.set_backend_reachable(false);
        tracker.set_backend_reachable(false);
        tracker.set_backend_reachable(true);

        // Repeated failed ticks collapse into one transition each way.
        assert_eq!(
            drain(&mut notices),
            vec![
                ConnectivityState::BackendUnreachable,
                ConnectivityState::PollOnly,
            ]
        );
    }

    #[tokio::test]
    async fn test_realtime_masks_poll_failure() {
        let (tracker, mut notices) = tracker();

        tracker.set_realtime(true);
        tracker.set_backend_reachable(false);
        tracker.set_backend_reachable(true);

        // While the channel is up, poll blips never reach the operator.
        assert_eq!(drain(&mut notices), vec![ConnectivityState::Realtime]);
        assert_eq!(tracker.state(), ConnectivityState::Realtime);

        tracker.set_realtime(false);
        assert_eq!(drain(&mut notices), vec![ConnectivityState::PollOnly]);
    }

    #[tokio::test]
    async fn test_disconnect_with_backend_down() {
        let (tracker, mut notices) = tracker();

        tracker.set_realtime(true);
        tracker.set_backend_reachable(false);
        tracker.set_realtime(false);

        assert_eq!(
            drain(&mut notices),
            vec![
                ConnectivityState::Realtime,
                ConnectivityState::BackendUnreachable,
            ]
        );
    }
}
