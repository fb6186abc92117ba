//! Notification effects gate
//!
//! Pure policy: given a freshly admitted order and the current settings
//! snapshot, decide independently whether to play the operator feedback
//! (sound/vibration) and whether to enqueue a receipt print. The two sides
//! are isolated - a failing feedback engine never stops the print path and
//! a full print queue never mutes the chime.

use crate::printing::PrintDispatcher;
use async_trait::async_trait;
use shared::{NotificationSettings, OrderRecord};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Feedback engine errors (platform audio/haptics can and do fail)
#[derive(Debug, Error)]
#[error("feedback failed: {0}")]
pub struct FeedbackError(pub String);

/// Operator feedback surface, supplied by the UI layer
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    /// Play the new-order chime
    async fn play_new_order_sound(&self) -> Result<(), FeedbackError>;

    /// Trigger the new-order vibration
    async fn vibrate(&self) -> Result<(), FeedbackError>;
}

/// Policy layer between admitted orders and their side effects
pub struct NotificationEffectsGate {
    settings: watch::Receiver<NotificationSettings>,
    feedback: Arc<dyn FeedbackSink>,
    dispatcher: Arc<PrintDispatcher>,
}

impl NotificationEffectsGate {
    pub fn new(
        settings: watch::Receiver<NotificationSettings>,
        feedback: Arc<dyn FeedbackSink>,
        dispatcher: Arc<PrintDispatcher>,
    ) -> Self {
        Self {
            settings,
            feedback,
            dispatcher,
        }
    }

    /// Run the side effects for one newly admitted order
    ///
    /// Settings are read once per event; flipping a switch takes effect on
    /// the next event and never cancels jobs already queued.
    pub async fn on_order_admitted(&self, order: &OrderRecord) {
        let settings = *self.settings.borrow();

        if settings.sound_enabled {
            if let Err(e) = self.feedback.play_new_order_sound().await {
                tracing::warn!(order_id = %order.id, error = %e, "New-order sound failed");
            }
        }
        if settings.vibration_enabled {
            if let Err(e) = self.feedback.vibrate().await {
                tracing::warn!(order_id = %order.id, error = %e, "New-order vibration failed");
            }
        }
        if settings.auto_print_enabled {
            self.dispatcher.enqueue(order);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::StationNotice;
    use coral_printer::{PrintError, PrintResult, PrinterEndpoint, PrinterHealth};
    use parking_lot::Mutex;
    use shared::order::OrderStatus;
    use shared::util::now_millis;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::broadcast;
    use tokio_util::sync::CancellationToken;

    struct CountingFeedback {
        sounds: AtomicUsize,
        vibrations: AtomicUsize,
        fail_sound: bool,
    }

    #[async_trait]
    impl FeedbackSink for CountingFeedback {
        async fn play_new_order_sound(&self) -> Result<(), FeedbackError> {
            self.sounds.fetch_add(1, Ordering::SeqCst);
            if self.fail_sound {
                return Err(FeedbackError("speaker busy".to_string()));
            }
            Ok(())
        }

        async fn vibrate(&self) -> Result<(), FeedbackError> {
            self.vibrations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RecordingPrinter {
        printed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PrinterEndpoint for RecordingPrinter {
        async fn print(&self, order: &OrderRecord) -> PrintResult<()> {
            self.printed.lock().push(order.id.clone());
            Ok(())
        }

        async fn health(&self) -> PrinterHealth {
            PrinterHealth::Online
        }
    }

    struct DeadPrinter;

    #[async_trait]
    impl PrinterEndpoint for DeadPrinter {
        async fn print(&self, _order: &OrderRecord) -> PrintResult<()> {
            Err(PrintError::Connection("no route".to_string()))
        }

        async fn health(&self) -> PrinterHealth {
            PrinterHealth::Offline
        }
    }

    fn make_order(id: &str) -> OrderRecord {
        OrderRecord {
            id: id.to_string(),
            order_number: format!("N-{id}"),
            table_number: None,
            items: vec![],
            status: OrderStatus::Received,
            created_at: now_millis(),
            status_history: vec![],
            subtotal: 0.0,
            tax: 0.0,
            tip: None,
            total: 0.0,
        }
    }

    fn gate_with(
        settings: NotificationSettings,
        feedback: Arc<CountingFeedback>,
        endpoint: Arc<dyn PrinterEndpoint>,
    ) -> (
        NotificationEffectsGate,
        broadcast::Receiver<StationNotice>,
        watch::Sender<NotificationSettings>,
    ) {
        let (settings_tx, rx) = watch::channel(settings);
        let (notice_tx, notices) = broadcast::channel(16);
        let dispatcher = Arc::new(
            PrintDispatcher::new(endpoint, notice_tx, CancellationToken::new())
                .with_backoff(std::time::Duration::from_millis(10)),
        );
        (
            NotificationEffectsGate::new(rx, feedback, dispatcher),
            notices,
            settings_tx,
        )
    }

    #[tokio::test]
    async fn test_sound_without_auto_print() {
        let feedback = Arc::new(CountingFeedback {
            sounds: AtomicUsize::new(0),
            vibrations: AtomicUsize::new(0),
            fail_sound: false,
        });
        let printer = Arc::new(RecordingPrinter {
            printed: Mutex::new(Vec::new()),
        });
        let settings = NotificationSettings {
            auto_print_enabled: false,
            sound_enabled: true,
            vibration_enabled: false,
        };
        let (gate, _notices, _settings_tx) = gate_with(settings, feedback.clone(), printer.clone());

        gate.on_order_admitted(&make_order("o1")).await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(feedback.sounds.load(Ordering::SeqCst), 1);
        assert_eq!(feedback.vibrations.load(Ordering::SeqCst), 0);
        assert!(printer.printed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_feedback_failure_does_not_block_print() {
        let feedback = Arc::new(CountingFeedback {
            sounds: AtomicUsize::new(0),
            vibrations: AtomicUsize::new(0),
            fail_sound: true,
        });
        let printer = Arc::new(RecordingPrinter {
            printed: Mutex::new(Vec::new()),
        });
        let (gate, _notices, _settings_tx) =
            gate_with(NotificationSettings::default(), feedback.clone(), printer.clone());

        gate.on_order_admitted(&make_order("o1")).await;
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        assert_eq!(feedback.sounds.load(Ordering::SeqCst), 1);
        assert_eq!(printer.printed.lock().clone(), vec!["o1"]);
    }

    #[tokio::test]
    async fn test_print_failure_does_not_suppress_feedback() {
        let feedback = Arc::new(CountingFeedback {
            sounds: AtomicUsize::new(0),
            vibrations: AtomicUsize::new(0),
            fail_sound: false,
        });
        let (gate, _notices, _settings_tx) =
            gate_with(NotificationSettings::default(), feedback.clone(), Arc::new(DeadPrinter));

        gate.on_order_admitted(&make_order("o1")).await;

        assert_eq!(feedback.sounds.load(Ordering::SeqCst), 1);
        assert_eq!(feedback.vibrations.load(Ordering::SeqCst), 1);
    }
}
