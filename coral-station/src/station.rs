//! Station - composition root for the order workstation core
//!
//! Wires the store, the print dispatcher, the effects gate and the three
//! source adapters together, and owns their background task lifecycle. The
//! UI layer talks only to this type.

use crate::adapters::{
    EventPipeline, NotificationPushAdapter, PollFetchAdapter, RealtimePushAdapter,
    RealtimeTransport,
};
use crate::backend::{BackendClient, BackendError, StatusUpdateResponse};
use crate::config::Config;
use crate::effects::{FeedbackSink, NotificationEffectsGate};
use crate::notice::{ConnectivityTracker, StationNotice};
use crate::printing::PrintDispatcher;
use crate::store::{ReconciliationStore, StoreUpdate};
use crate::tasks::{BackgroundTasks, TaskKind};
use anyhow::Context;
use coral_printer::{HttpPrinterEndpoint, PrinterHealth};
use shared::order::{EventSource, OrderEvent, OrderRecord, OrderStatus};
use shared::settings::NotificationSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

/// Notice channel capacity (UI subscribers)
const NOTICE_CHANNEL_CAPACITY: usize = 256;

pub struct Station {
    config: Config,
    backend: Arc<BackendClient>,
    store: Arc<ReconciliationStore>,
    dispatcher: Arc<PrintDispatcher>,
    pipeline: Arc<EventPipeline>,
    push: NotificationPushAdapter,
    connectivity: Arc<ConnectivityTracker>,
    settings_tx: watch::Sender<NotificationSettings>,
    notice_tx: broadcast::Sender<StationNotice>,
    tasks: BackgroundTasks,
}

impl Station {
    /// Build the full core from config
    ///
    /// The feedback sink is injected because sound and haptics are platform
    /// concerns; everything else is constructed here.
    pub fn new(config: Config, feedback: Arc<dyn FeedbackSink>) -> anyhow::Result<Self> {
        let tasks = BackgroundTasks::new();
        let (notice_tx, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        let (settings_tx, settings_rx) = watch::channel(NotificationSettings::default());

        let backend = Arc::new(BackendClient::new(
            &config.backend_url,
            Duration::from_millis(config.request_timeout_ms),
        ));

        let endpoint = Arc::new(
            HttpPrinterEndpoint::new(&config.printer_url)
                .context("Invalid printer configuration")?
                .with_timeouts(
                    Duration::from_millis(config.print_timeout_ms),
                    Duration::from_millis(config.health_timeout_ms),
                ),
        );
        let dispatcher = Arc::new(PrintDispatcher::new(
            endpoint,
            notice_tx.clone(),
            tasks.shutdown_token(),
        ));

        let store = Arc::new(ReconciliationStore::new());
        let gate = Arc::new(NotificationEffectsGate::new(
            settings_rx,
            feedback,
            Arc::clone(&dispatcher),
        ));
        let pipeline = Arc::new(EventPipeline::new(Arc::clone(&store), gate));
        let push = NotificationPushAdapter::new(Arc::clone(&backend), Arc::clone(&pipeline));
        let connectivity = Arc::new(ConnectivityTracker::new(notice_tx.clone()));

        Ok(Self {
            config,
            backend,
            store,
            dispatcher,
            pipeline,
            push,
            connectivity,
            settings_tx,
            notice_tx,
            tasks,
        })
    }

    /// Start the poll loop, the queue sweeper and the printer health probe
    pub fn start(&mut self) {
        info!(
            backend = %self.config.backend_url,
            printer = %self.config.printer_url,
            restaurant = %self.config.restaurant_id,
            "Station starting"
        );

        let poll = PollFetchAdapter::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.pipeline),
            Duration::from_millis(self.config.poll_interval_ms),
            Arc::clone(&self.connectivity),
        );
        let poll_shutdown = self.tasks.shutdown_token();
        self.tasks.spawn("poll_loop", TaskKind::Periodic, async move {
            poll.run(poll_shutdown).await;
        });

        let dispatcher = Arc::clone(&self.dispatcher);
        let sweep_interval = Duration::from_millis(self.config.queue_sweep_interval_ms);
        self.tasks
            .spawn("queue_sweeper", TaskKind::Periodic, async move {
                dispatcher.run_sweeper(sweep_interval).await;
            });

        let dispatcher = Arc::clone(&self.dispatcher);
        let notice_tx = self.notice_tx.clone();
        let probe_interval = Duration::from_millis(self.config.printer_health_interval_ms);
        let probe_shutdown = self.tasks.shutdown_token();
        self.tasks
            .spawn("printer_health", TaskKind::Periodic, async move {
                let mut ticker = tokio::time::interval(probe_interval);
                let mut last_online: Option<bool> = None;
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = probe_shutdown.cancelled() => return,
                    }
                    let online = dispatcher.health().await == PrinterHealth::Online;
                    if last_online != Some(online) {
                        if online {
                            info!("Printer online");
                        } else {
                            warn!("Printer offline");
                        }
                        let _ = notice_tx.send(StationNotice::PrinterHealth { online });
                        last_online = Some(online);
                    }
                }
            });
    }

    /// Attach a realtime transport and start listening
    pub fn attach_realtime<T: RealtimeTransport + 'static>(&mut self, transport: T) {
        let adapter = RealtimePushAdapter::new(
            Arc::clone(&self.pipeline),
            self.config.realtime_channel(),
            Arc::clone(&self.connectivity),
        );
        let shutdown = self.tasks.shutdown_token();
        self.tasks
            .spawn("realtime_listener", TaskKind::Listener, async move {
                adapter.run(transport, shutdown).await;
            });
    }

    /// Feed a raw push notification payload into the core
    pub async fn handle_push(&self, raw: serde_json::Value) {
        if let Err(e) = self.push.handle(raw).await {
            warn!(error = %e, "Push payload dropped");
        }
    }

    /// Submit a status change on behalf of the UI
    ///
    /// The change is applied optimistically first so the UI reflects it
    /// immediately, then the backend response is merged back as the
    /// authoritative truth. If the request fails, the optimistic state stands
    /// until the next poll cycle corrects it.
    pub async fn submit_status_change(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<StatusUpdateResponse, BackendError> {
        if let Err(e) = self.store.apply_optimistic(order_id, status) {
            warn!(order_id = %order_id, error = %e, "Optimistic apply rejected");
        }

        let response = self.backend.update_status(order_id, status).await?;

        self.pipeline
            .deliver(OrderEvent::status_changed(
                EventSource::Local,
                response.order_id.clone(),
                response.status,
                response.timestamp,
            ))
            .await;

        Ok(response)
    }

    /// Replace the notification settings snapshot
    pub fn update_settings(&self, settings: NotificationSettings) {
        let _ = self.settings_tx.send(settings);
    }

    /// Read-only view of the active order set
    pub fn snapshot(&self) -> Vec<OrderRecord> {
        self.store.snapshot()
    }

    pub fn get_order(&self, order_id: &str) -> Option<OrderRecord> {
        self.store.get(order_id)
    }

    /// Subscribe to order read-model updates
    pub fn subscribe_updates(&self) -> broadcast::Receiver<StoreUpdate> {
        self.store.subscribe()
    }

    /// Subscribe to print failures, connectivity and printer health notices
    pub fn subscribe_notices(&self) -> broadcast::Receiver<StationNotice> {
        self.notice_tx.subscribe()
    }

    /// Set the backend bearer token
    pub fn set_token(&self, token: impl Into<String>) {
        self.backend.set_token(token);
    }

    /// Graceful shutdown of all background tasks
    pub async fn shutdown(self) {
        info!("Station shutting down");
        self.tasks.shutdown().await;
    }
}
