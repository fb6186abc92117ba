//! Printer endpoint adapters
//!
//! The physical printer sits behind a bridge exposing a request/response
//! `print` call and a `health` call. Anything below that (ESC/POS, driver
//! spooling) is the bridge's problem.

use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::OrderRecord;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Default timeout for a print attempt
const PRINT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default timeout for a health probe
const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// Printer reachability as seen by the last probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterHealth {
    Online,
    Offline,
}

/// Trait for printer endpoints
#[async_trait]
pub trait PrinterEndpoint: Send + Sync {
    /// Deliver one receipt to the printer
    async fn print(&self, order: &OrderRecord) -> PrintResult<()>;

    /// Check whether the printer is reachable
    async fn health(&self) -> PrinterHealth;
}

// ============================================================================
// HTTP bridge
// ============================================================================

/// Bridge response for a print request
#[derive(Debug, Deserialize)]
struct PrintResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Bridge response for a health request
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Outgoing print request body
#[derive(Debug, Serialize)]
struct PrintRequest<'a> {
    order: &'a OrderRecord,
}

/// HTTP print bridge
///
/// Posts the order snapshot to `{base_url}/print` and probes
/// `{base_url}/health`. A timeout is indistinguishable from a network
/// failure - both are retryable to the caller.
#[derive(Debug, Clone)]
pub struct HttpPrinterEndpoint {
    client: reqwest::Client,
    base_url: String,
    print_timeout: Duration,
    health_timeout: Duration,
}

impl HttpPrinterEndpoint {
    /// Create a bridge client for the given base URL
    pub fn new(base_url: &str) -> PrintResult<Self> {
        if base_url.is_empty() {
            return Err(PrintError::InvalidConfig("empty printer URL".to_string()));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| PrintError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            print_timeout: PRINT_TIMEOUT,
            health_timeout: HEALTH_TIMEOUT,
        })
    }

    /// Override the per-attempt timeouts (tests use short ones)
    pub fn with_timeouts(mut self, print_timeout: Duration, health_timeout: Duration) -> Self {
        self.print_timeout = print_timeout;
        self.health_timeout = health_timeout;
        self
    }

    /// Get the bridge base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PrinterEndpoint for HttpPrinterEndpoint {
    #[instrument(skip(self, order), fields(order_id = %order.id, order_number = %order.order_number))]
    async fn print(&self, order: &OrderRecord) -> PrintResult<()> {
        let url = format!("{}/print", self.base_url);
        let body = PrintRequest { order };

        let resp = self
            .client
            .post(&url)
            .timeout(self.print_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PrintError::Timeout(format!("print request: {}", e))
                } else {
                    PrintError::Connection(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(PrintError::Rejected(format!(
                "bridge returned HTTP {}",
                resp.status()
            )));
        }

        let result: PrintResponse = resp
            .json()
            .await
            .map_err(|e| PrintError::Rejected(format!("invalid bridge response: {}", e)))?;

        if !result.success {
            return Err(PrintError::Rejected(
                result.error.unwrap_or_else(|| "unspecified".to_string()),
            ));
        }

        info!("Print job delivered");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn health(&self) -> PrinterHealth {
        let url = format!("{}/health", self.base_url);

        let resp = self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => match r.json::<HealthResponse>().await {
                Ok(h) if h.status == "ok" => {
                    info!("Printer online");
                    PrinterHealth::Online
                }
                Ok(h) => {
                    warn!(status = %h.status, "Printer reported degraded status");
                    PrinterHealth::Offline
                }
                Err(e) => {
                    warn!(error = %e, "Invalid health response");
                    PrinterHealth::Offline
                }
            },
            Ok(r) => {
                warn!(status = %r.status(), "Printer health check failed");
                PrinterHealth::Offline
            }
            Err(e) => {
                warn!(error = %e, "Printer unreachable");
                PrinterHealth::Offline
            }
        }
    }
}
