//! Backend REST client
//!
//! Three calls feed the core: the active-orders list (poll baseline), a
//! single-order fetch (push hydration) and the status PATCH whose response
//! feeds optimistic reconciliation. All responses arrive in the standard
//! `ApiResponse` envelope.

use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use shared::order::{OrderRecord, OrderStatus};
use shared::response::ApiResponse;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Backend client errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Network(e.to_string())
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Authoritative result of a status PATCH
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateResponse {
    pub order_id: String,
    pub status: OrderStatus,
    /// Server timestamp (unix milliseconds)
    pub timestamp: i64,
}

/// REST client for the order backend
///
/// Cheap to clone; the token is shared across clones so a login after
/// startup reaches every adapter holding a handle.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl BackendClient {
    /// Create a client with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the bearer token (session management lives outside the core)
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    fn auth_header(&self) -> Option<String> {
        self.token.read().as_ref().map(|t| format!("Bearer {}", t))
    }

    /// Fetch the full active-order list
    pub async fn fetch_active_orders(&self) -> BackendResult<Vec<OrderRecord>> {
        self.get("/api/orders/active").await
    }

    /// Fetch a single order by id (push payloads carry only the id)
    pub async fn fetch_order(&self, order_id: &str) -> BackendResult<OrderRecord> {
        self.get(&format!("/api/orders/{}", order_id)).await
    }

    /// Submit a status change; the response is authoritative
    pub async fn update_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> BackendResult<StatusUpdateResponse> {
        #[derive(serde::Serialize)]
        struct StatusUpdateRequest {
            status: OrderStatus,
        }

        self.patch(
            &format!("/api/orders/{}/status", order_id),
            &StatusUpdateRequest { status },
        )
        .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> BackendResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.get(&url);

        if let Some(auth) = self.auth_header() {
            req = req.header(reqwest::header::AUTHORIZATION, auth);
        }

        let resp = req.send().await?;
        Self::handle_response(resp).await
    }

    async fn patch<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> BackendResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.patch(&url).json(body);

        if let Some(auth) = self.auth_header() {
            req = req.header(reqwest::header::AUTHORIZATION, auth);
        }

        let resp = req.send().await?;
        Self::handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> BackendResult<T> {
        let status = resp.status();

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return match status {
                StatusCode::UNAUTHORIZED => Err(BackendError::Unauthorized),
                StatusCode::NOT_FOUND => Err(BackendError::NotFound(text)),
                _ => Err(BackendError::Api {
                    code: status.as_u16().to_string(),
                    message: text,
                }),
            };
        }

        let envelope: ApiResponse<T> = resp
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        if !envelope.is_success() {
            return Err(BackendError::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }

        envelope
            .data
            .ok_or_else(|| BackendError::InvalidResponse("Missing response data".into()))
    }
}
