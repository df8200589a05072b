//! User service — notification sink with its own admission gate and load
//! sample
//!
//! Deliveries are logged rather than pushed anywhere; this is the downstream
//! the gateway and event service exercise their breakers against.

use crate::api::{NotifyRequest, NotifyResponse, StatusResponse};
use crate::config::ResilienceConfig;
use crate::resilience::{AdmissionGate, LoadSample};
use crate::server::{error_response, json_response, text_response, AppResponse, HttpApp};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// The user/notification service.
pub struct UserService {
    gate: AdmissionGate,
    load: Arc<LoadSample>,
}

impl UserService {
    pub fn new(resilience: &ResilienceConfig) -> Self {
        Self {
            gate: AdmissionGate::new(resilience.max_concurrent),
            load: Arc::new(LoadSample::new()),
        }
    }

    /// The load sample handlers increment.
    pub fn load_sample(&self) -> Arc<LoadSample> {
        self.load.clone()
    }

    /// Deliver a notification (logged) and acknowledge it.
    pub async fn send_notification(&self, req: NotifyRequest) -> NotifyResponse {
        let _permit = self.gate.acquire().await;
        self.load.record();

        tracing::info!(
            user_id = req.user_id,
            message = req.message,
            "notification delivered"
        );
        NotifyResponse { success: true }
    }

    /// Health probe — not gated, not counted.
    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            status: "UserService is running".to_string(),
        }
    }
}

#[async_trait]
impl HttpApp for UserService {
    async fn handle(
        &self,
        method: http::Method,
        path: &str,
        _query: Option<&str>,
        body: Bytes,
    ) -> AppResponse {
        match (method.as_str(), path) {
            ("POST", "/notify") => {
                let req: NotifyRequest = match serde_json::from_slice(&body) {
                    Ok(req) => req,
                    Err(e) => return error_response(400, &format!("invalid request: {}", e)),
                };
                json_response(200, &self.send_notification(req).await)
            }
            ("GET", "/status") => json_response(200, &self.status()),
            _ => text_response(404, "Not found"),
        }
    }

    fn name(&self) -> &str {
        "users"
    }
}
