//! Gateway — routes inbound requests to the least-loaded downstream instance
//!
//! Owns one target pool per downstream service type (events, users), built
//! once at startup from static configuration or a one-shot registry lookup.
//! Each forwarded call runs through the selected target's circuit breaker
//! with an explicit timeout; the selection guard drops on every path, so the
//! in-flight count is always released.

use crate::api::{CreateEventRequest, CreateEventResponse, NotifyRequest, NotifyResponse, StatusResponse};
use crate::config::{GatewayConfig, ResilienceConfig};
use crate::error::{Error, Result};
use crate::pool::{Target, TargetPool};
use crate::server::{error_response, json_response, text_response, AppResponse, HttpApp};
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// The gateway process.
pub struct GatewayApp {
    events: TargetPool,
    users: TargetPool,
    client: reqwest::Client,
    timeout: Duration,
}

impl GatewayApp {
    /// Build the gateway from explicit target lists.
    pub fn new(
        resilience: &ResilienceConfig,
        event_backends: &[String],
        user_backends: &[String],
    ) -> Result<Self> {
        let timeout = resilience.call_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            events: TargetPool::new(
                "events",
                event_backends,
                resilience.failure_threshold,
                resilience.failure_window(),
            )?,
            users: TargetPool::new(
                "users",
                user_backends,
                resilience.failure_threshold,
                resilience.failure_window(),
            )?,
            client,
            timeout,
        })
    }

    /// Build the gateway from config, resolving empty backend lists through
    /// the registry (one-shot lookup at startup; pools never refresh).
    pub async fn from_config(
        resilience: &ResilienceConfig,
        gateway: &GatewayConfig,
    ) -> Result<Self> {
        let mut event_backends = gateway.event_backends.clone();
        let mut user_backends = gateway.user_backends.clone();

        if let Some(registry_url) = &gateway.registry_url {
            if event_backends.is_empty() {
                event_backends = resolve_backends(registry_url, "event_service").await?;
            }
            if user_backends.is_empty() {
                user_backends = resolve_backends(registry_url, "user_service").await?;
            }
        }

        Self::new(resilience, &event_backends, &user_backends)
    }

    /// Event target pool (exposed for tests).
    pub fn event_pool(&self) -> &TargetPool {
        &self.events
    }

    /// User target pool (exposed for tests).
    pub fn user_pool(&self) -> &TargetPool {
        &self.users
    }

    /// Forward an event-creation request to the least-loaded event target.
    pub async fn create_event(&self, req: CreateEventRequest) -> Result<CreateEventResponse> {
        let guard = self.events.select();
        let target = guard.target().clone();
        // The guard lives until this function returns, releasing the
        // selector slot on success and failure alike.
        target
            .breaker()
            .execute(|| self.forward(&target, "/events/create", &req))
            .await
    }

    /// Forward a notification to the least-loaded user target.
    pub async fn notify(&self, req: NotifyRequest) -> Result<NotifyResponse> {
        let guard = self.users.select();
        let target = guard.target().clone();
        target
            .breaker()
            .execute(|| self.forward(&target, "/notify", &req))
            .await
    }

    /// Health probe.
    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            status: "Gateway is running".to_string(),
        }
    }

    /// POST `body` to `path` on `target` and decode the JSON response.
    async fn forward<Req, Resp>(&self, target: &Arc<Target>, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", target.url.trim_end_matches('/'), path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::UpstreamTimeout(self.timeout.as_millis() as u64)
                } else if e.is_connect() {
                    Error::ServiceUnavailable(format!(
                        "cannot connect to backend {}: {}",
                        target.url, e
                    ))
                } else {
                    Error::Http(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(Error::Other(format!(
                "backend {} returned status {}",
                target.url,
                response.status()
            )));
        }

        response.json::<Resp>().await.map_err(Error::Http)
    }
}

/// One-shot registry lookup of the address list registered under `name`.
async fn resolve_backends(registry_url: &str, name: &str) -> Result<Vec<String>> {
    let url = format!("{}/get?name={}", registry_url.trim_end_matches('/'), name);
    let addresses: Vec<String> = reqwest::get(&url)
        .await
        .map_err(Error::Http)?
        .error_for_status()
        .map_err(|e| Error::Config(format!("registry lookup for '{}' failed: {}", name, e)))?
        .json()
        .await
        .map_err(Error::Http)?;

    // Registered addresses may be bare host:port; pools expect URLs.
    let backends = addresses
        .into_iter()
        .map(|addr| {
            if addr.starts_with("http://") || addr.starts_with("https://") {
                addr
            } else {
                format!("http://{}", addr)
            }
        })
        .collect();
    Ok(backends)
}

#[async_trait]
impl HttpApp for GatewayApp {
    async fn handle(
        &self,
        method: http::Method,
        path: &str,
        _query: Option<&str>,
        body: Bytes,
    ) -> AppResponse {
        match (method.as_str(), path) {
            ("POST", "/events/create") => {
                let req: CreateEventRequest = match serde_json::from_slice(&body) {
                    Ok(req) => req,
                    Err(e) => return error_response(400, &format!("invalid request: {}", e)),
                };
                match self.create_event(req).await {
                    Ok(resp) => json_response(200, &resp),
                    Err(e) => error_response(500, &e.to_string()),
                }
            }
            ("POST", "/notify") => {
                let req: NotifyRequest = match serde_json::from_slice(&body) {
                    Ok(req) => req,
                    Err(e) => return error_response(400, &format!("invalid request: {}", e)),
                };
                match self.notify(req).await {
                    Ok(resp) => json_response(200, &resp),
                    Err(e) => error_response(500, &e.to_string()),
                }
            }
            ("GET", "/status") => json_response(200, &self.status()),
            _ => text_response(404, "Not found"),
        }
    }

    fn name(&self) -> &str {
        "gateway"
    }
}
