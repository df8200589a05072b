//! Notification client — best-effort downstream call to the user service
//!
//! Invoked through the event service's circuit breaker; every failure here,
//! including a timeout, counts against that breaker. The event service logs
//! failures and carries on — notification is an explicit best-effort side
//! channel and never fails the primary operation.

use crate::api::{NotifyRequest, NotifyResponse};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Seam for sending a notification to a user.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message` to `user_id`, bounded by the client's timeout.
    async fn send(&self, user_id: &str, message: &str) -> Result<()>;
}

/// HTTP notifier posting to the user service's /notify endpoint.
pub struct HttpNotifier {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpNotifier {
    /// Create a notifier for the user service at `base_url`, with a per-call
    /// timeout. Fails if the HTTP client cannot be constructed, rather than
    /// falling back to a client without the deadline.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Http)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    /// Base URL this notifier posts to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, user_id: &str, message: &str) -> Result<()> {
        let url = format!("{}/notify", self.base_url.trim_end_matches('/'));
        let request = NotifyRequest {
            user_id: user_id.to_string(),
            message: message.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::UpstreamTimeout(self.timeout.as_millis() as u64)
                } else if e.is_connect() {
                    Error::ServiceUnavailable(format!(
                        "cannot reach user service {}: {}",
                        self.base_url, e
                    ))
                } else {
                    Error::Http(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(Error::Other(format!(
                "notification rejected with status {}",
                response.status()
            )));
        }

        let ack: NotifyResponse = response.json().await.map_err(Error::Http)?;
        if !ack.success {
            return Err(Error::Other("notification not acknowledged".to_string()));
        }
        Ok(())
    }
}
