//! Configuration for faultline services
//!
//! Uses HCL (HashiCorp Configuration Language) as the configuration format.
//! One file configures all four services; each process reads the sections it
//! needs. Defaults mirror the demo constants: breaker threshold 3 within a
//! 17.5 s window, 5 s call timeout, 10 concurrent handlers, cache capacity
//! 100, critical load 60 req/s.
//!
//! # HCL Example
//!
//! ```hcl
//! resilience {
//!   failure_threshold = 3
//!   failure_window_secs = 17.5
//!   call_timeout_secs = 5
//!   max_concurrent = 10
//! }
//!
//! gateway {
//!   listen = "0.0.0.0:5000"
//!   event_backends = ["http://127.0.0.1:50051"]
//!   user_backends = ["http://127.0.0.1:50052"]
//! }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration shared by all faultline services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Resilience knobs shared by every service
    #[serde(default)]
    pub resilience: ResilienceConfig,

    /// Gateway process
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Event service process
    #[serde(default)]
    pub events: EventsConfig,

    /// User service process
    #[serde(default)]
    pub users: UsersConfig,

    /// Discovery registry process
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Circuit breaker, admission, cache, and load monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Failures within the window that trip a breaker
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: usize,

    /// Sliding failure window, in (possibly fractional) seconds
    #[serde(default = "default_failure_window_secs")]
    pub failure_window_secs: f64,

    /// Per-call downstream timeout, in seconds
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Maximum concurrently admitted handler executions
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// LRU capacity of the cache-aside store
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Requests per second above which the load monitor alerts
    #[serde(default = "default_critical_load")]
    pub critical_load: f64,

    /// Load monitor wake interval, in seconds
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
}

fn default_failure_threshold() -> usize {
    3
}
fn default_failure_window_secs() -> f64 {
    17.5
}
fn default_call_timeout_secs() -> u64 {
    5
}
fn default_max_concurrent() -> usize {
    10
}
fn default_cache_capacity() -> usize {
    100
}
fn default_critical_load() -> f64 {
    60.0
}
fn default_monitor_interval_secs() -> u64 {
    1
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            failure_window_secs: default_failure_window_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            max_concurrent: default_max_concurrent(),
            cache_capacity: default_cache_capacity(),
            critical_load: default_critical_load(),
            monitor_interval_secs: default_monitor_interval_secs(),
        }
    }
}

impl ResilienceConfig {
    /// Sliding failure window as a duration.
    pub fn failure_window(&self) -> Duration {
        Duration::from_secs_f64(self.failure_window_secs)
    }

    /// Downstream call timeout as a duration.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Load monitor interval as a duration.
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }
}

/// Gateway listen address and downstream target pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_listen")]
    pub listen: String,

    /// Event service targets, used as-is when non-empty
    #[serde(default)]
    pub event_backends: Vec<String>,

    /// User service targets, used as-is when non-empty
    #[serde(default)]
    pub user_backends: Vec<String>,

    /// Registry base URL for one-shot lookup of empty backend lists
    #[serde(default)]
    pub registry_url: Option<String>,
}

fn default_gateway_listen() -> String {
    "0.0.0.0:5000".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: default_gateway_listen(),
            event_backends: vec!["http://127.0.0.1:50051".to_string()],
            user_backends: vec!["http://127.0.0.1:50052".to_string()],
            registry_url: None,
        }
    }
}

/// Event service listen address and its downstream user service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_events_listen")]
    pub listen: String,

    /// Base URL of the user service notifications are sent to
    #[serde(default = "default_user_service")]
    pub user_service: String,
}

fn default_events_listen() -> String {
    "0.0.0.0:50051".to_string()
}
fn default_user_service() -> String {
    "http://127.0.0.1:50052".to_string()
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            listen: default_events_listen(),
            user_service: default_user_service(),
        }
    }
}

/// User service listen address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersConfig {
    #[serde(default = "default_users_listen")]
    pub listen: String,
}

fn default_users_listen() -> String {
    "0.0.0.0:50052".to_string()
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            listen: default_users_listen(),
        }
    }
}

/// Registry listen address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_listen")]
    pub listen: String,
}

fn default_registry_listen() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            listen: default_registry_listen(),
        }
    }
}

impl MeshConfig {
    /// Load configuration from an HCL file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_hcl(&content)
    }

    /// Parse configuration from an HCL string.
    pub fn from_hcl(content: &str) -> Result<Self> {
        hcl::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse HCL config: {}", e)))
    }

    /// Validate the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        let r = &self.resilience;
        if r.failure_threshold == 0 {
            return Err(Error::Config("failure_threshold must be at least 1".into()));
        }
        if r.failure_window_secs <= 0.0 {
            return Err(Error::Config("failure_window_secs must be positive".into()));
        }
        if r.call_timeout_secs == 0 {
            return Err(Error::Config("call_timeout_secs must be at least 1".into()));
        }
        if r.max_concurrent == 0 {
            return Err(Error::Config("max_concurrent must be at least 1".into()));
        }
        if r.cache_capacity == 0 {
            return Err(Error::Config("cache_capacity must be at least 1".into()));
        }
        if r.monitor_interval_secs == 0 {
            return Err(Error::Config(
                "monitor_interval_secs must be at least 1".into(),
            ));
        }

        // The gateway pools must be resolvable: either static backends or a
        // registry to look them up from.
        if self.gateway.event_backends.is_empty() && self.gateway.registry_url.is_none() {
            return Err(Error::Config(
                "gateway has no event_backends and no registry_url".into(),
            ));
        }
        if self.gateway.user_backends.is_empty() && self.gateway.registry_url.is_none() {
            return Err(Error::Config(
                "gateway has no user_backends and no registry_url".into(),
            ));
        }

        Ok(())
    }
}
