//! Discovery registry — flat name → address-list lookup table
//!
//! Services register addresses under a name; the gateway can look a name up
//! once at startup to populate its target pools. No health checking, no
//! expiry — a deliberately minimal directory.

use crate::api::StatusResponse;
use crate::server::{json_response, text_response, AppResponse, HttpApp};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-process service directory.
#[derive(Debug, Default)]
pub struct ServiceDirectory {
    services: RwLock<HashMap<String, Vec<String>>>,
}

impl ServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `address` under `name`. Duplicate registrations are kept.
    pub fn register(&self, name: &str, address: &str) {
        let mut services = self.services.write().unwrap();
        services
            .entry(name.to_string())
            .or_default()
            .push(address.to_string());
        tracing::info!(name, address, "service registered");
    }

    /// All addresses registered under `name`, in registration order.
    pub fn lookup(&self, name: &str) -> Option<Vec<String>> {
        self.services.read().unwrap().get(name).cloned()
    }

    /// Number of distinct registered names.
    pub fn len(&self) -> usize {
        self.services.read().unwrap().len()
    }

    /// Whether no service has registered yet.
    pub fn is_empty(&self) -> bool {
        self.services.read().unwrap().is_empty()
    }
}

/// HTTP surface of the registry service.
#[derive(Debug, Default)]
pub struct RegistryApp {
    directory: ServiceDirectory,
}

impl RegistryApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directory(&self) -> &ServiceDirectory {
        &self.directory
    }
}

#[async_trait]
impl HttpApp for RegistryApp {
    async fn handle(
        &self,
        method: http::Method,
        path: &str,
        query: Option<&str>,
        _body: Bytes,
    ) -> AppResponse {
        match (method.as_str(), path) {
            ("GET", "/register") => {
                let params = crate::server::parse_query(query);
                match (params.get("name"), params.get("address")) {
                    (Some(name), Some(address))
                        if !name.is_empty() && !address.is_empty() =>
                    {
                        self.directory.register(name, address);
                        text_response(200, "Registered")
                    }
                    _ => text_response(400, "Missing name or address"),
                }
            }
            ("GET", "/get") => {
                let params = crate::server::parse_query(query);
                match params.get("name").filter(|n| !n.is_empty()) {
                    Some(name) => match self.directory.lookup(name) {
                        Some(addresses) => json_response(200, &addresses),
                        None => text_response(404, "Service not found"),
                    },
                    None => text_response(400, "Missing name"),
                }
            }
            ("GET", "/status") => json_response(
                200,
                &StatusResponse {
                    status: "Service Discovery is running".to_string(),
                },
            ),
            _ => text_response(404, "Not found"),
        }
    }

    fn name(&self) -> &str {
        "registry"
    }
}
