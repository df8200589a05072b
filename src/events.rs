//! Event service — create, update, and list event records
//!
//! Every handler takes an admission permit before doing work and counts the
//! request toward the shared load sample. Listing goes through the
//! cache-aside store; creation sends a best-effort notification to the user
//! service through this service's circuit breaker.
//!
//! Creates and updates do not invalidate the list cache. A freshly created
//! event may be missing from listings until the cached entry is evicted —
//! a known staleness window accepted for this read-mostly path.

use crate::api::{
    CreateEventRequest, CreateEventResponse, ListEventsResponse, StatusResponse,
    UpdateEventRequest, UpdateEventResponse,
};
use crate::cache::AsideCache;
use crate::config::ResilienceConfig;
use crate::error::Result;
use crate::notify::Notifier;
use crate::resilience::{AdmissionGate, CircuitBreaker, LoadSample};
use crate::server::{error_response, json_response, text_response, AppResponse, HttpApp};
use crate::store::{EventRecord, EventStore};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Cache key for the full event listing.
const LIST_CACHE_KEY: &str = "events";

/// The event-record service.
pub struct EventService {
    gate: AdmissionGate,
    store: Arc<dyn EventStore>,
    cache: AsideCache<Vec<EventRecord>>,
    breaker: CircuitBreaker,
    notifier: Arc<dyn Notifier>,
    load: Arc<LoadSample>,
}

impl EventService {
    pub fn new(
        resilience: &ResilienceConfig,
        store: Arc<dyn EventStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gate: AdmissionGate::new(resilience.max_concurrent),
            store,
            cache: AsideCache::new(resilience.cache_capacity),
            breaker: CircuitBreaker::new(
                resilience.failure_threshold,
                resilience.failure_window(),
            ),
            notifier,
            load: Arc::new(LoadSample::new()),
        }
    }

    /// The load sample handlers increment — share it with a [`LoadMonitor`]
    /// (crate::resilience::LoadMonitor).
    pub fn load_sample(&self) -> Arc<LoadSample> {
        self.load.clone()
    }

    /// Circuit breaker guarding the notification path (exposed for tests and
    /// status surfaces).
    pub fn notification_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Insert an event. Storage failure fails the whole request; notification
    /// failure is logged and swallowed.
    pub async fn create_event(&self, req: CreateEventRequest) -> Result<CreateEventResponse> {
        let _permit = self.gate.acquire().await;
        self.load.record();

        let id = self
            .store
            .insert(&req.title, &req.description, &req.date)
            .await?;
        tracing::info!(id, title = req.title, "event created");

        let message = format!("Event Created: {}", req.title);
        let send = self
            .breaker
            .execute(|| self.notifier.send("1", &message))
            .await;
        if let Err(e) = send {
            tracing::warn!(error = %e, id, "failed to send notification");
        }

        Ok(CreateEventResponse { id: id.to_string() })
    }

    /// Update an event row. Success is false when the id does not exist.
    pub async fn update_event(&self, req: UpdateEventRequest) -> Result<UpdateEventResponse> {
        let _permit = self.gate.acquire().await;
        self.load.record();

        let success = self
            .store
            .update(req.id, &req.title, &req.description, &req.date)
            .await?;
        if success {
            tracing::info!(id = req.id, "event updated");
        } else {
            tracing::debug!(id = req.id, "update matched no row");
        }
        Ok(UpdateEventResponse { success })
    }

    /// List all events, cache-aside: serve the cached listing when present,
    /// otherwise query the store and populate the cache.
    pub async fn list_events(&self) -> Result<ListEventsResponse> {
        let _permit = self.gate.acquire().await;
        self.load.record();

        if let Some(events) = self.cache.get(LIST_CACHE_KEY) {
            tracing::debug!(count = events.len(), "event listing served from cache");
            return Ok(ListEventsResponse { events });
        }

        let events = self.store.list_all().await?;
        self.cache.put(LIST_CACHE_KEY, events.clone());
        Ok(ListEventsResponse { events })
    }

    /// Health probe — not gated, not counted.
    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            status: "EventService is running".to_string(),
        }
    }
}

#[async_trait]
impl HttpApp for EventService {
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
            ("POST", "/events/update") => {
                let req: UpdateEventRequest = match serde_json::from_slice(&body) {
                    Ok(req) => req,
                    Err(e) => return error_response(400, &format!("invalid request: {}", e)),
                };
                match self.update_event(req).await {
                    Ok(resp) => json_response(200, &resp),
                    Err(e) => error_response(500, &e.to_string()),
                }
            }
            ("GET", "/events") => match self.list_events().await {
                Ok(resp) => json_response(200, &resp),
                Err(e) => error_response(500, &e.to_string()),
            },
            ("GET", "/status") => json_response(200, &self.status()),
            _ => text_response(404, "Not found"),
        }
    }

    fn name(&self) -> &str {
        "events"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResilienceConfig;
    use crate::error::Error;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Notifier that fails a configurable number of times, counting calls.
    struct ScriptedNotifier {
        calls: AtomicUsize,
        failures: usize,
    }

    impl ScriptedNotifier {
        fn failing(failures: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Notifier for ScriptedNotifier {
        async fn send(&self, _user_id: &str, _message: &str) -> Result<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(Error::UpstreamTimeout(5000))
            } else {
                Ok(())
            }
        }
    }

    /// Store whose every statement fails.
    struct BrokenStore;

    #[async_trait]
    impl EventStore for BrokenStore {
        async fn insert(&self, _title: &str, _description: &str, _date: &str) -> Result<i64> {
            Err(Error::Storage("insert failed: table is locked".into()))
        }

        async fn update(
            &self,
            _id: i64,
            _title: &str,
            _description: &str,
            _date: &str,
        ) -> Result<bool> {
            Err(Error::Storage("update failed: table is locked".into()))
        }

        async fn list_all(&self) -> Result<Vec<EventRecord>> {
            Err(Error::Storage("query failed: table is locked".into()))
        }
    }

    fn resilience() -> ResilienceConfig {
        ResilienceConfig::default()
    }

    fn service(
        store: Arc<MemoryStore>,
        notifier: Arc<ScriptedNotifier>,
    ) -> EventService {
        EventService::new(&resilience(), store, notifier)
    }

    fn create_req(title: &str) -> CreateEventRequest {
        CreateEventRequest {
            title: title.to_string(),
            description: "desc".to_string(),
            date: "2024-06-01".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_returns_generated_id() {
        let svc = service(
            Arc::new(MemoryStore::new()),
            Arc::new(ScriptedNotifier::failing(0)),
        );
        let resp = svc.create_event(create_req("launch")).await.unwrap();
        assert_eq!(resp.id, "1");
        let resp = svc.create_event(create_req("retro")).await.unwrap();
        assert_eq!(resp.id, "2");
    }

    #[tokio::test]
    async fn test_storage_failure_fails_create_without_notifying() {
        let notifier = Arc::new(ScriptedNotifier::failing(0));
        let svc = EventService::new(&resilience(), Arc::new(BrokenStore), notifier.clone());

        let result = svc.create_event(create_req("launch")).await;
        assert!(matches!(result, Err(Error::Storage(_))));
        // The request died in the store; no notification was attempted.
        assert_eq!(notifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_fails_update_and_list() {
        let svc = EventService::new(
            &resilience(),
            Arc::new(BrokenStore),
            Arc::new(ScriptedNotifier::failing(0)),
        );

        let result = svc
            .update_event(UpdateEventRequest {
                id: 1,
                title: "a".to_string(),
                description: "b".to_string(),
                date: "c".to_string(),
            })
            .await;
        assert!(matches!(result, Err(Error::Storage(_))));

        let result = svc.list_events().await;
        assert!(matches!(result, Err(Error::Storage(_))));
    }

    #[tokio::test]
    async fn test_http_create_storage_failure_returns_500() {
        let svc = EventService::new(
            &resilience(),
            Arc::new(BrokenStore),
            Arc::new(ScriptedNotifier::failing(0)),
        );
        let body = serde_json::to_vec(&create_req("launch")).unwrap();
        let resp = svc
            .handle(
                http::Method::POST,
                "/events/create",
                None,
                Bytes::from(body),
            )
            .await;
        assert_eq!(resp.status(), 500);

        let resp = svc
            .handle(http::Method::GET, "/events", None, Bytes::new())
            .await;
        assert_eq!(resp.status(), 500);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_create() {
        let notifier = Arc::new(ScriptedNotifier::failing(usize::MAX));
        let svc = service(Arc::new(MemoryStore::new()), notifier.clone());

        let resp = svc.create_event(create_req("launch")).await.unwrap();
        assert_eq!(resp.id, "1");
        assert_eq!(notifier.calls(), 1);
    }

    // End-to-end scenario: threshold 3, window 17.5s. Three notification
    // failures trip the breaker; the fourth create fails fast with
    // CircuitOpen and never reaches the notifier — yet every create still
    // returns a success response with a valid generated id.
    #[tokio::test]
    async fn test_breaker_trips_after_three_notification_failures() {
        let notifier = Arc::new(ScriptedNotifier::failing(usize::MAX));
        let svc = service(Arc::new(MemoryStore::new()), notifier.clone());

        for i in 1..=3 {
            let resp = svc.create_event(create_req("ev")).await.unwrap();
            assert_eq!(resp.id, i.to_string());
        }
        assert!(svc.notification_breaker().is_open());
        assert_eq!(notifier.calls(), 3);

        // Fourth call inside the window: fail-fast, notifier untouched.
        let resp = svc.create_event(create_req("ev")).await.unwrap();
        assert_eq!(resp.id, "4");
        assert_eq!(notifier.calls(), 3);
    }

    #[tokio::test]
    async fn test_breaker_resets_history_on_success() {
        let notifier = Arc::new(ScriptedNotifier::failing(2));
        let svc = service(Arc::new(MemoryStore::new()), notifier.clone());

        // Two failures, then a success: history cleared, breaker closed.
        for _ in 0..3 {
            svc.create_event(create_req("ev")).await.unwrap();
        }
        assert!(!svc.notification_breaker().is_open());
        assert_eq!(svc.notification_breaker().failure_count(), 0);
    }

    #[tokio::test]
    async fn test_list_events_cache_hit_skips_store() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone(), Arc::new(ScriptedNotifier::failing(0)));

        svc.create_event(create_req("a")).await.unwrap();

        let first = svc.list_events().await.unwrap();
        assert_eq!(first.events.len(), 1);
        assert_eq!(store.read_count(), 1);

        // Second listing is served from cache without re-querying.
        let second = svc.list_events().await.unwrap();
        assert_eq!(second.events, first.events);
        assert_eq!(store.read_count(), 1);
    }

    // Known staleness window: creation does not invalidate the cached
    // listing, so a new event is invisible until eviction.
    #[tokio::test]
    async fn test_create_does_not_invalidate_list_cache() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone(), Arc::new(ScriptedNotifier::failing(0)));

        svc.create_event(create_req("a")).await.unwrap();
        svc.list_events().await.unwrap();

        svc.create_event(create_req("b")).await.unwrap();
        let stale = svc.list_events().await.unwrap();
        assert_eq!(stale.events.len(), 1);
        assert_eq!(store.read_count(), 1);
    }

    #[tokio::test]
    async fn test_update_success_and_missing() {
        let svc = service(
            Arc::new(MemoryStore::new()),
            Arc::new(ScriptedNotifier::failing(0)),
        );
        svc.create_event(create_req("a")).await.unwrap();

        let ok = svc
            .update_event(UpdateEventRequest {
                id: 1,
                title: "a2".to_string(),
                description: "changed".to_string(),
                date: "2024-07-01".to_string(),
            })
            .await
            .unwrap();
        assert!(ok.success);

        let missing = svc
            .update_event(UpdateEventRequest {
                id: 42,
                title: "x".to_string(),
                description: "x".to_string(),
                date: "x".to_string(),
            })
            .await
            .unwrap();
        assert!(!missing.success);
    }

    #[tokio::test]
    async fn test_status_fixed_ack() {
        let svc = service(
            Arc::new(MemoryStore::new()),
            Arc::new(ScriptedNotifier::failing(0)),
        );
        assert_eq!(svc.status().status, "EventService is running");
        // Status is not counted toward load.
        assert_eq!(svc.load_sample().count(), 0);
    }

    #[tokio::test]
    async fn test_handlers_count_toward_load() {
        let svc = service(
            Arc::new(MemoryStore::new()),
            Arc::new(ScriptedNotifier::failing(0)),
        );
        svc.create_event(create_req("a")).await.unwrap();
        svc.list_events().await.unwrap();
        assert_eq!(svc.load_sample().count(), 2);
    }

    #[tokio::test]
    async fn test_http_create_invalid_body() {
        let svc = service(
            Arc::new(MemoryStore::new()),
            Arc::new(ScriptedNotifier::failing(0)),
        );
        let resp = svc
            .handle(
                http::Method::POST,
                "/events/create",
                None,
                Bytes::from_static(b"not json"),
            )
            .await;
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn test_http_routes() {
        let svc = service(
            Arc::new(MemoryStore::new()),
            Arc::new(ScriptedNotifier::failing(0)),
        );
        let body = serde_json::to_vec(&create_req("a")).unwrap();
        let resp = svc
            .handle(
                http::Method::POST,
                "/events/create",
                None,
                Bytes::from(body),
            )
            .await;
        assert_eq!(resp.status(), 200);

        let resp = svc
            .handle(http::Method::GET, "/events", None, Bytes::new())
            .await;
        assert_eq!(resp.status(), 200);

        let resp = svc
            .handle(http::Method::GET, "/nope", None, Bytes::new())
            .await;
        assert_eq!(resp.status(), 404);
    }
}
