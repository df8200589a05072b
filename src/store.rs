//! Event record store — persistence seam for the event service
//!
//! The event service talks to storage through the [`EventStore`] trait so
//! tests can substitute instrumented or failing stores. [`MemoryStore`] is
//! the in-process implementation: rows behind one mutex, serialized per
//! statement (coarse-grained, not a performance-critical path here).

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// One stored event row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: String,
}

/// Persistent record store interface.
///
/// Failures surface as [`Error::Storage`](crate::error::Error::Storage) and
/// fail the whole request they occur in.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert a row and return its generated id.
    async fn insert(&self, title: &str, description: &str, date: &str) -> Result<i64>;

    /// Update a row by id. Returns false if no such row exists.
    async fn update(&self, id: i64, title: &str, description: &str, date: &str) -> Result<bool>;

    /// All rows in insertion order.
    async fn list_all(&self) -> Result<Vec<EventRecord>>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    rows: Vec<EventRecord>,
    next_id: i64,
}

/// In-memory event store with auto-increment ids starting at 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    /// Number of list_all queries actually served (cache-hit instrumentation).
    reads: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times list_all has hit the store.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert(&self, title: &str, description: &str, date: &str) -> Result<i64> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.push(EventRecord {
            id,
            title: title.to_string(),
            description: description.to_string(),
            date: date.to_string(),
        });
        Ok(id)
    }

    async fn update(&self, id: i64, title: &str, description: &str, date: &str) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner.rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                row.title = title.to_string();
                row.description = description.to_string();
                row.date = date.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_all(&self) -> Result<Vec<EventRecord>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.inner.lock().unwrap().rows.clone())
    }
}
