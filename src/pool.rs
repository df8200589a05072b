//! Target pool — least-loaded selection over equivalent downstream targets
//!
//! Each target carries its own in-flight counter and its own circuit breaker.
//! Selection picks the target with the minimum in-flight count; the count is
//! incremented under the selection lock so concurrent selectors cannot race
//! the read-then-increment. Completion is an RAII guard, so the count is
//! decremented exactly once per selection, on success and failure paths alike.
//!
//! The pool never health-checks targets: a target whose breaker is open is
//! still selectable, and the subsequent call through that breaker fails fast.
//! Load balancing and circuit breaking are independent axes.

use crate::error::{Error, Result};
use crate::resilience::CircuitBreaker;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One downstream endpoint with its in-flight count and circuit breaker.
#[derive(Debug)]
pub struct Target {
    /// Base URL of the downstream endpoint
    pub url: String,
    in_flight: AtomicUsize,
    breaker: CircuitBreaker,
}

impl Target {
    fn new(url: String, breaker: CircuitBreaker) -> Self {
        Self {
            url,
            in_flight: AtomicUsize::new(0),
            breaker,
        }
    }

    /// Current in-flight count for this target.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// The circuit breaker guarding calls to this target.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

/// RAII guard for one selection. Dropping it completes the selection and
/// decrements the target's in-flight count.
#[derive(Debug)]
pub struct TargetGuard {
    target: Arc<Target>,
}

impl TargetGuard {
    /// The selected target.
    pub fn target(&self) -> &Arc<Target> {
        &self.target
    }
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        self.target.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Pool of equivalent downstream targets with least-loaded selection.
#[derive(Debug)]
pub struct TargetPool {
    name: String,
    targets: Vec<Arc<Target>>,
    // Serializes the scan-and-increment in select(); per-target counters stay
    // atomic so guards can decrement without taking this lock.
    select_lock: Mutex<()>,
}

impl TargetPool {
    /// Build a pool with one breaker per target. Fails on an empty target
    /// list.
    pub fn new(
        name: impl Into<String>,
        urls: &[String],
        breaker_threshold: usize,
        breaker_window: Duration,
    ) -> Result<Self> {
        let name = name.into();
        if urls.is_empty() {
            return Err(Error::Config(format!("target pool '{}' has no targets", name)));
        }
        let targets = urls
            .iter()
            .map(|url| {
                Arc::new(Target::new(
                    url.clone(),
                    CircuitBreaker::new(breaker_threshold, breaker_window),
                ))
            })
            .collect();
        Ok(Self {
            name,
            targets,
            select_lock: Mutex::new(()),
        })
    }

    /// Pick the target with the minimum in-flight count and increment it.
    /// Ties break to the first target in configuration order.
    pub fn select(&self) -> TargetGuard {
        let _guard = self.select_lock.lock().unwrap();
        // min_by_key keeps the first of equal elements, so ties are stable.
        let target = self
            .targets
            .iter()
            .min_by_key(|t| t.in_flight())
            .expect("pool is never empty")
            .clone();
        target.in_flight.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            pool = self.name,
            target = target.url,
            in_flight = target.in_flight(),
            "target selected"
        );
        TargetGuard { target }
    }

    /// Pool name (for logging).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All targets, in configuration order.
    pub fn targets(&self) -> &[Arc<Target>] {
        &self.targets
    }

    /// Number of targets in the pool.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the pool is empty (never true for a constructed pool).
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Total in-flight count across all targets.
    pub fn total_in_flight(&self) -> usize {
        self.targets.iter().map(|t| t.in_flight()).sum()
    }
}
