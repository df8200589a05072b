//! Admission gate — bounds concurrently executing handler work
//!
//! A fixed number of permits caps in-flight handler executions per process.
//! Excess work waits; nothing is dropped. Permits are RAII guards, so release
//! happens on every exit path of the guarded handler, including errors.

use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// RAII permit returned by [`AdmissionGate::acquire`]. Dropping it returns the
/// slot to the gate.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

/// Bounded-concurrency gate backed by a semaphore.
#[derive(Debug)]
pub struct AdmissionGate {
    max_permits: usize,
    semaphore: Arc<Semaphore>,
}

impl AdmissionGate {
    /// Create a gate admitting at most `max_permits` concurrent executions.
    pub fn new(max_permits: usize) -> Self {
        let max_permits = max_permits.max(1);
        Self {
            max_permits,
            semaphore: Arc::new(Semaphore::new(max_permits)),
        }
    }

    /// Wait until a permit is available. Never fails, only delays.
    pub async fn acquire(&self) -> AdmissionPermit {
        // The semaphore is never closed, so acquisition cannot fail.
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("admission gate semaphore closed");
        AdmissionPermit { _permit: permit }
    }

    /// Take a permit without waiting, or None if the gate is at capacity.
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => Some(AdmissionPermit { _permit: permit }),
            Err(TryAcquireError::NoPermits) => None,
            Err(TryAcquireError::Closed) => None,
        }
    }

    /// Wait for a permit with a bounded wait, failing with
    /// [`Error::AdmissionTimeout`] if none frees up in time.
    pub async fn acquire_timeout(&self, wait: Duration) -> Result<AdmissionPermit> {
        tokio::time::timeout(wait, self.acquire())
            .await
            .map_err(|_| Error::AdmissionTimeout(wait.as_millis() as u64))
    }

    /// Number of permits not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Number of permits currently held.
    pub fn in_flight(&self) -> usize {
        self.max_permits - self.semaphore.available_permits()
    }

    /// Configured maximum concurrency.
    pub fn max_permits(&self) -> usize {
        self.max_permits
    }
}
