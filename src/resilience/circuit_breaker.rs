//! Circuit breaker — stops calling a failing downstream once failures pile up
//!
//! Tracks failure timestamps in a sliding time window. When the number of
//! failures inside the window reaches the threshold, the breaker trips to the
//! open state and every subsequent call fails fast with
//! [`Error::CircuitOpen`](crate::error::Error::CircuitOpen) without touching
//! the downstream.
//!
//! Once open, the breaker stays open for the life of the process unless
//! [`reset`](CircuitBreaker::reset) is called explicitly — there is no
//! half-open probe state. A success while still closed clears the failure
//! history entirely.

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Internal mutable state, guarded by one mutex per breaker instance.
#[derive(Debug)]
struct BreakerState {
    /// Timestamps of recent failures, oldest first. Pruned to the window on
    /// every failure observation, so it never grows past `threshold` entries.
    failures: VecDeque<Instant>,
    open: bool,
}

/// Sliding-window circuit breaker guarding a single downstream call path.
///
/// Distinct breakers (distinct targets) are fully independent; clone the
/// surrounding `Arc`, not the breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: usize,
    window: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a closed breaker that trips after `threshold` failures within
    /// `window`.
    pub fn new(threshold: usize, window: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            window,
            state: Mutex::new(BreakerState {
                failures: VecDeque::new(),
                open: false,
            }),
        }
    }

    /// Whether the breaker is currently open (failing fast).
    pub fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }

    /// Number of failures currently inside the window.
    pub fn failure_count(&self) -> usize {
        self.state.lock().unwrap().failures.len()
    }

    /// Close the breaker and clear the failure history. This is the only way
    /// back from the open state.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.open = false;
        state.failures.clear();
    }

    /// Run `op` under the breaker.
    ///
    /// Fails fast with [`Error::CircuitOpen`] when open, without invoking
    /// `op`. Otherwise awaits `op` with no lock held, then records the
    /// outcome: success clears the failure history, failure is timestamped,
    /// pruned to the window, and trips the breaker at the threshold. The
    /// original error is propagated to the caller after bookkeeping.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.check()?;

        // The downstream call runs outside the exclusive section — the lock
        // only covers local state transitions.
        match op().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(err)
            }
        }
    }

    /// Fail fast if the breaker is open.
    fn check(&self) -> Result<()> {
        if self.state.lock().unwrap().open {
            Err(Error::CircuitOpen)
        } else {
            Ok(())
        }
    }

    /// Record a successful call — clears the failure history.
    fn record_success(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    /// Record a failed call. Returns true if this failure tripped the breaker.
    fn record_failure(&self) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap();

        state.failures.push_back(now);
        if let Some(horizon) = now.checked_sub(self.window) {
            while let Some(&oldest) = state.failures.front() {
                if oldest < horizon {
                    state.failures.pop_front();
                } else {
                    break;
                }
            }
        }

        if !state.open && state.failures.len() >= self.threshold {
            state.open = true;
            tracing::warn!(
                failures = state.failures.len(),
                window_secs = self.window.as_secs_f64(),
                "circuit breaker tripped"
            );
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn breaker(threshold: usize, window_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(threshold, Duration::from_millis(window_ms))
    }

    async fn fail(cb: &CircuitBreaker) -> Result<()> {
        cb.execute(|| async { Err::<(), _>(Error::Other("boom".into())) })
            .await
            .map(|_| ())
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<u32> {
        cb.execute(|| async { Ok(7) }).await
    }

    #[tokio::test]
    async fn test_starts_closed() {
        let cb = breaker(3, 1000);
        assert!(!cb.is_open());
        assert_eq!(succeed(&cb).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_trips_on_nth_failure() {
        let cb = breaker(3, 10_000);
        for _ in 0..2 {
            assert!(fail(&cb).await.is_err());
            assert!(!cb.is_open());
        }
        assert!(fail(&cb).await.is_err());
        assert!(cb.is_open());
    }

    #[tokio::test]
    async fn test_open_fails_fast_without_invoking_operation() {
        let cb = breaker(2, 10_000);
        fail(&cb).await.ok();
        fail(&cb).await.ok();
        assert!(cb.is_open());

        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let result = cb
            .execute(|| async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(Error::CircuitOpen)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_clears_failure_history() {
        let cb = breaker(3, 10_000);
        fail(&cb).await.ok();
        fail(&cb).await.ok();
        assert_eq!(cb.failure_count(), 2);

        succeed(&cb).await.unwrap();
        assert_eq!(cb.failure_count(), 0);

        // Two more failures do not trip a threshold-3 breaker.
        fail(&cb).await.ok();
        fail(&cb).await.ok();
        assert!(!cb.is_open());
    }

    #[tokio::test]
    async fn test_window_prunes_old_failures() {
        let cb = breaker(3, 50);
        fail(&cb).await.ok();
        fail(&cb).await.ok();

        tokio::time::sleep(Duration::from_millis(80)).await;

        // The two earlier failures fell out of the window, so this third
        // failure does not trip the breaker.
        fail(&cb).await.ok();
        assert!(!cb.is_open());
        assert_eq!(cb.failure_count(), 1);
    }

    #[tokio::test]
    async fn test_no_autonomous_recovery() {
        let cb = breaker(1, 10);
        fail(&cb).await.ok();
        assert!(cb.is_open());

        // Waiting past the window does not close an open breaker.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cb.is_open());
        assert!(matches!(succeed(&cb).await, Err(Error::CircuitOpen)));
    }

    #[tokio::test]
    async fn test_explicit_reset_closes() {
        let cb = breaker(1, 10_000);
        fail(&cb).await.ok();
        assert!(cb.is_open());

        cb.reset();
        assert!(!cb.is_open());
        assert_eq!(cb.failure_count(), 0);
        assert_eq!(succeed(&cb).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_original_error_is_propagated() {
        let cb = breaker(5, 10_000);
        let result = cb
            .execute(|| async { Err::<(), _>(Error::UpstreamTimeout(5000)) })
            .await;
        assert!(matches!(result, Err(Error::UpstreamTimeout(5000))));
        assert_eq!(cb.failure_count(), 1);
    }

    #[tokio::test]
    async fn test_breakers_are_independent() {
        let a = breaker(1, 10_000);
        let b = breaker(1, 10_000);
        fail(&a).await.ok();
        assert!(a.is_open());
        assert!(!b.is_open());
        assert!(succeed(&b).await.is_ok());
    }
}
