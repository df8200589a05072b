//! Load monitor — approximate request-rate observation with alerting
//!
//! Handlers bump a shared counter once per admitted request. A background
//! task samples the counter against elapsed wall time on a fixed interval and
//! logs an alert when throughput exceeds the configured critical rate, then
//! resets the window. Lossy by design: requests landing across a window
//! boundary may be attributed to either window.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Shared request counter plus the start of the current observation window.
/// Count and window start are always read and reset together.
#[derive(Debug)]
pub struct LoadSample {
    inner: Mutex<SampleWindow>,
}

#[derive(Debug)]
struct SampleWindow {
    count: u64,
    started: Instant,
}

impl LoadSample {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SampleWindow {
                count: 0,
                started: Instant::now(),
            }),
        }
    }

    /// Count one admitted request.
    pub fn record(&self) {
        self.inner.lock().unwrap().count += 1;
    }

    /// Current count without resetting (for status surfaces and tests).
    pub fn count(&self) -> u64 {
        self.inner.lock().unwrap().count
    }

    /// Atomically read the window and reset it: returns the request count and
    /// the elapsed time since the window started.
    pub fn take(&self) -> (u64, Duration) {
        let mut window = self.inner.lock().unwrap();
        let elapsed = window.started.elapsed();
        let count = window.count;
        window.count = 0;
        window.started = Instant::now();
        (count, elapsed)
    }
}

impl Default for LoadSample {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic observer of a [`LoadSample`].
///
/// Alerts are a side effect (a warn-level log line plus an internal counter);
/// they never interrupt request handling.
pub struct LoadMonitor {
    service: String,
    sample: Arc<LoadSample>,
    critical_rate: f64,
    interval: Duration,
    alerts: AtomicU64,
}

impl LoadMonitor {
    pub fn new(
        service: impl Into<String>,
        sample: Arc<LoadSample>,
        critical_rate: f64,
        interval: Duration,
    ) -> Self {
        Self {
            service: service.into(),
            sample,
            critical_rate,
            interval,
            alerts: AtomicU64::new(0),
        }
    }

    /// Number of alerts raised so far.
    pub fn alerts(&self) -> u64 {
        self.alerts.load(Ordering::Relaxed)
    }

    /// One observation: compute the rate over the elapsed window, alert if it
    /// exceeds the critical rate, and reset the window either way.
    pub fn tick(&self) {
        let (count, elapsed) = self.sample.take();
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return;
        }
        let rate = count as f64 / secs;
        if rate > self.critical_rate {
            self.alerts.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                service = self.service,
                rate = format!("{:.1}", rate),
                critical = self.critical_rate,
                "ALERT: high load detected"
            );
        }
    }

    /// Run the monitor as a long-lived background task.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            // The first tick completes immediately; skip it so the first
            // observed window spans a full interval.
            interval.tick().await;
            loop {
                interval.tick().await;
                self.tick();
            }
        })
    }
}
