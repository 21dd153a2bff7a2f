//! Clock and timing utilities for frame pacing.
//!
//! The render loop never touches wall-clock time directly. It asks a
//! [`Clock`] for elapsed time and suspends through it, which lets tests
//! swap in a [`VirtualClock`] and check duration math and frame counts
//! without waiting in real time.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of elapsed time and cooperative suspension.
#[async_trait::async_trait]
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Time elapsed since the clock's epoch.
    fn elapsed(&self) -> Duration;

    /// Suspend the caller for `duration`, yielding to the runtime.
    async fn sleep(&self, duration: Duration);

    /// Seconds elapsed since the clock's epoch.
    fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

/// Monotonic clock backed by [`Instant`] and `tokio::time::sleep`.
#[derive(Debug, Clone)]
pub struct SystemClock {
    /// The instant the clock started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl SystemClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Wall-clock time at clock start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

#[async_trait::async_trait]
impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic clock whose time only moves when someone sleeps on it.
///
/// Every `sleep` still yields once so background tasks (encoder readers,
/// narration dispatch) get a turn, matching the cooperative model of the
/// real clock.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Mutex<Duration>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without suspending.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += duration;
    }
}

#[async_trait::async_trait]
impl Clock for VirtualClock {
    fn elapsed(&self) -> Duration {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

/// Interval between frames at the given rate.
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(fps.max(1)))
}

/// Convert seconds to nanoseconds.
pub fn secs_to_ns(secs: f64) -> u64 {
    (secs * 1_000_000_000.0) as u64
}

/// Drift between a planned timeline position and the observed one.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Planned timestamp (ns).
    pub reference_ns: u64,
    /// Observed timestamp (ns).
    pub measured_ns: u64,
}

impl DriftMeasurement {
    /// Drift in nanoseconds (positive = observed is late).
    pub fn drift_ns(&self) -> i64 {
        self.measured_ns as i64 - self.reference_ns as i64
    }

    /// Drift in milliseconds.
    pub fn drift_ms(&self) -> f64 {
        self.drift_ns() as f64 / 1_000_000.0
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds_threshold_ms(&self, threshold_ms: f64) -> bool {
        self.drift_ms().abs() > threshold_ms
    }
}
