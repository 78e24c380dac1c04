//! Latency telemetry for the matching hot path.
//!
//! `LatencyStats` is four lock-free counters written by the matching worker
//! and readable from any thread. `Clock` wraps a raw monotonic time source
//! with nanosecond conversion.

use std::sync::atomic::{AtomicU64, Ordering};

/// Running latency counters.
///
/// `record` costs four atomic operations: relaxed adds for count/sum and
/// compare-and-swap loops for min/max. Readers load each counter
/// independently and may observe a torn pair (an updated count with a
/// pre-update sum); the numbers are diagnostics, not a linearizable
/// snapshot.
pub struct LatencyStats {
    count: AtomicU64,
    sum_nanos: AtomicU64,
    min_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl LatencyStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_nanos: AtomicU64::new(0),
            min_nanos: AtomicU64::new(u64::MAX),
            max_nanos: AtomicU64::new(0),
        }
    }

    /// Record one latency sample in nanoseconds.
    #[inline]
    pub fn record(&self, nanos: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_nanos.fetch_add(nanos, Ordering::Relaxed);

        let mut current = self.min_nanos.load(Ordering::Relaxed);
        while nanos < current {
            match self.min_nanos.compare_exchange_weak(
                current,
                nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        let mut current = self.max_nanos.load(Ordering::Relaxed);
        while nanos > current {
            match self.max_nanos.compare_exchange_weak(
                current,
                nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    /// Number of samples recorded.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of all samples in nanoseconds.
    #[inline]
    pub fn sum_nanos(&self) -> u64 {
        self.sum_nanos.load(Ordering::Relaxed)
    }

    /// Smallest sample seen, or 0 before any sample.
    #[inline]
    pub fn min_nanos(&self) -> u64 {
        let min = self.min_nanos.load(Ordering::Relaxed);
        if min == u64::MAX {
            0
        } else {
            min
        }
    }

    /// Largest sample seen, or 0 before any sample.
    #[inline]
    pub fn max_nanos(&self) -> u64 {
        self.max_nanos.load(Ordering::Relaxed)
    }

    /// Mean latency in microseconds, or 0.0 before any sample.
    pub fn average_micros(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        self.sum_nanos() as f64 / count as f64 / 1_000.0
    }

    /// Smallest sample in microseconds.
    pub fn min_micros(&self) -> f64 {
        self.min_nanos() as f64 / 1_000.0
    }

    /// Largest sample in microseconds.
    pub fn max_micros(&self) -> f64 {
        self.max_nanos() as f64 / 1_000.0
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic clock for hot-path timestamping.
///
/// Raw captures are cheap; conversion to nanoseconds happens off the
/// critical path. All instances created by `clone` share one calibration.
#[derive(Clone)]
pub struct Clock {
    inner: quanta::Clock,
    origin: u64,
}

impl Clock {
    /// Create a calibrated clock.
    pub fn new() -> Self {
        let inner = quanta::Clock::new();
        let origin = inner.raw();
        Self { inner, origin }
    }

    /// Raw monotonic timestamp (arbitrary unit, monotone non-decreasing).
    #[inline(always)]
    pub fn raw(&self) -> u64 {
        self.inner.raw()
    }

    /// Nanoseconds between two raw captures.
    #[inline(always)]
    pub fn delta_nanos(&self, start: u64, end: u64) -> u64 {
        self.inner.delta_as_nanos(start, end)
    }

    /// Nanoseconds since this clock (family) was created.
    #[inline(always)]
    pub fn now_nanos(&self) -> u64 {
        self.inner.delta_as_nanos(self.origin, self.inner.raw())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a nanosecond value with a readable unit.
pub fn format_nanos(nanos: u64) -> String {
    if nanos < 1_000 {
        format!("{} ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2} µs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2} ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2} s", nanos as f64 / 1_000_000_000.0)
    }
}
