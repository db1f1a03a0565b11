//! Throughput measurement.
//!
//! The meter holds no global state: [`ThroughputMeter::start`] hands back a
//! [`MeterStart`] that the caller threads into [`ThroughputMeter::stop`].
//!
//! The sender starts the meter before it listens for the first CONNECT, so
//! the reported figure includes the time spent waiting for a receiver.

use slidewin_shared::ELEMENT_SIZE;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock monotonic time (`Instant`).
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock for deterministic measurements.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward; saturates at `u64::MAX` nanoseconds.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .nanos
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |now| {
                Some(now.saturating_add(by))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Timestamp captured by [`ThroughputMeter::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterStart(Duration);

/// Single-shot throughput meter for a dataset of `items` elements.
pub struct ThroughputMeter<C: Clock> {
    clock: C,
    items: usize,
}

impl<C: Clock> ThroughputMeter<C> {
    pub fn new(clock: C, items: usize) -> Self {
        Self { clock, items }
    }

    pub fn start(&self) -> MeterStart {
        MeterStart(self.clock.now())
    }

    pub fn stop(&self, start: MeterStart) -> ThroughputReport {
        let elapsed = self.clock.now().saturating_sub(start.0);
        ThroughputReport::new(total_bits(self.items), elapsed)
    }
}

/// `items * size_of::<i32>() * 8`
#[inline]
pub fn total_bits(items: usize) -> f64 {
    (items * ELEMENT_SIZE * 8) as f64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputReport {
    total_bits: f64,
    elapsed: Duration,
}

impl ThroughputReport {
    pub fn new(total_bits: f64, elapsed: Duration) -> Self {
        Self {
            total_bits,
            elapsed,
        }
    }

    pub fn total_bits(&self) -> f64 {
        self.total_bits
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// `total_bits / elapsed`; infinite when nothing measurable elapsed.
    pub fn bits_per_sec(&self) -> f64 {
        self.total_bits / self.elapsed_secs()
    }
}

impl fmt::Display for ThroughputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "elapsed_time=\t{:.6} (seconds)", self.elapsed_secs())?;
        writeln!(f, "{:.6}", self.total_bits)?;
        write!(f, "throughput = {:.6} bits/sec", self.bits_per_sec())
    }
}
