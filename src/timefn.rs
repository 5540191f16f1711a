//! Monotonic high-resolution timer used by the benchmark mode.
//!
//! `std::time::Instant` is monotonic and thread-safe on every supported
//! platform, so the abstraction is thin: capture a timestamp, measure a
//! nanosecond span.

use std::time::Instant;

/// Nanosecond duration.
pub type DurationNs = u64;

/// Opaque timestamp; only spans between two timestamps are meaningful.
#[derive(Clone, Copy)]
pub struct TimePoint {
    t: Instant,
}

/// Current monotonic timestamp.
pub fn get_time() -> TimePoint {
    TimePoint { t: Instant::now() }
}

/// Nanoseconds elapsed since `start`.
pub fn clock_span_ns(start: TimePoint) -> DurationNs {
    start.t.elapsed().as_nanos() as DurationNs
}

/// Throughput in MB/s given a byte count and a span.
pub fn rate_mb_per_s(bytes: usize, span_ns: DurationNs) -> f64 {
    if span_ns == 0 {
        return f64::INFINITY;
    }
    bytes as f64 * 1_000.0 / span_ns as f64
}
