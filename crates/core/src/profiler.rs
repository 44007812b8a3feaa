//! Operation profiling hook
//!
//! `Store::with_profiler` lets backends that measure themselves report
//! per-operation timings. Backends without instrumentation treat it as a
//! no-op; decorators pass it inward.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Receives one record per profiled backend operation.
pub trait Profiler: Send + Sync {
    /// Called once per operation with its name and wall-clock duration.
    fn record(&self, op: &'static str, elapsed: Duration);
}

/// A profiler that counts operations and accumulates their total duration.
#[derive(Debug, Default)]
pub struct BasicProfiler {
    operations: AtomicUsize,
    elapsed_ns: AtomicU64,
}

impl BasicProfiler {
    /// Creates a profiler with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations recorded so far.
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::Relaxed)
    }

    /// Total duration across all recorded operations.
    pub fn total_elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns.load(Ordering::Relaxed))
    }
}

impl Profiler for BasicProfiler {
    fn record(&self, _op: &'static str, elapsed: Duration) {
        self.operations.fetch_add(1, Ordering::Relaxed);
        self.elapsed_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_profiler_accumulates() {
        let profiler = BasicProfiler::new();
        profiler.record("get", Duration::from_micros(5));
        profiler.record("set", Duration::from_micros(7));
        assert_eq!(profiler.operation_count(), 2);
        assert_eq!(profiler.total_elapsed(), Duration::from_micros(12));
    }
}
