use std::sync::atomic::{AtomicU64, Ordering};

/// Stand-in for the Prometheus registry the teacher wires into its server
/// binary: a handful of `AtomicU64` counters covering the compile cache's
/// hit/miss path.
#[derive(Default)]
pub struct EngineMetrics {
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub compiles: AtomicU64,
    pub runs: AtomicU64,
}

impl EngineMetrics {
    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compile(&self) {
        self.compiles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            compiles: self.compiles.load(Ordering::Relaxed),
            runs: self.runs.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub compiles: u64,
    pub runs: u64,
}
