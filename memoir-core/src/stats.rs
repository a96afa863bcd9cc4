//! Cache hit/miss instrumentation.
//!
//! Each `memoize` declaration owns one [`MemoStats`], shared by all of its
//! wrappers across all instances. Counters are lock-free `AtomicU64`s
//! incremented on the call path and read on export.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for one augmentation.
#[derive(Debug)]
pub struct MemoStats {
    /// Calls answered from a populated slot.
    pub hits: AtomicU64,
    /// Calls that ran the rest of the chain.
    pub misses: AtomicU64,
    /// Misses whose body returned an error (slot left unset).
    pub failures: AtomicU64,
}

impl MemoStats {
    /// Zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for MemoStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Cache hits.
    pub hits: u64,
    /// Cache misses.
    pub misses: u64,
    /// Failed computations.
    pub failures: u64,
}

impl StatsSnapshot {
    /// Fraction of calls served from cache, `0.0` when nothing was called.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Format as Prometheus-compatible text, labelled with `type_name`.
    #[must_use]
    pub fn to_prometheus(&self, type_name: &str) -> String {
        format!(
            "# HELP memoir_cache_hits_total Memoized calls answered from cache\n\
             # TYPE memoir_cache_hits_total counter\n\
             memoir_cache_hits_total{{type=\"{type_name}\"}} {}\n\
             # HELP memoir_cache_misses_total Memoized calls that ran the body\n\
             # TYPE memoir_cache_misses_total counter\n\
             memoir_cache_misses_total{{type=\"{type_name}\"}} {}\n\
             # HELP memoir_body_failures_total Memoized bodies that returned an error\n\
             # TYPE memoir_body_failures_total counter\n\
             memoir_body_failures_total{{type=\"{type_name}\"}} {}\n",
            self.hits, self.misses, self.failures,
        )
    }
}

// ---------------------------------------------------------------------------
// Tracing Span Names
// ---------------------------------------------------------------------------

/// Span names used with `tracing::span!`.
pub mod spans {
    /// A `memoize` declaration being applied.
    pub const AUGMENT: &str = "memoir::augment";
    /// Instance construction, initializer and eager hooks included.
    pub const CONSTRUCT: &str = "memoir::construct";
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
