//! The memoizing interception stage.
//!
//! A [`MemoizedMethod`] sits in front of one method. On a populated slot it
//! answers directly and the rest of the chain never runs. Otherwise it
//! delegates, stores a successful result and returns it. Errors pass
//! through untouched and leave the slot unset, so the next call retries.

use std::sync::Arc;

use tracing::trace;

use crate::cache::InstanceCache;
use crate::config::SyncPolicy;
use crate::error::Result;
use crate::object::{Instance, Interceptor, Next};
use crate::slot::{SlotKey, resolve};
use crate::stats::MemoStats;
use crate::types::{Identifier, Value};

/// Caches the result of one nullary method per instance.
#[derive(Debug, Clone)]
pub struct MemoizedMethod {
    method: Identifier,
    key: SlotKey,
    policy: SyncPolicy,
    trace_hits: bool,
    stats: Arc<MemoStats>,
}

/// Build the memoizing stage for `method` under `prefix`.
#[must_use]
pub fn wrap(method: &Identifier, prefix: &str) -> MemoizedMethod {
    MemoizedMethod {
        method: method.clone(),
        key: resolve(method, prefix),
        policy: SyncPolicy::Racy,
        trace_hits: false,
        stats: Arc::new(MemoStats::new()),
    }
}

impl MemoizedMethod {
    /// Use `policy` for first computations.
    #[must_use]
    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Record into shared counters.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<MemoStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Emit `trace!` events on hits and misses.
    #[must_use]
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.trace_hits = enabled;
        self
    }

    /// The wrapped method.
    #[must_use]
    pub fn method(&self) -> &Identifier {
        &self.method
    }

    /// The slot this stage reads and writes.
    #[must_use]
    pub fn key(&self) -> &SlotKey {
        &self.key
    }

    fn cached(&self, cache: &InstanceCache) -> Option<Value> {
        let value = cache.get(&self.key)?;
        self.stats.record_hit();
        if self.trace_hits {
            trace!(method = %self.method, slot = %self.key, "memo hit");
        }
        Some(value)
    }

    fn compute(&self, receiver: &Instance, next: Next<'_>) -> Result<Value> {
        self.stats.record_miss();
        if self.trace_hits {
            trace!(method = %self.method, slot = %self.key, "memo miss");
        }
        match next.call(receiver) {
            Ok(value) => {
                receiver.cache().set(self.key.clone(), value.clone());
                Ok(value)
            }
            Err(err) => {
                self.stats.record_failure();
                Err(err)
            }
        }
    }
}

impl Interceptor for MemoizedMethod {
    fn call(&self, receiver: &Instance, next: Next<'_>) -> Result<Value> {
        if let Some(value) = self.cached(receiver.cache()) {
            return Ok(value);
        }
        match self.policy {
            SyncPolicy::Racy => self.compute(receiver, next),
            SyncPolicy::PerSlot => {
                let guard = receiver.cache().slot_guard(&self.key);
                let _held = guard.lock();
                if let Some(value) = self.cached(receiver.cache()) {
                    return Ok(value);
                }
                self.compute(receiver, next)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
