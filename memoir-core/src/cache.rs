//! Per-instance cache slot store.
//!
//! Presence is tracked by the map entry, never by the value: a slot holding
//! `null`, `false` or `""` is just as populated as one holding `42`.
//!
//! The map lock is taken for a single lookup or store at a time and is
//! never held across a method body, so memoized methods may freely call
//! other memoized methods on the same instance.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::slot::SlotKey;
use crate::types::Value;

/// Cached method results for one instance.
#[derive(Debug, Default)]
pub struct InstanceCache {
    slots: Mutex<HashMap<SlotKey, Value>>,
    /// Compute locks for the per-slot sync policy, created on demand.
    guards: Mutex<HashMap<SlotKey, Arc<Mutex<()>>>>,
}

impl InstanceCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a value was stored under `key`.
    #[must_use]
    pub fn has(&self, key: &SlotKey) -> bool {
        self.slots.lock().contains_key(key)
    }

    /// The stored value, or `None` if the slot is unset.
    #[must_use]
    pub fn get(&self, key: &SlotKey) -> Option<Value> {
        self.slots.lock().get(key).cloned()
    }

    /// Store `value` under `key`. Last write wins.
    pub fn set(&self, key: SlotKey, value: Value) {
        self.slots.lock().insert(key, value);
    }

    /// Number of populated slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether no slot has been populated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Populated slot keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<SlotKey> {
        let mut keys: Vec<SlotKey> = self.slots.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// The compute lock for `key`.
    pub(crate) fn slot_guard(&self, key: &SlotKey) -> Arc<Mutex<()>> {
        Arc::clone(self.guards.lock().entry(key.clone()).or_default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
