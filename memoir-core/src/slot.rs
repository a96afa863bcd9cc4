//! Slot key resolution.
//!
//! Maps `(method, prefix)` to a storage-safe slot identifier. Trailing
//! markers are spelled out as suffixes:
//!
//! ```text
//! ready        → {prefix}_ready
//! ready?       → {prefix}_ready_query
//! ready!       → {prefix}_ready_bang
//! ready_query  → {prefix}_ready_query_plain
//! ```
//!
//! Unmarked stems that already end in a reserved suffix get `_plain`
//! appended, which keeps the mapping injective for a fixed prefix.

use std::fmt;
use std::sync::Arc;

use crate::error::{MemoirError, Result};
use crate::types::{Identifier, Marker};

/// Prefix used when a declaration does not name one.
pub const DEFAULT_PREFIX: &str = "__default";

const QUERY_SUFFIX: &str = "_query";
const BANG_SUFFIX: &str = "_bang";
const PLAIN_SUFFIX: &str = "_plain";

/// A storage-safe cache slot identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey(Arc<str>);

impl SlotKey {
    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for SlotKey {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for SlotKey {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// Resolve the slot key for `method` under `prefix`.
#[must_use]
pub fn resolve(method: &Identifier, prefix: &str) -> SlotKey {
    let stem = method.stem();
    let mut key = String::with_capacity(prefix.len() + stem.len() + 8);
    key.push_str(prefix);
    key.push('_');
    key.push_str(stem);

    match method.marker() {
        Marker::Predicate => key.push_str(QUERY_SUFFIX),
        Marker::Mutating => key.push_str(BANG_SUFFIX),
        Marker::None => {
            if [QUERY_SUFFIX, BANG_SUFFIX, PLAIN_SUFFIX]
                .iter()
                .any(|s| stem.ends_with(s))
            {
                key.push_str(PLAIN_SUFFIX);
            }
        }
    }

    SlotKey(Arc::from(key))
}

/// Check that `prefix` only contains storage-safe characters.
///
/// # Errors
/// Returns [`MemoirError::InvalidArguments`] for an empty prefix or one
/// containing anything outside `[A-Za-z0-9_]`.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(MemoirError::InvalidArguments("prefix must not be empty".into()));
    }
    if let Some(bad) = prefix.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(MemoirError::InvalidArguments(format!(
            "prefix {prefix:?} contains illegal character {bad:?}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
