//! Core type definitions for the memoir object model.
//!
//! Descriptors are immutable once captured and serializable so that a
//! type's augmentations can be dumped for inspection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{MemoirError, Result};

/// The dynamic value produced by every method.
///
/// `Null`, `false`, `0`, `""` and empty collections are ordinary results;
/// nothing in the cache treats them as "not yet computed".
pub type Value = serde_json::Value;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Trailing marker character on a method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marker {
    /// Plain name, no marker.
    None,
    /// Ends in `?` (boolean-ish query).
    Predicate,
    /// Ends in `!` (mutating / dangerous).
    Mutating,
}

/// A validated method name.
///
/// Grammar: `[A-Za-z_][A-Za-z0-9_]*` followed by at most one `?` or `!`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(Arc<str>);

impl Identifier {
    /// Parse and validate a method name.
    ///
    /// # Errors
    /// Returns [`MemoirError::InvalidIdentifier`] if `name` is not a legal method name.
    pub fn parse(name: &str) -> Result<Self> {
        let stem = name.strip_suffix(['?', '!']).unwrap_or(name);
        let mut chars = stem.chars();
        let head_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !head_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(MemoirError::InvalidIdentifier(name.to_string()));
        }
        Ok(Self(Arc::from(name)))
    }

    /// The full name, marker included.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Which trailing marker the name carries.
    #[must_use]
    pub fn marker(&self) -> Marker {
        match self.0.as_bytes().last() {
            Some(b'?') => Marker::Predicate,
            Some(b'!') => Marker::Mutating,
            _ => Marker::None,
        }
    }

    /// The name with any trailing marker removed.
    #[must_use]
    pub fn stem(&self) -> &str {
        match self.marker() {
            Marker::None => &self.0,
            Marker::Predicate | Marker::Mutating => &self.0[..self.0.len() - 1],
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = MemoirError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0.to_string()
    }
}

impl std::borrow::Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Who may call a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Callable from anywhere.
    #[default]
    Public,
    /// Callable from instances of the owning type or its descendants.
    Protected,
    /// Callable only by the instance itself.
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Protected => write!(f, "protected"),
            Self::Private => write!(f, "private"),
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// A method name together with its visibility at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Method name.
    pub name: Identifier,
    /// Visibility when captured.
    pub visibility: Visibility,
}

/// When memoized methods are first evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// On the first call.
    #[default]
    Lazy,
    /// Right after the initializer, during construction.
    Eager,
}

/// The resolved form of one `memoize` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentationDescriptor {
    /// Methods wrapped by this declaration, in declaration order.
    pub target_methods: Vec<MethodDescriptor>,
    /// Namespace for generated slot keys.
    pub prefix: String,
    /// Whether slots are populated at construction.
    pub eager: bool,
}

impl AugmentationDescriptor {
    /// Strategy implied by the `eager` flag.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        if self.eager { Strategy::Eager } else { Strategy::Lazy }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
