//! Error types for the memoir core library.

use thiserror::Error;

use crate::types::Visibility;

/// Boxed error raised from inside a method body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all memoir operations.
///
/// Declaration-time errors (`InvalidArguments`, `UnknownMethod`,
/// `InvalidIdentifier`, `SlotCollision`) abort a `memoize` declaration
/// before any wrapper is installed. Call-time errors from a method body
/// travel through every interception stage untouched.
#[derive(Error, Debug)]
pub enum MemoirError {
    /// A declaration was given a contradictory or malformed set of arguments.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// An explicitly named method does not exist on the type or its ancestors.
    #[error("Unknown method `{method}` on type `{type_name}`")]
    UnknownMethod {
        /// Type being declared.
        type_name: String,
        /// Method that could not be resolved.
        method: String,
    },

    /// A method name is not a legal identifier.
    #[error("Invalid method identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Two distinct (prefix, method) pairs would share one cache slot.
    #[error("Slot collision on `{key}`: already used by {existing}, requested by {incoming}")]
    SlotCollision {
        /// The contested slot identifier.
        key: String,
        /// `prefix/method` already owning the slot.
        existing: String,
        /// `prefix/method` that tried to claim it.
        incoming: String,
    },

    /// A method body failed. Passed to the caller unchanged and never cached.
    #[error("Method `{method}` failed: {source}")]
    OriginalMethodFailure {
        /// Method whose body raised.
        method: String,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },

    /// No method with this name is reachable on the receiver's type.
    #[error("Undefined method `{method}` for instance of `{type_name}`")]
    NoMethod {
        /// Receiver's type.
        type_name: String,
        /// Requested method.
        method: String,
    },

    /// The method exists but is not callable from this call site.
    #[error("{visibility} method `{method}` called from outside its type")]
    NotVisible {
        /// Requested method.
        method: String,
        /// The method's visibility.
        visibility: Visibility,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MemoirError {
    /// Wrap an arbitrary failure raised by the body of `method`.
    pub fn method_failure(method: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::OriginalMethodFailure {
            method: method.into(),
            source: source.into(),
        }
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, MemoirError>;
