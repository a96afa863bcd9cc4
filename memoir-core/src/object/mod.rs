//! The host object model.
//!
//! Types are declared with a [`TypeBuilder`], which collects method bodies,
//! visibility, an initializer and interception stages. [`TypeBuilder::build`]
//! composes each method's delegation chain once and returns an immutable
//! [`TypeDef`]. [`Instance`]s are created from a `TypeDef` and own their
//! per-instance cache.

pub mod builder;
pub mod chain;
pub mod instance;
pub mod typedef;

pub use builder::TypeBuilder;
pub use chain::{Callable, Interceptor, Next};
pub use instance::Instance;
pub use typedef::TypeDef;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::types::Value;

/// Constructor body: runs against the fresh instance with the construction arguments.
pub type Initializer = Arc<dyn Fn(&Instance, &[Value]) -> Result<()> + Send + Sync>;

/// Process-unique identity of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDefId(u64);

impl TypeDefId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}
