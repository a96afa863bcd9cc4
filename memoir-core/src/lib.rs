//! # memoir core library
//!
//! Per-instance memoization of nullary methods over a small runtime object
//! model. A `memoize` declaration wraps selected methods so each one's
//! result is computed at most once per instance and then served from that
//! instance's cache:
//!
//! - **Slot keys**: `(prefix, method)` mapped to a storage-safe, collision-free identifier
//! - **Instance cache**: presence-tagged slots that live exactly as long as the instance
//! - **Memoizing stage**: an interceptor in the method's delegation chain
//! - **Declarations**: explicit method lists or blocks that declare the targets
//! - **Eager strategy**: slots filled right after construction
//!
//! ```
//! use memoir_core::{Memoize, TypeBuilder};
//! use serde_json::json;
//!
//! let mut builder = TypeBuilder::new("Sensor");
//! builder.define("reading", |_| Ok(json!(21.5))).expect("define");
//! builder.define("ready?", |_| Ok(json!(false))).expect("define");
//! builder
//!     .memoize(Memoize::new().methods(["reading", "ready?"]))
//!     .expect("memoize");
//!
//! let sensor = builder.build().new_instance().expect("instance");
//! assert_eq!(sensor.call("ready?").expect("call"), json!(false));
//! assert!(sensor.cache().keys().iter().any(|k| k == "__default_ready_query"));
//! ```
//!
//! ## Failure policy
//!
//! Errors from a method body reach the caller unchanged and are never
//! cached; the next call runs the body again. Declaration errors abort the
//! whole declaration before any stage is installed.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod augment;
pub mod cache;
pub mod config;
pub mod eager;
pub mod error;
pub mod object;
pub mod slot;
pub mod stats;
pub mod types;
pub mod wrapper;

pub use augment::{Augmentation, Memoize};
pub use cache::InstanceCache;
pub use config::{MemoirConfig, SyncPolicy};
pub use error::{MemoirError, Result};
pub use object::{Instance, Interceptor, Next, TypeBuilder, TypeDef};
pub use slot::{DEFAULT_PREFIX, SlotKey, resolve};
pub use stats::StatsSnapshot;
pub use types::*;
