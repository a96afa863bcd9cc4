//! Configuration for memoir, loadable from `memoir.toml`.
//!
//! Only defaults live here. A `memoize` declaration that names its own
//! prefix or strategy always wins over the configured value.

use serde::{Deserialize, Serialize};

use crate::slot::DEFAULT_PREFIX;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoirConfig {
    /// Declaration defaults.
    #[serde(default)]
    pub memoize: MemoizeConfig,
    /// Synchronization of first computations.
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    /// Tracing verbosity of the call path.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl MemoirConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `MemoirError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::MemoirError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Defaults applied to `memoize` declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoizeConfig {
    /// Slot key prefix when a declaration names none.
    #[serde(default = "default_prefix")]
    pub default_prefix: String,
    /// Strategy when a declaration does not choose one.
    #[serde(default)]
    pub eager_by_default: bool,
}

impl Default for MemoizeConfig {
    fn default() -> Self {
        Self {
            default_prefix: DEFAULT_PREFIX.to_string(),
            eager_by_default: false,
        }
    }
}

/// How concurrent first calls to the same slot are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// Check, compute and store without holding a lock. Concurrent first
    /// calls may each run the body; the last store wins.
    #[default]
    Racy,
    /// Hold the slot's compute lock across check, compute and store, so a
    /// successful body runs at most once per instance.
    PerSlot,
}

/// Concurrency settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Policy for memoized stages installed under this config.
    #[serde(default)]
    pub sync_policy: SyncPolicy,
}

/// Call-path tracing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Emit a `trace!` event on every cache hit and miss.
    #[serde(default)]
    pub trace_cache_hits: bool,
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_prefix() -> String { DEFAULT_PREFIX.to_string() }

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
