//! The `memoize` declaration.
//!
//! A declaration names its targets either explicitly or by a block that
//! declares them. It is validated in full before anything is installed:
//! identifiers, method existence, prefix, and slot key collisions. Only
//! then does each target get a [`MemoizedMethod`](crate::wrapper::MemoizedMethod)
//! pushed onto its chain and, for eager declarations, a construction hook.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, debug_span};

use crate::eager::ConstructHook;
use crate::error::{MemoirError, Result};
use crate::object::TypeBuilder;
use crate::slot::{SlotKey, resolve, validate_prefix};
use crate::stats::{MemoStats, StatsSnapshot, spans};
use crate::types::{AugmentationDescriptor, Identifier, MethodDescriptor};
use crate::wrapper::wrap;

/// Options for one `memoize` declaration.
///
/// Unset fields fall back to the builder's [`MemoirConfig`](crate::MemoirConfig).
#[derive(Debug, Clone, Default)]
pub struct Memoize {
    methods: Vec<String>,
    eager: Option<bool>,
    prefix: Option<String>,
}

impl Memoize {
    /// A declaration with configured defaults and no explicit methods.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `Memoize::new().eager(false)`.
    #[must_use]
    pub fn lazy() -> Self {
        Self::new().eager(false)
    }

    /// Shorthand for `Memoize::new().eager(true)`.
    #[must_use]
    pub fn eagerly() -> Self {
        Self::new().eager(true)
    }

    /// Name the methods to memoize.
    #[must_use]
    pub fn methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods.extend(methods.into_iter().map(Into::into));
        self
    }

    /// Populate slots at construction instead of on first call.
    #[must_use]
    pub fn eager(mut self, eager: bool) -> Self {
        self.eager = Some(eager);
        self
    }

    /// Namespace for the generated slot keys.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Which `(prefix, method)` pair owns a slot key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SlotOwner {
    pub(crate) prefix: String,
    pub(crate) method: Identifier,
}

impl fmt::Display for SlotOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.prefix, self.method)
    }
}

/// The installed result of one `memoize` declaration.
#[derive(Debug)]
pub struct Augmentation {
    descriptor: AugmentationDescriptor,
    keys: Vec<SlotKey>,
    stats: Arc<MemoStats>,
}

impl Augmentation {
    /// The resolved declaration.
    #[must_use]
    pub fn descriptor(&self) -> &AugmentationDescriptor {
        &self.descriptor
    }

    /// Slot keys, parallel to `descriptor().target_methods`.
    #[must_use]
    pub fn slot_keys(&self) -> &[SlotKey] {
        &self.keys
    }

    /// Whether slots are populated at construction.
    #[must_use]
    pub fn is_eager(&self) -> bool {
        self.descriptor.eager
    }

    /// Hit/miss counters across all instances.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl fmt::Display for Augmentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_eager() { "EagerMemoizer" } else { "Memoizer" };
        let names: Vec<&str> = self
            .descriptor
            .target_methods
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        write!(f, "<{kind} (methods: {})>", names.join(", "))
    }
}

impl TypeBuilder {
    /// Memoize methods named explicitly in `decl`.
    ///
    /// Inherited methods may be named; the stage is installed on this type
    /// and delegates to the ancestor's implementation.
    ///
    /// # Errors
    /// - [`MemoirError::InvalidArguments`] if `decl` names no methods or has a bad prefix.
    /// - [`MemoirError::InvalidIdentifier`] for an illegal name.
    /// - [`MemoirError::UnknownMethod`] if a name is not reachable on this type.
    /// - [`MemoirError::SlotCollision`] if two different targets would share a slot.
    pub fn memoize(&mut self, decl: Memoize) -> Result<Arc<Augmentation>> {
        if decl.methods.is_empty() {
            return Err(MemoirError::InvalidArguments(
                "memoize takes method names or a block defining methods".into(),
            ));
        }
        let targets = decl
            .methods
            .iter()
            .map(|name| Identifier::parse(name))
            .collect::<Result<Vec<_>>>()?;
        let prefix = self.declared_prefix(decl.prefix)?;
        self.install(targets, prefix, decl.eager)
    }

    /// Memoize every method newly declared on this type by `block`.
    ///
    /// Methods declared outside the block, and methods the block merely
    /// redefines, are left alone. An empty block yields an empty declaration.
    ///
    /// # Errors
    /// - [`MemoirError::InvalidArguments`] if `decl` also names methods (the
    ///   block is not run) or has a bad prefix.
    /// - Any error returned by `block`.
    /// - [`MemoirError::SlotCollision`] as for [`TypeBuilder::memoize`].
    pub fn memoize_with<F>(&mut self, decl: Memoize, block: F) -> Result<Arc<Augmentation>>
    where
        F: FnOnce(&mut TypeBuilder) -> Result<()>,
    {
        if !decl.methods.is_empty() {
            return Err(MemoirError::InvalidArguments(
                "memoize takes method names or a block defining methods, not both".into(),
            ));
        }
        let prefix = self.declared_prefix(decl.prefix)?;
        let before: HashSet<Identifier> =
            self.own_methods().into_iter().map(|m| m.name).collect();
        block(self)?;
        let targets: Vec<Identifier> = self
            .own_methods()
            .into_iter()
            .map(|m| m.name)
            .filter(|name| !before.contains(name))
            .collect();
        self.install(targets, prefix, decl.eager)
    }

    /// The declaration's prefix, or the configured default, validated.
    fn declared_prefix(&self, prefix: Option<String>) -> Result<String> {
        let prefix = prefix.unwrap_or_else(|| self.config.memoize.default_prefix.clone());
        validate_prefix(&prefix)?;
        Ok(prefix)
    }

    fn install(
        &mut self,
        targets: Vec<Identifier>,
        prefix: String,
        eager: Option<bool>,
    ) -> Result<Arc<Augmentation>> {
        let eager = eager.unwrap_or(self.config.memoize.eager_by_default);
        let _span = debug_span!(spans::AUGMENT, type_name = %self.name, %prefix, eager).entered();

        // Resolve everything up front so a failure installs nothing.
        let mut seen = HashSet::new();
        let mut descriptors = Vec::with_capacity(targets.len());
        let mut keys = Vec::with_capacity(targets.len());
        let mut claimed: Vec<(SlotKey, SlotOwner)> = Vec::with_capacity(targets.len());
        for name in targets {
            if !seen.insert(name.clone()) {
                continue;
            }
            let visibility = self.lookup_visibility(name.as_str()).ok_or_else(|| {
                MemoirError::UnknownMethod {
                    type_name: self.name.clone(),
                    method: name.to_string(),
                }
            })?;
            let key = resolve(&name, &prefix);
            let owner = SlotOwner {
                prefix: prefix.clone(),
                method: name.clone(),
            };
            let existing = self
                .slots
                .get(&key)
                .or_else(|| claimed.iter().find(|(k, _)| *k == key).map(|(_, o)| o));
            if let Some(existing) = existing
                && *existing != owner
            {
                return Err(MemoirError::SlotCollision {
                    key: key.to_string(),
                    existing: existing.to_string(),
                    incoming: owner.to_string(),
                });
            }
            claimed.push((key.clone(), owner));
            keys.push(key);
            descriptors.push(MethodDescriptor { name, visibility });
        }

        let stats = Arc::new(MemoStats::new());
        for descriptor in &descriptors {
            let stage = wrap(&descriptor.name, &prefix)
                .with_policy(self.config.concurrency.sync_policy)
                .with_tracing(self.config.telemetry.trace_cache_hits)
                .with_stats(Arc::clone(&stats));
            self.push_stage(descriptor.name.as_str(), Arc::new(stage))?;
        }
        self.slots.extend(claimed);

        let augmentation = Arc::new(Augmentation {
            descriptor: AugmentationDescriptor {
                target_methods: descriptors,
                prefix,
                eager,
            },
            keys,
            stats,
        });
        if eager {
            self.hooks.push(ConstructHook::new(Arc::clone(&augmentation)));
        }
        self.augmentations.push(Arc::clone(&augmentation));

        debug!(
            methods = augmentation.descriptor.target_methods.len(),
            "Installed {augmentation}"
        );
        Ok(augmentation)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
