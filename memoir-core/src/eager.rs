//! Eager evaluation at construction.
//!
//! Every eager `memoize` declaration appends one [`ConstructHook`] to its
//! type. After the initializer returns, hooks run ancestor-first and each
//! one calls all of its targets once, filling their slots. A failing
//! initializer or body aborts construction.

use std::sync::Arc;

use tracing::{debug, debug_span};

use crate::augment::Augmentation;
use crate::error::Result;
use crate::object::{Instance, TypeDef};
use crate::stats::spans;
use crate::types::Value;

/// Post-construction pass for one eager declaration.
#[derive(Debug, Clone)]
pub(crate) struct ConstructHook {
    augmentation: Arc<Augmentation>,
}

impl ConstructHook {
    pub(crate) fn new(augmentation: Arc<Augmentation>) -> Self {
        Self { augmentation }
    }

    /// Call every target through full dispatch and drop the results.
    fn run(&self, instance: &Instance) -> Result<()> {
        for method in &self.augmentation.descriptor().target_methods {
            instance.send(method.name.as_str())?;
        }
        Ok(())
    }
}

impl TypeDef {
    /// Construct an instance: initializer first, then eager hooks.
    ///
    /// # Errors
    /// Whatever the initializer or an eagerly evaluated body returns. If
    /// the initializer fails no hook runs.
    pub fn instantiate(self: &Arc<Self>, args: &[Value]) -> Result<Instance> {
        let _span = debug_span!(spans::CONSTRUCT, type_name = %self.name).entered();
        let instance = Instance::blank(Arc::clone(self));

        if let Some(init) = self.nearest_initializer() {
            init(&instance, args)?;
        }

        let hooks = self.construct_hooks();
        for hook in &hooks {
            hook.run(&instance)?;
        }
        if !hooks.is_empty() {
            debug!(
                hooks = hooks.len(),
                slots = instance.cache().len(),
                "Eager slots populated"
            );
        }
        Ok(instance)
    }

    /// Construct an instance with no arguments.
    ///
    /// # Errors
    /// As for [`TypeDef::instantiate`].
    pub fn new_instance(self: &Arc<Self>) -> Result<Instance> {
        self.instantiate(&[])
    }

    /// All hooks on the ancestry, root type first, each in registration order.
    fn construct_hooks(&self) -> Vec<&ConstructHook> {
        let mut chain: Vec<&TypeDef> = self.ancestors().collect();
        chain.reverse();
        chain.into_iter().flat_map(|t| t.hooks.iter()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
