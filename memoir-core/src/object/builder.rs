//! Type declaration.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::augment::{Augmentation, SlotOwner};
use crate::config::MemoirConfig;
use crate::eager::ConstructHook;
use crate::error::{MemoirError, Result};
use crate::object::chain::{Callable, Interceptor, compose};
use crate::object::typedef::ResolvedMethod;
use crate::object::{Initializer, Instance, TypeDef, TypeDefId};
use crate::slot::SlotKey;
use crate::types::{Identifier, MethodDescriptor, Value, Visibility};

/// A method under declaration: its base body plus the stages in front of it.
pub(crate) struct MethodEntry {
    pub(crate) visibility: Visibility,
    /// Type whose body sits at the bottom of the chain.
    pub(crate) owner: TypeDefId,
    pub(crate) base: Callable,
    /// Installation order; the last one runs first.
    pub(crate) stages: Vec<Arc<dyn Interceptor>>,
    /// `false` for entries that only carry stages or visibility for an
    /// inherited body.
    pub(crate) declared: bool,
}

/// Declares a type: methods, visibility, initializer and interception stages.
///
/// ```
/// use memoir_core::{Memoize, TypeBuilder};
/// use serde_json::json;
///
/// let mut builder = TypeBuilder::new("Report");
/// builder
///     .memoize_with(Memoize::new(), |b| {
///         b.define("total", |_| Ok(json!(42)))?;
///         Ok(())
///     })
///     .expect("memoize");
/// let report = builder.build().new_instance().expect("instance");
/// assert_eq!(report.call("total").expect("call"), json!(42));
/// assert_eq!(report.cache().len(), 1);
/// ```
pub struct TypeBuilder {
    pub(crate) id: TypeDefId,
    pub(crate) name: String,
    pub(crate) parent: Option<Arc<TypeDef>>,
    pub(crate) methods: IndexMap<Identifier, MethodEntry>,
    pub(crate) initializer: Option<Initializer>,
    pub(crate) augmentations: Vec<Arc<Augmentation>>,
    pub(crate) hooks: Vec<ConstructHook>,
    /// Every slot key claimed on this type or an ancestor.
    pub(crate) slots: HashMap<SlotKey, SlotOwner>,
    pub(crate) config: MemoirConfig,
}

impl TypeBuilder {
    /// Start declaring a root type.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TypeDefId::next(),
            name: name.into(),
            parent: None,
            methods: IndexMap::new(),
            initializer: None,
            augmentations: Vec::new(),
            hooks: Vec::new(),
            slots: HashMap::new(),
            config: MemoirConfig::default(),
        }
    }

    /// Start declaring a type that inherits from `parent`.
    #[must_use]
    pub fn subclass(name: impl Into<String>, parent: &Arc<TypeDef>) -> Self {
        let mut builder = Self::new(name);
        builder.slots = parent.slots.clone();
        builder.parent = Some(Arc::clone(parent));
        builder
    }

    /// Use `config` for defaults of subsequent `memoize` declarations.
    #[must_use]
    pub fn with_config(mut self, config: &MemoirConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// The type's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare (or redefine) a public nullary method directly on this type.
    ///
    /// Redefinition keeps any installed stages, which then delegate to the
    /// new body.
    ///
    /// # Errors
    /// Returns [`MemoirError::InvalidIdentifier`] for an illegal name.
    pub fn define<F>(&mut self, name: &str, body: F) -> Result<&mut Self>
    where
        F: Fn(&Instance) -> Result<Value> + Send + Sync + 'static,
    {
        let name = Identifier::parse(name)?;
        let base: Callable = Arc::new(body);
        let owner = self.id;
        match self.methods.get_mut(&name) {
            Some(entry) => {
                entry.base = base;
                entry.owner = owner;
                entry.visibility = Visibility::Public;
                entry.declared = true;
            }
            None => {
                self.methods.insert(
                    name,
                    MethodEntry {
                        visibility: Visibility::Public,
                        owner,
                        base,
                        stages: Vec::new(),
                        declared: true,
                    },
                );
            }
        }
        Ok(self)
    }

    /// Change who may call `name`. Inherited methods get a local override.
    ///
    /// # Errors
    /// Returns [`MemoirError::UnknownMethod`] if `name` is not reachable.
    pub fn set_visibility(&mut self, name: &str, visibility: Visibility) -> Result<&mut Self> {
        self.own_entry_mut(name)?.visibility = visibility;
        Ok(self)
    }

    /// Shorthand for [`Visibility::Protected`].
    ///
    /// # Errors
    /// Returns [`MemoirError::UnknownMethod`] if `name` is not reachable.
    pub fn make_protected(&mut self, name: &str) -> Result<&mut Self> {
        self.set_visibility(name, Visibility::Protected)
    }

    /// Shorthand for [`Visibility::Private`].
    ///
    /// # Errors
    /// Returns [`MemoirError::UnknownMethod`] if `name` is not reachable.
    pub fn make_private(&mut self, name: &str) -> Result<&mut Self> {
        self.set_visibility(name, Visibility::Private)
    }

    /// Set the constructor body. Without one, the nearest ancestor's runs.
    pub fn initializer<F>(&mut self, init: F) -> &mut Self
    where
        F: Fn(&Instance, &[Value]) -> Result<()> + Send + Sync + 'static,
    {
        self.initializer = Some(Arc::new(init));
        self
    }

    /// Install an interception stage in front of `name`.
    ///
    /// # Errors
    /// Returns [`MemoirError::UnknownMethod`] if `name` is not reachable.
    pub fn intercept<I>(&mut self, name: &str, stage: I) -> Result<&mut Self>
    where
        I: Interceptor + 'static,
    {
        self.own_entry_mut(name)?.stages.push(Arc::new(stage));
        Ok(self)
    }

    /// Methods declared directly on this type, in declaration order.
    #[must_use]
    pub fn own_methods(&self) -> Vec<MethodDescriptor> {
        self.methods
            .iter()
            .filter(|(_, entry)| entry.declared)
            .map(|(name, entry)| MethodDescriptor {
                name: name.clone(),
                visibility: entry.visibility,
            })
            .collect()
    }

    /// Visibility of `name` as currently declared, own or inherited.
    pub(crate) fn lookup_visibility(&self, name: &str) -> Option<Visibility> {
        match self.methods.get(name) {
            Some(entry) => Some(entry.visibility),
            None => self.parent.as_ref()?.visibility_of(name),
        }
    }

    pub(crate) fn push_stage(&mut self, name: &str, stage: Arc<dyn Interceptor>) -> Result<()> {
        self.own_entry_mut(name)?.stages.push(stage);
        Ok(())
    }

    /// The local entry for `name`, creating one over the inherited body if needed.
    fn own_entry_mut(&mut self, name: &str) -> Result<&mut MethodEntry> {
        if !self.methods.contains_key(name) {
            let inherited = self
                .parent
                .as_ref()
                .and_then(|p| p.find_method(name))
                .ok_or_else(|| MemoirError::UnknownMethod {
                    type_name: self.name.clone(),
                    method: name.to_string(),
                })?;
            let entry = MethodEntry {
                visibility: inherited.visibility,
                owner: inherited.owner,
                base: Arc::clone(&inherited.callable),
                stages: Vec::new(),
                declared: false,
            };
            self.methods.insert(Identifier::parse(name)?, entry);
        }
        self.methods
            .get_mut(name)
            .ok_or_else(|| MemoirError::UnknownMethod {
                type_name: self.name.clone(),
                method: name.to_string(),
            })
    }

    /// Compose every delegation chain and freeze the type.
    #[must_use]
    pub fn build(self) -> Arc<TypeDef> {
        let methods: IndexMap<Identifier, ResolvedMethod> = self
            .methods
            .into_iter()
            .map(|(name, entry)| {
                let callable = compose(&entry.base, &entry.stages);
                let resolved = ResolvedMethod {
                    visibility: entry.visibility,
                    owner: entry.owner,
                    declared: entry.declared,
                    callable,
                };
                (name, resolved)
            })
            .collect();

        debug!(
            type_name = %self.name,
            methods = methods.len(),
            augmentations = self.augmentations.len(),
            construct_hooks = self.hooks.len(),
            "Built type"
        );

        Arc::new(TypeDef {
            id: self.id,
            name: self.name,
            parent: self.parent,
            methods,
            initializer: self.initializer,
            augmentations: self.augmentations,
            hooks: self.hooks,
            slots: self.slots,
        })
    }
}

impl std::fmt::Debug for TypeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeBuilder")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("augmentations", &self.augmentations.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
