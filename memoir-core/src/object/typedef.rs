//! Frozen type definitions.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::augment::{Augmentation, SlotOwner};
use crate::eager::ConstructHook;
use crate::object::chain::Callable;
use crate::object::{Initializer, TypeDefId};
use crate::slot::SlotKey;
use crate::types::{Identifier, MethodDescriptor, Visibility};

/// A method with its delegation chain already composed.
pub(crate) struct ResolvedMethod {
    pub(crate) visibility: Visibility,
    pub(crate) owner: TypeDefId,
    pub(crate) declared: bool,
    pub(crate) callable: Callable,
}

/// An immutable, built type. Create instances with [`TypeDef::instantiate`].
pub struct TypeDef {
    pub(crate) id: TypeDefId,
    pub(crate) name: String,
    pub(crate) parent: Option<Arc<TypeDef>>,
    pub(crate) methods: IndexMap<Identifier, ResolvedMethod>,
    pub(crate) initializer: Option<Initializer>,
    pub(crate) augmentations: Vec<Arc<Augmentation>>,
    pub(crate) hooks: Vec<ConstructHook>,
    pub(crate) slots: HashMap<SlotKey, SlotOwner>,
}

impl TypeDef {
    /// The type's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type's identity.
    #[must_use]
    pub fn id(&self) -> TypeDefId {
        self.id
    }

    /// The direct parent, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<TypeDef>> {
        self.parent.as_ref()
    }

    /// This type followed by its ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &TypeDef> {
        std::iter::successors(Some(self), |t| t.parent.as_deref())
    }

    /// Whether `self` is `other` or descends from it.
    #[must_use]
    pub fn is_a(&self, other: &TypeDef) -> bool {
        self.descends_from(other.id)
    }

    pub(crate) fn descends_from(&self, id: TypeDefId) -> bool {
        self.ancestors().any(|t| t.id == id)
    }

    /// The most-derived definition of `name`.
    pub(crate) fn find_method(&self, name: &str) -> Option<&ResolvedMethod> {
        self.ancestors().find_map(|t| t.methods.get(name))
    }

    /// Whether instances respond to `name` at any visibility.
    #[must_use]
    pub fn responds_to(&self, name: &str) -> bool {
        self.find_method(name).is_some()
    }

    /// Effective visibility of `name`, if it exists.
    #[must_use]
    pub fn visibility_of(&self, name: &str) -> Option<Visibility> {
        self.find_method(name).map(|m| m.visibility)
    }

    /// All reachable method names with the given visibility, sorted.
    ///
    /// The most-derived definition decides a name's visibility.
    #[must_use]
    pub fn instance_methods(&self, visibility: Visibility) -> Vec<Identifier> {
        let mut seen: HashMap<&Identifier, Visibility> = HashMap::new();
        for t in self.ancestors() {
            for (name, method) in &t.methods {
                seen.entry(name).or_insert(method.visibility);
            }
        }
        let mut names: Vec<Identifier> = seen
            .into_iter()
            .filter(|(_, v)| *v == visibility)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Methods declared directly on this type, in declaration order.
    #[must_use]
    pub fn own_methods(&self) -> Vec<MethodDescriptor> {
        self.methods
            .iter()
            .filter(|(_, m)| m.declared)
            .map(|(name, m)| MethodDescriptor {
                name: name.clone(),
                visibility: m.visibility,
            })
            .collect()
    }

    /// `memoize` declarations made on this type itself, in order.
    #[must_use]
    pub fn augmentations(&self) -> &[Arc<Augmentation>] {
        &self.augmentations
    }

    pub(crate) fn nearest_initializer(&self) -> Option<&Initializer> {
        self.ancestors().find_map(|t| t.initializer.as_ref())
    }
}

impl std::fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDef")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.as_str()))
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("augmentations", &self.augmentations)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
