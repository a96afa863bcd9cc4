//! Instances and call dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::InstanceCache;
use crate::error::{MemoirError, Result};
use crate::object::TypeDef;
use crate::object::typedef::ResolvedMethod;
use crate::types::{Value, Visibility};

/// One object: its type, ordinary field state and its memoization cache.
///
/// The cache lives and dies with the instance and is never shared.
pub struct Instance {
    type_def: Arc<TypeDef>,
    fields: Mutex<HashMap<String, Value>>,
    cache: InstanceCache,
}

impl Instance {
    /// A fresh instance with no fields and an empty cache. Runs nothing.
    pub(crate) fn blank(type_def: Arc<TypeDef>) -> Self {
        Self {
            type_def,
            fields: Mutex::new(HashMap::new()),
            cache: InstanceCache::new(),
        }
    }

    /// The instance's type.
    #[must_use]
    pub fn type_def(&self) -> &Arc<TypeDef> {
        &self.type_def
    }

    /// The memoization cache.
    #[must_use]
    pub fn cache(&self) -> &InstanceCache {
        &self.cache
    }

    /// Read an ordinary field.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.fields.lock().get(name).cloned()
    }

    /// Write an ordinary field.
    pub fn set_field(&self, name: impl Into<String>, value: Value) {
        self.fields.lock().insert(name.into(), value);
    }

    /// Call `name` from outside the type. Only public methods are reachable.
    ///
    /// # Errors
    /// [`MemoirError::NoMethod`], [`MemoirError::NotVisible`], or whatever
    /// the method itself returns.
    pub fn call(&self, name: &str) -> Result<Value> {
        let method = self.resolve(name)?;
        match method.visibility {
            Visibility::Public => (method.callable)(self),
            visibility => Err(not_visible(name, visibility)),
        }
    }

    /// Call `name` on `self` from code running inside `caller`.
    ///
    /// Protected methods are reachable when `caller` is an instance of the
    /// type that declared the method, or of a descendant of it.
    ///
    /// # Errors
    /// [`MemoirError::NoMethod`], [`MemoirError::NotVisible`], or whatever
    /// the method itself returns.
    pub fn call_from(&self, caller: &Instance, name: &str) -> Result<Value> {
        let method = self.resolve(name)?;
        match method.visibility {
            Visibility::Public => (method.callable)(self),
            Visibility::Protected if caller.type_def.descends_from(method.owner) => {
                (method.callable)(self)
            }
            visibility => Err(not_visible(name, visibility)),
        }
    }

    /// Call `name` as the instance itself, ignoring visibility.
    ///
    /// # Errors
    /// [`MemoirError::NoMethod`] or whatever the method itself returns.
    pub fn send(&self, name: &str) -> Result<Value> {
        let method = self.resolve(name)?;
        (method.callable)(self)
    }

    fn resolve(&self, name: &str) -> Result<&ResolvedMethod> {
        self.type_def
            .find_method(name)
            .ok_or_else(|| MemoirError::NoMethod {
                type_name: self.type_def.name.clone(),
                method: name.to_string(),
            })
    }
}

fn not_visible(name: &str, visibility: Visibility) -> MemoirError {
    MemoirError::NotVisible {
        method: name.to_string(),
        visibility,
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.type_def.name)
            .field("fields", &*self.fields.lock())
            .field("cache", &self.cache.keys())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
