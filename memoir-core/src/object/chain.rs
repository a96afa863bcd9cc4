//! Delegation chains.
//!
//! Every method is a base body plus an ordered list of interception
//! stages. `build()` folds the stages over the base once; the stage
//! installed last ends up outermost and sees the call first.
//!
//! ```text
//! call ──▶ stage[n-1] ──next──▶ … ──next──▶ stage[0] ──next──▶ body
//! ```

use std::sync::Arc;

use crate::error::Result;
use crate::object::Instance;
use crate::types::Value;

/// A fully composed method: what a call site ultimately invokes.
pub type Callable = Arc<dyn Fn(&Instance) -> Result<Value> + Send + Sync>;

/// A stage that sits in front of a method body.
///
/// Implementations decide whether to delegate onward through `next`.
/// Memoization is one such stage; logging or counting stages compose with
/// it in installation order.
pub trait Interceptor: Send + Sync {
    /// Handle a call on `receiver`, optionally delegating to `next`.
    ///
    /// # Errors
    /// Whatever the stage or the rest of the chain returns.
    fn call(&self, receiver: &Instance, next: Next<'_>) -> Result<Value>;
}

impl<F> Interceptor for F
where
    F: Fn(&Instance, Next<'_>) -> Result<Value> + Send + Sync,
{
    fn call(&self, receiver: &Instance, next: Next<'_>) -> Result<Value> {
        self(receiver, next)
    }
}

/// The remainder of a delegation chain.
pub struct Next<'a> {
    inner: &'a Callable,
}

impl Next<'_> {
    /// Invoke the rest of the chain.
    ///
    /// # Errors
    /// Whatever the remaining stages or the body return.
    pub fn call(self, receiver: &Instance) -> Result<Value> {
        (self.inner)(receiver)
    }
}

/// Fold `stages` over `base`, first stage innermost.
pub(crate) fn compose(base: &Callable, stages: &[Arc<dyn Interceptor>]) -> Callable {
    stages.iter().fold(Arc::clone(base), |inner, stage| {
        let stage = Arc::clone(stage);
        let outer: Callable =
            Arc::new(move |receiver: &Instance| stage.call(receiver, Next { inner: &inner }));
        outer
    })
}
