//! Callback pairs
//!
//! A pair groups the "pre" and "post" callbacks of one logical operation. Both
//! halves are created together, and both are released when the pair is
//! released or dropped. A disabled pair never touches a registry at all.

use crate::context::{CallContext, ScriptContext};
use crate::registry::{CallbackRegistry, SharedRegistry};
use crate::types::{CallbackId, ExecutionReport};
use std::rc::Rc;

/// Pre/post callbacks created and released in lockstep
pub struct CallbackPair<C: CallContext = ScriptContext> {
    registry: Option<SharedRegistry<C>>,
    pre: Option<CallbackId>,
    post: Option<CallbackId>,
}

impl<C: CallContext + Default> CallbackPair<C> {
    /// Create both halves under empty names
    ///
    /// The halves are reachable through [`pre`](Self::pre) and
    /// [`post`](Self::post) only, not by name.
    pub fn new(registry: &SharedRegistry<C>) -> Self {
        Self::create(registry, String::new(), String::new())
    }

    /// Create both halves as `<base>.pre` and `<base>.post`
    pub fn named(registry: &SharedRegistry<C>, base: &str) -> Self {
        Self::create(registry, format!("{}.pre", base), format!("{}.post", base))
    }

    /// Create a populated pair when `enabled`, otherwise a disabled one
    pub fn with_callbacks(registry: &SharedRegistry<C>, enabled: bool) -> Self {
        if enabled {
            Self::new(registry)
        } else {
            Self::disabled()
        }
    }

    fn create(registry: &SharedRegistry<C>, pre_name: String, post_name: String) -> Self {
        let mut owner = registry.borrow_mut();
        let pre = owner.create_callback(pre_name);
        let post = owner.create_callback(post_name);
        drop(owner);

        Self {
            registry: Some(Rc::clone(registry)),
            pre: Some(pre),
            post: Some(post),
        }
    }

    /// Execute the pre half; `None` for a disabled or released pair
    ///
    /// Listeners may use the shared registry, including releasing this pair.
    pub fn execute_pre(&self, reset_context: bool) -> Option<ExecutionReport> {
        self.execute_half(self.pre, reset_context)
    }

    /// Execute the post half; `None` for a disabled or released pair
    pub fn execute_post(&self, reset_context: bool) -> Option<ExecutionReport> {
        self.execute_half(self.post, reset_context)
    }

    fn execute_half(
        &self,
        half: Option<CallbackId>,
        reset_context: bool,
    ) -> Option<ExecutionReport> {
        let id = half?;
        let registry = self.registry.as_ref()?;
        CallbackRegistry::execute_shared(registry, id, reset_context)
    }
}

impl<C: CallContext> CallbackPair<C> {
    /// A pair with no callbacks and no registry reference
    pub fn disabled() -> Self {
        Self {
            registry: None,
            pre: None,
            post: None,
        }
    }

    pub fn pre(&self) -> Option<CallbackId> {
        self.pre
    }

    pub fn post(&self) -> Option<CallbackId> {
        self.post
    }

    /// True while both halves are held
    pub fn is_enabled(&self) -> bool {
        self.pre.is_some() && self.post.is_some()
    }

    /// Release both halves back to the registry
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn release(&mut self) {
        let Some(registry) = self.registry.take() else {
            return;
        };

        let halves = [self.pre.take(), self.post.take()];
        let released = match registry.try_borrow_mut() {
            Ok(mut owner) => {
                for id in halves.into_iter().flatten() {
                    owner.release_callback(id);
                }
                true
            }
            Err(_) => false,
        };

        if !released {
            log::error!(
                "Registry is borrowed while releasing callback pair ({:?}, {:?}); \
                 callbacks leaked",
                halves[0],
                halves[1]
            );
        }
    }
}

impl<C: CallContext> Drop for CallbackPair<C> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<C: CallContext> std::fmt::Debug for CallbackPair<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackPair")
            .field("pre", &self.pre)
            .field("post", &self.post)
            .finish()
    }
}
