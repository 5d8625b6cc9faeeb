//! Listener handles
//!
//! A listener is a reference to an externally-owned callable. The core never
//! owns what the callable captures; it only keeps a shared handle and compares
//! handles by the token issued when the listener was created.

use crate::context::ScriptContext;
use crate::types::ListenerId;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Cloneable handle to a callable invoked with a call context
pub struct Listener<C = ScriptContext> {
    id: ListenerId,
    func: Rc<dyn Fn(&mut C)>,
}

impl<C> Listener<C> {
    /// Wrap a callable and issue a fresh listener token
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&mut C) + 'static,
    {
        Self {
            id: ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed)),
            func: Rc::new(func),
        }
    }

    /// Token shared by this handle and all of its clones
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub(crate) fn invoke(&self, context: &mut C) {
        (self.func)(context)
    }
}

impl<C> Clone for Listener<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            func: Rc::clone(&self.func),
        }
    }
}

impl<C> PartialEq for Listener<C> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<C> Eq for Listener<C> {}

impl<C> fmt::Debug for Listener<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}
