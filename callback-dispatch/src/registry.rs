//! Callback registry
//!
//! The registry owns every named callback in existence. Callers hold
//! [`CallbackId`] handles; the callbacks themselves never leave the registry,
//! so releasing a handle twice or releasing a handle the registry never issued
//! is a logged no-op rather than a double free.
//!
//! Names are not unique. Name-based lookups return the first callback created
//! under that name; later callbacks sharing a name are only reachable by id.

use crate::callback::NamedCallback;
use crate::config::DispatchConfig;
use crate::context::{CallContext, ScriptContext};
use crate::listener::Listener;
use crate::types::{CallbackId, ExecutionReport};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Registry shared between a host and the components it hands it to
pub type SharedRegistry<C = ScriptContext> = Rc<RefCell<CallbackRegistry<C>>>;

/// Header line of the debug listing
pub const DEBUG_LISTING_HEADER: &str = "----CALLBACKS----";

/// Owner of all named callbacks
pub struct CallbackRegistry<C = ScriptContext> {
    managed: Vec<NamedCallback<C>>,
    config: DispatchConfig,
    slow_threshold: Duration,
    next_id: u64,
    created: usize,
    released: usize,
}

/// Statistics about the registry contents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Callbacks currently owned
    pub callbacks: usize,
    /// Listener entries across all owned callbacks
    pub listeners: usize,
    /// Callbacks created since the registry was built
    pub created: usize,
    /// Callbacks released since the registry was built
    pub released: usize,
}

impl CallbackRegistry<ScriptContext> {
    /// Create an empty registry using [`ScriptContext`] and default settings
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }
}

impl Default for CallbackRegistry<ScriptContext> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CallContext> CallbackRegistry<C> {
    /// Create an empty registry with the given configuration
    pub fn with_config(config: DispatchConfig) -> Self {
        let slow_threshold = config.slow_listener_threshold();
        Self {
            managed: Vec::new(),
            config,
            slow_threshold,
            next_id: 1,
            created: 0,
            released: 0,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Wrap the registry for single-threaded sharing
    pub fn into_shared(self) -> SharedRegistry<C> {
        Rc::new(RefCell::new(self))
    }

    /// Create a callback owning `context`
    pub fn create_callback_with_context(
        &mut self,
        name: impl Into<String>,
        context: C,
    ) -> CallbackId {
        let name = name.into();
        log::trace!("Creating callback {}", name);

        if !name.is_empty() && self.find_callback(&name).is_some() {
            log::debug!(
                "Callback name '{}' already registered; lookups resolve to the first one",
                name
            );
        }

        let id = CallbackId(self.next_id);
        self.next_id += 1;
        self.managed.push(NamedCallback::new(
            id,
            name,
            context,
            self.slow_threshold,
            self.config.trace_hook,
        ));
        self.created += 1;

        id
    }

    /// First callback whose name matches exactly
    pub fn find_callback(&self, name: &str) -> Option<CallbackId> {
        self.managed
            .iter()
            .find(|callback| callback.name() == name)
            .map(NamedCallback::id)
    }

    pub fn get(&self, id: CallbackId) -> Option<&NamedCallback<C>> {
        self.managed.iter().find(|callback| callback.id() == id)
    }

    pub fn get_mut(&mut self, id: CallbackId) -> Option<&mut NamedCallback<C>> {
        self.managed.iter_mut().find(|callback| callback.id() == id)
    }

    pub fn contains(&self, id: CallbackId) -> bool {
        self.get(id).is_some()
    }

    /// Destroy the callback behind `id`
    ///
    /// Returns `false` and logs a warning if the registry does not own it
    /// (already released, or never issued by this registry).
    pub fn release_callback(&mut self, id: CallbackId) -> bool {
        match self.managed.iter().position(|callback| callback.id() == id) {
            Some(index) => {
                let callback = self.managed.remove(index);
                log::trace!("Releasing callback {} ({})", callback.name(), id);
                self.released += 1;
                true
            }
            None => {
                log::warn!("Attempted to release unknown callback {}", id);
                false
            }
        }
    }

    /// Attach `listener` to the callback named `name`
    ///
    /// Returns `false` without side effects if no callback has that name.
    pub fn try_add_function(&mut self, name: &str, listener: Listener<C>) -> bool {
        match self.find_callback_mut(name) {
            Some(callback) => {
                callback.add_listener(listener);
                true
            }
            None => false,
        }
    }

    /// Detach the first occurrence of `listener` from the callback named `name`
    pub fn try_remove_function(&mut self, name: &str, listener: &Listener<C>) -> bool {
        match self.find_callback_mut(name) {
            Some(callback) => callback.remove_listener(listener),
            None => false,
        }
    }

    /// Execute the callback behind `id`; `None` if it is not owned
    pub fn execute(&mut self, id: CallbackId, reset_context: bool) -> Option<ExecutionReport> {
        self.get_mut(id).map(|callback| callback.execute(reset_context))
    }

    /// Execute the first callback named `name`; `None` if there is none
    pub fn execute_by_name(
        &mut self,
        name: &str,
        reset_context: bool,
    ) -> Option<ExecutionReport> {
        self.find_callback_mut(name)
            .map(|callback| callback.execute(reset_context))
    }

    /// Lines written by [`print_debug_listing`](Self::print_debug_listing)
    pub fn debug_listing(&self) -> Vec<String> {
        std::iter::once(DEBUG_LISTING_HEADER.to_string())
            .chain(
                self.managed
                    .iter()
                    .map(|callback| format!("'{}'", callback.name())),
            )
            .collect()
    }

    /// Log one line per owned callback
    pub fn print_debug_listing(&self) {
        for line in self.debug_listing() {
            log::info!("{}", line);
        }
    }

    /// Owned callbacks in creation order
    pub fn iter(&self) -> impl Iterator<Item = &NamedCallback<C>> {
        self.managed.iter()
    }

    pub fn len(&self) -> usize {
        self.managed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managed.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            callbacks: self.managed.len(),
            listeners: self.managed.iter().map(NamedCallback::listener_count).sum(),
            created: self.created,
            released: self.released,
        }
    }

    fn find_callback_mut(&mut self, name: &str) -> Option<&mut NamedCallback<C>> {
        self.managed.iter_mut().find(|callback| callback.name() == name)
    }
}

impl<C: CallContext + Default> CallbackRegistry<C> {
    /// Create a callback with a fresh default context
    pub fn create_callback(&mut self, name: impl Into<String>) -> CallbackId {
        self.create_callback_with_context(name, C::default())
    }

    /// Execute the callback behind `id` in a shared registry
    ///
    /// The registry is not borrowed while listeners run, so a listener may
    /// add, remove, release or execute callbacks through the same registry.
    /// Returns `None` if `id` is not owned or the registry is already
    /// mutably borrowed by the caller.
    pub fn execute_shared(
        registry: &SharedRegistry<C>,
        id: CallbackId,
        reset_context: bool,
    ) -> Option<ExecutionReport> {
        let mut owner = match registry.try_borrow_mut() {
            Ok(owner) => owner,
            Err(_) => {
                log::warn!("Registry is busy; callback {} not executed", id);
                return None;
            }
        };
        let mut detached = owner.get_mut(id)?.detach();
        drop(owner);

        let report = detached.execute(reset_context);

        let mut owner = match registry.try_borrow_mut() {
            Ok(owner) => owner,
            Err(_) => {
                log::error!("Registry is busy; context of callback {} discarded", id);
                return Some(report);
            }
        };
        match owner.get_mut(id) {
            Some(callback) => callback.restore_context(detached.into_context()),
            None => log::trace!("Callback {} released during its own execution", id),
        }
        drop(owner);

        Some(report)
    }
}
