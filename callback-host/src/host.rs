//! Host runtime
//!
//! Owns the registry for the lifetime of a run: registers the configured
//! events, attaches listeners by name and fires the trigger sequence.

use crate::callbacks::{simple_listener, NativeLibrary};
use crate::config::{HostConfig, TriggerConfig};
use crate::report::{RunSummary, TriggerOutcome};
use anyhow::Result;
use callback_dispatch::{CallbackPair, CallbackRegistry, Listener, SharedRegistry};
use std::path::Path;

/// A registry populated from a [`HostConfig`]
pub struct Host {
    registry: SharedRegistry,
    pairs: Vec<CallbackPair>,
    // Keeps the library mapped even if every native listener is removed
    native: Option<NativeLibrary>,
    unattached: Vec<String>,
}

impl Host {
    /// Register every configured event and attach every configured listener
    pub fn from_config(config: &HostConfig) -> Result<Self> {
        let registry: SharedRegistry =
            CallbackRegistry::with_config(config.dispatch.clone()).into_shared();
        let mut pairs = Vec::new();

        for event in &config.events {
            if event.paired {
                log::debug!("Registering paired event {}", event.name);
                pairs.push(CallbackPair::named(&registry, &event.name));
            } else {
                log::debug!("Registering event {}", event.name);
                registry.borrow_mut().create_callback(event.name.as_str());
            }
        }

        let mut host = Self {
            registry,
            pairs,
            native: None,
            unattached: Vec::new(),
        };

        for simple in &config.callbacks.simple {
            host.attach(&simple.event, simple_listener(simple));
        }

        if let Some(path) = &config.callbacks.library {
            let library = NativeLibrary::open(path)?;
            for native in &config.callbacks.native {
                let listener = library.listener(&native.function)?;
                host.attach(&native.event, listener);
            }
            host.native = Some(library);
        }

        Ok(host)
    }

    fn attach(&mut self, event: &str, listener: Listener) {
        if !self.registry.borrow_mut().try_add_function(event, listener) {
            log::warn!("Cannot attach listener: event '{}' is not registered", event);
            self.unattached.push(event.to_string());
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn pairs(&self) -> &[CallbackPair] {
        &self.pairs
    }

    /// Path of the loaded native callback library, if any
    pub fn native_library(&self) -> Option<&Path> {
        self.native.as_ref().map(NativeLibrary::path)
    }

    /// Events that listeners were configured for but that do not exist
    pub fn unattached(&self) -> &[String] {
        &self.unattached
    }

    /// Fire every trigger in order
    pub fn run(&self, triggers: &[TriggerConfig]) -> RunSummary {
        let mut summary = RunSummary::new(self.unattached.clone());
        for trigger in triggers {
            for _ in 0..trigger.repeat {
                summary.record(self.fire(trigger));
            }
        }
        summary
    }

    /// Push the trigger's arguments and execute the named callback
    pub fn fire(&self, trigger: &TriggerConfig) -> TriggerOutcome {
        let mut registry = self.registry.borrow_mut();
        let Some(id) = registry.find_callback(&trigger.event) else {
            log::warn!("Trigger skipped: event '{}' is not registered", trigger.event);
            return TriggerOutcome::missing(&trigger.event);
        };
        if let Some(callback) = registry.get_mut(id) {
            let context = callback.context_mut();
            for arg in &trigger.args {
                if let Err(e) = context.push_arg(arg) {
                    log::error!("[{}] Failed to push argument: {}", trigger.event, e);
                }
            }
        }
        drop(registry);

        let Some(report) = CallbackRegistry::execute_shared(&self.registry, id, false) else {
            return TriggerOutcome::missing(&trigger.event);
        };

        // Read the outputs before a reset wipes them
        let mut registry = self.registry.borrow_mut();
        let Some(callback) = registry.get_mut(id) else {
            log::debug!("[{}] Callback released by one of its listeners", trigger.event);
            return TriggerOutcome {
                report: Some(report),
                ..TriggerOutcome::missing(&trigger.event)
            };
        };
        let aborted = report.aborted;
        let outcome = TriggerOutcome::executed(report, callback.context());
        if trigger.reset_context && !aborted {
            callback.reset();
        }
        outcome
    }

    pub fn print_listing(&self) {
        self.registry.borrow().print_debug_listing();
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        // Pairs release through the registry before it goes away
        self.pairs.clear();
        log::debug!("Host shut down: {:?}", self.registry.borrow().stats());
    }
}
