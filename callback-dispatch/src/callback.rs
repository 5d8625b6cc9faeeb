//! Named callbacks
//!
//! A named callback owns an ordered listener sequence and the call context the
//! listeners are invoked with. Execution validates the context first, runs
//! every listener in insertion order and times each one individually.

use crate::context::{CallContext, ScriptContext};
use crate::listener::Listener;
use crate::trace::record_callback_trace;
use crate::types::{CallbackId, Diagnostic, ExecutionReport};
use std::time::{Duration, Instant};

/// Message raised on the context when execution is aborted
const INVALID_CONTEXT_ERROR: &str = "Callback execution aborted due to invalid context";

/// A named event with its listeners and call context
///
/// Instances are created and destroyed exclusively by a
/// [`CallbackRegistry`](crate::CallbackRegistry).
pub struct NamedCallback<C = ScriptContext> {
    id: CallbackId,
    name: String,
    profile_name: String,
    listeners: Vec<Listener<C>>,
    context: C,
    slow_threshold: Duration,
    trace_hook: bool,
}

impl<C: CallContext> NamedCallback<C> {
    pub(crate) fn new(
        id: CallbackId,
        name: String,
        context: C,
        slow_threshold: Duration,
        trace_hook: bool,
    ) -> Self {
        let profile_name = format!("callback::execute::{}", name);
        Self {
            id,
            name,
            profile_name,
            listeners: Vec::new(),
            context,
            slow_threshold,
            trace_hook,
        }
    }

    pub fn id(&self) -> CallbackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Label used for profiling and trace correlation
    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Listeners in execution order
    pub fn listeners(&self) -> &[Listener<C>] {
        &self.listeners
    }

    pub fn contains_listener(&self, listener: &Listener<C>) -> bool {
        self.listeners.contains(listener)
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Append a listener; duplicates are kept
    pub fn add_listener(&mut self, listener: Listener<C>) {
        self.listeners.push(listener);
    }

    /// Remove the first occurrence of `listener`
    ///
    /// Returns `true` if the sequence shrank. Relative order of the remaining
    /// listeners is preserved.
    pub fn remove_listener(&mut self, listener: &Listener<C>) -> bool {
        match self.listeners.iter().position(|l| l == listener) {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Run every listener in order
    ///
    /// If the context fails its probe, an error is raised on the context, a
    /// warning is logged and no listener runs. Listeners slower than the
    /// configured threshold are reported but never interrupted.
    pub fn execute(&mut self, reset_context: bool) -> ExecutionReport {
        let dispatch = Dispatch {
            id: self.id,
            name: &self.name,
            profile_name: &self.profile_name,
            listeners: &self.listeners,
            slow_threshold: self.slow_threshold,
            trace_hook: self.trace_hook,
        };
        dispatch.run(&mut self.context, reset_context)
    }

    /// Reset the owned context
    pub fn reset(&mut self) {
        self.context.reset();
    }
}

impl<C: CallContext + Default> NamedCallback<C> {
    /// Move the context and a snapshot of the listeners out for one execution
    ///
    /// The callback keeps a default context until
    /// [`restore_context`](Self::restore_context) is called.
    pub(crate) fn detach(&mut self) -> DetachedCallback<C> {
        DetachedCallback {
            id: self.id,
            name: self.name.clone(),
            profile_name: self.profile_name.clone(),
            listeners: self.listeners.clone(),
            context: std::mem::take(&mut self.context),
            slow_threshold: self.slow_threshold,
            trace_hook: self.trace_hook,
        }
    }

    pub(crate) fn restore_context(&mut self, context: C) {
        self.context = context;
    }
}

/// A callback lifted out of its registry while its listeners run
///
/// Listeners added or removed in the meantime take effect on the next
/// execution.
pub(crate) struct DetachedCallback<C> {
    id: CallbackId,
    name: String,
    profile_name: String,
    listeners: Vec<Listener<C>>,
    context: C,
    slow_threshold: Duration,
    trace_hook: bool,
}

impl<C: CallContext> DetachedCallback<C> {
    pub(crate) fn execute(&mut self, reset_context: bool) -> ExecutionReport {
        let dispatch = Dispatch {
            id: self.id,
            name: &self.name,
            profile_name: &self.profile_name,
            listeners: &self.listeners,
            slow_threshold: self.slow_threshold,
            trace_hook: self.trace_hook,
        };
        dispatch.run(&mut self.context, reset_context)
    }

    pub(crate) fn into_context(self) -> C {
        self.context
    }
}

/// Borrowed view of everything one execution needs besides the context
struct Dispatch<'a, C> {
    id: CallbackId,
    name: &'a str,
    profile_name: &'a str,
    listeners: &'a [Listener<C>],
    slow_threshold: Duration,
    trace_hook: bool,
}

impl<C: CallContext> Dispatch<'_, C> {
    fn run(&self, context: &mut C, reset_context: bool) -> ExecutionReport {
        let mut report = ExecutionReport::new(self.id, self.name);

        if let Err(e) = context.probe() {
            context.raise_error(INVALID_CONTEXT_ERROR);
            let diagnostic = Diagnostic::InvalidContext {
                callback: self.name.to_string(),
                reason: e.to_string(),
            };
            log::warn!("{}", diagnostic);
            report.aborted = true;
            report.diagnostics.push(diagnostic);
            return report;
        }

        if self.trace_hook {
            record_callback_trace(self.name, self.listeners.len(), self.profile_name, None);
        }

        for (index, listener) in self.listeners.iter().enumerate() {
            let start = Instant::now();
            listener.invoke(context);
            let elapsed = start.elapsed();
            report.invoked += 1;

            if elapsed > self.slow_threshold {
                let diagnostic = Diagnostic::SlowListener {
                    callback: self.name.to_string(),
                    index,
                    elapsed_ms: elapsed.as_secs_f64() * 1000.0,
                };
                log::warn!("{}", diagnostic);
                report.diagnostics.push(diagnostic);
            }
        }

        if reset_context {
            context.reset();
            report.context_reset = true;
        }

        log::trace!(
            "Executed callback '{}' ({} listener(s))",
            self.name,
            report.invoked
        );
        report
    }
}

impl<C> std::fmt::Debug for NamedCallback<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedCallback")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
