//! Call contexts
//!
//! A call context carries the arguments and result of one callback invocation.
//! The dispatch core only needs three things from it: a safety probe, a reset,
//! and a way to signal an error back to whoever raised the event. Everything
//! else about the representation is up to the implementor.
//!
//! [`ScriptContext`] is the marshaled context used by default: a stack of
//! JSON-encoded arguments plus result and native-error slots.

use crate::types::{ContextError, DispatchError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::ffi::c_void;

/// Interface the dispatch core requires from a call context
pub trait CallContext {
    /// Probe the context's result slot
    ///
    /// Must not panic. An `Err` means listeners must not be invoked with this
    /// context: [`ContextError::Invalidated`] when the whole context is gone,
    /// [`ContextError::ResultUnavailable`] when only the result slot is.
    fn probe(&self) -> std::result::Result<(), ContextError>;

    /// Return the context to its empty, valid state
    fn reset(&mut self);

    /// Record an error visible to the caller that triggered the event
    fn raise_error(&mut self, message: &str);
}

/// Check whether a context can be dispatched
///
/// Returns `false` and logs a warning instead of propagating the probe failure.
pub fn is_context_safe<C: CallContext + ?Sized>(context: &C) -> bool {
    match context.probe() {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Context is invalid ({})", e);
            false
        }
    }
}

/// Default marshaled call context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptContext {
    args: Vec<Value>,
    result: Option<Value>,
    result_released: Option<String>,
    native_error: Option<String>,
    invalidated: Option<String>,
}

impl ScriptContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context pre-loaded with arguments
    pub fn with_args(args: Vec<Value>) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    /// Push an argument onto the context
    pub fn push_arg<T: Serialize>(&mut self, value: T) -> Result<()> {
        self.args.push(serde_json::to_value(value)?);
        Ok(())
    }

    /// Read the argument at `index` as `T`
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        let value = self
            .args
            .get(index)
            .ok_or(DispatchError::ArgumentOutOfRange {
                index,
                count: self.args.len(),
            })?;

        T::deserialize(value).map_err(|source| DispatchError::ArgumentType { index, source })
    }

    /// Number of arguments currently on the context
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Raw arguments
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Store the invocation result, replacing any previous one
    ///
    /// Fails once the result slot has been released.
    pub fn set_result<T: Serialize>(&mut self, value: T) -> Result<()> {
        if let Some(reason) = &self.result_released {
            return Err(ContextError::ResultUnavailable(reason.clone()).into());
        }
        self.result = Some(serde_json::to_value(value)?);
        Ok(())
    }

    /// Read the invocation result as `T`, if one was set
    pub fn result<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.result {
            Some(value) => Ok(Some(T::deserialize(value)?)),
            None => Ok(None),
        }
    }

    /// Raw result slot
    pub fn raw_result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Error raised on this context since the last reset
    pub fn native_error(&self) -> Option<&str> {
        self.native_error.as_deref()
    }

    /// Drop the result slot until the next reset
    ///
    /// Any stored result is discarded and the context stops passing its probe.
    pub fn release_result(&mut self, reason: impl Into<String>) {
        self.result = None;
        self.result_released = Some(reason.into());
    }

    /// Put the context into the invalid state until the next reset
    pub fn invalidate(&mut self, reason: impl Into<String>) {
        self.invalidated = Some(reason.into());
    }

    pub fn is_valid(&self) -> bool {
        self.probe().is_ok()
    }

    /// Opaque handle for native invocation mechanisms
    ///
    /// Only valid while this context is neither moved nor dropped.
    pub fn as_raw(&mut self) -> *mut c_void {
        self as *mut Self as *mut c_void
    }
}

impl CallContext for ScriptContext {
    fn probe(&self) -> std::result::Result<(), ContextError> {
        if let Some(reason) = &self.invalidated {
            return Err(ContextError::Invalidated(reason.clone()));
        }
        match &self.result_released {
            Some(reason) => Err(ContextError::ResultUnavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn reset(&mut self) {
        self.args.clear();
        self.result = None;
        self.result_released = None;
        self.native_error = None;
        self.invalidated = None;
    }

    fn raise_error(&mut self, message: &str) {
        self.native_error = Some(message.to_string());
    }
}
