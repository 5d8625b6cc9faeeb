//! Core types for the callback dispatch library
//!
//! This module defines the handles, diagnostics and error types shared by the
//! registry, the named callbacks and the callback pairs. Nothing in here owns a
//! callback; these are the values that flow between the host and the core.

use chrono::{DateTime, Utc};
use std::fmt;

/// Timestamp type used throughout the library
pub type Timestamp = DateTime<Utc>;

/// Result type for context marshaling operations
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Handle to a named callback owned by a [`CallbackRegistry`](crate::CallbackRegistry)
///
/// Ids are issued monotonically by the registry and are never reused, so a
/// handle kept past `release_callback` simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(pub(crate) u64);

impl CallbackId {
    /// Raw numeric value of the handle
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Token identifying one registered listener handle
///
/// Issued by [`Listener::new`](crate::Listener::new); clones of a listener
/// share the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Why a call context failed its safety probe
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContextError {
    #[error("context was invalidated: {0}")]
    Invalidated(String),

    #[error("result slot is unreadable: {0}")]
    ResultUnavailable(String),
}

/// Errors raised while marshaling values in and out of a call context
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Argument index {index} out of range (context holds {count})")]
    ArgumentOutOfRange { index: usize, count: usize },

    #[error("Failed to convert argument {index}: {source}")]
    ArgumentType {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to marshal value: {0}")]
    Marshal(#[from] serde_json::Error),

    #[error("Context unavailable: {0}")]
    Context(#[from] ContextError),
}

/// Warning-level event produced while executing a callback
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Execution was aborted before any listener ran
    InvalidContext {
        /// Name of the callback whose context failed the probe
        callback: String,
        /// Probe failure description
        reason: String,
    },

    /// A single listener ran longer than the slow-listener threshold
    SlowListener {
        /// Name of the callback the listener is attached to
        callback: String,
        /// Position of the listener in the callback's sequence
        index: usize,
        /// Wall-clock time spent in the listener, in milliseconds
        elapsed_ms: f64,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InvalidContext { callback, reason } => write!(
                f,
                "Callback '{}' execution aborted: context invalid ({})",
                callback, reason
            ),
            Diagnostic::SlowListener {
                callback,
                index,
                elapsed_ms,
            } => write!(
                f,
                "Callback '{}' listener {} exceeded time limit: {:.3} ms",
                callback, index, elapsed_ms
            ),
        }
    }
}

/// Outcome of one `execute()` call
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    /// Callback that was executed
    pub callback_id: CallbackId,
    /// Name of the callback at execution time
    pub callback: String,
    /// When the execution started
    pub started_at: Timestamp,
    /// Number of listener invocations performed
    pub invoked: usize,
    /// True if the context failed its probe and no listener ran
    pub aborted: bool,
    /// True if the context was reset after the listeners ran
    pub context_reset: bool,
    /// Warnings emitted during this execution, in emission order
    pub diagnostics: Vec<Diagnostic>,
}

impl ExecutionReport {
    pub(crate) fn new(callback_id: CallbackId, callback: &str) -> Self {
        Self {
            callback_id,
            callback: callback.to_string(),
            started_at: Utc::now(),
            invoked: 0,
            aborted: false,
            context_reset: false,
            diagnostics: Vec::new(),
        }
    }

    /// All warnings emitted during the execution
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Slow-listener warnings as `(index, elapsed_ms)` pairs
    pub fn slow_listeners(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::SlowListener {
                index, elapsed_ms, ..
            } => Some((*index, *elapsed_ms)),
            _ => None,
        })
    }

    /// True if nothing was aborted and no warning was emitted
    pub fn is_clean(&self) -> bool {
        !self.aborted && self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let invalid = Diagnostic::InvalidContext {
            callback: "OnTick".to_string(),
            reason: "context was invalidated: stale".to_string(),
        };
        assert_eq!(
            invalid.to_string(),
            "Callback 'OnTick' execution aborted: context invalid (context was invalidated: stale)"
        );

        let slow = Diagnostic::SlowListener {
            callback: "OnRoundStart".to_string(),
            index: 2,
            elapsed_ms: 7.25,
        };
        assert_eq!(
            slow.to_string(),
            "Callback 'OnRoundStart' listener 2 exceeded time limit: 7.250 ms"
        );
    }

    #[test]
    fn test_report_helpers() {
        let mut report = ExecutionReport::new(CallbackId(3), "OnTick");
        assert!(report.is_clean());

        report.diagnostics.push(Diagnostic::SlowListener {
            callback: "OnTick".to_string(),
            index: 1,
            elapsed_ms: 12.5,
        });
        assert!(!report.is_clean());
        assert_eq!(report.slow_listeners().collect::<Vec<_>>(), vec![(1, 12.5)]);
        assert_eq!(report.warnings().len(), 1);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(CallbackId(7).to_string(), "#7");
        assert_eq!(ListenerId(4).to_string(), "listener#4");
        assert_eq!(CallbackId(9).as_u64(), 9);
    }
}
