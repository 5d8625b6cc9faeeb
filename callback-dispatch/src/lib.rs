//! Callback Dispatch Library
//!
//! A named-event callback dispatch core: a host creates named callbacks in a
//! registry, external code attaches and detaches listeners by name, and the
//! host raises an event by executing the callback.
//!
//! # Architecture
//!
//! - [`CallbackRegistry`] owns every [`NamedCallback`] and hands out
//!   [`CallbackId`] handles. Releasing an unknown or already released handle
//!   is a logged no-op.
//! - [`NamedCallback`] owns an ordered [`Listener`] sequence and one call
//!   context. `execute()` probes the context, runs listeners in insertion
//!   order and warns about any listener slower than the configured threshold.
//! - [`CallbackPair`] creates a "pre" and a "post" callback together and
//!   releases both when dropped. Its halves run through
//!   [`CallbackRegistry::execute_shared`], so listeners may use the shared
//!   registry while they run.
//! - [`CallContext`] is the seam to the marshaled argument representation;
//!   [`ScriptContext`] is the default one.
//!
//! The library does NOT:
//! - Synchronize access (everything runs on the host's event thread)
//! - Retry or interrupt listeners
//! - Persist registrations
//! - Install a logger (diagnostics go through the `log` facade)
//!
//! # Example Usage
//!
//! ```
//! use callback_dispatch::{CallbackRegistry, Listener, ScriptContext};
//!
//! let mut registry = CallbackRegistry::new();
//! let round_start = registry.create_callback("OnRoundStart");
//!
//! // External code attaches listeners by name
//! let listener = Listener::new(|ctx: &mut ScriptContext| {
//!     let round: u32 = ctx.arg(0).unwrap_or_default();
//!     println!("Round {} started", round);
//! });
//! assert!(registry.try_add_function("OnRoundStart", listener.clone()));
//!
//! // The host raises the event
//! let callback = registry.get_mut(round_start).unwrap();
//! callback.context_mut().push_arg(3).unwrap();
//! let report = callback.execute(true);
//! assert_eq!(report.invoked, 1);
//!
//! assert!(registry.try_remove_function("OnRoundStart", &listener));
//! registry.release_callback(round_start);
//! ```

// Public modules
pub mod callback;
pub mod config;
pub mod context;
pub mod listener;
pub mod pair;
pub mod registry;
pub mod trace;
pub mod types;

// Re-export main types for convenience
pub use callback::NamedCallback;
pub use config::{DispatchConfig, DEFAULT_SLOW_LISTENER_THRESHOLD_MS};
pub use context::{is_context_safe, CallContext, ScriptContext};
pub use listener::Listener;
pub use pair::CallbackPair;
pub use registry::{CallbackRegistry, RegistryStats, SharedRegistry};
pub use trace::record_callback_trace;
pub use types::{
    CallbackId, ContextError, Diagnostic, DispatchError, ExecutionReport, ListenerId, Result,
    Timestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
