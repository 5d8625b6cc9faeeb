//! Dispatch configuration types
//!
//! This module defines the small set of knobs the registry hands down to every
//! named callback it creates. Anything host-specific (which events exist, what
//! listeners to attach) belongs to the application layer.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-listener time budget before a warning is emitted
pub const DEFAULT_SLOW_LISTENER_THRESHOLD_MS: f64 = 5.0;

/// Configuration for the callback registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Listener run time (ms) above which a slow-listener warning is emitted
    #[serde(default = "default_slow_listener_threshold_ms")]
    pub slow_listener_threshold_ms: f64,

    /// Whether `execute()` calls the diagnostic trace hook
    #[serde(default = "default_true")]
    pub trace_hook: bool,
}

fn default_true() -> bool {
    true
}

fn default_slow_listener_threshold_ms() -> f64 {
    DEFAULT_SLOW_LISTENER_THRESHOLD_MS
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            slow_listener_threshold_ms: default_slow_listener_threshold_ms(),
            trace_hook: true,
        }
    }
}

impl DispatchConfig {
    /// Create a new dispatch configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the slow-listener threshold in milliseconds
    pub fn with_slow_listener_threshold_ms(mut self, threshold_ms: f64) -> Self {
        self.slow_listener_threshold_ms = threshold_ms;
        self
    }

    /// Builder method: enable or disable the diagnostic trace hook
    pub fn with_trace_hook(mut self, enabled: bool) -> Self {
        self.trace_hook = enabled;
        self
    }

    /// Slow-listener threshold as a `Duration`
    ///
    /// Negative or non-finite values fall back to the default threshold.
    pub fn slow_listener_threshold(&self) -> Duration {
        let ms = self.slow_listener_threshold_ms;
        if ms.is_finite() && ms >= 0.0 {
            if let Ok(threshold) = Duration::try_from_secs_f64(ms / 1000.0) {
                return threshold;
            }
        }

        log::warn!(
            "Invalid slow listener threshold {} ms, using {} ms",
            ms,
            DEFAULT_SLOW_LISTENER_THRESHOLD_MS
        );
        Duration::from_micros((DEFAULT_SLOW_LISTENER_THRESHOLD_MS * 1000.0) as u64)
    }
}
