//! Configuration loading and validation

use anyhow::{Context, Result};
use callback_dispatch::DispatchConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Main host configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HostConfig {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub events: Vec<EventConfig>,
    #[serde(default)]
    pub callbacks: CallbacksConfig,
    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
}

/// An event the host registers at startup
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventConfig {
    pub name: String,
    /// Register `<name>.pre` / `<name>.post` as a callback pair
    #[serde(default)]
    pub paired: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CallbacksConfig {
    pub library: Option<PathBuf>,
    #[serde(default)]
    pub simple: Vec<SimpleCallbackConfig>,
    #[serde(default)]
    pub native: Vec<NativeCallbackConfig>,
}

/// Declarative listener attached by event name
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimpleCallbackConfig {
    pub event: String,
    pub action: SimpleAction,
    pub message: Option<String>,
    pub value: Option<Value>,
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimpleAction {
    /// Log `message` together with the context arguments
    Log,
    /// Store `value` as the invocation result
    SetResult,
    /// Block for `delay_ms`
    Sleep,
    /// Raise `message` as an error on the context
    Fail,
}

/// Exported function from `callbacks.library` attached by event name
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NativeCallbackConfig {
    pub event: String,
    pub function: String,
}

/// One step of the run sequence
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TriggerConfig {
    pub event: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default = "default_true")]
    pub reset_context: bool,
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

fn default_true() -> bool {
    true
}

fn default_repeat() -> usize {
    1
}

/// Problems found by [`validate_config`]
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Event '{0}' is declared more than once")]
    DuplicateEvent(String),

    #[error("Event names must not be empty")]
    EmptyEventName,

    #[error("Native callback '{0}' configured but no callbacks.library given")]
    MissingLibrary(String),

    #[error("Action '{action:?}' on event '{event}' requires '{field}'")]
    MissingField {
        event: String,
        action: SimpleAction,
        field: &'static str,
    },
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<HostConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: HostConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config).with_context(|| format!("Invalid config file: {:?}", path))?;

    Ok(config)
}

/// Check cross-references the TOML schema cannot express
///
/// Listeners and triggers naming an unknown event are allowed here; they are
/// reported when the host tries to attach or fire them.
pub fn validate_config(config: &HostConfig) -> std::result::Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for event in &config.events {
        if event.name.is_empty() {
            return Err(ConfigError::EmptyEventName);
        }
        if !seen.insert(event.name.as_str()) {
            return Err(ConfigError::DuplicateEvent(event.name.clone()));
        }
    }

    if config.callbacks.library.is_none() {
        if let Some(native) = config.callbacks.native.first() {
            return Err(ConfigError::MissingLibrary(native.function.clone()));
        }
    }

    for simple in &config.callbacks.simple {
        let field = match simple.action {
            SimpleAction::SetResult if simple.value.is_none() => Some("value"),
            SimpleAction::Sleep if simple.delay_ms.is_none() => Some("delay_ms"),
            _ => None,
        };
        if let Some(field) = field {
            return Err(ConfigError::MissingField {
                event: simple.event.clone(),
                action: simple.action,
                field,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [dispatch]
        slow_listener_threshold_ms = 2.5

        [[events]]
        name = "OnRoundStart"

        [[events]]
        name = "OnTakeDamage"
        paired = true

        [[callbacks.simple]]
        event = "OnRoundStart"
        action = "log"
        message = "round started"

        [[callbacks.simple]]
        event = "OnTakeDamage.pre"
        action = "set_result"
        value = { blocked = true }

        [[triggers]]
        event = "OnRoundStart"
        args = ["de_dust2", 1]
        repeat = 2

        [[triggers]]
        event = "OnTakeDamage.pre"
        reset_context = false
    "#;

    #[test]
    fn test_config_deserialization() {
        let config: HostConfig = toml::from_str(SAMPLE).unwrap();

        assert_eq!(config.dispatch.slow_listener_threshold_ms, 2.5);
        assert!(config.dispatch.trace_hook);
        assert_eq!(config.events.len(), 2);
        assert!(config.events[1].paired);
        assert_eq!(config.callbacks.simple[1].action, SimpleAction::SetResult);
        assert_eq!(
            config.callbacks.simple[1].value,
            Some(serde_json::json!({ "blocked": true }))
        );
        assert_eq!(config.triggers[0].args.len(), 2);
        assert_eq!(config.triggers[0].repeat, 2);
        assert!(config.triggers[0].reset_context);
        assert_eq!(config.triggers[1].repeat, 1);
        assert!(!config.triggers[1].reset_context);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: HostConfig = toml::from_str("").unwrap();
        assert!(config.events.is_empty());
        assert_eq!(config.dispatch, DispatchConfig::default());
    }

    #[test]
    fn test_validation_errors() {
        let duplicate: HostConfig = toml::from_str(
            r#"
            [[events]]
            name = "OnTick"
            [[events]]
            name = "OnTick"
            "#,
        )
        .unwrap();
        assert_eq!(
            validate_config(&duplicate),
            Err(ConfigError::DuplicateEvent("OnTick".to_string()))
        );

        let native: HostConfig = toml::from_str(
            r#"
            [[callbacks.native]]
            event = "OnTick"
            function = "on_tick"
            "#,
        )
        .unwrap();
        assert_eq!(
            validate_config(&native),
            Err(ConfigError::MissingLibrary("on_tick".to_string()))
        );

        let sleep: HostConfig = toml::from_str(
            r#"
            [[callbacks.simple]]
            event = "OnTick"
            action = "sleep"
            "#,
        )
        .unwrap();
        assert!(matches!(
            validate_config(&sleep),
            Err(ConfigError::MissingField { field: "delay_ms", .. })
        ));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.triggers.len(), 2);
    }

    #[test]
    fn test_load_config_errors() {
        assert!(load_config(Path::new("/nonexistent/host.toml")).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[[events]]\nname = \"\"\n").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("must not be empty"));
    }
}
