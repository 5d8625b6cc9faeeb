//! Listener construction
//!
//! Implements both simple declarative listeners and native listeners exported
//! from a dynamic library.

use crate::config::{SimpleAction, SimpleCallbackConfig};
use anyhow::{Context, Result};
use callback_dispatch::{CallContext, Listener, ScriptContext};
use libloading::{Library, Symbol};
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;
use std::time::Duration;

/// Signature every native listener must export
///
/// The argument is the opaque handle from [`ScriptContext::as_raw`].
pub type NativeCallbackFn = unsafe extern "C" fn(context: *mut c_void);

/// Build a listener from a declarative config entry
pub fn simple_listener(config: &SimpleCallbackConfig) -> Listener {
    let event = config.event.clone();
    let message = config.message.clone().unwrap_or_default();

    match config.action {
        SimpleAction::Log => Listener::new(move |ctx: &mut ScriptContext| {
            log::info!("[{}] {} args={:?}", event, message, ctx.args());
        }),
        SimpleAction::SetResult => {
            let value = config.value.clone().unwrap_or_default();
            Listener::new(move |ctx: &mut ScriptContext| {
                if let Err(e) = ctx.set_result(&value) {
                    log::error!("[{}] Failed to set result: {}", event, e);
                }
            })
        }
        SimpleAction::Sleep => {
            let delay = Duration::from_millis(config.delay_ms.unwrap_or_default());
            Listener::new(move |_ctx: &mut ScriptContext| {
                log::debug!("[{}] Sleeping for {:?}", event, delay);
                thread::sleep(delay);
            })
        }
        SimpleAction::Fail => Listener::new(move |ctx: &mut ScriptContext| {
            let reason = if message.is_empty() {
                format!("{} listener failed", event)
            } else {
                message.clone()
            };
            ctx.raise_error(&reason);
        }),
    }
}

/// Dynamic library exporting native listeners
pub struct NativeLibrary {
    path: PathBuf,
    library: Rc<Library>,
}

impl NativeLibrary {
    /// Load the library at `path`
    pub fn open(path: &Path) -> Result<Self> {
        log::info!("Loading callback library: {:?}", path);

        // SAFETY: loading runs the library's initializers; the library is
        // operator-supplied and trusted the same way the config file is.
        let library = unsafe { Library::new(path) }
            .with_context(|| format!("Failed to load callback library: {:?}", path))?;

        Ok(Self {
            path: path.to_path_buf(),
            library: Rc::new(library),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve `function` and wrap it in a listener
    ///
    /// The returned listener keeps the library loaded for as long as it lives.
    pub fn listener(&self, function: &str) -> Result<Listener> {
        // SAFETY: the exported symbol is required to match `NativeCallbackFn`.
        let func: NativeCallbackFn = unsafe {
            let symbol: Symbol<NativeCallbackFn> = self
                .library
                .get(function.as_bytes())
                .with_context(|| format!("Symbol '{}' not found in {:?}", function, self.path))?;
            *symbol
        };

        let library = Rc::clone(&self.library);
        Ok(Listener::new(move |ctx: &mut ScriptContext| {
            let _loaded = &library;
            // SAFETY: `library` is still loaded, and the handle points at a
            // live context for the duration of the call.
            unsafe { func(ctx.as_raw()) }
        }))
    }
}
