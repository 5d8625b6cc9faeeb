// End-to-end dispatch scenarios against the public API
use callback_dispatch::{
    CallContext, CallbackPair, CallbackRegistry, ContextError, Diagnostic, DispatchConfig,
    Listener, ScriptContext,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

type CallLog = Rc<RefCell<Vec<String>>>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn recorder(log: &CallLog, tag: &str) -> Listener {
    let log = Rc::clone(log);
    let tag = tag.to_string();
    Listener::new(move |_ctx: &mut ScriptContext| log.borrow_mut().push(tag.clone()))
}

fn sleeper(log: &CallLog, tag: &str, delay: Duration) -> Listener {
    let log = Rc::clone(log);
    let tag = tag.to_string();
    Listener::new(move |_ctx: &mut ScriptContext| {
        thread::sleep(delay);
        log.borrow_mut().push(tag.clone());
    })
}

#[test]
fn scenario_a_listeners_run_in_insertion_order() {
    init_logging();
    let calls = CallLog::default();
    let mut registry = CallbackRegistry::new();
    let id = registry.create_callback("OnRoundStart");

    assert!(registry.try_add_function("OnRoundStart", recorder(&calls, "L1")));
    assert!(registry.try_add_function("OnRoundStart", recorder(&calls, "L2")));

    registry
        .get_mut(id)
        .unwrap()
        .context_mut()
        .push_arg("de_inferno")
        .unwrap();
    let before = registry.get(id).unwrap().context().clone();

    let report = registry.execute(id, false).unwrap();

    assert_eq!(*calls.borrow(), vec!["L1", "L2"]);
    assert_eq!(report.invoked, 2);
    assert!(!report.aborted);
    assert_eq!(registry.get(id).unwrap().context(), &before);
}

#[test]
fn scenario_b_empty_callback_executes_cleanly() {
    init_logging();
    let mut registry = CallbackRegistry::new();
    registry.create_callback("OnTick");

    let report = registry.execute_by_name("OnTick", true).unwrap();

    assert_eq!(report.invoked, 0);
    assert!(report.is_clean());
    assert!(report.context_reset);
}

#[test]
fn scenario_c_invalid_context_skips_every_listener() {
    init_logging();
    let calls = CallLog::default();
    let mut registry = CallbackRegistry::new();
    let id = registry.create_callback("OnPlayerHurt");
    registry.try_add_function("OnPlayerHurt", recorder(&calls, "L1"));
    registry.try_add_function("OnPlayerHurt", recorder(&calls, "L2"));

    registry
        .get_mut(id)
        .unwrap()
        .context_mut()
        .invalidate("native frame unwound");

    let report = registry.execute(id, true).unwrap();

    assert!(calls.borrow().is_empty());
    assert_eq!(report.invoked, 0);
    assert!(report.aborted);
    assert_eq!(report.warnings().len(), 1);
    assert!(matches!(
        &report.warnings()[0],
        Diagnostic::InvalidContext { callback, .. } if callback == "OnPlayerHurt"
    ));
    assert!(registry.get(id).unwrap().context().native_error().is_some());
}

#[test]
fn scenario_d_pair_halves_released_together() {
    init_logging();
    let registry = CallbackRegistry::new().into_shared();

    let pair = CallbackPair::new(&registry);
    let pre = pair.pre().unwrap();
    let post = pair.post().unwrap();
    assert!(registry.borrow().get(pre).is_some());
    assert!(registry.borrow().get(post).is_some());

    drop(pair);

    assert!(registry.borrow().get(pre).is_none());
    assert!(registry.borrow().get(post).is_none());
    assert!(registry.borrow().is_empty());
}

#[test]
fn scenario_e_disabled_pair_never_touches_registry() {
    init_logging();
    let registry = CallbackRegistry::new().into_shared();
    let before = registry.borrow().stats();

    let pair = CallbackPair::with_callbacks(&registry, false);
    assert!(pair.pre().is_none() && pair.post().is_none());
    drop(pair);

    let disabled: CallbackPair = CallbackPair::disabled();
    drop(disabled);

    assert_eq!(registry.borrow().stats(), before);
    assert_eq!(Rc::strong_count(&registry), 1);
}

#[test]
fn slow_listeners_are_reported_individually() {
    init_logging();
    let calls = CallLog::default();
    let mut registry = CallbackRegistry::new();
    let id = registry.create_callback("OnWeaponFire");

    registry.try_add_function("OnWeaponFire", recorder(&calls, "fast-0"));
    registry.try_add_function(
        "OnWeaponFire",
        sleeper(&calls, "slow-1", Duration::from_millis(20)),
    );
    registry.try_add_function("OnWeaponFire", recorder(&calls, "fast-2"));
    registry.try_add_function(
        "OnWeaponFire",
        sleeper(&calls, "slow-3", Duration::from_millis(12)),
    );

    let report = registry.execute(id, false).unwrap();

    // Slow listeners are observed, never interrupted
    assert_eq!(*calls.borrow(), vec!["fast-0", "slow-1", "fast-2", "slow-3"]);
    assert_eq!(report.invoked, 4);

    let slow: Vec<_> = report.slow_listeners().collect();
    assert_eq!(slow.len(), 2);
    assert_eq!(slow[0].0, 1);
    assert!(slow[0].1 >= 20.0);
    assert_eq!(slow[1].0, 3);
    assert!(slow[1].1 >= 12.0);
}

#[test]
fn slow_listener_threshold_is_configurable() {
    init_logging();
    let calls = CallLog::default();
    let config = DispatchConfig::new().with_slow_listener_threshold_ms(1_000.0);
    let mut registry: CallbackRegistry = CallbackRegistry::with_config(config);
    registry.create_callback("OnTick");
    registry.try_add_function("OnTick", sleeper(&calls, "slow", Duration::from_millis(10)));

    let report = registry.execute_by_name("OnTick", false).unwrap();

    assert_eq!(report.invoked, 1);
    assert!(report.is_clean());
}

#[test]
fn remove_listener_drops_exactly_one_occurrence() {
    init_logging();
    let calls = CallLog::default();
    let mut registry = CallbackRegistry::new();
    let id = registry.create_callback("OnChat");
    let repeated = recorder(&calls, "repeated");
    let other = recorder(&calls, "other");

    registry.try_add_function("OnChat", repeated.clone());
    registry.try_add_function("OnChat", other.clone());
    registry.try_add_function("OnChat", repeated.clone());

    assert!(registry.try_remove_function("OnChat", &repeated));
    assert_eq!(registry.get(id).unwrap().listener_count(), 2);

    registry.execute(id, false);
    assert_eq!(*calls.borrow(), vec!["other", "repeated"]);

    assert!(registry.try_remove_function("OnChat", &repeated));
    assert!(!registry.try_remove_function("OnChat", &repeated));
    assert_eq!(registry.get(id).unwrap().listener_count(), 1);
}

#[test]
fn lookup_misses_leave_registry_untouched() {
    init_logging();
    let calls = CallLog::default();
    let mut registry = CallbackRegistry::new();
    registry.create_callback("OnRoundEnd");
    registry.try_add_function("OnRoundEnd", recorder(&calls, "L1"));
    let before = registry.stats();

    assert_eq!(registry.find_callback("OnRoundStart"), None);
    assert!(!registry.try_add_function("OnRoundStart", recorder(&calls, "L2")));
    assert!(!registry.try_remove_function("OnRoundStart", &recorder(&calls, "L1")));

    assert_eq!(registry.stats(), before);
    assert!(calls.borrow().is_empty());
}

#[test]
fn duplicate_names_find_first_created() {
    init_logging();
    let mut registry = CallbackRegistry::new();
    let first = registry.create_callback("OnTick");
    let second = registry.create_callback("OnTick");

    for _ in 0..3 {
        assert_eq!(registry.find_callback("OnTick"), Some(first));
    }
    assert!(registry.get(second).is_some());
}

#[test]
fn double_release_is_a_no_op() {
    init_logging();
    let mut registry = CallbackRegistry::new();
    let id = registry.create_callback("OnTick");

    assert!(registry.release_callback(id));
    assert!(!registry.release_callback(id));
    assert_eq!(registry.find_callback("OnTick"), None);
    assert_eq!(registry.stats().released, 1);
}

/// Context whose result slot faults once `broken` is set
#[derive(Default)]
struct FlakyContext {
    broken: bool,
    resets: usize,
    errors: Vec<String>,
}

impl CallContext for FlakyContext {
    fn probe(&self) -> Result<(), ContextError> {
        if self.broken {
            Err(ContextError::ResultUnavailable("slot freed".to_string()))
        } else {
            Ok(())
        }
    }

    fn reset(&mut self) {
        self.resets += 1;
    }

    fn raise_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

#[test]
fn custom_context_implementations_are_supported() {
    init_logging();
    let hits = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&hits);
    let mut registry: CallbackRegistry<FlakyContext> =
        CallbackRegistry::with_config(DispatchConfig::default());
    let id = registry.create_callback("OnFlaky");
    registry.try_add_function(
        "OnFlaky",
        Listener::new(move |_ctx: &mut FlakyContext| *counter.borrow_mut() += 1),
    );

    let report = registry.execute(id, true).unwrap();
    assert_eq!(report.invoked, 1);
    assert_eq!(registry.get(id).unwrap().context().resets, 1);

    registry.get_mut(id).unwrap().context_mut().broken = true;
    let report = registry.execute(id, true).unwrap();
    assert!(report.aborted);
    assert_eq!(*hits.borrow(), 1);

    let context = registry.get(id).unwrap().context();
    assert_eq!(context.errors.len(), 1);
    assert_eq!(context.resets, 1);
}

#[test]
fn released_result_slot_aborts_execution() {
    init_logging();
    let calls = CallLog::default();
    let mut registry = CallbackRegistry::new();
    let id = registry.create_callback("OnRoundEnd");
    registry.try_add_function("OnRoundEnd", recorder(&calls, "L1"));

    let context = registry.get_mut(id).unwrap().context_mut();
    context.release_result("caller dropped the result buffer");

    let report = registry.execute(id, true).unwrap();
    assert!(report.aborted);
    assert!(!report.context_reset);
    assert!(calls.borrow().is_empty());
    assert!(matches!(
        &report.warnings()[0],
        Diagnostic::InvalidContext { reason, .. } if reason.contains("result slot")
    ));
}

#[test]
fn listeners_can_reenter_a_shared_registry() {
    init_logging();
    let calls = CallLog::default();
    let registry = CallbackRegistry::new().into_shared();
    let pair = CallbackPair::named(&registry, "OnTakeDamage");

    // Pre handler unsubscribes itself, then fires the post half
    let weak = Rc::downgrade(&registry);
    let slot: Rc<RefCell<Option<Listener>>> = Rc::default();
    let own = Rc::clone(&slot);
    let post = pair.post().unwrap();
    let log = Rc::clone(&calls);
    let pre_handler = Listener::new(move |_ctx: &mut ScriptContext| {
        log.borrow_mut().push("pre".to_string());
        let Some(registry) = weak.upgrade() else {
            return;
        };
        if let Some(me) = own.borrow_mut().take() {
            registry
                .borrow_mut()
                .try_remove_function("OnTakeDamage.pre", &me);
        }
        CallbackRegistry::execute_shared(&registry, post, false);
    });
    *slot.borrow_mut() = Some(pre_handler.clone());

    registry
        .borrow_mut()
        .try_add_function("OnTakeDamage.pre", pre_handler);
    registry
        .borrow_mut()
        .try_add_function("OnTakeDamage.post", recorder(&calls, "post"));

    assert_eq!(pair.execute_pre(false).unwrap().invoked, 1);
    assert_eq!(*calls.borrow(), vec!["pre", "post"]);

    // Handler is gone from the second run on
    assert_eq!(pair.execute_pre(false).unwrap().invoked, 0);
    assert_eq!(registry.borrow().stats().listeners, 1);
}
