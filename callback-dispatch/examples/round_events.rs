//! Round event walkthrough
//!
//! Registers a handful of game-style events, attaches listeners by name,
//! raises the events and prints what the dispatcher observed.
//!
//! Usage:
//!   RUST_LOG=trace cargo run --example round_events

use callback_dispatch::{CallbackPair, CallbackRegistry, Listener, ScriptContext};
use std::thread;
use std::time::Duration;

fn main() {
    env_logger::init();

    let registry = CallbackRegistry::new().into_shared();

    let round_start = registry.borrow_mut().create_callback("OnRoundStart");
    registry.borrow_mut().create_callback("OnTick");
    let damage = CallbackPair::named(&registry, "OnTakeDamage");

    let announce = Listener::new(|ctx: &mut ScriptContext| {
        let map: String = ctx.arg(0).unwrap_or_else(|_| "<unknown>".to_string());
        println!("Round started on {}", map);
    });
    let slow_stats = Listener::new(|_ctx: &mut ScriptContext| {
        // Pretend to flush statistics to disk
        thread::sleep(Duration::from_millis(8));
    });
    let armor = Listener::new(|ctx: &mut ScriptContext| {
        let damage: f64 = ctx.arg(0).unwrap_or(0.0);
        let _ = ctx.set_result(damage * 0.5);
    });

    {
        let mut owner = registry.borrow_mut();
        owner.try_add_function("OnRoundStart", announce.clone());
        owner.try_add_function("OnRoundStart", slow_stats);
        owner.try_add_function("OnTakeDamage.pre", armor);
        if !owner.try_add_function("OnBombPlanted", announce) {
            println!("OnBombPlanted is not registered, listener skipped");
        }
        owner.print_debug_listing();
    }

    {
        let mut owner = registry.borrow_mut();
        if let Some(callback) = owner.get_mut(round_start) {
            let _ = callback.context_mut().push_arg("de_nuke");
            let report = callback.execute(true);
            println!(
                "OnRoundStart: {} listener(s), {} warning(s)",
                report.invoked,
                report.warnings().len()
            );
        }
    }

    if let Some(id) = damage.pre() {
        let mut owner = registry.borrow_mut();
        if let Some(callback) = owner.get_mut(id) {
            let _ = callback.context_mut().push_arg(40.0);
            callback.execute(false);
            let reduced: Option<f64> = callback.context().result().unwrap_or(None);
            println!("OnTakeDamage.pre reduced damage to {:?}", reduced);
        }
    }

    let tick = registry.borrow_mut().execute_by_name("OnTick", true);
    println!("OnTick clean: {:?}", tick.map(|report| report.is_clean()));

    drop(damage);
    println!("{:?}", registry.borrow().stats());
}
