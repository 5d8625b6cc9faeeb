//! Run summary
//!
//! Collects one outcome per fired trigger and prints the end-of-run summary.

use callback_dispatch::{Diagnostic, ExecutionReport, ScriptContext, Timestamp};
use serde_json::Value;

/// What happened when one trigger was fired
#[derive(Debug, Clone)]
pub struct TriggerOutcome {
    pub event: String,
    /// `None` when the event was not registered
    pub report: Option<ExecutionReport>,
    /// Result slot right after the listeners ran
    pub result: Option<Value>,
    /// Error raised on the context by a listener or by the dispatcher
    pub native_error: Option<String>,
}

impl TriggerOutcome {
    pub fn missing(event: &str) -> Self {
        Self {
            event: event.to_string(),
            report: None,
            result: None,
            native_error: None,
        }
    }

    pub fn executed(report: ExecutionReport, context: &ScriptContext) -> Self {
        Self {
            event: report.callback.clone(),
            result: context.raw_result().cloned(),
            native_error: context.native_error().map(str::to_string),
            report: Some(report),
        }
    }
}

/// Aggregated results of a host run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    outcomes: Vec<TriggerOutcome>,
    unattached: Vec<String>,
}

impl RunSummary {
    pub fn new(unattached: Vec<String>) -> Self {
        Self {
            outcomes: Vec::new(),
            unattached,
        }
    }

    pub fn record(&mut self, outcome: TriggerOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[TriggerOutcome] {
        &self.outcomes
    }

    /// Triggers whose event existed
    pub fn fired(&self) -> usize {
        self.reports().count()
    }

    /// Triggers whose event was not registered
    pub fn missing(&self) -> usize {
        self.outcomes.len() - self.fired()
    }

    pub fn invocations(&self) -> usize {
        self.reports().map(|report| report.invoked).sum()
    }

    pub fn aborted(&self) -> usize {
        self.reports().filter(|report| report.aborted).count()
    }

    pub fn slow_listeners(&self) -> usize {
        self.warnings()
            .filter(|d| matches!(d, Diagnostic::SlowListener { .. }))
            .count()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.reports().flat_map(|report| report.warnings().iter())
    }

    fn reports(&self) -> impl Iterator<Item = &ExecutionReport> {
        self.outcomes.iter().filter_map(|outcome| outcome.report.as_ref())
    }

    pub fn print_summary(&self) {
        println!("\n=== RUN SUMMARY ===");
        println!("Triggers fired: {}", self.fired());
        println!("Missing events: {}", self.missing());
        println!("Listener invocations: {}", self.invocations());
        println!("Aborted executions: {}", self.aborted());
        println!("Slow listeners: {}", self.slow_listeners());
        if !self.unattached.is_empty() {
            println!("Unattached listeners: {}", self.unattached.join(", "));
        }

        if self.outcomes.is_empty() {
            return;
        }

        println!("\nTriggers:");
        for outcome in &self.outcomes {
            match &outcome.report {
                Some(report) => {
                    println!(
                        "  {} {:<24} listeners={} warnings={}",
                        format_timestamp(&report.started_at),
                        outcome.event,
                        report.invoked,
                        report.warnings().len()
                    );
                    if let Some(result) = &outcome.result {
                        println!("      result: {}", result);
                    }
                    if let Some(error) = &outcome.native_error {
                        println!("      error:  {}", error);
                    }
                }
                None => println!("  {:<37} (not registered)", outcome.event),
            }
        }
    }
}

fn format_timestamp(ts: &Timestamp) -> String {
    ts.format("%H:%M:%S%.3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use callback_dispatch::CallbackRegistry;

    #[test]
    fn test_summary_counts() {
        let mut registry = CallbackRegistry::new();
        let id = registry.create_callback("OnTick");

        let report = registry.execute(id, false).unwrap();
        let context = registry.get(id).unwrap().context().clone();

        let mut summary = RunSummary::new(vec!["OnGhost".to_string()]);
        summary.record(TriggerOutcome::executed(report, &context));
        summary.record(TriggerOutcome::missing("OnMissing"));

        registry.get_mut(id).unwrap().context_mut().invalidate("gone");
        let aborted = registry.execute(id, false).unwrap();
        let context = registry.get(id).unwrap().context().clone();
        summary.record(TriggerOutcome::executed(aborted, &context));

        assert_eq!(summary.fired(), 2);
        assert_eq!(summary.missing(), 1);
        assert_eq!(summary.aborted(), 1);
        assert_eq!(summary.warnings().count(), 1);
        assert_eq!(summary.slow_listeners(), 0);
        assert!(summary.outcomes()[2].native_error.is_some());

        summary.print_summary();
    }
}
