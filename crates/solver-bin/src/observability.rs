//! A4.8's "structured event scraped by the enclosing collaborator" contract,
//! satisfied without a Prometheus registry: a `tracing_subscriber::Layer`
//! that watches every event for a `reason` field and tallies it, so
//! `/metrics` can dump plain counters without plumbing a drop-event channel
//! through every crate in the workspace.

use {
    std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    },
    tracing::field::{Field, Visit},
    tracing_subscriber::layer::{Context, Layer},
};

#[derive(Clone, Default)]
pub struct DropCounters(Arc<Mutex<HashMap<String, u64>>>);

impl DropCounters {
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.0.lock().expect("drop counters mutex poisoned").clone()
    }
}

#[derive(Default)]
struct ReasonVisitor(Option<String>);

impl Visit for ReasonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "reason" && self.0.is_none() {
            self.0 = Some(format!("{value:?}").trim_matches('"').to_owned());
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "reason" {
            self.0 = Some(value.to_owned());
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for DropCounters {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = ReasonVisitor::default();
        event.record(&mut visitor);
        if let Some(reason) = visitor.0 {
            *self.0.lock().expect("drop counters mutex poisoned").entry(reason).or_insert(0) += 1;
        }
    }
}
