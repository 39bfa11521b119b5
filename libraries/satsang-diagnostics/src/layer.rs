//! `tracing` integration

use crate::entry::{LogEntry, LogLevel};
use crate::log::DiagnosticLog;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};

/// Forwards `tracing` events into a [`DiagnosticLog`]
///
/// The event message becomes the entry message, remaining fields become the
/// entry's JSON data, and the event target becomes its source.
#[derive(Clone)]
pub struct DiagnosticsLayer {
    log: DiagnosticLog,
}

impl DiagnosticsLayer {
    pub fn new(log: DiagnosticLog) -> Self {
        Self { log }
    }
}

impl<S> tracing_subscriber::Layer<S> for DiagnosticsLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        if !self.log.is_debug_enabled() {
            return;
        }

        let metadata = event.metadata();
        // The sink's own failure reports must not loop back into it
        if metadata.target().starts_with(env!("CARGO_CRATE_NAME")) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let data = if visitor.fields.is_empty() {
            None
        } else {
            Some(Value::Object(visitor.fields))
        };

        self.log.record(LogEntry::new(
            LogLevel::from(metadata.level()),
            visitor.message,
            data,
            Some(metadata.target()),
        ));
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Map<String, Value>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields
                .insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .insert(field.name().to_string(), Value::String(format!("{:?}", value)));
        }
    }
}
