use std::fmt::Write;

use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use servertail_types::{PushRecord, Severity};

/// Turns this process's own tracing events into [`PushRecord`]s.
///
/// Events are forwarded over an unbounded channel so the layer never blocks
/// the code that logged; a [`PushScheduler`](crate::PushScheduler) on the
/// other end applies retention and the pause flag.
pub struct CaptureLayer {
    sender: mpsc::UnboundedSender<PushRecord>,
}

/// Build a capture layer and the receiver that drains it
pub fn capture_layer() -> (CaptureLayer, mpsc::UnboundedReceiver<PushRecord>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (CaptureLayer { sender }, receiver)
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let record = PushRecord::new(
            severity_for(*meta.level()),
            visitor.finish(),
            meta.target(),
        );
        // Receiver gone means the stream shut down; drop silently rather than
        // log from inside a log handler.
        let _ = self.sender.send(record);
    }
}

fn severity_for(level: Level) -> Severity {
    match level {
        Level::ERROR => Severity::Error,
        Level::WARN => Severity::Warn,
        Level::INFO => Severity::Info,
        Level::DEBUG | Level::TRACE => Severity::Debug,
    }
}

/// Collects the `message` field, then any other fields as `key=value`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, name: &str, value: std::fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::prelude::*;

    fn capture<F: FnOnce()>(f: F) -> Vec<PushRecord> {
        let (layer, mut rx) = capture_layer();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);

        let mut records = Vec::new();
        while let Ok(record) = rx.try_recv() {
            records.push(record);
        }
        records
    }

    #[test]
    fn test_message_and_level() {
        let records = capture(|| {
            tracing::error!(target: "servertail::poll", "read failed");
            tracing::trace!("very chatty");
        });

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].severity, Severity::Error);
        assert_eq!(records[0].message, "read failed");
        assert_eq!(records[0].source, "servertail::poll");
        assert_eq!(records[1].severity, Severity::Debug);
    }

    #[test]
    fn test_fields_are_appended() {
        let records = capture(|| {
            tracing::warn!(lines = 3, source = "console", "read new log lines");
        });

        assert_eq!(records[0].severity, Severity::Warn);
        assert_eq!(
            records[0].message,
            "read new log lines lines=3 source=console"
        );
    }

    #[test]
    fn test_fields_without_message() {
        let records = capture(|| tracing::info!(reads = 7));
        assert_eq!(records[0].message, "reads=7");
    }

    #[test]
    fn test_closed_receiver_is_ignored() {
        let (layer, rx) = capture_layer();
        drop(rx);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || tracing::info!("nobody listening"));
    }
}
