//! Tracing layer that turns analytics events into channel messages.
//!
//! Editing code reports analytics as ordinary `tracing` events on
//! [`TRACK_TARGET`] with an `event` field naming them. This layer picks those
//! out and forwards them, with their remaining fields, to a host that wants
//! to ship them somewhere.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use wikiedit_core::TRACK_TARGET;

const NAME_FIELD: &str = "event";
const MESSAGE_FIELD: &str = "message";

/// One analytics event, e.g. `mwedit.saveAttempt`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrackedEvent {
    pub name: String,
    pub fields: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

pub struct TrackingLayer {
    sender: mpsc::UnboundedSender<TrackedEvent>,
}

impl TrackingLayer {
    pub fn new(sender: mpsc::UnboundedSender<TrackedEvent>) -> Self {
        Self { sender }
    }
}

impl<S> Layer<S> for TrackingLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != TRACK_TARGET {
            return;
        }

        let mut fields = BTreeMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        let Some(name) = fields
            .remove(NAME_FIELD)
            .and_then(|v| v.as_str().map(str::to_string))
        else {
            return;
        };
        fields.remove(MESSAGE_FIELD);

        // The receiver may be gone; tracking is best-effort.
        let _ = self.sender.send(TrackedEvent {
            name,
            fields,
            timestamp: Utc::now(),
        });
    }
}

struct FieldVisitor<'a>(&'a mut BTreeMap<String, Value>);

impl Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), serde_json::json!(format!("{:?}", value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(emit: impl FnOnce()) -> Vec<TrackedEvent> {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let subscriber = tracing_subscriber::registry().with(TrackingLayer::new(sender));
        tracing::subscriber::with_default(subscriber, emit);

        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_forwards_tracked_events_with_fields() {
        let events = capture(|| {
            tracing::info!(
                target: TRACK_TARGET,
                event = %"mwedit.abort",
                abort_type = "nochange",
                duration_ms = 12u64,
                "track"
            );
        });

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.name, "mwedit.abort");
        assert_eq!(event.fields["abort_type"], "nochange");
        assert_eq!(event.fields["duration_ms"], 12);
        assert!(!event.fields.contains_key("message"));
        assert!(!event.fields.contains_key("event"));
    }

    #[test]
    fn test_ignores_other_targets() {
        let events = capture(|| {
            tracing::info!(event = %"mwedit.abort", "not tracked");
            tracing::warn!(target: TRACK_TARGET, "no event name");
        });
        assert!(events.is_empty());
    }
}
