//! Events delivered to listeners and listener failure reports.
//!
//! An [`Event`] is built once per `publish` call and handed by reference to
//! every matching listener during that publication's delivery task. It is
//! never stored beyond the delivery pass except by listeners that clone it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ListenerId;
use super::payload::Payload;

/// A single published event.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Name of the bus the event was published on.
    pub bus_name: String,
    /// Event name passed to `publish`.
    pub event_name: String,
    /// Payload, shared with the publisher and every listener.
    pub data: Payload,
    /// Time the event was published (not delivered).
    pub published_at: DateTime<Utc>,
}

impl Event {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(bus_name: &str, event_name: &str, data: Payload) -> Self {
        Self {
            bus_name: bus_name.to_string(),
            event_name: event_name.to_string(),
            data,
            published_at: Utc::now(),
        }
    }
}

/// Report of a listener that failed while handling an event.
///
/// Passed to the dev-tool listener-error hook. The failure never
/// propagates to the publisher.
#[derive(Debug, Clone, Serialize)]
pub struct ListenerFailure {
    /// The event being delivered.
    #[serde(flatten)]
    pub event: Event,
    /// Listener that failed.
    pub listener_id: ListenerId,
    /// Error message, or the panic message if the listener panicked.
    pub reason: String,
}
