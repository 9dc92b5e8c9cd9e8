//! Domain layer: identifiers, payloads, events, listeners, buses, and the
//! bus registry.
//!
//! The [`EventBus`] is the core: it owns the event vocabulary, the listener
//! set, and the serialized delivery queue. [`EventBusRegistry`] creates
//! buses and guarantees their names are unique.

pub mod bus_registry;
pub mod event;
pub mod event_bus;
pub mod ids;
pub mod listener;
pub mod payload;

pub use bus_registry::EventBusRegistry;
pub use event::{Event, ListenerFailure};
pub use event_bus::{Dispatcher, EventAccessors, EventBus, RESERVED_NAMES, WeakEventBus};
pub use ids::{ListenerId, unique_id};
pub use listener::{ListenerFn, ListenerScope, Subscription};
pub use payload::{Payload, deep_freeze};
