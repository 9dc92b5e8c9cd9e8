//! # event-relay
//!
//! In-process publish/subscribe event buses with ordered, fail-isolated
//! delivery.
//!
//! Each bus is named, declares a fixed vocabulary of event names, and
//! serializes delivery of published events to every matching listener.
//! Publishes issued from inside a listener are queued behind the current
//! delivery instead of nesting, so each bus delivers in exact publish order.
//! A failing listener is reported to the dev-tool hooks and never disturbs
//! the others.
//!
//! ## Architecture
//!
//! ```text
//! EventBusRegistry (domain/)
//!     │  create / get / exists
//!     ├── DevTools (devtools/)          on-create, on-event, on-listener-error
//!     │
//!     └── EventBus (domain/)
//!           ├── vocabulary + lock latch
//!           ├── listeners (scope: all | set of names)
//!           └── FIFO delivery queue ── Payload (deep-frozen if immutable)
//! ```
//!
//! ## Example
//!
//! ```
//! use event_relay::{BusConfig, EventBusRegistry};
//! use serde_json::json;
//!
//! let registry = EventBusRegistry::new();
//! let bus = registry.create(BusConfig::named("clock"))?;
//! let tick = bus.register_event("tick")?;
//! bus.lock();
//!
//! let _sub = bus.subscribe(
//!     |event| {
//!         assert_eq!(event.data, json!(42));
//!         Ok(())
//!     },
//!     &["tick"],
//! )?;
//! tick.publish(json!(42));
//! # Ok::<(), event_relay::BusError>(())
//! ```

pub mod config;
pub mod devtools;
pub mod domain;
pub mod error;

pub use config::{BusConfig, RegistryConfig};
pub use devtools::{DevToolHooks, DevTools};
pub use domain::{
    Dispatcher, Event, EventAccessors, EventBus, EventBusRegistry, ListenerFailure, ListenerId,
    Payload, Subscription, WeakEventBus,
};
pub use error::BusError;
