//! Named event bus with serialized, fail-isolated delivery.
//!
//! An [`EventBus`] carries a fixed vocabulary of event names, registered
//! while the bus is unlocked. Listeners subscribe to every event or to a
//! subset of registered names. Publication is serialized per bus through a
//! FIFO queue of delivery tasks:
//!
//! - `publish` appends its event to the queue.
//! - If no delivery is in progress, the caller becomes the drainer and runs
//!   queued tasks in order until the queue is empty.
//! - If a delivery is in progress (a listener publishing re-entrantly, or
//!   another thread), the event waits its turn and `publish` returns.
//!
//! All bus state sits behind one mutex that is never held while a listener
//! or dev-tool hook runs, so callbacks may call back into the bus.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};

use super::listener::{ListenerEntry, ListenerFn, ListenerScope, Subscription};
use super::payload::{self, Payload};
use super::{Event, ListenerFailure, ListenerId};
use crate::devtools::DevTools;
use crate::error::BusError;

/// Names taken by the bus surface, in both spellings. Event names and
/// derived accessor names may not collide with them.
pub const RESERVED_NAMES: &[&str] = &[
    "name",
    "isLocked",
    "is_locked",
    "isImmutabilityEnabled",
    "is_immutability_enabled",
    "supportEvents",
    "support_events",
    "registerEvent",
    "register_event",
    "lock",
    "publish",
    "subscribe",
    "subscribeAll",
    "subscribe_all",
    "unsubscribe",
    "accessors",
    "accessorNames",
    "accessor_names",
    "listenerCount",
    "listener_count",
    "isSubscribed",
    "is_subscribed",
    "pendingCount",
    "pending_count",
    "downgrade",
];

const SUBSCRIBE_PREFIX: &str = "on";
const PUBLISH_PREFIX: &str = "publish";

pub(crate) struct BusInner {
    name: String,
    immutability_enabled: bool,
    listener_id_prefix: String,
    devtools: Arc<DevTools>,
    state: Mutex<BusState>,
}

#[derive(Default)]
struct BusState {
    locked: bool,
    events: Vec<String>,
    listeners: Vec<Arc<ListenerEntry>>,
    queue: VecDeque<Event>,
    draining: bool,
}

impl BusState {
    fn is_registered(&self, event_name: &str) -> bool {
        self.events.iter().any(|e| e == event_name)
    }

    /// Whether `candidate` is already a reserved, event, or accessor name.
    fn is_taken(&self, candidate: &str) -> bool {
        RESERVED_NAMES.contains(&candidate)
            || self.events.iter().any(|existing| {
                let (on, publish) = accessor_names(existing);
                existing == candidate || on == candidate || publish == candidate
            })
    }
}

/// Returns the `(subscribe, publish)` accessor names for an event,
/// e.g. `tick` gives `("onTick", "publishTick")`.
#[must_use]
pub fn accessor_names(event_name: &str) -> (String, String) {
    let capitalized = capitalize(event_name);
    (
        format!("{SUBSCRIBE_PREFIX}{capitalized}"),
        format!("{PUBLISH_PREFIX}{capitalized}"),
    )
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Handle to a named event bus.
///
/// Cheap to clone; clones refer to the same bus. Buses are normally
/// created through [`crate::EventBusRegistry::create`].
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub(crate) fn new(
        name: String,
        immutability_enabled: bool,
        listener_id_prefix: String,
        devtools: Arc<DevTools>,
    ) -> Self {
        Self {
            inner: Arc::new(BusInner {
                name,
                immutability_enabled,
                listener_id_prefix,
                devtools,
                state: Mutex::new(BusState::default()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<BusInner>) -> Self {
        Self { inner }
    }

    /// Returns a handle that does not keep the bus alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakEventBus {
        WeakEventBus {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Bus name, unique within its registry.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether [`Self::lock`] has been called.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.inner.state.lock().locked
    }

    /// Whether structured payloads are deep-frozen before delivery.
    #[must_use]
    pub fn is_immutability_enabled(&self) -> bool {
        self.inner.immutability_enabled
    }

    /// Registered event names, in registration order.
    #[must_use]
    pub fn support_events(&self) -> Vec<String> {
        self.inner.state.lock().events.clone()
    }

    /// Number of subscribed listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.state.lock().listeners.len()
    }

    /// Whether a listener with this id is currently subscribed.
    #[must_use]
    pub fn is_subscribed(&self, id: &ListenerId) -> bool {
        self.inner
            .state
            .lock()
            .listeners
            .iter()
            .any(|entry| &entry.id == id)
    }

    /// Publications queued behind the delivery in progress.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Adds an event name to the bus vocabulary and returns its dispatcher.
    ///
    /// # Errors
    ///
    /// - [`BusError::Locked`] if the bus is locked.
    /// - [`BusError::DuplicateOrReservedName`] if the name, or one of its
    ///   accessor names, is already registered, derived, or reserved.
    ///
    /// A failed registration changes nothing.
    pub fn register_event(&self, event_name: &str) -> Result<Dispatcher, BusError> {
        let mut state = self.inner.state.lock();
        if state.locked {
            return Err(BusError::Locked {
                bus: self.inner.name.clone(),
                event: event_name.to_string(),
            });
        }

        let (on, publish) = accessor_names(event_name);
        if state.is_taken(event_name) || state.is_taken(&on) || state.is_taken(&publish) {
            return Err(BusError::DuplicateOrReservedName {
                bus: self.inner.name.clone(),
                event: event_name.to_string(),
            });
        }

        state.events.push(event_name.to_string());
        drop(state);

        tracing::debug!(bus = %self.inner.name, event = event_name, "event registered");
        Ok(Dispatcher {
            bus: self.clone(),
            event_name: event_name.to_string(),
        })
    }

    /// Locks the vocabulary. Idempotent and irreversible.
    pub fn lock(&self) {
        let mut state = self.inner.state.lock();
        if state.locked {
            return;
        }
        state.locked = true;
        let events = state.events.len();
        drop(state);
        tracing::info!(bus = %self.inner.name, events, "event bus locked");
    }

    /// Accessor shortcuts for a registered event, `None` otherwise.
    #[must_use]
    pub fn accessors(&self, event_name: &str) -> Option<EventAccessors> {
        if !self.inner.state.lock().is_registered(event_name) {
            return None;
        }
        let (subscribe_name, publish_name) = accessor_names(event_name);
        Some(EventAccessors {
            subscribe_name,
            publish_name,
            dispatcher: Dispatcher {
                bus: self.clone(),
                event_name: event_name.to_string(),
            },
        })
    }

    /// All derived accessor names, in registration order.
    #[must_use]
    pub fn accessor_names(&self) -> Vec<String> {
        self.support_events()
            .iter()
            .flat_map(|event| {
                let (on, publish) = accessor_names(event);
                [on, publish]
            })
            .collect()
    }

    /// Publishes an event.
    ///
    /// The name is not checked against the vocabulary: an unregistered
    /// name reaches listeners subscribed to all events. Listener failures
    /// are reported to the dev-tool hooks and never returned.
    ///
    /// When the bus is idle, delivery completes before this returns. When
    /// a delivery is already in progress, the event is queued behind it
    /// and delivered by the thread draining the queue.
    pub fn publish(&self, event_name: &str, data: impl Into<Payload>) {
        let data = data.into();
        if self.inner.immutability_enabled {
            payload::deep_freeze(&data);
        }
        let event = Event::new(&self.inner.name, event_name, data);

        {
            let mut state = self.inner.state.lock();
            state.queue.push_back(event);
            if state.draining {
                tracing::debug!(
                    bus = %self.inner.name,
                    event = event_name,
                    pending = state.queue.len(),
                    "publish queued behind in-flight delivery"
                );
                return;
            }
            state.draining = true;
        }

        self.drain();
    }

    /// Subscribes a listener.
    ///
    /// An empty `event_names` subscribes to every event. Otherwise each
    /// name must already be registered.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::UnknownEvent`] for the first unregistered name;
    /// no listener is added.
    pub fn subscribe<F>(&self, listener: F, event_names: &[&str]) -> Result<Subscription, BusError>
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let state = self.inner.state.lock();
        if let Some(unknown) = event_names.iter().find(|name| !state.is_registered(name)) {
            return Err(BusError::UnknownEvent {
                bus: self.inner.name.clone(),
                event: (*unknown).to_string(),
            });
        }

        let scope = ListenerScope::from_names(event_names);
        Ok(self.insert_listener(state, scope, Arc::new(listener)))
    }

    /// Subscribes a listener to every event.
    pub fn subscribe_all<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let state = self.inner.state.lock();
        self.insert_listener(state, ListenerScope::All, Arc::new(listener))
    }

    fn insert_listener(
        &self,
        mut state: MutexGuard<'_, BusState>,
        scope: ListenerScope,
        callback: ListenerFn,
    ) -> Subscription {
        let id = ListenerId::generate(&self.inner.listener_id_prefix);
        tracing::debug!(bus = %self.inner.name, listener = %id, ?scope, "listener subscribed");
        state
            .listeners
            .push(Arc::new(ListenerEntry::new(id.clone(), scope, callback)));
        drop(state);
        Subscription::new(&self.inner, id)
    }

    /// Removes a listener. Returns `false` if no such listener exists.
    ///
    /// A listener removed while a delivery is in progress is skipped for
    /// that delivery if it has not run yet.
    pub fn unsubscribe(&self, id: &ListenerId) -> bool {
        let mut state = self.inner.state.lock();
        let Some(position) = state.listeners.iter().position(|entry| &entry.id == id) else {
            return false;
        };
        let entry = state.listeners.remove(position);
        entry.deactivate();
        drop(state);

        tracing::debug!(bus = %self.inner.name, listener = %id, "listener unsubscribed");
        true
    }

    /// Runs queued delivery tasks until the queue is empty.
    ///
    /// Only one caller drains at a time; `state.draining` is set before entry.
    fn drain(&self) {
        let mut guard = DrainGuard {
            inner: &self.inner,
            armed: true,
        };
        loop {
            let mut state = self.inner.state.lock();
            let Some(event) = state.queue.pop_front() else {
                state.draining = false;
                guard.armed = false;
                return;
            };
            let listeners: Vec<Arc<ListenerEntry>> =
                state.listeners.iter().map(Arc::clone).collect();
            drop(state);

            self.deliver(&event, &listeners);
        }
    }

    fn deliver(&self, event: &Event, listeners: &[Arc<ListenerEntry>]) {
        tracing::trace!(
            bus = %self.inner.name,
            event = %event.event_name,
            listeners = listeners.len(),
            "delivery started"
        );
        self.inner.devtools.notify_event(event);

        let mut delivered = 0usize;
        let mut failed = 0usize;
        for entry in listeners {
            if !entry.accepts(&event.event_name) {
                continue;
            }
            match invoke(&entry.callback, event) {
                Ok(()) => delivered += 1,
                Err(reason) => {
                    failed += 1;
                    tracing::warn!(
                        bus = %self.inner.name,
                        event = %event.event_name,
                        listener = %entry.id,
                        %reason,
                        "listener failed"
                    );
                    self.inner.devtools.notify_listener_error(&ListenerFailure {
                        event: event.clone(),
                        listener_id: entry.id.clone(),
                        reason,
                    });
                }
            }
        }

        tracing::trace!(
            bus = %self.inner.name,
            event = %event.event_name,
            delivered,
            failed,
            "delivery finished"
        );
    }
}

/// Clears the draining flag if a dev-tool hook unwinds out of `drain`.
///
/// The event whose delivery was interrupted is dropped. Events queued
/// behind it stay in the queue and are delivered by the next `publish`.
struct DrainGuard<'a> {
    inner: &'a BusInner,
    armed: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.state.lock().draining = false;
        }
    }
}

fn invoke(callback: &ListenerFn, event: &Event) -> Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(cause) => Err(panic_message(cause.as_ref())),
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(msg) = cause.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = cause.downcast_ref::<String>() {
        msg.clone()
    } else {
        "listener panicked".to_string()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("EventBus")
            .field("name", &self.inner.name)
            .field("is_locked", &state.locked)
            .field("is_immutability_enabled", &self.inner.immutability_enabled)
            .field("support_events", &state.events)
            .field("listeners", &state.listeners.len())
            .field("pending", &state.queue.len())
            .finish()
    }
}

/// Non-owning [`EventBus`] handle, for listeners that publish back into
/// their own bus.
#[derive(Debug, Clone)]
pub struct WeakEventBus {
    inner: Weak<BusInner>,
}

impl WeakEventBus {
    /// Returns the bus if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<EventBus> {
        self.inner.upgrade().map(EventBus::from_inner)
    }
}

/// Publisher bound to one event name, returned by
/// [`EventBus::register_event`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    bus: EventBus,
    event_name: String,
}

impl Dispatcher {
    /// The event this dispatcher publishes.
    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Publishes the bound event with `data`.
    pub fn publish(&self, data: impl Into<Payload>) {
        self.bus.publish(&self.event_name, data);
    }

    /// Publishes the bound event with a `null` payload.
    pub fn publish_empty(&self) {
        self.bus.publish(&self.event_name, Payload::null());
    }
}

/// Subscribe and publish shortcuts for one registered event.
///
/// `subscribe_name` and `publish_name` are the derived accessor names,
/// e.g. `onTick` and `publishTick` for `tick`.
#[derive(Debug, Clone)]
pub struct EventAccessors {
    /// Name of the subscribe shortcut.
    pub subscribe_name: String,
    /// Name of the publish shortcut.
    pub publish_name: String,
    /// Publisher bound to the event.
    pub dispatcher: Dispatcher,
}

impl EventAccessors {
    /// The event these accessors are bound to.
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.dispatcher.event_name()
    }

    /// Subscribes a listener scoped to this event only.
    ///
    /// # Errors
    ///
    /// Propagates [`EventBus::subscribe`] errors; registered names are
    /// never removed, so none occur in practice.
    pub fn subscribe<F>(&self, listener: F) -> Result<Subscription, BusError>
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.dispatcher
            .bus
            .subscribe(listener, &[self.dispatcher.event_name.as_str()])
    }

    /// Publishes the event with `data`.
    pub fn publish(&self, data: impl Into<Payload>) {
        self.dispatcher.publish(data);
    }
}
