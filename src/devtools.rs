//! Dev-tool observer hooks.
//!
//! [`DevTools`] holds three optional callbacks that buses invoke
//! synchronously: bus created, event published, listener failed. A registry
//! owns one `DevTools` and shares it with every bus it creates, so calling
//! [`DevTools::set`] affects all of those buses immediately. `set` merges:
//! only the hooks present in the override replace the current ones.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::{Event, EventBus, ListenerFailure};

/// Hook invoked after a bus is created and registered.
pub type OnCreateHook = Arc<dyn Fn(&EventBus) + Send + Sync>;
/// Hook invoked once per delivery task, before listener fan-out.
pub type OnEventHook = Arc<dyn Fn(&Event) + Send + Sync>;
/// Hook invoked for each listener that fails during delivery.
pub type OnListenerErrorHook = Arc<dyn Fn(&ListenerFailure) + Send + Sync>;

/// A partial set of dev-tool callbacks.
///
/// Unset hooks are no-ops. Used both as the live hook set and as the
/// override passed to [`DevTools::set`].
#[derive(Clone, Default)]
pub struct DevToolHooks {
    /// Bus-created callback.
    pub on_create: Option<OnCreateHook>,
    /// Event-published callback.
    pub on_event: Option<OnEventHook>,
    /// Listener-error callback.
    pub on_listener_error: Option<OnListenerErrorHook>,
}

impl DevToolHooks {
    /// Creates an empty hook set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bus-created callback.
    #[must_use]
    pub fn on_create(mut self, hook: impl Fn(&EventBus) + Send + Sync + 'static) -> Self {
        self.on_create = Some(Arc::new(hook));
        self
    }

    /// Sets the event-published callback.
    #[must_use]
    pub fn on_event(mut self, hook: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.on_event = Some(Arc::new(hook));
        self
    }

    /// Sets the listener-error callback.
    #[must_use]
    pub fn on_listener_error(
        mut self,
        hook: impl Fn(&ListenerFailure) + Send + Sync + 'static,
    ) -> Self {
        self.on_listener_error = Some(Arc::new(hook));
        self
    }

    /// Hooks that report every callback through `tracing`.
    #[must_use]
    pub fn tracing() -> Self {
        Self::new()
            .on_create(|bus| {
                tracing::info!(
                    target: "event_relay::devtools",
                    bus = %bus.name(),
                    immutable = bus.is_immutability_enabled(),
                    "bus created"
                );
            })
            .on_event(|event| {
                tracing::debug!(
                    target: "event_relay::devtools",
                    bus = %event.bus_name,
                    event = %event.event_name,
                    data = ?event.data.get(),
                    "event published"
                );
            })
            .on_listener_error(|failure| {
                tracing::error!(
                    target: "event_relay::devtools",
                    bus = %failure.event.bus_name,
                    event = %failure.event.event_name,
                    listener = %failure.listener_id,
                    reason = %failure.reason,
                    "listener error"
                );
            })
    }

    fn merge(&mut self, overrides: Self) {
        if let Some(hook) = overrides.on_create {
            self.on_create = Some(hook);
        }
        if let Some(hook) = overrides.on_event {
            self.on_event = Some(hook);
        }
        if let Some(hook) = overrides.on_listener_error {
            self.on_listener_error = Some(hook);
        }
    }
}

impl fmt::Debug for DevToolHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevToolHooks")
            .field("on_create", &self.on_create.is_some())
            .field("on_event", &self.on_event.is_some())
            .field("on_listener_error", &self.on_listener_error.is_some())
            .finish()
    }
}

/// Live, replaceable dev-tool hook set shared by a registry and its buses.
#[derive(Debug, Default)]
pub struct DevTools {
    hooks: RwLock<DevToolHooks>,
}

impl DevTools {
    /// Creates a hook set where every callback is a no-op.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a hook set starting from `hooks`.
    #[must_use]
    pub fn with_hooks(hooks: DevToolHooks) -> Self {
        Self {
            hooks: RwLock::new(hooks),
        }
    }

    /// Merges `overrides` into the current hooks.
    ///
    /// Hooks left unset in `overrides` keep their current value.
    pub fn set(&self, overrides: DevToolHooks) {
        self.hooks.write().merge(overrides);
    }

    /// Restores the no-op defaults.
    pub fn reset(&self) {
        *self.hooks.write() = DevToolHooks::default();
    }

    // Each notifier clones the hook out of the lock before calling it, so a
    // hook may itself call `set`.

    pub(crate) fn notify_create(&self, bus: &EventBus) {
        let hook = self.hooks.read().on_create.clone();
        if let Some(hook) = hook {
            hook(bus);
        }
    }

    pub(crate) fn notify_event(&self, event: &Event) {
        let hook = self.hooks.read().on_event.clone();
        if let Some(hook) = hook {
            hook(event);
        }
    }

    pub(crate) fn notify_listener_error(&self, failure: &ListenerFailure) {
        let hook = self.hooks.read().on_listener_error.clone();
        if let Some(hook) = hook {
            hook(failure);
        }
    }
}
