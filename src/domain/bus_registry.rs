//! Named registry of event buses.
//!
//! [`EventBusRegistry`] is the context object that owns every bus created
//! through it, enforces name uniqueness, and carries the [`DevTools`]
//! hook set shared by those buses. Applications keep one registry at their
//! root; tests build one each so they stay isolated.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::EventBus;
use super::ids::unique_id;
use crate::config::{BusConfig, RegistryConfig};
use crate::devtools::{DevToolHooks, DevTools};
use crate::error::BusError;

/// Store of all live buses, keyed by name.
///
/// Buses enter the registry at creation and are never removed.
///
/// # Concurrency
///
/// The name table sits behind one `RwLock`; the existence check and
/// insertion in [`Self::create`] happen under a single write lock, so two
/// concurrent creates with the same name cannot both succeed.
#[derive(Debug)]
pub struct EventBusRegistry {
    buses: RwLock<HashMap<String, EventBus>>,
    devtools: Arc<DevTools>,
    config: RegistryConfig,
}

impl EventBusRegistry {
    /// Creates an empty registry with default configuration and no-op hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates an empty registry with the given configuration.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        let devtools = if config.devtools_tracing {
            DevTools::with_hooks(DevToolHooks::tracing())
        } else {
            DevTools::new()
        };
        Self {
            buses: RwLock::new(HashMap::new()),
            devtools: Arc::new(devtools),
            config,
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Returns the hook set shared with every bus of this registry.
    #[must_use]
    pub fn devtools(&self) -> &Arc<DevTools> {
        &self.devtools
    }

    /// Merges `hooks` into the shared hook set. Takes effect for every bus
    /// of this registry immediately.
    pub fn set_devtools(&self, hooks: DevToolHooks) {
        self.devtools.set(hooks);
    }

    /// Returns `true` if a bus with exactly this name exists.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.buses.read().contains_key(name)
    }

    /// Creates and registers a new bus, then notifies the on-create hook.
    ///
    /// Without an explicit name, a fresh one is generated from
    /// [`RegistryConfig::bus_name_prefix`].
    ///
    /// # Errors
    ///
    /// Returns [`BusError::DuplicateBusName`] if `config.name` is already
    /// taken.
    pub fn create(&self, config: BusConfig) -> Result<EventBus, BusError> {
        let immutable = config
            .immutability
            .unwrap_or(self.config.immutable_by_default);

        let mut map = self.buses.write();
        let name = match config.name {
            Some(name) if map.contains_key(&name) => {
                return Err(BusError::DuplicateBusName(name));
            }
            Some(name) => name,
            None => loop {
                let candidate = unique_id(&self.config.bus_name_prefix);
                if !map.contains_key(&candidate) {
                    break candidate;
                }
            },
        };

        let bus = EventBus::new(
            name.clone(),
            immutable,
            self.config.listener_id_prefix.clone(),
            Arc::clone(&self.devtools),
        );
        map.insert(name, bus.clone());
        drop(map);

        tracing::info!(bus = %bus.name(), immutable, "event bus created");
        self.devtools.notify_create(&bus);
        Ok(bus)
    }

    /// Returns the bus registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::BusNotFound`] if no such bus exists.
    pub fn get(&self, name: &str) -> Result<EventBus, BusError> {
        self.buses
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BusError::BusNotFound(name.to_string()))
    }

    /// Returns all bus names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.buses.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of buses in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buses.read().len()
    }

    /// Returns `true` if the registry contains no buses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buses.read().is_empty()
    }
}

impl Default for EventBusRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;

    fn create(registry: &EventBusRegistry, config: BusConfig) -> EventBus {
        let Ok(bus) = registry.create(config) else {
            panic!("bus creation failed");
        };
        bus
    }

    #[test]
    fn create_and_get() {
        let registry = EventBusRegistry::new();
        let bus = create(&registry, BusConfig::named("orders"));

        assert!(registry.exists("orders"));
        let Ok(fetched) = registry.get("orders") else {
            panic!("bus should be registered");
        };
        assert_eq!(fetched.name(), bus.name());
        assert!(!fetched.is_locked());
    }

    #[test]
    fn get_nonexistent_returns_error() {
        let registry = EventBusRegistry::new();
        assert_eq!(
            registry.get("missing").err(),
            Some(BusError::BusNotFound("missing".to_string()))
        );
        assert!(!registry.exists("missing"));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let registry = EventBusRegistry::new();
        create(&registry, BusConfig::named("orders"));

        let result = registry.create(BusConfig::named("orders"));
        assert!(matches!(result, Err(BusError::DuplicateBusName(name)) if name == "orders"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn generated_names_are_unique_and_prefixed() {
        let registry = EventBusRegistry::new();
        let a = create(&registry, BusConfig::new());
        let b = create(&registry, BusConfig::new());

        assert_ne!(a.name(), b.name());
        assert!(a.name().starts_with("bus-"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn config_prefix_and_default_immutability_apply() {
        let registry = EventBusRegistry::with_config(RegistryConfig {
            bus_name_prefix: "relay".to_string(),
            listener_id_prefix: "sub".to_string(),
            immutable_by_default: true,
            devtools_tracing: false,
        });
        let bus = create(&registry, BusConfig::new());
        assert!(bus.name().starts_with("relay-"));
        assert!(bus.is_immutability_enabled());

        let sub = bus.subscribe_all(|_| Ok(()));
        assert!(sub.id().as_str().starts_with("sub-"));

        let explicit = create(&registry, BusConfig::new().with_immutability(false));
        assert!(!explicit.is_immutability_enabled());
    }

    #[test]
    fn on_create_hook_sees_registered_bus() {
        let registry = Arc::new(EventBusRegistry::new());
        let seen: Arc<Mutex<Vec<(String, bool)>>> = Arc::new(Mutex::new(Vec::new()));

        let seen_in = Arc::clone(&seen);
        let registry_in = Arc::clone(&registry);
        registry.set_devtools(DevToolHooks::new().on_create(move |bus| {
            seen_in
                .lock()
                .push((bus.name().to_string(), registry_in.exists(bus.name())));
        }));

        create(&registry, BusConfig::named("b1"));
        assert_eq!(*seen.lock(), vec![("b1".to_string(), true)]);
    }

    #[test]
    fn failed_create_does_not_notify() {
        let registry = EventBusRegistry::new();
        create(&registry, BusConfig::named("b1"));

        let created = Arc::new(AtomicUsize::new(0));
        let created_in = Arc::clone(&created);
        registry.set_devtools(DevToolHooks::new().on_create(move |_| {
            created_in.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(registry.create(BusConfig::named("b1")).is_err());
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn devtools_override_reaches_existing_buses() {
        let registry = EventBusRegistry::new();
        let bus = create(&registry, BusConfig::named("b1"));
        let events = Arc::new(AtomicUsize::new(0));

        let events_in = Arc::clone(&events);
        registry.set_devtools(DevToolHooks::new().on_event(move |_| {
            events_in.fetch_add(1, Ordering::SeqCst);
        }));
        bus.publish("anything", json!(null));

        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn names_len_and_is_empty() {
        let registry = EventBusRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);

        create(&registry, BusConfig::named("beta"));
        create(&registry, BusConfig::named("alpha"));

        assert!(!registry.is_empty());
        assert_eq!(registry.names(), vec!["alpha", "beta"]);
    }

    #[test]
    fn registries_are_isolated() {
        let first = EventBusRegistry::new();
        let second = EventBusRegistry::new();
        create(&first, BusConfig::named("shared"));
        assert!(!second.exists("shared"));
        assert!(second.create(BusConfig::named("shared")).is_ok());
    }

    #[test]
    fn tracing_config_installs_hooks() {
        let registry = EventBusRegistry::with_config(RegistryConfig {
            devtools_tracing: true,
            ..RegistryConfig::default()
        });
        let bus = create(&registry, BusConfig::named("traced"));
        bus.publish("e", json!({ "k": 1 }));
        assert!(format!("{:?}", registry.devtools()).contains("on_event: true"));
    }

    #[test]
    fn end_to_end_clock_scenario() {
        let registry = EventBusRegistry::new();
        let bus = create(&registry, BusConfig::named("B1"));

        let Ok(_tick) = bus.register_event("tick") else {
            panic!("registering tick failed");
        };

        let received: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));
        let received_in = Arc::clone(&received);
        let Ok(_sub) = bus.subscribe(
            move |event| {
                received_in.lock().push(event.data.get());
                Ok(())
            },
            &["tick"],
        ) else {
            panic!("subscribe failed");
        };

        bus.publish("tick", json!(42));
        assert_eq!(*received.lock(), vec![json!(42)]);

        bus.lock();
        assert!(matches!(
            bus.register_event("tock"),
            Err(BusError::Locked { .. })
        ));
        assert_eq!(bus.support_events(), vec!["tick"]);
    }
}
