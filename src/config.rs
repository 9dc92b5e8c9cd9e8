//! Registry and bus configuration.
//!
//! [`RegistryConfig`] follows 12-factor style: settings come from
//! environment variables (or a `.env` file via `dotenvy`) and fall back to
//! defaults when unset or unparsable. [`BusConfig`] is the per-bus
//! argument to [`crate::EventBusRegistry::create`].

/// Registry-wide settings.
///
/// Loaded once at startup via [`RegistryConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Prefix for generated bus names (`EVENT_RELAY_BUS_PREFIX`).
    pub bus_name_prefix: String,

    /// Prefix for listener identifiers (`EVENT_RELAY_LISTENER_PREFIX`).
    pub listener_id_prefix: String,

    /// Immutability for buses whose [`BusConfig`] leaves it unset
    /// (`EVENT_RELAY_IMMUTABLE_BY_DEFAULT`).
    pub immutable_by_default: bool,

    /// Install [`crate::devtools::DevToolHooks::tracing`] on the registry
    /// (`EVENT_RELAY_DEVTOOLS_TRACING`).
    pub devtools_tracing: bool,
}

impl RegistryConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bus_name_prefix: parse_prefix(lookup("EVENT_RELAY_BUS_PREFIX"))
                .unwrap_or(defaults.bus_name_prefix),
            listener_id_prefix: parse_prefix(lookup("EVENT_RELAY_LISTENER_PREFIX"))
                .unwrap_or(defaults.listener_id_prefix),
            immutable_by_default: parse_bool(lookup("EVENT_RELAY_IMMUTABLE_BY_DEFAULT"))
                .unwrap_or(defaults.immutable_by_default),
            devtools_tracing: parse_bool(lookup("EVENT_RELAY_DEVTOOLS_TRACING"))
                .unwrap_or(defaults.devtools_tracing),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            bus_name_prefix: "bus".to_string(),
            listener_id_prefix: "listener".to_string(),
            immutable_by_default: false,
            devtools_tracing: false,
        }
    }
}

/// Per-bus creation options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusConfig {
    /// Explicit bus name. Generated when `None`.
    pub name: Option<String>,

    /// Deep-freeze structured payloads before delivery. Falls back to
    /// [`RegistryConfig::immutable_by_default`] when `None`.
    pub immutability: Option<bool>,
}

impl BusConfig {
    /// Creates a config with a generated name and default immutability.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config with an explicit name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().with_name(name)
    }

    /// Sets the bus name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Enables or disables payload freezing.
    #[must_use]
    pub fn with_immutability(mut self, enabled: bool) -> Self {
        self.immutability = Some(enabled);
        self
    }
}

/// Accepts non-blank prefixes, trimmed.
fn parse_prefix(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses `"true"`, `"1"`, `"false"`, `"0"` (case-insensitive).
fn parse_bool(value: Option<String>) -> Option<bool> {
    match value?.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
