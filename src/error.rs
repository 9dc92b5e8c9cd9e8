//! Event bus error types with numeric code mapping.
//!
//! [`BusError`] is the central error type of the crate. Every fallible
//! operation on the registry, a bus, or a payload returns it, and no
//! failing call leaves partial state behind.

/// Caller-facing failure of a registry, bus, or payload operation.
///
/// # Error Code Ranges
///
/// | Range     | Category                  |
/// |-----------|---------------------------|
/// | 1000–1999 | Event registration        |
/// | 2000–2999 | Bus lookup / subscription |
/// | 3000–3999 | Payload                   |
///
/// Listener failures during delivery are never surfaced as a `BusError`;
/// they are reported through [`crate::devtools::DevTools`] instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// Event registration was attempted after the bus was locked.
    #[error("event bus `{bus}` is locked; cannot register `{event}`")]
    Locked {
        /// Name of the locked bus.
        bus: String,
        /// Event name that was rejected.
        event: String,
    },

    /// The event name, or one of its derived accessor names, is already
    /// registered or reserved by the bus surface.
    #[error("event name `{event}` is already registered or reserved on bus `{bus}`")]
    DuplicateOrReservedName {
        /// Name of the bus.
        bus: String,
        /// Event name that was rejected.
        event: String,
    },

    /// A bus with this name already exists in the registry.
    #[error("event bus `{0}` already exists")]
    DuplicateBusName(String),

    /// A subscription scope named an event the bus does not carry.
    #[error("event `{event}` is not registered on bus `{bus}`")]
    UnknownEvent {
        /// Name of the bus.
        bus: String,
        /// Unregistered event name.
        event: String,
    },

    /// No bus with this name exists in the registry.
    #[error("event bus `{0}` not found")]
    BusNotFound(String),

    /// A write was attempted on a frozen payload.
    #[error("payload is frozen and cannot be modified")]
    FrozenPayload,
}

impl BusError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Locked { .. } => 1001,
            Self::DuplicateOrReservedName { .. } => 1002,
            Self::DuplicateBusName(_) => 2001,
            Self::BusNotFound(_) => 2002,
            Self::UnknownEvent { .. } => 2003,
            Self::FrozenPayload => 3001,
        }
    }
}
