//! Shared event payloads and deep freezing.
//!
//! A [`Payload`] is a reference-counted cell around a [`serde_json::Value`].
//! Clones share the same cell, so a listener that updates the payload is
//! observed by every other holder, including the publisher. Once
//! [`deep_freeze`] has run on a structured payload (object or array), every
//! write through any handle fails with [`BusError::FrozenPayload`]. Nested
//! values live inside the same cell, so freezing the root freezes the tree.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::BusError;

#[derive(Debug)]
struct PayloadCell {
    value: RwLock<Value>,
    frozen: AtomicBool,
}

/// Data carried by an [`super::Event`].
///
/// Cheap to clone; clones share identity (see [`Payload::ptr_eq`]).
#[derive(Clone)]
pub struct Payload {
    cell: Arc<PayloadCell>,
}

impl Payload {
    /// Wraps a JSON value in a new, unfrozen payload.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            cell: Arc::new(PayloadCell {
                value: RwLock::new(value),
                frozen: AtomicBool::new(false),
            }),
        }
    }

    /// Creates a `null` payload.
    #[must_use]
    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    /// Returns a snapshot of the current value.
    #[must_use]
    pub fn get(&self) -> Value {
        self.cell.value.read_recursive().clone()
    }

    /// Runs `f` with a shared borrow of the current value.
    ///
    /// `f` may read or republish this payload, but must not update it.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.cell.value.read_recursive())
    }

    /// Mutates the value in place.
    ///
    /// `f` runs under the payload's write lock and must not touch this
    /// payload again, publishing included.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::FrozenPayload`] if the payload has been frozen.
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> Result<R, BusError> {
        let mut value = self.cell.value.write();
        // Checked under the write lock so a concurrent freeze cannot interleave.
        if self.is_frozen() {
            return Err(BusError::FrozenPayload);
        }
        Ok(f(&mut value))
    }

    /// Replaces the value.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::FrozenPayload`] if the payload has been frozen.
    pub fn set(&self, value: Value) -> Result<(), BusError> {
        self.update(|slot| *slot = value)
    }

    /// Returns `true` once the payload has been deep-frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.cell.frozen.load(Ordering::Acquire)
    }

    /// Returns `true` if the value is an object or an array.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        self.with(|v| v.is_object() || v.is_array())
    }

    /// Returns `true` if both handles point at the same payload cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

/// Freezes a structured payload in place and returns it.
///
/// Objects and arrays, together with everything nested inside them, become
/// read-only for every handle. `null` and primitives are returned unchanged.
pub fn deep_freeze(payload: &Payload) -> &Payload {
    let value = payload.cell.value.read_recursive();
    if value.is_object() || value.is_array() {
        payload.cell.frozen.store(true, Ordering::Release);
    }
    drop(value);
    payload
}

impl Default for Payload {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("value", &*self.cell.value.read_recursive())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<&Payload> for Payload {
    fn from(payload: &Payload) -> Self {
        payload.clone()
    }
}

impl PartialEq<Value> for Payload {
    fn eq(&self, other: &Value) -> bool {
        self.with(|v| v == other)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.cell.value.read_recursive().serialize(serializer)
    }
}
