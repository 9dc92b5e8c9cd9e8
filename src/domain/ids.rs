//! Process-unique identifiers for buses and listeners.
//!
//! [`unique_id`] combines a process-wide counter with a random salt drawn
//! once per process from a UUID v4, so generated strings never repeat for
//! the lifetime of the process. [`ListenerId`] is a newtype over such a
//! string so listener identifiers cannot be confused with bus names.

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static SALT: OnceLock<String> = OnceLock::new();

fn salt() -> &'static str {
    SALT.get_or_init(|| uuid::Uuid::new_v4().simple().to_string().chars().take(8).collect())
}

/// Returns a fresh identifier of the form `{prefix}-{salt}-{counter}`.
///
/// Never returns the same string twice within a process.
#[must_use]
pub fn unique_id(prefix: &str) -> String {
    let n = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{n}", salt())
}

/// Identifier of a listener subscribed to an [`super::EventBus`].
///
/// Generated at subscription time and unique within the process. Carried
/// by [`super::Subscription`] for out-of-band
/// [`super::EventBus::unsubscribe`] calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(String);

impl ListenerId {
    /// Generates a new identifier with the given prefix.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(unique_id(prefix))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ListenerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ListenerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
