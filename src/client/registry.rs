//! Per-tab event registry.
//!
//! Maps a type tag to the callbacks registered for it. Registration is
//! append-only, and callbacks for one tag keep their registration order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::Envelope;

/// Callback invoked with the raw envelope of a matching inbound message.
pub type Callback = Arc<dyn Fn(&Envelope) + Send + Sync>;

/// Type-tag to callback mapping for a single client adapter.
#[derive(Default)]
pub struct EventRegistry {
    events: HashMap<String, Vec<Callback>>,
}

impl EventRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `callback` to the list for `msg_type`. Duplicates are kept.
    pub fn add(&mut self, msg_type: impl Into<String>, callback: Callback) {
        self.events.entry(msg_type.into()).or_default().push(callback);
    }

    /// Returns the callbacks for `msg_type` in registration order.
    ///
    /// The list is cloned so callers can invoke it without holding a lock.
    #[must_use]
    pub fn callbacks_for(&self, msg_type: &str) -> Vec<Callback> {
        self.events.get(msg_type).cloned().unwrap_or_default()
    }

    /// Returns the number of callbacks registered for `msg_type`.
    #[must_use]
    pub fn count(&self, msg_type: &str) -> usize {
        self.events.get(msg_type).map_or(0, Vec::len)
    }

    /// Returns the total number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (tag, callbacks) in &self.events {
            map.entry(tag, &callbacks.len());
        }
        map.finish()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::ConnectionId;

    fn envelope(msg_type: &str) -> Envelope {
        Envelope::new(msg_type, ConnectionId::new(1), serde_json::Value::Null)
    }

    #[test]
    fn empty_registry_has_no_callbacks() {
        let registry = EventRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.callbacks_for("CSRF_TOKEN").is_empty());
    }

    #[test]
    fn callbacks_keep_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = EventRegistry::new();
        for n in 0..3 {
            let seen = Arc::clone(&seen);
            registry.add(
                "CSRF_TOKEN",
                Arc::new(move |_: &Envelope| {
                    if let Ok(mut v) = seen.lock() {
                        v.push(n);
                    }
                }),
            );
        }

        let env = envelope("CSRF_TOKEN");
        for callback in registry.callbacks_for("CSRF_TOKEN") {
            callback(&env);
        }
        let Ok(seen) = seen.lock() else {
            panic!("poisoned");
        };
        assert_eq!(*seen, vec![0, 1, 2]);
    }

    #[test]
    fn tags_are_isolated() {
        let mut registry = EventRegistry::new();
        registry.add("A", Arc::new(|_: &Envelope| {}));
        registry.add("A", Arc::new(|_: &Envelope| {}));
        registry.add("B", Arc::new(|_: &Envelope| {}));
        assert_eq!(registry.count("A"), 2);
        assert_eq!(registry.count("B"), 1);
        assert_eq!(registry.count("C"), 0);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn debug_lists_counts() {
        let mut registry = EventRegistry::new();
        registry.add("A", Arc::new(|_: &Envelope| {}));
        assert_eq!(format!("{registry:?}"), r#"{"A": 1}"#);
    }
}
