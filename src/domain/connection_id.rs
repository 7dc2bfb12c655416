//! Type-safe connection identifier.
//!
//! [`ConnectionId`] is a newtype wrapper around `u64`. The relay hands out
//! identifiers `1, 2, 3, ...` in arrival order; `0` is representable on the
//! wire (relay-originated error frames use it) but is never assigned.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one connected tab.
///
/// Assigned by [`super::Relay::on_connect`] and carried in the
/// `connectionId` field of every [`super::Envelope`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// The unassigned identifier.
    pub const UNASSIGNED: Self = Self(0);

    /// Creates a `ConnectionId` from a raw integer.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns `true` if this identifier could have been assigned by a relay.
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ConnectionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<ConnectionId> for u64 {
    fn from(id: ConnectionId) -> Self {
        id.0
    }
}
