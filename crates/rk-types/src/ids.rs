//! Branded/newtype ID types for type safety.
//!
//! Each ID wraps a `Box<str>` for cheap cloning and a small struct size,
//! matching the one place in the wire protocol that cares: JSON in, JSON
//! out, never interpreted as anything but an opaque key.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Box<str>);

        impl $name {
            pub fn new(s: impl Into<Box<str>>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.into())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s.into_boxed_str())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// A player's login name. Doubles as the registry key everywhere a
    /// player needs to be looked up (§4.4): connections, pending-queue
    /// membership, and room membership are all keyed by `Username`.
    Username
);

define_id!(
    /// Opaque user identifier, distinct from `Username` so a user can
    /// rename without invalidating persisted references (not exercised by
    /// the current store, but keeps `User::id` meaningful).
    UserId
);

define_id!(
    /// Session token minted at login (§4.5), opaque to the client.
    SessionToken
);

define_id!(
    /// Room identifier, generated as `timestamp_ns` per §4.6.
    RoomId
);

define_id!(
    /// Unique id of a live troop instance on the battle map (tick mode only).
    TroopInstanceId
);

define_id!(
    /// Unique id of a live tower instance on the battle map (tick mode only).
    TowerInstanceId
);
