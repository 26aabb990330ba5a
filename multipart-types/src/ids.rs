//! Identifier types used throughout the multipart core.
//!
//! Uses UUID v7 for time-ordered, globally unique identifiers. Identity
//! comparisons (listener keys, writer keys, property definitions) are
//! equality on these ids, never on the values they are attached to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new identifier with the current timestamp.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Parses an identifier from a string.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id! {
    /// Persistence-durable unique id of one part instance.
    ///
    /// Stable for the part's whole life inside a container and saved with it,
    /// so external systems can hold references across reloads. Never sent on
    /// the wire: replicas address parts by list position.
    PartId
}

uuid_id! {
    /// Identity of one container (one occupied cell).
    ContainerId
}

uuid_id! {
    /// Unique identifier for a peer (replica endpoint) on the sync channel.
    PeerId
}

uuid_id! {
    /// Identity token for listener registrations and property writers.
    ///
    /// Every part owns the key derived from its [`PartId`]; external
    /// observers mint their own with [`OwnerKey::new`].
    OwnerKey
}

uuid_id! {
    /// Identity of one property definition.
    PropertyId
}

impl From<PartId> for OwnerKey {
    fn from(id: PartId) -> Self {
        Self(id.0)
    }
}
