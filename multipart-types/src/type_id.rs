//! Namespaced part type identifiers.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest type id that fits the one-byte length prefix on the wire.
pub const MAX_TYPE_ID_LEN: usize = u8::MAX as usize;

const MISSING: &str = "multipart:missing";

/// Stable identifier of a part type, e.g. `"pipes:copper_pipe"`.
///
/// This is the registry key: persisted parts and wire descriptors both carry
/// it, and decoders are looked up by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartTypeId(String);

impl PartTypeId {
    /// Parses and validates a `namespace:path` identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        validate(&id).map_err(|reason| Error::InvalidTypeId {
            id: id.clone(),
            reason,
        })?;
        Ok(Self(id))
    }

    /// The reserved id describing a placeholder for a part whose real type
    /// is not registered. Every registry resolves it.
    #[must_use]
    pub fn missing() -> Self {
        Self(MISSING.to_string())
    }

    pub fn is_missing(&self) -> bool {
        self.0 == MISSING
    }

    /// The namespace half (before the colon).
    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map_or("", |(ns, _)| ns)
    }

    /// The path half (after the colon).
    pub fn path(&self) -> &str {
        self.0.split_once(':').map_or("", |(_, path)| path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(id: &str) -> Result<(), &'static str> {
    if id.len() > MAX_TYPE_ID_LEN {
        return Err("longer than 255 bytes");
    }
    let Some((namespace, path)) = id.split_once(':') else {
        return Err("missing ':' separator");
    };
    if namespace.is_empty() || path.is_empty() {
        return Err("empty namespace or path");
    }
    let ns_ok = namespace
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'_' | b'-' | b'.'));
    let path_ok = path.bytes().all(|b| {
        b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'_' | b'-' | b'.' | b'/')
    });
    if !ns_ok || !path_ok {
        return Err("illegal character");
    }
    Ok(())
}

impl fmt::Display for PartTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PartTypeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PartTypeId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PartTypeId> for String {
    fn from(id: PartTypeId) -> Self {
        id.0
    }
}

impl AsRef<str> for PartTypeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
