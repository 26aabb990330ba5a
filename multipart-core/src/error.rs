//! Error types for the container layer.

use crate::container::Role;
use multipart_types::{ContainerId, PartId, PartTypeId};
use thiserror::Error;

/// Result type for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Errors that can occur in container operations.
///
/// Admission rejection is not an error: `Container::offer` returns `None`.
/// Everything here is either a decode failure or a collaborator breaking
/// the container's contract.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The container changed between `offer` and `commit`.
    #[error("stale offer: made at generation {offered}, container is at {current}")]
    StaleOffer { offered: u64, current: u64 },

    /// An offer or handle was used with a container that did not issue it.
    #[error("offer belongs to container {expected}, not {actual}")]
    WrongContainer {
        expected: ContainerId,
        actual: ContainerId,
    },

    /// A part factory returned a part that does not carry the handle it was given.
    #[error("part factory ignored the handle issued for part {part}")]
    HandleMismatch { part: PartId },

    /// An authority-only operation was used on a replica, or vice versa.
    #[error("operation requires a {expected:?} container, this one is {actual:?}")]
    RoleMismatch { expected: Role, actual: Role },

    /// Wire index outside the current part list.
    #[error("part index {index} out of range (container holds {len} parts)")]
    IndexOutOfRange { index: usize, len: usize },

    /// The container cannot hold more parts.
    #[error("too many parts: {count} (max {max})")]
    TooManyParts { count: usize, max: usize },

    /// No definition is registered for the type id.
    #[error("unknown part type: {0}")]
    UnknownPartType(PartTypeId),

    /// A registered decoder rejected its payload.
    #[error("failed to decode part {part_type}: {source}")]
    Decode {
        part_type: PartTypeId,
        #[source]
        source: DecodeError,
    },

    /// A definition with the same type id is already registered.
    #[error("part type already registered: {0}")]
    DuplicateDefinition(PartTypeId),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure reported by a part decoder.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<std::str::Utf8Error> for DecodeError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::new(err.to_string())
    }
}
