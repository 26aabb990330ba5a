//! Core type definitions for multipart cells.
//!
//! This crate defines the plugin-agnostic building blocks shared by the
//! container and the sync layer:
//! - Part, container, peer and key identifiers (UUID v7)
//! - Namespaced part type identifiers (registry keys)
//! - The box-based [`Shape`] geometry used for admission control
//!
//! Nothing in here knows what a part *does*; domain behaviour lives with
//! the part implementations registered at startup.

mod ids;
mod shape;
mod type_id;

pub use ids::{ContainerId, OwnerKey, PartId, PeerId, PropertyId};
pub use shape::{Cuboid, Direction, EPSILON, Shape};
pub use type_id::{MAX_TYPE_ID_LEN, PartTypeId};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid part type id {id:?}: {reason}")]
    InvalidTypeId { id: String, reason: &'static str },
}
