//! Error types for the sync layer.

use multipart_core::ContainerError;
use multipart_types::PartTypeId;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Protocol error (malformed frame or a message the replica cannot apply).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A frame exceeds the configured message size.
    #[error("message too large: {len} bytes (max {max})")]
    MessageTooLarge { len: usize, max: usize },

    /// A creation payload exceeds the configured payload size.
    #[error("payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },

    /// A part decoder failed or the container refused an operation.
    #[error("container error: {0}")]
    Container(#[source] ContainerError),

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,
}

/// Ways a peer can break the wire protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("truncated frame: needed {needed} more bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },

    #[error("unknown message tag {0}")]
    UnknownTag(u8),

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    #[error("invalid part type id {0:?}")]
    InvalidTypeId(String),

    #[error("no definition for part type {0}")]
    UnknownPartType(PartTypeId),

    #[error("remove index {index} out of range (replica holds {len} parts)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("snapshot of {0} parts exceeds the one-byte index space")]
    TooManyParts(usize),

    #[error("message received before the initial snapshot")]
    NotSynchronized,

    #[error("replica is desynchronized; waiting for a snapshot")]
    Desynchronized,
}

impl From<ContainerError> for SyncError {
    fn from(err: ContainerError) -> Self {
        match err {
            ContainerError::UnknownPartType(part_type) => {
                ProtocolError::UnknownPartType(part_type).into()
            }
            ContainerError::IndexOutOfRange { index, len } => {
                ProtocolError::IndexOutOfRange { index, len }.into()
            }
            ContainerError::TooManyParts { count, .. } => ProtocolError::TooManyParts(count).into(),
            other => SyncError::Container(other),
        }
    }
}
